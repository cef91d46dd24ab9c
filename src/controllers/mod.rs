pub mod actors;
pub mod genres;
pub mod performances;
pub mod plays;
pub mod reservations;
pub mod theatre_halls;

use axum::{
    extract::{FromRequest, FromRequestParts, Path, Request},
    http::request::Parts,
    Json, Router,
};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use validator::Validate;

use crate::error::AppError;
use crate::AppState;

pub fn routes(state: &AppState) -> Router<Arc<AppState>> {
    Router::new()
        .merge(genres::routes())
        .merge(actors::routes())
        .merge(theatre_halls::routes())
        .merge(plays::routes(state.media.max_upload_bytes()))
        .merge(performances::routes())
        .merge(reservations::routes())
}

/// JSON тело, прошедшее `validator`. Ошибки разбора и проверки - 400 с полями.
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::validation("body", rejection.body_text()))?;
        value
            .validate()
            .map_err(|errors| AppError::Validation(errors.into()))?;
        Ok(ValidatedJson(value))
    }
}

/// Параметр пути (`/{id}`). Нечисловой id - 400 в общем формате ошибок.
#[derive(Debug, Clone, Copy)]
pub struct PathId(pub i64);

impl<S> FromRequestParts<S> for PathId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<i64>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| AppError::validation("id", rejection.body_text()))?;
        Ok(PathId(id))
    }
}
