use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use std::sync::Arc;
use tracing::info;

use crate::controllers::ValidatedJson;
use crate::error::AppResult;
use crate::middleware::AdminUser;
use crate::models::{Genre, NewGenre};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/genres", get(list_genres).post(create_genre))
}

async fn list_genres(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<Genre>>> {
    Ok(Json(Genre::list(&state.db.pool).await?))
}

async fn create_genre(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    ValidatedJson(req): ValidatedJson<NewGenre>,
) -> AppResult<impl IntoResponse> {
    let genre = Genre::insert(&state.db.pool, &req).await?;
    info!("Genre {} created by {}", genre, admin.email);
    Ok((StatusCode::CREATED, Json(genre)))
}
