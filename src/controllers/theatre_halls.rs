use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use std::sync::Arc;
use tracing::info;

use crate::controllers::ValidatedJson;
use crate::error::AppResult;
use crate::middleware::AdminUser;
use crate::models::theatre_hall::TheatreHallResponse;
use crate::models::{NewTheatreHall, TheatreHall};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/theatre_halls", get(list_halls).post(create_hall))
}

async fn list_halls(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<TheatreHallResponse>>> {
    let halls = TheatreHall::list(&state.db.pool).await?;
    Ok(Json(halls.into_iter().map(TheatreHallResponse::from).collect()))
}

async fn create_hall(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    ValidatedJson(req): ValidatedJson<NewTheatreHall>,
) -> AppResult<impl IntoResponse> {
    let hall = TheatreHall::insert(&state.db.pool, &req).await?;
    info!(
        "Hall {} ({}x{}) created by {}",
        hall.name, hall.rows, hall.seats_in_row, admin.email
    );
    Ok((StatusCode::CREATED, Json(TheatreHallResponse::from(hall))))
}
