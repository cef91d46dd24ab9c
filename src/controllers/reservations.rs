use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use std::sync::Arc;

use crate::controllers::ValidatedJson;
use crate::error::AppResult;
use crate::middleware::AuthUser;
use crate::services::catalog::{self, ReservationView};
use crate::services::reservation::{self, CreateReservationRequest};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/reservations", get(list_reservations).post(create_reservation))
}

// GET /api/reservations - только брони вызывающего
async fn list_reservations(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> AppResult<Json<Vec<ReservationView>>> {
    Ok(Json(catalog::list_reservations(&state.db.pool, user.user_id).await?))
}

// POST /api/reservations
async fn create_reservation(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ValidatedJson(req): ValidatedJson<CreateReservationRequest>,
) -> AppResult<impl IntoResponse> {
    let created =
        reservation::create_reservation(&state.db.pool, user.user_id, &user.email, &req).await?;

    // available_tickets в списке показов поменялся
    state.cache.invalidate_performance_lists().await;

    Ok((StatusCode::CREATED, Json(created)))
}
