use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use std::sync::Arc;
use tracing::info;

use crate::controllers::ValidatedJson;
use crate::error::AppResult;
use crate::middleware::AdminUser;
use crate::models::actor::ActorResponse;
use crate::models::{Actor, NewActor};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/actors", get(list_actors).post(create_actor))
}

async fn list_actors(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<ActorResponse>>> {
    let actors = Actor::list(&state.db.pool).await?;
    Ok(Json(actors.into_iter().map(ActorResponse::from).collect()))
}

async fn create_actor(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    ValidatedJson(req): ValidatedJson<NewActor>,
) -> AppResult<impl IntoResponse> {
    let actor = Actor::insert(&state.db.pool, &req).await?;
    info!("Actor {} created by {}", actor, admin.email);
    Ok((StatusCode::CREATED, Json(ActorResponse::from(actor))))
}
