use axum::{
    extract::{Query, State},
    http::{header, HeaderName, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info};

use crate::cache::performances::performance_list_key;
use crate::controllers::{PathId, ValidatedJson};
use crate::error::AppResult;
use crate::middleware::AdminUser;
use crate::models::{NewPerformance, Performance};
use crate::services::catalog::{self, AvailableTickets, PerformanceDetail};
use crate::AppState;

const X_CACHE: HeaderName = HeaderName::from_static("x-cache");

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/performances", get(list_performances).post(create_performance))
        .route("/performances/{id}", get(get_performance))
        .route("/performances/{id}/available_tickets", get(available_tickets))
}

#[derive(Debug, Deserialize)]
pub struct PerformancesQuery {
    pub date: Option<String>,
}

// GET /api/performances?date=2025-01-01
async fn list_performances(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PerformancesQuery>,
) -> AppResult<Response> {
    let date = params
        .date
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(|d| catalog::parse_date("date", d))
        .transpose()?;

    // 1. Списки допускают короткую задержку - сначала кеш
    let cache_key = performance_list_key(date);
    if let Some(cached) = state.cache.get_performance_list(&cache_key).await {
        return Ok(json_with_cache_status(cached, "HIT"));
    }

    // 2. Промах: идём в базу и кладём результат в кеш
    let performances = catalog::list_performances(&state.db.pool, date).await?;
    match serde_json::to_string(&performances) {
        Ok(json) => {
            state.cache.cache_performance_list(&cache_key, &json).await;
            Ok(json_with_cache_status(json, "MISS"))
        }
        Err(e) => {
            error!("Failed to serialize performance list: {:?}", e);
            Ok(Json(performances).into_response())
        }
    }
}

fn json_with_cache_status(body: String, status: &'static str) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json"), (X_CACHE, status)],
        body,
    )
        .into_response()
}

async fn get_performance(
    State(state): State<Arc<AppState>>,
    PathId(id): PathId,
) -> AppResult<Json<PerformanceDetail>> {
    Ok(Json(catalog::performance_detail(&state.db.pool, id).await?))
}

async fn available_tickets(
    State(state): State<Arc<AppState>>,
    PathId(id): PathId,
) -> AppResult<Json<AvailableTickets>> {
    Ok(Json(catalog::available_tickets(&state.db.pool, id).await?))
}

async fn create_performance(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    ValidatedJson(req): ValidatedJson<NewPerformance>,
) -> AppResult<impl IntoResponse> {
    let (performance, label): (Performance, String) =
        Performance::insert(&state.db.pool, &req).await?;
    state.cache.invalidate_performance_lists().await;
    info!("Scheduled {} (by {})", label, admin.email);
    Ok((StatusCode::CREATED, Json(performance)))
}
