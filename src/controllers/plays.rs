use axum::{
    extract::{DefaultBodyLimit, Multipart, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::controllers::{PathId, ValidatedJson};
use crate::error::{AppError, AppResult};
use crate::media::MediaStorage;
use crate::middleware::AdminUser;
use crate::models::{NewPlay, Play};
use crate::services::catalog::{self, PlayDetail, PlayFilter, PlayListItem};
use crate::AppState;

// запас под multipart-обвязку вокруг файла
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn routes(max_upload_bytes: usize) -> Router<Arc<AppState>> {
    Router::new()
        .route("/plays", get(list_plays).post(create_play))
        .route("/plays/{id}", get(get_play))
        .route(
            "/plays/{id}/upload-image",
            post(upload_image).layer(DefaultBodyLimit::max(max_upload_bytes + MULTIPART_OVERHEAD)),
        )
}

#[derive(Debug, Deserialize)]
pub struct PlaysQuery {
    pub genres: Option<String>,
    pub actors: Option<String>,
}

// GET /api/plays?genres=1,2&actors=5
async fn list_plays(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PlaysQuery>,
) -> AppResult<Json<Vec<PlayListItem>>> {
    let filter = PlayFilter::from_query(params.genres.as_deref(), params.actors.as_deref())?;
    let plays = catalog::list_plays(&state.db.pool, &filter).await?;
    Ok(Json(plays))
}

async fn get_play(
    State(state): State<Arc<AppState>>,
    PathId(id): PathId,
) -> AppResult<Json<PlayDetail>> {
    Ok(Json(catalog::play_detail(&state.db.pool, id).await?))
}

async fn create_play(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    ValidatedJson(req): ValidatedJson<NewPlay>,
) -> AppResult<impl IntoResponse> {
    let play = Play::insert(&state.db.pool, &req).await?;
    info!("Play \"{}\" created by {}", play.title, admin.email);
    Ok((StatusCode::CREATED, Json(play)))
}

#[derive(Debug, Serialize)]
pub struct PlayImageResponse {
    pub id: i64,
    pub cover_image: String,
}

// POST /api/plays/{id}/upload-image, multipart поле `cover_image`
async fn upload_image(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    PathId(id): PathId,
    mut multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    if Play::find(&state.db.pool, id).await?.is_none() {
        return Err(AppError::not_found("play", id));
    }

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation("cover_image", e.body_text()))?
    {
        if field.name() != Some("cover_image") {
            continue;
        }
        let extension = MediaStorage::image_extension(field.content_type(), field.file_name())?;
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::validation("cover_image", e.body_text()))?;
        upload = Some((bytes, extension));
        break;
    }

    let (bytes, extension) =
        upload.ok_or_else(|| AppError::validation("cover_image", "no file was submitted"))?;

    let cover_image = state.media.save_cover_image(&bytes, extension).await?;
    if !Play::set_cover_image(&state.db.pool, id, &cover_image).await? {
        return Err(AppError::not_found("play", id));
    }
    // обложка попадает в списки показов
    state.cache.invalidate_performance_lists().await;

    info!("Cover image for play {} uploaded by {}", id, admin.email);
    Ok((StatusCode::OK, Json(PlayImageResponse { id, cover_image })))
}
