pub mod cache;
pub mod config;
pub mod controllers;
pub mod database;
pub mod error;
pub mod media;
pub mod middleware;
pub mod models;
pub mod redis_client;
pub mod services;

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::{info, warn};

// Shared state для всего приложения
#[derive(Clone)]
pub struct AppState {
    pub db: database::Database,
    pub cache: cache::CacheService,
    pub config: config::Config,
    pub media: media::MediaStorage,
}

impl AppState {
    pub async fn new(config: config::Config) -> anyhow::Result<Arc<Self>> {
        let db = database::Database::new(&config.database.url, config.database.pool_size).await?;
        info!("Database connected");

        db.run_migrations().await?;

        // Redis нужен только для кеша списков; без него работаем напрямую с базой
        let redis = match config.redis.url.as_deref() {
            Some(url) => match redis_client::RedisClient::new(url).await {
                Ok(client) => Some(client),
                Err(e) => {
                    warn!("Redis unavailable, listing cache disabled: {:?}", e);
                    None
                }
            },
            None => None,
        };
        let cache = cache::CacheService::new(redis, config.redis.listing_ttl_seconds);

        if let (Some(email), Some(password)) = (
            config.bootstrap.admin_email.as_deref(),
            config.bootstrap.admin_password.as_deref(),
        ) {
            models::User::upsert_admin(&db.pool, email, password).await?;
        }

        let media = media::MediaStorage::new(&config.media);
        tokio::fs::create_dir_all(media.root()).await?;

        Ok(Arc::new(Self {
            db,
            cache,
            config,
            media,
        }))
    }
}

/// Корневой роутер: `/api/*`, `/media/*`, служебные пути.
pub fn app(state: Arc<AppState>) -> Router {
    let media = ServeDir::new(state.media.root());
    let media_prefix = state.media.url_prefix().to_string();

    Router::new()
        .route("/", get(|| async { "Theatre API v1.0" }))
        .route("/health", get(|| async { "OK" }))
        .nest("/api", controllers::routes(&state))
        .nest_service(&media_prefix, media)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
