use crate::redis_client::RedisClient;
use tracing::info;

pub mod performances;

/// Кеш ответов для списков. Без Redis все методы превращаются в промахи.
#[derive(Clone)]
pub struct CacheService {
    redis: Option<RedisClient>,
    listing_ttl_seconds: u64,
}

impl CacheService {
    pub fn new(redis: Option<RedisClient>, listing_ttl_seconds: u64) -> Self {
        if redis.is_none() {
            info!("Listing cache disabled: no Redis configured");
        }
        Self { redis, listing_ttl_seconds }
    }

    pub fn disabled() -> Self {
        Self { redis: None, listing_ttl_seconds: 0 }
    }

    pub fn is_enabled(&self) -> bool {
        self.redis.is_some() && self.listing_ttl_seconds > 0
    }
}
