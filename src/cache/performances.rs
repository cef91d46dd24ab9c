use chrono::NaiveDate;
use redis::AsyncCommands;
use tracing::{debug, warn};

use crate::cache::CacheService;

const PERFORMANCE_LIST_PREFIX: &str = "performances:list:";

/// Ключ кеша для списка спектаклей с фильтром по дате.
pub fn performance_list_key(date: Option<NaiveDate>) -> String {
    match date {
        Some(d) => format!("{PERFORMANCE_LIST_PREFIX}date={}", d.format("%Y-%m-%d")),
        None => format!("{PERFORMANCE_LIST_PREFIX}all"),
    }
}

impl CacheService {
    /// Закешированный JSON списка. Ошибка Redis = промах.
    pub async fn get_performance_list(&self, key: &str) -> Option<String> {
        if !self.is_enabled() {
            return None;
        }
        let mut conn = self.redis.as_ref()?.conn.clone();
        match conn.get::<_, Option<String>>(key).await {
            Ok(hit) => hit,
            Err(e) => {
                warn!("performance list cache read failed: {:?}", e);
                None
            }
        }
    }

    pub async fn cache_performance_list(&self, key: &str, json: &str) {
        let Some(redis) = self.redis.as_ref().filter(|_| self.is_enabled()) else {
            return;
        };
        let mut conn = redis.conn.clone();
        if let Err(e) = conn
            .set_ex::<_, _, ()>(key, json, self.listing_ttl_seconds)
            .await
        {
            warn!("performance list cache write failed: {:?}", e);
        }
    }

    /// Сбросить все закешированные списки (после продажи билетов или нового показа).
    pub async fn invalidate_performance_lists(&self) {
        let Some(redis) = self.redis.as_ref() else {
            return;
        };
        let mut conn = redis.conn.clone();
        let keys: Vec<String> = match redis::cmd("KEYS")
            .arg(format!("{PERFORMANCE_LIST_PREFIX}*"))
            .query_async(&mut conn)
            .await
        {
            Ok(keys) => keys,
            Err(e) => {
                warn!("failed to list performance cache keys: {:?}", e);
                return;
            }
        };
        if keys.is_empty() {
            return;
        }
        let count = keys.len();
        if let Err(e) = conn.del::<_, ()>(keys).await {
            warn!("failed to invalidate performance lists: {:?}", e);
        } else {
            debug!("Invalidated {} cached performance lists", count);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_differ_per_date() {
        let day = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        assert_eq!(performance_list_key(Some(day)), "performances:list:date=2025-01-01");
        assert_eq!(performance_list_key(None), "performances:list:all");
    }

    #[tokio::test]
    async fn disabled_cache_always_misses() {
        let cache = CacheService::disabled();
        assert!(!cache.is_enabled());
        cache.cache_performance_list("performances:list:all", "[]").await;
        assert_eq!(cache.get_performance_list("performances:list:all").await, None);
        cache.invalidate_performance_lists().await;
    }
}
