use anyhow::Context;
use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

// Главная структура конфигурации - контейнер для всех настроек
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub media: MediaConfig,
    pub bootstrap: BootstrapConfig,
}

// Настройки приложения
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub rust_log: String,
    /// `plain` или `json`
    pub log_format: String,
}

// Настройки базы данных
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: u32,
}

// Redis опционален: без REDIS_URL кеш списков просто выключен
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: Option<String>,
    pub listing_ttl_seconds: u64,
}

// Куда складываются обложки спектаклей и под каким префиксом они отдаются
#[derive(Debug, Clone, Deserialize)]
pub struct MediaConfig {
    pub root: PathBuf,
    pub url_prefix: String,
    pub max_upload_bytes: usize,
}

// Администратор, которого создаём при старте (если заданы оба поля)
#[derive(Debug, Clone, Deserialize)]
pub struct BootstrapConfig {
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Config {
            app: AppConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_var("PORT", 8000)?,
                environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
                rust_log: env::var("RUST_LOG")
                    .unwrap_or_else(|_| "theatre_booking=debug,tower_http=debug".to_string()),
                log_format: env::var("LOG_FORMAT").unwrap_or_else(|_| "plain".to_string()),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
                pool_size: parse_var("DB_POOL_SIZE", 20)?,
            },
            redis: RedisConfig {
                url: optional_var("REDIS_URL"),
                listing_ttl_seconds: parse_var("LISTING_CACHE_TTL_SECONDS", 5)?,
            },
            media: MediaConfig {
                root: env::var("MEDIA_ROOT")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from("./media")),
                url_prefix: media_url_prefix(
                    &env::var("MEDIA_URL").unwrap_or_else(|_| "/media".to_string()),
                )?,
                max_upload_bytes: parse_var("MAX_UPLOAD_BYTES", 5 * 1024 * 1024)?,
            },
            bootstrap: BootstrapConfig {
                admin_email: optional_var("ADMIN_EMAIL"),
                admin_password: optional_var("ADMIN_PASSWORD"),
            },
        })
    }

    pub fn is_json_logging(&self) -> bool {
        self.app.log_format.eq_ignore_ascii_case("json")
    }
}

fn optional_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

// Префикс монтируется в роутер, поэтому корень "/" и пустая строка не годятся
fn media_url_prefix(raw: &str) -> anyhow::Result<String> {
    let prefix = raw.trim().trim_end_matches('/');
    if prefix.is_empty() || !prefix.starts_with('/') {
        anyhow::bail!("MEDIA_URL must be a path like /media, got {raw:?}");
    }
    Ok(prefix.to_string())
}

fn parse_var<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} must be a valid value, got {raw:?}")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_var_falls_back_to_default_when_unset() {
        let value: u16 = parse_var("THEATRE_TEST_SURELY_UNSET_PORT", 8123).unwrap();
        assert_eq!(value, 8123);
    }

    #[test]
    fn media_prefix_must_be_a_non_root_path() {
        assert_eq!(media_url_prefix("/media/").unwrap(), "/media");
        assert_eq!(media_url_prefix(" /static/covers ").unwrap(), "/static/covers");
        assert!(media_url_prefix("/").is_err());
        assert!(media_url_prefix("").is_err());
        assert!(media_url_prefix("media").is_err());
    }

    #[test]
    fn optional_var_ignores_blank_values() {
        assert_eq!(optional_var("THEATRE_TEST_SURELY_UNSET_VALUE"), None);
    }
}
