use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::MediaConfig;
use crate::error::{AppError, AppResult};

const COVER_DIR: &str = "plays";

/// Локальное хранилище обложек. Имя файла - sha256 содержимого,
/// поэтому повторная загрузка той же картинки ничего не дублирует.
#[derive(Debug, Clone)]
pub struct MediaStorage {
    root: PathBuf,
    url_prefix: String,
    max_upload_bytes: usize,
}

impl MediaStorage {
    pub fn new(config: &MediaConfig) -> Self {
        Self {
            root: config.root.clone(),
            url_prefix: config.url_prefix.trim_end_matches('/').to_string(),
            max_upload_bytes: config.max_upload_bytes,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn url_prefix(&self) -> &str {
        &self.url_prefix
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }

    /// Расширение по content-type, а если его нет - по имени файла.
    pub fn image_extension(content_type: Option<&str>, file_name: Option<&str>) -> AppResult<&'static str> {
        let by_type = content_type.and_then(|ct| match ct {
            "image/jpeg" | "image/jpg" => Some("jpg"),
            "image/png" => Some("png"),
            "image/gif" => Some("gif"),
            "image/webp" => Some("webp"),
            _ => None,
        });
        let by_name = || {
            let ext = Path::new(file_name?).extension()?.to_str()?.to_ascii_lowercase();
            match ext.as_str() {
                "jpg" | "jpeg" => Some("jpg"),
                "png" => Some("png"),
                "gif" => Some("gif"),
                "webp" => Some("webp"),
                _ => None,
            }
        };
        by_type.or_else(by_name).ok_or_else(|| {
            AppError::validation(
                "cover_image",
                "upload a valid image (jpeg, png, gif or webp)",
            )
        })
    }

    /// Сохраняет обложку и возвращает её публичный путь.
    pub async fn save_cover_image(&self, bytes: &[u8], extension: &str) -> AppResult<String> {
        if bytes.is_empty() {
            return Err(AppError::validation("cover_image", "the submitted file is empty"));
        }
        if bytes.len() > self.max_upload_bytes {
            return Err(AppError::validation(
                "cover_image",
                format!("file is larger than {} bytes", self.max_upload_bytes),
            ));
        }

        let digest = Sha256::digest(bytes);
        let file_name = format!("{digest:x}.{extension}");
        let dir = self.root.join(COVER_DIR);
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(dir.join(&file_name), bytes).await?;

        info!("Stored cover image {} ({} bytes)", file_name, bytes.len());
        Ok(format!("{}/{COVER_DIR}/{file_name}", self.url_prefix))
    }
}
