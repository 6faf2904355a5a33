//! Uploaded image storage on the local filesystem.

use std::io;
use std::path::{Path, PathBuf};

use actix_multipart::Field;
use futures_util::TryStreamExt;
use thiserror::Error;
use uuid::Uuid;

const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

/// Public URL prefix stored in `image_url` columns.
pub const PUBLIC_PREFIX: &str = "uploads";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Unsupported image type '{0}'. Allowed: png, jpg, jpeg, gif, webp")]
    UnsupportedType(String),

    #[error("Image exceeds the {limit} byte upload limit")]
    TooLarge { limit: usize },

    #[error("Invalid multipart payload: {0}")]
    Multipart(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone)]
pub struct ImageStore {
    root: PathBuf,
    max_bytes: usize,
}

impl ImageStore {
    pub fn new(root: impl Into<PathBuf>, max_bytes: usize) -> Self {
        Self {
            root: root.into(),
            max_bytes,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn ensure_root(&self) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.root).await
    }

    /// Streams one multipart file field to disk and returns its public path.
    pub async fn save_field(&self, mut field: Field) -> Result<String, StorageError> {
        let original_name = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .unwrap_or_default()
            .to_string();
        let extension = allowed_extension(&original_name)?;

        let mut bytes = Vec::new();
        while let Some(chunk) = field
            .try_next()
            .await
            .map_err(|e| StorageError::Multipart(e.to_string()))?
        {
            if bytes.len() + chunk.len() > self.max_bytes {
                return Err(StorageError::TooLarge {
                    limit: self.max_bytes,
                });
            }
            bytes.extend_from_slice(&chunk);
        }

        self.write(&extension, &bytes).await
    }

    #[cfg(test)]
    pub async fn save_bytes(&self, original_name: &str, bytes: &[u8]) -> Result<String, StorageError> {
        let extension = allowed_extension(original_name)?;
        if bytes.len() > self.max_bytes {
            return Err(StorageError::TooLarge {
                limit: self.max_bytes,
            });
        }
        self.write(&extension, bytes).await
    }

    async fn write(&self, extension: &str, bytes: &[u8]) -> Result<String, StorageError> {
        self.ensure_root().await?;
        let file_name = format!("{}.{}", Uuid::new_v4(), extension);
        tokio::fs::write(self.root.join(&file_name), bytes).await?;
        log::info!("Stored image {file_name} ({} bytes)", bytes.len());
        Ok(format!("{PUBLIC_PREFIX}/{file_name}"))
    }

    /// Maps a stored `image_url` back to a file inside the root. Only the
    /// final path component is used, so stored values cannot escape the root.
    pub fn resolve(&self, image_url: &str) -> Option<PathBuf> {
        let file_name = Path::new(image_url.trim()).file_name()?;
        let file_name = file_name.to_str()?;
        if file_name.is_empty() || file_name.starts_with('.') {
            return None;
        }
        Some(self.root.join(file_name))
    }

    /// Best-effort removal. Failures are logged and never propagated.
    pub async fn delete(&self, image_url: &str) -> bool {
        let Some(path) = self.resolve(image_url) else {
            log::warn!("Refusing to delete image with unusable path '{image_url}'");
            return false;
        };
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                log::info!("Deleted image {}", path.display());
                true
            }
            Err(err) => {
                log::warn!("Failed to delete image {}: {err}", path.display());
                false
            }
        }
    }
}

fn allowed_extension(file_name: &str) -> Result<String, StorageError> {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();

    if ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        Ok(extension)
    } else {
        Err(StorageError::UnsupportedType(extension))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn saves_and_deletes_images() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path().join("business_images"), 1024);

        let url = store.save_bytes("Storefront.JPG", b"fake-jpeg").await.unwrap();
        assert!(url.starts_with("uploads/"));
        assert!(url.ends_with(".jpg"));

        let path = store.resolve(&url).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"fake-jpeg");

        assert!(store.delete(&url).await);
        assert!(!path.exists());
        // Second delete is logged, not an error.
        assert!(!store.delete(&url).await);
    }

    #[tokio::test]
    async fn rejects_unsupported_and_oversized_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path(), 4);

        assert!(matches!(
            store.save_bytes("payload.exe", b"MZ").await,
            Err(StorageError::UnsupportedType(ext)) if ext == "exe"
        ));
        assert!(matches!(
            store.save_bytes("big.png", b"too many bytes").await,
            Err(StorageError::TooLarge { limit: 4 })
        ));
    }

    #[test]
    fn resolve_stays_inside_root() {
        let store = ImageStore::new("/srv/images", 10);
        assert_eq!(
            store.resolve("uploads/../../etc/passwd"),
            Some(PathBuf::from("/srv/images/passwd"))
        );
        assert_eq!(store.resolve("uploads/.."), None);
        assert_eq!(store.resolve(""), None);
    }
}
