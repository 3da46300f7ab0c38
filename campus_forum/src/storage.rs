use axum::body::Bytes;
use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

/// Blob store for attachments backed by a local directory that is served
/// statically under `base_url`.
#[derive(Clone)]
pub struct LocalFileStorage {
    pub upload_dir: PathBuf,
    pub base_url: String,
}

impl LocalFileStorage {
    pub fn new(upload_dir: String, base_url: String) -> Self {
        Self {
            upload_dir: PathBuf::from(upload_dir),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Writes the bytes under a random key, keeping the original extension.
    /// Returns the public url of the stored file.
    pub async fn save_file(
        &self,
        file_bytes: Bytes,
        original_filename: Option<&str>,
    ) -> Result<String, std::io::Error> {
        let extension = original_filename
            .and_then(|name| Path::new(name).extension().and_then(|ext| ext.to_str()))
            .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .map(|ext| format!(".{}", ext))
            .unwrap_or_default();

        let unique_filename = format!("{}{}", Uuid::new_v4(), extension);
        let file_path = self.upload_dir.join(&unique_filename);

        fs::create_dir_all(&self.upload_dir).await?;
        fs::write(&file_path, file_bytes).await?;

        Ok(format!("{}/{}", self.base_url, unique_filename))
    }

    pub async fn delete_file(&self, file_url: &str) -> Result<(), std::io::Error> {
        let key = file_url
            .strip_prefix(&self.base_url)
            .unwrap_or(file_url)
            .trim_start_matches('/');
        // Keys are flat; anything with a separator did not come from save_file.
        if key.is_empty() || key.contains('/') || key.contains("..") {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "not a stored file url",
            ));
        }
        fs::remove_file(self.upload_dir.join(key)).await
    }
}
