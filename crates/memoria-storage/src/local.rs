use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use memoria_core::models::{StorageDriver, StorageTarget};
use tokio::fs;
use tokio::io::AsyncReadExt;

use crate::traits::{validate_path, Storage, StorageError, StorageResult};

/// Local filesystem storage implementation
///
/// The root is scoped to one storage target; see [`LocalStorage::for_target`].
#[derive(Clone)]
pub struct LocalStorage {
    root: PathBuf,
    base_url: String,
}

impl LocalStorage {
    /// Create a new LocalStorage instance rooted at `root`.
    pub async fn new(root: impl Into<PathBuf>, base_url: String) -> StorageResult<Self> {
        let root = root.into();

        fs::create_dir_all(&root).await.map_err(|e| {
            StorageError::Config(format!(
                "Failed to create storage directory {}: {}",
                root.display(),
                e
            ))
        })?;

        Ok(LocalStorage { root, base_url })
    }

    /// Build a backend for a local-driver target.
    ///
    /// The configured root is extended with the target id so that two targets
    /// sharing a base directory never collide.
    pub async fn for_target(target: &StorageTarget) -> StorageResult<Self> {
        let base = target.config.root.as_deref().ok_or_else(|| {
            StorageError::Config(format!(
                "local target {} has no configured root",
                target.id
            ))
        })?;
        let root = Path::new(base).join(target.id.to_string());
        let base_url = target
            .config
            .url
            .clone()
            .unwrap_or_else(|| format!("storage/{}", target.id));
        Self::new(root, base_url).await
    }

    /// Convert a storage path to a filesystem path, rejecting traversal
    /// sequences that would escape the root.
    fn resolve(&self, path: &str) -> StorageResult<PathBuf> {
        validate_path(path)?;
        Ok(self.root.join(path))
    }

    fn generate_url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn exists(&self, path: &str) -> StorageResult<bool> {
        let full = self.resolve(path)?;
        Ok(fs::try_exists(&full).await.unwrap_or(false))
    }

    async fn read(&self, path: &str) -> StorageResult<Vec<u8>> {
        let full = self.resolve(path)?;

        if !fs::try_exists(&full).await.unwrap_or(false) {
            return Err(StorageError::NotFound(path.to_string()));
        }

        fs::read(&full).await.map_err(|e| {
            StorageError::ReadFailed(format!("Failed to read file {}: {}", full.display(), e))
        })
    }

    async fn write_file(&self, path: &str, source: &Path) -> StorageResult<u64> {
        let full = self.resolve(path)?;
        self.ensure_parent_dir(&full).await?;

        let start = std::time::Instant::now();

        let mut reader = fs::File::open(source).await.map_err(|e| {
            StorageError::WriteFailed(format!(
                "Failed to open source {}: {}",
                source.display(),
                e
            ))
        })?;
        let mut file = fs::File::create(&full).await.map_err(|e| {
            StorageError::WriteFailed(format!("Failed to create file {}: {}", full.display(), e))
        })?;

        let bytes_copied = tokio::io::copy(&mut reader, &mut file).await.map_err(|e| {
            StorageError::WriteFailed(format!("Failed to write file {}: {}", full.display(), e))
        })?;

        file.sync_all().await.map_err(|e| {
            StorageError::WriteFailed(format!("Failed to sync file {}: {}", full.display(), e))
        })?;

        tracing::info!(
            path = %full.display(),
            size_bytes = bytes_copied,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage write successful"
        );

        Ok(bytes_copied)
    }

    async fn delete(&self, path: &str) -> StorageResult<()> {
        let full = self.resolve(path)?;

        if !fs::try_exists(&full).await.unwrap_or(false) {
            return Ok(());
        }

        fs::remove_file(&full).await.map_err(|e| {
            StorageError::DeleteFailed(format!("Failed to delete file {}: {}", full.display(), e))
        })?;

        tracing::info!(path = %full.display(), "Local storage delete successful");

        Ok(())
    }

    async fn delete_all(&self, prefix: &str) -> StorageResult<()> {
        let full = if prefix.is_empty() {
            self.root.clone()
        } else {
            self.resolve(prefix)?
        };

        if !fs::try_exists(&full).await.unwrap_or(false) {
            return Ok(());
        }

        fs::remove_dir_all(&full).await.map_err(|e| {
            StorageError::DeleteFailed(format!(
                "Failed to delete tree {}: {}",
                full.display(),
                e
            ))
        })?;

        tracing::info!(path = %full.display(), "Local storage tree removed");

        Ok(())
    }

    async fn content_length(&self, path: &str) -> StorageResult<u64> {
        let full = self.resolve(path)?;
        let meta = fs::metadata(&full)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(meta.len())
    }

    async fn content_type(&self, path: &str) -> StorageResult<Option<String>> {
        let full = self.resolve(path)?;
        let mut file = fs::File::open(&full)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        // Magic-byte sniff of the file head; 8 KiB covers every registered type.
        let mut head = vec![0u8; 8192];
        let n = file
            .read(&mut head)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        head.truncate(n);

        Ok(infer::get(&head).map(|t| t.mime_type().to_string()))
    }

    async fn last_modified(&self, path: &str) -> StorageResult<DateTime<Utc>> {
        let full = self.resolve(path)?;
        let meta = fs::metadata(&full)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        let modified = meta.modified().map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(DateTime::<Utc>::from(modified))
    }

    fn url(&self, path: &str) -> String {
        self.generate_url(path)
    }

    async fn presigned_url(&self, path: &str, _expires_in: Duration) -> StorageResult<String> {
        // Local files are served by path; no signing.
        self.resolve(path)?;
        Ok(self.generate_url(path))
    }

    fn driver(&self) -> StorageDriver {
        StorageDriver::Local
    }
}
