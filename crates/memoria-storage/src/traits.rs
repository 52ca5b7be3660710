//! Storage abstraction trait
//!
//! This module defines the Storage trait that all restore-target backends
//! must implement.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use memoria_core::models::StorageDriver;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid storage path: {0}")]
    InvalidPath(String),

    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage abstraction trait
///
/// All target backends (local filesystem, object store) implement this trait
/// so the restore pipeline works against any backend without coupling to
/// implementation details. Backends are safe for concurrent use within one
/// batch run; resolved instances must not be assumed valid across process
/// restarts, since target credentials and configuration can change.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Check if an object exists at `path`.
    async fn exists(&self, path: &str) -> StorageResult<bool>;

    /// Read an object's full content.
    async fn read(&self, path: &str) -> StorageResult<Vec<u8>>;

    /// Copy a staged file into the backend at `path`. Returns the number of
    /// bytes written. Writing to an existing path overwrites it, which makes
    /// content-addressed placement idempotent. The local backend streams;
    /// the object backend buffers the file for a single put, so memory use
    /// there is bounded by the largest archive entry.
    async fn write_file(&self, path: &str, source: &Path) -> StorageResult<u64>;

    /// Delete one object. Deleting a missing object is not an error.
    async fn delete(&self, path: &str) -> StorageResult<()>;

    /// Recursively delete every object under `prefix`; an empty prefix wipes
    /// the whole target tree (force-delete cascade).
    async fn delete_all(&self, prefix: &str) -> StorageResult<()>;

    /// Size in bytes of an object.
    async fn content_length(&self, path: &str) -> StorageResult<u64>;

    /// MIME type of an object, if the backend can determine one.
    async fn content_type(&self, path: &str) -> StorageResult<Option<String>>;

    /// Last-modified instant of an object.
    async fn last_modified(&self, path: &str) -> StorageResult<DateTime<Utc>>;

    /// Public retrieval URL for an object.
    fn url(&self, path: &str) -> String;

    /// Time-limited retrieval URL. Backends without signing return the plain
    /// URL.
    async fn presigned_url(&self, path: &str, expires_in: Duration) -> StorageResult<String>;

    /// The driver kind backing this instance.
    fn driver(&self) -> StorageDriver;
}

/// Reject paths that could escape the target root.
pub(crate) fn validate_path(path: &str) -> StorageResult<()> {
    if path.contains("..") || path.starts_with('/') {
        return Err(StorageError::InvalidPath(
            "storage path contains invalid components".to_string(),
        ));
    }
    Ok(())
}
