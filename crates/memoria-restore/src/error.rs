//! Pipeline error taxonomy.
//!
//! Only batch-fatal conditions are represented here. Per-file failures are
//! task outcomes counted by the orchestrator, metadata extraction degrades
//! to a partial record, and cleanup failures are logged and never escalated.

use memoria_storage::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RestoreError {
    /// The input is not a recognized ZIP archive. Fatal, no retry.
    #[error("invalid archive: {0}")]
    InvalidArchive(String),

    /// Disk or permission failure while extracting. Fatal to the batch;
    /// partially extracted content is removed by cleanup.
    #[error("extraction failed: {0}")]
    ExtractionIo(#[source] std::io::Error),

    /// The storage target cannot be resolved to a working backend.
    #[error("storage configuration error: {0}")]
    Config(String),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("catalog error: {0}")]
    Catalog(#[source] anyhow::Error),
}

impl RestoreError {
    /// Split resolution failures into configuration errors and plain
    /// storage errors.
    pub(crate) fn from_resolution(err: StorageError) -> Self {
        match err {
            StorageError::Config(msg) => RestoreError::Config(msg),
            other => RestoreError::Storage(other),
        }
    }
}
