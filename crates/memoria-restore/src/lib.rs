//! Memoria Restore Pipeline
//!
//! Ingests ZIP media archives into per-owner, content-addressed storage
//! targets: extraction to a staging area, magic-byte classification,
//! metadata extraction (EXIF, ffprobe, or JSON sidecars), content-addressed
//! placement, and idempotent catalog upserts, orchestrated per batch with
//! bounded concurrency and allowed partial failure.

pub mod address;
pub mod batch;
pub mod classify;
pub mod error;
pub mod extract;
pub mod metadata;
pub mod notify;
pub mod task;

// Re-export commonly used types
pub use address::{address, ContentAddress};
pub use batch::RestorePipeline;
pub use classify::{scan_staging, FileClass, MediaKind, StagedEntry};
pub use error::RestoreError;
pub use notify::{Notifier, TracingNotifier};
pub use task::TaskOutcome;
