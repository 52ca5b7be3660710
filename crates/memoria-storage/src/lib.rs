//! Memoria Storage Library
//!
//! This crate provides the storage abstraction for restore targets and its
//! implementations: local filesystem and S3-compatible object stores.
//!
//! # Path format
//!
//! Storage paths are target-relative and content-addressed
//! (`lowercase(sha256).ext`). Paths must not contain `..` or a leading `/`;
//! local targets additionally scope their root to a per-target subdirectory
//! so no two targets' trees collide.

pub mod local;
pub mod object;
pub mod resolver;
pub mod traits;

// Re-export commonly used types
pub use local::LocalStorage;
pub use object::ObjectStorage;
pub use resolver::StorageResolver;
pub use traits::{Storage, StorageError, StorageResult};
