//! Memoria Core Library
//!
//! This crate provides the domain models, configuration, and catalog seam
//! shared across all Memoria components.

pub mod catalog;
pub mod config;
pub mod models;

// Re-export commonly used types
pub use catalog::{MediumCatalog, NewMedium};
pub use config::{RestoreConfig, StorageConfig};
pub use models::{
    BatchSummary, CameraInfo, GeoPoint, Medium, MediumMeta, RestoreEvent, RestoreJob,
    StorageDriver, StorageTarget, Visibility,
};
