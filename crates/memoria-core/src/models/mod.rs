//! Data models for the application
//!
//! This module contains all data structures used throughout the application,
//! organized by domain: storage targets, catalog records, and restore runs.

mod medium;
mod restore;
mod storage_target;

// Re-export all models for convenient imports
pub use medium::*;
pub use restore::*;
pub use storage_target::*;
