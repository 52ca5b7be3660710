//! Configuration module
//!
//! This module provides the per-target storage configuration schema and the
//! process-wide restore pipeline settings, read from the environment with
//! sensible defaults.

use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::models::{StorageDriver, Visibility};

const DEFAULT_MAX_WORKERS: usize = 4;
const DEFAULT_FFPROBE_PATH: &str = "ffprobe";

/// Driver configuration carried by a storage target.
///
/// For `local` targets `root` is the base directory; resolution scopes it to
/// a per-target subdirectory. For `object-store` targets all of `endpoint`,
/// `region`, `bucket`, `key`, and `secret` are required; a missing field is a
/// configuration error surfaced at resolution time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    pub driver: StorageDriver,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub use_path_style_endpoint: bool,
}

impl StorageConfig {
    /// A local-driver configuration rooted at `root`.
    pub fn local(root: impl Into<String>) -> Self {
        Self {
            driver: StorageDriver::Local,
            root: Some(root.into()),
            url: None,
            visibility: Visibility::default(),
            key: None,
            secret: None,
            region: None,
            bucket: None,
            endpoint: None,
            use_path_style_endpoint: false,
        }
    }
}

/// Restore pipeline settings.
#[derive(Debug, Clone)]
pub struct RestoreConfig {
    /// Upper bound on concurrently running per-file restore tasks.
    pub max_workers: usize,
    /// Root directory under which per-batch staging directories are created.
    pub staging_root: PathBuf,
    /// Path to the ffprobe binary used for video stream probing.
    pub ffprobe_path: String,
    /// Log sidecar files that have no matching media file.
    pub report_unmatched_sidecars: bool,
}

impl Default for RestoreConfig {
    fn default() -> Self {
        Self {
            max_workers: DEFAULT_MAX_WORKERS,
            staging_root: env::temp_dir().join("memoria-staging"),
            ffprobe_path: DEFAULT_FFPROBE_PATH.to_string(),
            report_unmatched_sidecars: false,
        }
    }
}

impl RestoreConfig {
    /// Read settings from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_workers: env_parse("MEMORIA_MAX_WORKERS").unwrap_or(defaults.max_workers),
            staging_root: env::var("MEMORIA_STAGING_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.staging_root),
            ffprobe_path: env::var("MEMORIA_FFPROBE_PATH").unwrap_or(defaults.ffprobe_path),
            report_unmatched_sidecars: env_parse("MEMORIA_REPORT_UNMATCHED_SIDECARS")
                .unwrap_or(defaults.report_unmatched_sidecars),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}
