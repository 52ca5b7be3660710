//! Metadata extraction.
//!
//! Each staged file gets a [`MediumMeta`] assembled from up to three layers:
//! the kind-specific extractor (Exif or ffprobe), the companion sidecar for
//! gaps the extractor left, and finally the file's modification time when no
//! capture instant was found anywhere.

pub mod image;
pub mod sidecar;
pub mod video;

use std::path::Path;

use chrono::{DateTime, Utc};
use memoria_core::config::RestoreConfig;
use memoria_core::models::MediumMeta;

use crate::classify::{MediaKind, StagedEntry};

pub use sidecar::Sidecar;

/// Extracted metadata plus the sidecar's display-name override, when any.
#[derive(Debug, Default)]
pub struct ExtractedMeta {
    pub meta: MediumMeta,
    pub title: Option<String>,
}

/// Build the metadata record for one staged entry. Never fails: every
/// layer degrades to absence.
pub async fn extract(entry: &StagedEntry, config: &RestoreConfig) -> ExtractedMeta {
    let mut meta = match entry.kind {
        MediaKind::Image => {
            let path = entry.path.clone();
            tokio::task::spawn_blocking(move || image::extract(&path))
                .await
                .unwrap_or_default()
        }
        MediaKind::Video => video::extract(&entry.path, &config.ffprobe_path).await,
        MediaKind::Generic => MediumMeta::default(),
    };

    let mut title = None;
    if let Some(sidecar_path) = &entry.sidecar {
        if let Some((sidecar, raw)) = sidecar::load(sidecar_path) {
            fill_gaps(&mut meta, &sidecar);
            title = sidecar.title.clone();
            if entry.kind == MediaKind::Generic {
                meta.extra = raw;
            }
        }
    }

    if meta.taken_at.is_none() {
        meta.taken_at = modified_at(&entry.path).await;
    }

    ExtractedMeta { meta, title }
}

/// Sidecar values only fill fields the extractor left empty.
fn fill_gaps(meta: &mut MediumMeta, sidecar: &Sidecar) {
    if meta.taken_at.is_none() {
        meta.taken_at = sidecar.taken_at();
    }
    if meta.width.is_none() {
        meta.width = sidecar.width();
    }
    if meta.height.is_none() {
        meta.height = sidecar.height();
    }
    if meta.orientation.is_none() {
        meta.orientation = sidecar.orientation();
    }
    if meta.gps.is_none() {
        meta.gps = sidecar.gps();
    }
    if meta.camera.is_none() {
        meta.camera = sidecar.camera();
    }
}

async fn modified_at(path: &Path) -> Option<DateTime<Utc>> {
    let modified = tokio::fs::metadata(path).await.ok()?.modified().ok()?;
    Some(DateTime::from(modified))
}
