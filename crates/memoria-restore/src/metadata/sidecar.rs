//! Companion-JSON sidecar parsing.
//!
//! Takeout-style sidecars carry epoch-second timestamps (as strings or
//! numbers), pixel dimensions, geo data, and camera identity. Parsing never
//! fails the restore; malformed documents degrade to nothing with a warning.

use std::path::Path;

use chrono::{DateTime, Utc};
use memoria_core::models::{CameraInfo, GeoPoint};
use serde::Deserialize;
use serde_json::Value as JsonValue;

/// Number that may arrive as a JSON string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum LooseNumber {
    Number(f64),
    Text(String),
}

impl LooseNumber {
    fn as_f64(&self) -> Option<f64> {
        match self {
            LooseNumber::Number(n) => Some(*n),
            LooseNumber::Text(s) => s.trim().parse().ok(),
        }
    }

    fn as_u32(&self) -> Option<u32> {
        self.as_f64().map(|n| n as u32)
    }

    fn as_i64(&self) -> Option<i64> {
        self.as_f64().map(|n| n as i64)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EpochTime {
    pub timestamp: Option<LooseNumber>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeoData {
    pub latitude: Option<LooseNumber>,
    pub longitude: Option<LooseNumber>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SidecarCamera {
    pub make: Option<String>,
    pub model: Option<String>,
}

/// Parsed sidecar document. Every field optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sidecar {
    pub title: Option<String>,
    pub photo_taken_time: Option<EpochTime>,
    pub creation_time: Option<EpochTime>,
    pub width: Option<LooseNumber>,
    pub height: Option<LooseNumber>,
    pub orientation: Option<LooseNumber>,
    pub geo_data: Option<GeoData>,
    pub camera: Option<SidecarCamera>,
}

impl Sidecar {
    /// Capture instant: photoTakenTime first, creationTime as fallback.
    /// Sidecar timestamps are epoch seconds.
    pub fn taken_at(&self) -> Option<DateTime<Utc>> {
        [&self.photo_taken_time, &self.creation_time]
            .into_iter()
            .flatten()
            .find_map(|t| t.timestamp.as_ref())
            .and_then(|n| n.as_i64())
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
    }

    pub fn width(&self) -> Option<u32> {
        self.width.as_ref().and_then(LooseNumber::as_u32)
    }

    pub fn height(&self) -> Option<u32> {
        self.height.as_ref().and_then(LooseNumber::as_u32)
    }

    pub fn orientation(&self) -> Option<i32> {
        self.orientation
            .as_ref()
            .and_then(LooseNumber::as_i64)
            .map(|n| n as i32)
    }

    pub fn gps(&self) -> Option<GeoPoint> {
        let geo = self.geo_data.as_ref()?;
        let lat = geo.latitude.as_ref()?.as_f64()?;
        let lng = geo.longitude.as_ref()?.as_f64()?;
        // Takeout writes 0.0/0.0 for "no fix".
        if lat == 0.0 && lng == 0.0 {
            return None;
        }
        Some(GeoPoint { lat, lng })
    }

    pub fn camera(&self) -> Option<CameraInfo> {
        let camera = self.camera.as_ref()?;
        let info = CameraInfo {
            make: camera.make.clone(),
            model: camera.model.clone(),
        };
        (!info.is_empty()).then_some(info)
    }
}

/// Load and parse a sidecar, returning both the typed view and the raw
/// document. `None` when the file is unreadable or not valid JSON.
pub fn load(path: &Path) -> Option<(Sidecar, JsonValue)> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to read sidecar");
            return None;
        }
    };

    let raw: JsonValue = match serde_json::from_slice(&bytes) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Sidecar is not valid JSON");
            return None;
        }
    };

    let sidecar = serde_json::from_value(raw.clone()).unwrap_or_else(|e| {
        tracing::warn!(path = %path.display(), error = %e, "Sidecar has unexpected shape");
        Sidecar::default()
    });

    Some((sidecar, raw))
}
