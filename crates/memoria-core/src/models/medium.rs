use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// Camera make/model taken from EXIF or a sidecar.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CameraInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub make: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl CameraInfo {
    pub fn is_empty(&self) -> bool {
        self.make.is_none() && self.model.is_none()
    }
}

/// A capture location as decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// Structured metadata attached to a restored file.
///
/// Every field is optional; extraction degrades to an empty record rather
/// than blocking ingestion. `extra` carries the raw sidecar document for
/// files where no structured interpretation applies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediumMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub taken_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orientation: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub camera: Option<CameraInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gps: Option<GeoPoint>,
    #[serde(default, skip_serializing_if = "JsonValue::is_null")]
    pub extra: JsonValue,
}

impl MediumMeta {
    pub fn is_empty(&self) -> bool {
        self.taken_at.is_none()
            && self.width.is_none()
            && self.height.is_none()
            && self.orientation.is_none()
            && self.camera.is_none()
            && self.gps.is_none()
            && self.extra.is_null()
    }
}

/// A catalog record for one restored file.
///
/// The tuple `(owner_id, target_id, name, path, hash)` is unique;
/// re-restoring byte-identical content under the same name updates the
/// existing row instead of creating a duplicate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Medium {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub target_id: Uuid,
    /// Logical name, usually the original file name.
    pub name: String,
    /// Storage-relative path: `lowercase(hash).ext`.
    pub path: String,
    pub content_type: String,
    /// Lowercase SHA-256 hex digest of the file content.
    pub hash: String,
    pub size: i64,
    pub meta: MediumMeta,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}
