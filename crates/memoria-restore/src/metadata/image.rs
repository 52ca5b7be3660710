//! Exif extraction for still images.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use exif::{Exif, In, Reader, Tag, Value};
use memoria_core::models::{CameraInfo, GeoPoint, MediumMeta};

/// Read Exif from an image file. Files without Exif, or with unreadable
/// Exif, yield an empty record.
pub fn extract(path: &Path) -> MediumMeta {
    let exif = match read_exif(path) {
        Some(exif) => exif,
        None => return MediumMeta::default(),
    };

    let camera = CameraInfo {
        make: ascii_field(&exif, Tag::Make),
        model: ascii_field(&exif, Tag::Model),
    };

    MediumMeta {
        taken_at: taken_at(&exif),
        width: uint_field(&exif, Tag::PixelXDimension),
        height: uint_field(&exif, Tag::PixelYDimension),
        orientation: uint_field(&exif, Tag::Orientation).map(|o| o as i32),
        camera: (!camera.is_empty()).then_some(camera),
        gps: gps_position(&exif),
        extra: serde_json::Value::Null,
    }
}

fn read_exif(path: &Path) -> Option<Exif> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to open image");
            return None;
        }
    };
    Reader::new()
        .read_from_container(&mut BufReader::new(file))
        .ok()
}

fn taken_at(exif: &Exif) -> Option<DateTime<Utc>> {
    let field = exif
        .get_field(Tag::DateTimeOriginal, In::PRIMARY)
        .or_else(|| exif.get_field(Tag::DateTime, In::PRIMARY))?;
    let ascii = match &field.value {
        Value::Ascii(v) => v.first()?,
        _ => return None,
    };
    let dt = exif::DateTime::from_ascii(ascii).ok()?;
    // Exif timestamps carry no zone; treat them as UTC.
    let date = NaiveDate::from_ymd_opt(dt.year as i32, dt.month as u32, dt.day as u32)?;
    let naive = date.and_hms_opt(dt.hour as u32, dt.minute as u32, dt.second as u32)?;
    Some(DateTime::from_naive_utc_and_offset(naive, Utc))
}

fn uint_field(exif: &Exif, tag: Tag) -> Option<u32> {
    exif.get_field(tag, In::PRIMARY)
        .and_then(|f| f.value.get_uint(0))
}

fn ascii_field(exif: &Exif, tag: Tag) -> Option<String> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    match &field.value {
        Value::Ascii(v) => v.first().map(|bytes| {
            String::from_utf8_lossy(bytes).trim_end_matches('\0').trim().to_string()
        }),
        _ => None,
    }
    .filter(|s| !s.is_empty())
}

fn gps_position(exif: &Exif) -> Option<GeoPoint> {
    let lat = dms_field(exif, Tag::GPSLatitude)?;
    let lng = dms_field(exif, Tag::GPSLongitude)?;
    let lat_sign = ref_sign(exif, Tag::GPSLatitudeRef, "S");
    let lng_sign = ref_sign(exif, Tag::GPSLongitudeRef, "W");
    Some(GeoPoint {
        lat: lat * lat_sign,
        lng: lng * lng_sign,
    })
}

fn dms_field(exif: &Exif, tag: Tag) -> Option<f64> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    match &field.value {
        Value::Rational(parts) if parts.len() >= 3 => Some(
            parts[0].to_f64() + parts[1].to_f64() / 60.0 + parts[2].to_f64() / 3600.0,
        ),
        _ => None,
    }
}

fn ref_sign(exif: &Exif, tag: Tag, negative: &str) -> f64 {
    let is_negative = exif
        .get_field(tag, In::PRIMARY)
        .map(|f| f.display_value().to_string().trim() == negative)
        .unwrap_or(false);
    if is_negative {
        -1.0
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_non_image_yields_empty_meta() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("not-an-image.jpg");
        std::fs::write(&path, b"plain text, no exif container").unwrap();
        assert!(extract(&path).is_empty());
    }

    #[test]
    fn test_missing_file_yields_empty_meta() {
        assert!(extract(Path::new("/nonexistent/photo.jpg")).is_empty());
    }
}
