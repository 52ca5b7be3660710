//! Video metadata via `ffprobe`.
//!
//! ffprobe is invoked with JSON output and parsed leniently: a missing
//! binary, a non-zero exit, or unparseable output all degrade to an empty
//! record with a warning.

use std::path::Path;
use std::process::Stdio;

use chrono::{DateTime, Utc};
use memoria_core::models::{GeoPoint, MediumMeta};
use serde::Deserialize;
use tokio::process::Command;

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<Stream>,
    format: Option<Format>,
}

#[derive(Debug, Deserialize)]
struct Stream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    #[serde(default)]
    side_data_list: Vec<SideData>,
    tags: Option<StreamTags>,
}

#[derive(Debug, Deserialize)]
struct SideData {
    rotation: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct StreamTags {
    rotate: Option<String>,
    creation_time: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Format {
    tags: Option<FormatTags>,
}

#[derive(Debug, Deserialize)]
struct FormatTags {
    location: Option<String>,
    #[serde(rename = "com.apple.quicktime.location.ISO6709")]
    quicktime_location: Option<String>,
    creation_time: Option<String>,
}

/// Probe a video file. Returns an empty record when ffprobe is unavailable
/// or the file cannot be interpreted.
pub async fn extract(path: &Path, ffprobe: &str) -> MediumMeta {
    let output = Command::new(ffprobe)
        .arg("-v")
        .arg("error")
        .arg("-show_format")
        .arg("-show_streams")
        .arg("-of")
        .arg("json")
        .arg(path)
        .stdin(Stdio::null())
        .output()
        .await;

    let output = match output {
        Ok(output) => output,
        Err(e) => {
            tracing::warn!(tool = ffprobe, error = %e, "ffprobe unavailable, skipping video metadata");
            return MediumMeta::default();
        }
    };

    if !output.status.success() {
        tracing::warn!(
            path = %path.display(),
            status = %output.status,
            stderr = %String::from_utf8_lossy(&output.stderr).trim(),
            "ffprobe failed"
        );
        return MediumMeta::default();
    }

    let probe: FfprobeOutput = match serde_json::from_slice(&output.stdout) {
        Ok(probe) => probe,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Unparseable ffprobe output");
            return MediumMeta::default();
        }
    };

    interpret(probe)
}

fn interpret(probe: FfprobeOutput) -> MediumMeta {
    let video_stream = probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"));

    let mut meta = MediumMeta::default();

    if let Some(stream) = video_stream {
        meta.width = stream.width;
        meta.height = stream.height;
        meta.orientation = rotation(stream).map(|deg| deg as i32);
        meta.taken_at = stream
            .tags
            .as_ref()
            .and_then(|t| t.creation_time.as_deref())
            .and_then(parse_instant);
    }

    if let Some(tags) = probe.format.as_ref().and_then(|f| f.tags.as_ref()) {
        meta.gps = tags
            .location
            .as_deref()
            .or(tags.quicktime_location.as_deref())
            .and_then(parse_iso6709);
        if meta.taken_at.is_none() {
            meta.taken_at = tags.creation_time.as_deref().and_then(parse_instant);
        }
    }

    meta
}

/// Display rotation, preferring the side-data matrix over the legacy
/// `rotate` tag.
fn rotation(stream: &Stream) -> Option<f64> {
    stream
        .side_data_list
        .iter()
        .find_map(|sd| sd.rotation)
        .or_else(|| {
            stream
                .tags
                .as_ref()
                .and_then(|t| t.rotate.as_deref())
                .and_then(|r| r.trim().parse().ok())
        })
}

fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// ISO 6709 point, e.g. `+45.4642+009.1900/`. Sign characters delimit the
/// latitude and longitude components.
fn parse_iso6709(raw: &str) -> Option<GeoPoint> {
    let raw = raw.trim().trim_end_matches('/');
    let mut boundaries = raw
        .char_indices()
        .filter(|&(i, c)| (c == '+' || c == '-') && i > 0)
        .map(|(i, _)| i);
    let split = boundaries.next()?;
    // A third component is altitude; ignore it.
    let lng_end = boundaries.next().unwrap_or(raw.len());

    let lat: f64 = raw[..split].parse().ok()?;
    let lng: f64 = raw[split..lng_end].parse().ok()?;
    Some(GeoPoint { lat, lng })
}
