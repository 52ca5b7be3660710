//! File classification and sidecar pairing.
//!
//! Classification sniffs magic bytes rather than trusting extensions, so
//! renamed exports still land in the right lane. Hidden files and dotfiles
//! (`.DS_Store` and friends) never enter the eligible set.

use std::collections::HashSet;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

/// Content class of one staged file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileClass {
    Image,
    Video,
    /// `.json` companion holding metadata for a same-named media file.
    Sidecar,
    Other,
}

/// Metadata extraction strategy selected for an eligible file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
    /// No embedded metadata to read; the sidecar is taken verbatim.
    Generic,
}

/// One eligible file queued for a restore task.
#[derive(Debug, Clone)]
pub struct StagedEntry {
    pub path: PathBuf,
    pub kind: MediaKind,
    pub content_type: String,
    pub sidecar: Option<PathBuf>,
}

/// Result of walking a staging directory.
#[derive(Debug, Default)]
pub struct ScanOutcome {
    pub entries: Vec<StagedEntry>,
    /// Files that were neither media nor consumed sidecars.
    pub ignored: usize,
}

const SNIFF_BYTES: usize = 8192;

fn sniff(path: &Path) -> io::Result<Option<infer::Type>> {
    let mut file = File::open(path)?;
    let mut head = vec![0u8; SNIFF_BYTES];
    let n = file.read(&mut head)?;
    Ok(infer::get(&head[..n]))
}

/// Classify one staged file by suffix (sidecars) and magic bytes (media).
pub fn classify(path: &Path) -> io::Result<(FileClass, Option<String>)> {
    let is_json = path
        .extension()
        .map(|e| e.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if is_json {
        return Ok((FileClass::Sidecar, Some("application/json".to_string())));
    }

    let sniffed = sniff(path)?;
    let mime = sniffed.map(|t| t.mime_type().to_string());
    let class = match sniffed.map(|t| t.matcher_type()) {
        Some(infer::MatcherType::Image) => FileClass::Image,
        Some(infer::MatcherType::Video) => FileClass::Video,
        _ => FileClass::Other,
    };
    Ok((class, mime))
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.'))
        .unwrap_or(true)
}

fn walk(root: &Path, out: &mut Vec<PathBuf>) -> io::Result<()> {
    for entry in std::fs::read_dir(root)? {
        let entry = entry?;
        let path = entry.path();
        if is_hidden(&path) {
            continue;
        }
        if entry.file_type()?.is_dir() {
            walk(&path, out)?;
        } else {
            out.push(path);
        }
    }
    Ok(())
}

/// Walk the staging tree and build the eligible file set.
///
/// Sidecars pair by exact name: `IMG_1.jpg` consumes `IMG_1.jpg.json`.
/// Recognized images and videos are always eligible; unrecognized files are
/// eligible only when a sidecar vouches for them (generic kind), otherwise
/// they are counted as ignored. Unmatched sidecars are ignored, optionally
/// logged.
pub fn scan_staging(root: &Path, report_unmatched_sidecars: bool) -> io::Result<ScanOutcome> {
    let mut files = Vec::new();
    walk(root, &mut files)?;

    let mut sidecars: HashSet<PathBuf> = HashSet::new();
    let mut media = Vec::new();
    let mut ignored = 0usize;

    for path in files {
        let (class, mime) = classify(&path)?;
        match class {
            FileClass::Sidecar => {
                sidecars.insert(path);
            }
            _ => media.push((path, class, mime)),
        }
    }

    let mut entries = Vec::new();
    for (path, class, mime) in media {
        let sidecar_name = PathBuf::from(format!("{}.json", path.display()));
        let sidecar = sidecars.take(&sidecar_name);

        let kind = match class {
            FileClass::Image => MediaKind::Image,
            FileClass::Video => MediaKind::Video,
            FileClass::Other if sidecar.is_some() => MediaKind::Generic,
            FileClass::Other => {
                tracing::debug!(path = %path.display(), "Ignoring unclassified file");
                ignored += 1;
                continue;
            }
            FileClass::Sidecar => unreachable!("sidecars partitioned above"),
        };

        entries.push(StagedEntry {
            path,
            kind,
            content_type: mime.unwrap_or_else(|| "application/octet-stream".to_string()),
            sidecar,
        });
    }

    // Whatever is left paired with nothing.
    ignored += sidecars.len();
    if report_unmatched_sidecars {
        for orphan in &sidecars {
            tracing::warn!(path = %orphan.display(), "Sidecar has no matching media file");
        }
    }

    Ok(ScanOutcome { entries, ignored })
}
