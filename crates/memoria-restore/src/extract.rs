//! Streaming ZIP extraction into a staging directory.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use zip::ZipArchive;

use crate::error::RestoreError;

/// Per-entry copy buffer; keeps the memory footprint fixed regardless of
/// entry size.
const COPY_CHUNK_BYTES: usize = 1024 * 1024;

/// Extract every non-directory entry of `archive_path` under `staging_root`,
/// preserving relative directory structure. Returns the number of files
/// written.
///
/// Extraction is not atomic: on failure, partially extracted content is left
/// for the caller's cleanup phase. Entries whose names would escape the
/// staging root are skipped with a warning.
pub async fn extract_archive(
    archive_path: &Path,
    staging_root: &Path,
) -> Result<usize, RestoreError> {
    let archive_path = archive_path.to_path_buf();
    let staging_root = staging_root.to_path_buf();

    tokio::task::spawn_blocking(move || extract_blocking(&archive_path, &staging_root))
        .await
        .map_err(|e| RestoreError::ExtractionIo(io::Error::other(e)))?
}

fn extract_blocking(archive_path: &Path, staging_root: &Path) -> Result<usize, RestoreError> {
    let file = File::open(archive_path)
        .map_err(|e| RestoreError::InvalidArchive(format!("cannot open archive: {}", e)))?;
    let mut archive = ZipArchive::new(BufReader::new(file))
        .map_err(|e| RestoreError::InvalidArchive(e.to_string()))?;

    fs::create_dir_all(staging_root).map_err(RestoreError::ExtractionIo)?;

    let mut extracted = 0usize;
    let mut buf = vec![0u8; COPY_CHUNK_BYTES];

    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|e| RestoreError::InvalidArchive(e.to_string()))?;

        if entry.is_dir() {
            continue;
        }

        // enclosed_name rejects absolute paths and `..` components (zip-slip).
        let Some(relative) = entry.enclosed_name().map(Path::to_path_buf) else {
            tracing::warn!(entry = %entry.name(), "Skipping archive entry with unsafe path");
            continue;
        };

        let destination = staging_root.join(&relative);
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).map_err(RestoreError::ExtractionIo)?;
        }

        let out = File::create(&destination).map_err(RestoreError::ExtractionIo)?;
        let mut writer = BufWriter::new(out);
        loop {
            let n = entry.read(&mut buf).map_err(RestoreError::ExtractionIo)?;
            if n == 0 {
                break;
            }
            writer.write_all(&buf[..n]).map_err(RestoreError::ExtractionIo)?;
        }
        writer.flush().map_err(RestoreError::ExtractionIo)?;

        extracted += 1;
    }

    tracing::info!(
        archive = %archive_path.display(),
        staging = %staging_root.display(),
        files = extracted,
        "Archive extracted"
    );

    Ok(extracted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use zip::write::FileOptions;
    use zip::ZipWriter;

    fn build_zip(path: &Path, entries: &[(&str, &[u8])]) {
        let file = File::create(path).unwrap();
        let mut writer = ZipWriter::new(file);
        let options = FileOptions::default();
        for (name, data) in entries {
            writer.start_file(*name, options).unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap();
    }

    #[tokio::test]
    async fn test_extracts_nested_entries() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("export.zip");
        build_zip(
            &archive,
            &[
                ("a.jpg", b"top-level".as_slice()),
                ("albums/2021/b.jpg", b"nested".as_slice()),
            ],
        );

        let staging = dir.path().join("staging");
        let count = extract_archive(&archive, &staging).await.unwrap();

        assert_eq!(count, 2);
        assert_eq!(fs::read(staging.join("a.jpg")).unwrap(), b"top-level");
        assert_eq!(
            fs::read(staging.join("albums/2021/b.jpg")).unwrap(),
            b"nested"
        );
    }

    #[tokio::test]
    async fn test_entry_larger_than_chunk_round_trips() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("big.zip");
        let payload: Vec<u8> = (0..(COPY_CHUNK_BYTES + 4096))
            .map(|i| (i % 251) as u8)
            .collect();
        build_zip(&archive, &[("big.bin", payload.as_slice())]);

        let staging = dir.path().join("staging");
        extract_archive(&archive, &staging).await.unwrap();

        assert_eq!(fs::read(staging.join("big.bin")).unwrap(), payload);
    }

    #[tokio::test]
    async fn test_zip_slip_entry_is_skipped() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("evil.zip");
        build_zip(
            &archive,
            &[
                ("../outside.txt", b"nope".as_slice()),
                ("inside.txt", b"ok".as_slice()),
            ],
        );

        let staging = dir.path().join("staging");
        let count = extract_archive(&archive, &staging).await.unwrap();

        assert_eq!(count, 1);
        assert!(staging.join("inside.txt").exists());
        assert!(!dir.path().join("outside.txt").exists());
    }

    #[tokio::test]
    async fn test_non_zip_input_is_invalid_archive() {
        let dir = tempdir().unwrap();
        let not_zip = dir.path().join("export.zip");
        fs::write(&not_zip, b"this is not a zip file").unwrap();

        let result = extract_archive(&not_zip, &dir.path().join("staging")).await;
        assert!(matches!(result, Err(RestoreError::InvalidArchive(_))));
    }
}
