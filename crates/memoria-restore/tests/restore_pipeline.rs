//! End-to-end pipeline tests over a local storage target and an in-memory
//! catalog: idempotent re-runs, content addressing, sidecar metadata,
//! archive validation, partial failure, and cancellation.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;
use zip::write::FileOptions;
use zip::ZipWriter;

use memoria_core::catalog::{MediumCatalog, NewMedium};
use memoria_core::config::{RestoreConfig, StorageConfig};
use memoria_core::models::{RestoreEvent, RestoreJob, StorageTarget};
use memoria_restore::{Notifier, RestoreError, RestorePipeline};
use memoria_storage::StorageResolver;

const JPEG_MAGIC: [u8; 4] = [0xFF, 0xD8, 0xFF, 0xE0];
const MP4_MAGIC: &[u8] = b"\x00\x00\x00\x20ftypisom\x00\x00\x02\x00";
const ZIP_MAGIC: [u8; 4] = [0x50, 0x4B, 0x03, 0x04];

fn jpeg_bytes(seed: u8) -> Vec<u8> {
    let mut bytes = JPEG_MAGIC.to_vec();
    bytes.extend(std::iter::repeat(seed).take(64));
    bytes
}

fn build_zip(path: &Path, entries: &[(&str, &[u8])]) {
    let file = std::fs::File::create(path).unwrap();
    let mut writer = ZipWriter::new(file);
    let options = FileOptions::default();
    for (name, bytes) in entries {
        writer.start_file(*name, options).unwrap();
        writer.write_all(bytes).unwrap();
    }
    writer.finish().unwrap();
}

#[derive(Default)]
struct InMemoryCatalog {
    rows: Mutex<HashMap<(Uuid, Uuid, String, String, String), (Uuid, NewMedium)>>,
}

impl InMemoryCatalog {
    fn media(&self) -> Vec<NewMedium> {
        self.rows
            .lock()
            .unwrap()
            .values()
            .map(|(_, m)| m.clone())
            .collect()
    }
}

#[async_trait]
impl MediumCatalog for InMemoryCatalog {
    async fn upsert(&self, medium: NewMedium) -> Result<Uuid> {
        let key = (
            medium.owner_id,
            medium.target_id,
            medium.name.clone(),
            medium.path.clone(),
            medium.hash.clone(),
        );
        let mut rows = self.rows.lock().unwrap();
        let id = rows.get(&key).map(|(id, _)| *id).unwrap_or_else(Uuid::new_v4);
        rows.insert(key, (id, medium));
        Ok(id)
    }

    async fn count_for_target(&self, owner_id: Uuid, target_id: Uuid) -> Result<i64> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|(_, m)| m.owner_id == owner_id && m.target_id == target_id)
            .count() as i64)
    }
}

/// Fails every upsert whose name matches, to exercise partial failure.
struct FlakyCatalog {
    inner: InMemoryCatalog,
    poison_name: String,
}

#[async_trait]
impl MediumCatalog for FlakyCatalog {
    async fn upsert(&self, medium: NewMedium) -> Result<Uuid> {
        if medium.name == self.poison_name {
            anyhow::bail!("simulated catalog outage");
        }
        self.inner.upsert(medium).await
    }

    async fn count_for_target(&self, owner_id: Uuid, target_id: Uuid) -> Result<i64> {
        self.inner.count_for_target(owner_id, target_id).await
    }
}

/// Blocks each upsert until released, so a test can cancel mid-batch.
struct GatedCatalog {
    inner: InMemoryCatalog,
    gate: Arc<Notify>,
    entered: Arc<Notify>,
    calls: AtomicUsize,
}

#[async_trait]
impl MediumCatalog for GatedCatalog {
    async fn upsert(&self, medium: NewMedium) -> Result<Uuid> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.entered.notify_one();
        self.gate.notified().await;
        self.inner.upsert(medium).await
    }

    async fn count_for_target(&self, owner_id: Uuid, target_id: Uuid) -> Result<i64> {
        self.inner.count_for_target(owner_id, target_id).await
    }
}

#[derive(Default)]
struct ChannelNotifier {
    events: Mutex<Vec<RestoreEvent>>,
}

impl ChannelNotifier {
    fn events(&self) -> Vec<RestoreEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for ChannelNotifier {
    async fn notify(&self, _owner_id: Uuid, event: RestoreEvent) {
        self.events.lock().unwrap().push(event);
    }
}

struct Harness {
    _dir: tempfile::TempDir,
    archive_dir: PathBuf,
    pipeline: RestorePipeline,
    catalog: Arc<InMemoryCatalog>,
    notifier: Arc<ChannelNotifier>,
    target: StorageTarget,
    owner_id: Uuid,
    config: RestoreConfig,
}

fn harness_with(catalog_override: Option<Arc<dyn MediumCatalog>>, max_workers: usize) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let storage_root = dir.path().join("storage");
    let archive_dir = dir.path().join("archives");
    std::fs::create_dir_all(&archive_dir).unwrap();

    let owner_id = Uuid::new_v4();
    let target = StorageTarget::new(
        owner_id,
        "memories",
        StorageConfig::local(storage_root.to_string_lossy()),
    );

    let catalog = Arc::new(InMemoryCatalog::default());
    let notifier = Arc::new(ChannelNotifier::default());
    let config = RestoreConfig {
        max_workers,
        staging_root: dir.path().join("staging"),
        ..RestoreConfig::default()
    };

    let pipeline = RestorePipeline::new(
        Arc::new(StorageResolver::new()),
        catalog_override.unwrap_or_else(|| catalog.clone() as Arc<dyn MediumCatalog>),
        notifier.clone(),
        config.clone(),
    );

    Harness {
        _dir: dir,
        archive_dir,
        pipeline,
        catalog,
        notifier,
        target,
        owner_id,
        config,
    }
}

fn harness() -> Harness {
    harness_with(None, 4)
}

#[tokio::test]
async fn test_restores_media_and_pairs_sidecars() {
    let h = harness();
    let archive = h.archive_dir.join("takeout.zip");
    let photo = jpeg_bytes(1);
    let sidecar = br#"{
        "title": "Beach day.jpg",
        "photoTakenTime": {"timestamp": "1609459200"},
        "geoData": {"latitude": 45.4642, "longitude": 9.19}
    }"#;
    build_zip(
        &archive,
        &[
            ("album/IMG_0001.jpg", photo.as_slice()),
            ("album/IMG_0001.jpg.json", sidecar.as_slice()),
            ("album/VID_0001.mp4", MP4_MAGIC),
        ],
    );

    let job = RestoreJob::new(h.owner_id, h.target.id, &archive);
    let summary = h
        .pipeline
        .run(job, &h.target, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.total, 2);
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed, 0);
    assert!(!summary.cancelled);

    let media = h.catalog.media();
    assert_eq!(media.len(), 2);

    let photo_row = media.iter().find(|m| m.name == "Beach day.jpg").unwrap();
    assert_eq!(photo_row.content_type, "image/jpeg");
    assert_eq!(photo_row.path, format!("{}.jpg", photo_row.hash));
    assert_eq!(photo_row.taken_at.timestamp(), 1609459200);
    assert_eq!(photo_row.meta.gps.unwrap().lat, 45.4642);

    // Archive deleted by default; staging always removed.
    assert!(!archive.exists());
    assert!(!h.config.staging_root.exists() || dir_is_empty(&h.config.staging_root));

    let events = h.notifier.events();
    assert!(matches!(events.first(), Some(RestoreEvent::Started { total: 2 })));
    assert!(matches!(
        events.last(),
        Some(RestoreEvent::Completed { succeeded: 2, total: 2 })
    ));
    let progress = events
        .iter()
        .filter(|e| matches!(e, RestoreEvent::Progress { .. }))
        .count();
    assert_eq!(progress, 2);
}

fn dir_is_empty(path: &Path) -> bool {
    std::fs::read_dir(path).map(|mut d| d.next().is_none()).unwrap_or(true)
}

#[tokio::test]
async fn test_rerun_is_idempotent() {
    let h = harness();
    let archive = h.archive_dir.join("export.zip");
    let photo = jpeg_bytes(7);
    build_zip(&archive, &[("IMG_1.jpg", photo.as_slice())]);

    let job = RestoreJob::new(h.owner_id, h.target.id, &archive).keep_archive();
    let first = h
        .pipeline
        .run(job.clone(), &h.target, CancellationToken::new())
        .await
        .unwrap();
    let second = h
        .pipeline
        .run(job, &h.target, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(first.succeeded, 1);
    assert_eq!(second.succeeded, 1);
    assert_eq!(h.catalog.media().len(), 1);
    assert!(archive.exists());
}

#[tokio::test]
async fn test_identical_content_shares_one_address() {
    let h = harness();
    let archive = h.archive_dir.join("dupes.zip");
    let photo = jpeg_bytes(9);
    build_zip(
        &archive,
        &[
            ("a/first.jpg", photo.as_slice()),
            ("b/second.jpg", photo.as_slice()),
        ],
    );

    let job = RestoreJob::new(h.owner_id, h.target.id, &archive);
    let summary = h
        .pipeline
        .run(job, &h.target, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.succeeded, 2);
    let media = h.catalog.media();
    assert_eq!(media.len(), 2, "distinct names are distinct records");
    assert_eq!(media[0].path, media[1].path, "same bytes, same storage key");
    assert_eq!(media[0].hash, media[1].hash);
}

#[tokio::test]
async fn test_non_zip_archive_is_rejected() {
    let h = harness();
    let archive = h.archive_dir.join("export.zip");
    std::fs::write(&archive, b"this is not an archive at all").unwrap();

    let job = RestoreJob::new(h.owner_id, h.target.id, &archive).keep_archive();
    let err = h
        .pipeline
        .run(job, &h.target, CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, RestoreError::InvalidArchive(_)));
    assert!(h.catalog.media().is_empty());
    assert!(
        !h.config.staging_root.exists() || dir_is_empty(&h.config.staging_root),
        "no staging residue for a rejected archive"
    );
    assert!(matches!(
        h.notifier.events().last(),
        Some(RestoreEvent::Failed { .. })
    ));
}

#[tokio::test]
async fn test_zip_magic_alone_is_not_enough() {
    let h = harness();
    let archive = h.archive_dir.join("truncated.zip");
    std::fs::write(&archive, ZIP_MAGIC).unwrap();

    let job = RestoreJob::new(h.owner_id, h.target.id, &archive).keep_archive();
    let err = h
        .pipeline
        .run(job, &h.target, CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, RestoreError::InvalidArchive(_)));
}

#[tokio::test]
async fn test_partial_failure_settles_the_rest() {
    let flaky = Arc::new(FlakyCatalog {
        inner: InMemoryCatalog::default(),
        poison_name: "IMG_0003.jpg".to_string(),
    });
    let h = harness_with(Some(flaky.clone() as Arc<dyn MediumCatalog>), 4);

    let archive = h.archive_dir.join("big.zip");
    let photos: Vec<(String, Vec<u8>)> = (0..10)
        .map(|i| (format!("IMG_{:04}.jpg", i), jpeg_bytes(i as u8)))
        .collect();
    let entries: Vec<(&str, &[u8])> = photos
        .iter()
        .map(|(name, bytes)| (name.as_str(), bytes.as_slice()))
        .collect();
    build_zip(&archive, &entries);

    let job = RestoreJob::new(h.owner_id, h.target.id, &archive);
    let summary = h
        .pipeline
        .run(job, &h.target, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.total, 10);
    assert_eq!(summary.succeeded, 9);
    assert_eq!(summary.failed, 1);
    assert_eq!(flaky.inner.media().len(), 9);
    assert!(matches!(
        h.notifier.events().last(),
        Some(RestoreEvent::Completed { succeeded: 9, total: 10 })
    ));
}

#[tokio::test]
async fn test_cancellation_skips_unstarted_files() {
    let gate = Arc::new(Notify::new());
    let entered = Arc::new(Notify::new());
    let gated = Arc::new(GatedCatalog {
        inner: InMemoryCatalog::default(),
        gate: gate.clone(),
        entered: entered.clone(),
        calls: AtomicUsize::new(0),
    });
    // One worker: files settle strictly one at a time.
    let h = harness_with(Some(gated.clone() as Arc<dyn MediumCatalog>), 1);

    let archive = h.archive_dir.join("cancel.zip");
    let photos: Vec<(String, Vec<u8>)> = (0..5)
        .map(|i| (format!("IMG_{:04}.jpg", i), jpeg_bytes(i as u8)))
        .collect();
    let entries: Vec<(&str, &[u8])> = photos
        .iter()
        .map(|(name, bytes)| (name.as_str(), bytes.as_slice()))
        .collect();
    build_zip(&archive, &entries);

    let cancel = CancellationToken::new();
    let job = RestoreJob::new(h.owner_id, h.target.id, &archive);
    let run = tokio::spawn({
        let cancel = cancel.clone();
        let target = h.target.clone();
        async move { h.pipeline.run(job, &target, cancel).await }
    });

    // Wait for the first file to reach the catalog, cancel, then let every
    // in-flight upsert finish.
    entered.notified().await;
    cancel.cancel();
    for _ in 0..5 {
        gate.notify_one();
    }

    let summary = run.await.unwrap().unwrap();
    assert!(summary.cancelled);
    assert!(summary.succeeded >= 1, "in-flight file runs to completion");
    assert!(
        summary.succeeded < summary.total,
        "remaining files were skipped"
    );
    assert_eq!(
        gated.calls.load(Ordering::SeqCst),
        summary.succeeded,
        "skipped files never reached the catalog"
    );
}
