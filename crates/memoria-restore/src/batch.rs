//! Batch orchestration for one archive restore.
//!
//! The pipeline validates the archive, extracts it into a private staging
//! directory, classifies the staged tree, and fans the media files out over a
//! bounded worker pool. Individual file failures are tolerated; cancellation
//! is honored between files; staging is cleaned up on every exit path.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::io::AsyncReadExt;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use memoria_core::catalog::MediumCatalog;
use memoria_core::config::RestoreConfig;
use memoria_core::models::{BatchSummary, RestoreEvent, RestoreJob, StorageTarget};
use memoria_storage::{Storage, StorageResolver};

use crate::classify::{self, StagedEntry};
use crate::error::RestoreError;
use crate::extract;
use crate::notify::Notifier;
use crate::task::{self, TaskOutcome};

/// Orchestrates restore batches end to end.
pub struct RestorePipeline {
    resolver: Arc<StorageResolver>,
    catalog: Arc<dyn MediumCatalog>,
    notifier: Arc<dyn Notifier>,
    config: RestoreConfig,
}

impl RestorePipeline {
    pub fn new(
        resolver: Arc<StorageResolver>,
        catalog: Arc<dyn MediumCatalog>,
        notifier: Arc<dyn Notifier>,
        config: RestoreConfig,
    ) -> Self {
        Self {
            resolver,
            catalog,
            notifier,
            config,
        }
    }

    /// Run one restore batch to completion.
    ///
    /// Validation and extraction errors fail the batch as a whole; per-file
    /// errors only mark that file failed. Staging is removed on every exit
    /// path, and so is the archive when the job asks for it, whether the
    /// batch succeeded or not.
    pub async fn run(
        &self,
        job: RestoreJob,
        target: &StorageTarget,
        cancel: CancellationToken,
    ) -> Result<BatchSummary, RestoreError> {
        tracing::info!(
            owner_id = %job.owner_id,
            target_id = %target.id,
            archive = %job.archive_path.display(),
            "Starting restore batch"
        );

        let staging = self
            .config
            .staging_root
            .join(format!("{}-{}", target.id, Uuid::new_v4()));

        let result = self.try_run(&job, target, &staging, &cancel).await;

        cleanup(&staging, &job).await;

        match &result {
            Ok(summary) => {
                if summary.cancelled {
                    tracing::warn!(owner_id = %job.owner_id, "Restore batch cancelled");
                } else {
                    self.notifier
                        .notify(
                            job.owner_id,
                            RestoreEvent::Completed {
                                succeeded: summary.succeeded,
                                total: summary.total,
                            },
                        )
                        .await;
                }
            }
            Err(e) => {
                self.notifier
                    .notify(
                        job.owner_id,
                        RestoreEvent::Failed {
                            reason: e.to_string(),
                        },
                    )
                    .await;
            }
        }

        result
    }

    /// Spawn a batch onto the runtime, returning its handle and a token the
    /// caller can use to cancel it.
    pub fn spawn(
        self: &Arc<Self>,
        job: RestoreJob,
        target: StorageTarget,
    ) -> (JoinHandle<Result<BatchSummary, RestoreError>>, CancellationToken) {
        let cancel = CancellationToken::new();
        let pipeline = Arc::clone(self);
        let token = cancel.clone();
        let handle = tokio::spawn(async move { pipeline.run(job, &target, token).await });
        (handle, cancel)
    }

    async fn try_run(
        &self,
        job: &RestoreJob,
        target: &StorageTarget,
        staging: &PathBuf,
        cancel: &CancellationToken,
    ) -> Result<BatchSummary, RestoreError> {
        // Fail before any side effects: archive must exist and be a zip,
        // and the target must resolve to a usable backend.
        validate_archive(&job.archive_path).await?;
        let storage = self
            .resolver
            .resolve(target)
            .await
            .map_err(RestoreError::from_resolution)?;

        extract::extract_archive(&job.archive_path, staging).await?;

        let scan_root = staging.clone();
        let report_unmatched = self.config.report_unmatched_sidecars;
        let outcome = tokio::task::spawn_blocking(move || {
            classify::scan_staging(&scan_root, report_unmatched)
        })
        .await
        .map_err(|e| RestoreError::ExtractionIo(std::io::Error::other(e)))?
        .map_err(RestoreError::ExtractionIo)?;

        let mut summary = BatchSummary {
            total: outcome.entries.len(),
            ignored: outcome.ignored,
            ..Default::default()
        };

        self.notifier
            .notify(
                job.owner_id,
                RestoreEvent::Started {
                    total: summary.total,
                },
            )
            .await;

        if summary.total == 0 {
            return Ok(summary);
        }

        let semaphore = Arc::new(Semaphore::new(self.config.max_workers));
        let (result_tx, mut result_rx) = mpsc::channel::<TaskOutcome>(summary.total);

        for entry in outcome.entries {
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| RestoreError::Config(e.to_string()))?;
            let tx = result_tx.clone();
            let cancel = cancel.clone();
            let storage = Arc::clone(&storage);
            let catalog = Arc::clone(&self.catalog);
            let config = self.config.clone();
            let owner_id = job.owner_id;
            let target_id = target.id;

            tokio::spawn(async move {
                let outcome = restore_one(
                    entry, owner_id, target_id, &storage, &catalog, &config, &cancel,
                )
                .await;
                drop(permit);
                let _ = tx.send(outcome).await;
            });
        }
        drop(result_tx);

        while let Some(outcome) = result_rx.recv().await {
            match outcome {
                TaskOutcome::Succeeded(_) => summary.succeeded += 1,
                TaskOutcome::Failed => summary.failed += 1,
                TaskOutcome::Skipped => summary.cancelled = true,
            }
            if !summary.cancelled {
                self.notifier
                    .notify(
                        job.owner_id,
                        RestoreEvent::Progress {
                            completed: summary.settled(),
                            total: summary.total,
                        },
                    )
                    .await;
            }
        }

        Ok(summary)
    }
}

async fn restore_one(
    entry: StagedEntry,
    owner_id: Uuid,
    target_id: Uuid,
    storage: &Arc<dyn Storage>,
    catalog: &Arc<dyn MediumCatalog>,
    config: &RestoreConfig,
    cancel: &CancellationToken,
) -> TaskOutcome {
    // Cancellation is checked once, at task entry. A task that has started
    // placing a file runs to completion so storage and catalog stay
    // consistent.
    if cancel.is_cancelled() {
        tracing::debug!(file = %entry.path.display(), "Skipping file, batch cancelled");
        return TaskOutcome::Skipped;
    }
    task::restore_file(&entry, owner_id, target_id, storage, catalog, config).await
}

/// The archive must exist and carry zip magic bytes.
async fn validate_archive(path: &std::path::Path) -> Result<(), RestoreError> {
    let mut file = tokio::fs::File::open(path).await.map_err(|e| {
        RestoreError::InvalidArchive(format!("cannot open {}: {}", path.display(), e))
    })?;
    let mut head = [0u8; 512];
    let n = file
        .read(&mut head)
        .await
        .map_err(RestoreError::ExtractionIo)?;

    match infer::get(&head[..n]) {
        Some(kind) if kind.mime_type() == "application/zip" => Ok(()),
        Some(kind) => Err(RestoreError::InvalidArchive(format!(
            "expected a zip archive, got {}",
            kind.mime_type()
        ))),
        None => Err(RestoreError::InvalidArchive(
            "expected a zip archive, got unrecognized data".to_string(),
        )),
    }
}

/// Remove the staging tree, and the archive when the job asks for it.
/// Cleanup failures are logged, never surfaced.
async fn cleanup(staging: &PathBuf, job: &RestoreJob) {
    if staging.exists() {
        if let Err(e) = tokio::fs::remove_dir_all(staging).await {
            tracing::warn!(staging = %staging.display(), error = %e, "Failed to remove staging directory");
        }
    }
    if job.delete_after_restore {
        if let Err(e) = tokio::fs::remove_file(&job.archive_path).await {
            tracing::warn!(archive = %job.archive_path.display(), error = %e, "Failed to remove archive");
        }
    }
}
