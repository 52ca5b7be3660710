//! Per-file restore task.
//!
//! One task takes a staged entry through metadata extraction, content
//! addressing, storage placement, and the catalog upsert. Tasks are
//! independent; a failure here never aborts the batch.

use std::sync::Arc;

use chrono::Utc;
use memoria_core::catalog::{MediumCatalog, NewMedium};
use memoria_core::config::RestoreConfig;
use memoria_storage::Storage;
use uuid::Uuid;

use crate::address;
use crate::classify::StagedEntry;
use crate::metadata;

/// How a single file's restore settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Succeeded(Uuid),
    Failed,
    Skipped,
}

/// Restore one staged file into storage and the catalog.
///
/// Errors are logged and folded into [`TaskOutcome::Failed`]; callers only
/// tally outcomes.
pub async fn restore_file(
    entry: &StagedEntry,
    owner_id: Uuid,
    target_id: Uuid,
    storage: &Arc<dyn Storage>,
    catalog: &Arc<dyn MediumCatalog>,
    config: &RestoreConfig,
) -> TaskOutcome {
    match try_restore(entry, owner_id, target_id, storage, catalog, config).await {
        Ok(id) => {
            tracing::debug!(medium_id = %id, file = %entry.path.display(), "Restored file");
            TaskOutcome::Succeeded(id)
        }
        Err(e) => {
            tracing::error!(file = %entry.path.display(), error = %e, "Failed to restore file");
            TaskOutcome::Failed
        }
    }
}

async fn try_restore(
    entry: &StagedEntry,
    owner_id: Uuid,
    target_id: Uuid,
    storage: &Arc<dyn Storage>,
    catalog: &Arc<dyn MediumCatalog>,
    config: &RestoreConfig,
) -> anyhow::Result<Uuid> {
    let extracted = metadata::extract(entry, config).await;
    let addr = address::address(&entry.path).await?;

    let size = storage.write_file(&addr.path, &entry.path).await?;

    let name = extracted
        .title
        .or_else(|| {
            entry
                .path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| addr.path.clone());

    let taken_at = extracted.meta.taken_at.unwrap_or_else(Utc::now);

    let id = catalog
        .upsert(NewMedium {
            owner_id,
            target_id,
            name,
            path: addr.path,
            content_type: entry.content_type.clone(),
            hash: addr.hash,
            size: size as i64,
            meta: extracted.meta,
            taken_at,
        })
        .await?;
    Ok(id)
}
