//! Restore lifecycle notifications.

use async_trait::async_trait;
use memoria_core::models::RestoreEvent;
use uuid::Uuid;

/// Receives lifecycle events for a restore batch. Implementations must not
/// fail the batch; delivery problems are theirs to swallow.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, owner_id: Uuid, event: RestoreEvent);
}

/// Default notifier: structured log lines only.
#[derive(Debug, Default)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn notify(&self, owner_id: Uuid, event: RestoreEvent) {
        match &event {
            RestoreEvent::Started { total } => {
                tracing::info!(owner_id = %owner_id, total, "Restore started");
            }
            RestoreEvent::Progress { completed, total } => {
                tracing::debug!(owner_id = %owner_id, completed, total, "Restore progress");
            }
            RestoreEvent::Completed { succeeded, total } => {
                tracing::info!(owner_id = %owner_id, succeeded, total, "Restore completed");
            }
            RestoreEvent::Failed { reason } => {
                tracing::error!(owner_id = %owner_id, reason = %reason, "Restore failed");
            }
        }
    }
}
