use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One request to restore an archive into a storage target.
///
/// Ephemeral: consumed entirely by the batch orchestrator and discarded on
/// completion.
#[derive(Debug, Clone)]
pub struct RestoreJob {
    pub owner_id: Uuid,
    pub target_id: Uuid,
    pub archive_path: PathBuf,
    pub delete_after_restore: bool,
}

impl RestoreJob {
    pub fn new(owner_id: Uuid, target_id: Uuid, archive_path: impl Into<PathBuf>) -> Self {
        Self {
            owner_id,
            target_id,
            archive_path: archive_path.into(),
            delete_after_restore: true,
        }
    }

    pub fn keep_archive(mut self) -> Self {
        self.delete_after_restore = false;
        self
    }
}

/// Terminal report of one restore batch.
///
/// `ignored` counts files that were neither media nor consumed sidecars;
/// they are not part of `total`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub ignored: usize,
    pub cancelled: bool,
}

impl BatchSummary {
    pub fn settled(&self) -> usize {
        self.succeeded + self.failed
    }
}

/// Owner-visible lifecycle events emitted by the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum RestoreEvent {
    #[serde(rename = "restore.started")]
    Started { total: usize },
    #[serde(rename = "restore.progress")]
    Progress { completed: usize, total: usize },
    #[serde(rename = "restore.completed")]
    Completed { succeeded: usize, total: usize },
    #[serde(rename = "restore.failed")]
    Failed { reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_defaults_to_delete_after_restore() {
        let job = RestoreJob::new(Uuid::new_v4(), Uuid::new_v4(), "/tmp/export.zip");
        assert!(job.delete_after_restore);
        assert!(!job.keep_archive().delete_after_restore);
    }

    #[test]
    fn events_carry_dotted_names() {
        let event = RestoreEvent::Completed {
            succeeded: 9,
            total: 10,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "restore.completed");
        assert_eq!(json["succeeded"], 9);
    }
}
