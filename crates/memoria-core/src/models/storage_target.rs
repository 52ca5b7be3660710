use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::StorageConfig;

/// Storage driver kinds
///
/// This enum defines the available storage drivers for a target.
/// It's defined in core because it's used in configuration and database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "storage_driver", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum StorageDriver {
    Local,
    ObjectStore,
}

impl FromStr for StorageDriver {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(StorageDriver::Local),
            "object-store" => Ok(StorageDriver::ObjectStore),
            _ => Err(anyhow::anyhow!("Invalid storage driver: {}", s)),
        }
    }
}

impl Display for StorageDriver {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            StorageDriver::Local => write!(f, "local"),
            StorageDriver::ObjectStore => write!(f, "object-store"),
        }
    }
}

/// Visibility of content stored under a target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "visibility", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    #[default]
    Private,
}

impl Display for Visibility {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Visibility::Public => write!(f, "public"),
            Visibility::Private => write!(f, "private"),
        }
    }
}

/// An owner-scoped named storage destination.
///
/// The driver configuration must be sufficient to resolve a working backend;
/// local targets are always scoped to a per-target subdirectory of the
/// configured root so no two targets' trees collide.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageTarget {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub driver: StorageDriver,
    pub config: StorageConfig,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl StorageTarget {
    /// Build a target with fresh identity and timestamps.
    pub fn new(owner_id: Uuid, name: impl Into<String>, config: StorageConfig) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner_id,
            name: name.into(),
            driver: config.driver,
            config,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn driver_round_trips_through_str() {
        assert_eq!(
            "object-store".parse::<StorageDriver>().unwrap(),
            StorageDriver::ObjectStore
        );
        assert_eq!(StorageDriver::Local.to_string(), "local");
        assert_eq!(StorageDriver::ObjectStore.to_string(), "object-store");
        assert!("nfs".parse::<StorageDriver>().is_err());
    }

    #[test]
    fn driver_serde_uses_kebab_case() {
        let json = serde_json::to_string(&StorageDriver::ObjectStore).unwrap();
        assert_eq!(json, "\"object-store\"");
        let back: StorageDriver = serde_json::from_str(&json).unwrap();
        assert_eq!(back, StorageDriver::ObjectStore);
    }
}
