//! Catalog seam for medium upserts.
//!
//! The restore pipeline persists records through this trait; the Postgres
//! implementation lives in memoria-db, tests use an in-memory one.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::MediumMeta;

/// Input to one idempotent medium upsert.
#[derive(Debug, Clone)]
pub struct NewMedium {
    pub owner_id: Uuid,
    pub target_id: Uuid,
    pub name: String,
    pub path: String,
    pub content_type: String,
    pub hash: String,
    pub size: i64,
    pub meta: MediumMeta,
    /// Capture instant; used for both created_at and updated_at.
    pub taken_at: DateTime<Utc>,
}

/// Idempotent catalog of restored media.
///
/// `upsert` matches on `(owner_id, target_id, name, path, hash)`: an existing
/// row has its mutable fields updated in place, otherwise a new row is
/// inserted. Either way the resulting identity is returned. Implementations
/// fail only on underlying storage/database I/O, never on "already exists".
#[async_trait]
pub trait MediumCatalog: Send + Sync {
    async fn upsert(&self, medium: NewMedium) -> Result<Uuid>;

    /// Number of live (not soft-deleted) rows for an owner/target pair.
    async fn count_for_target(&self, owner_id: Uuid, target_id: Uuid) -> Result<i64>;
}
