use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use memoria_core::config::StorageConfig;
use memoria_core::models::{StorageDriver, StorageTarget};
use memoria_storage::Storage;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

#[derive(sqlx::FromRow)]
struct StorageTargetRow {
    id: Uuid,
    owner_id: Uuid,
    name: String,
    driver: StorageDriver,
    config: Json<StorageConfig>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl From<StorageTargetRow> for StorageTarget {
    fn from(row: StorageTargetRow) -> Self {
        StorageTarget {
            id: row.id,
            owner_id: row.owner_id,
            name: row.name,
            driver: row.driver,
            config: row.config.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
        }
    }
}

/// Repository for owner-scoped storage targets.
#[derive(Clone)]
pub struct StorageTargetRepository {
    pool: PgPool,
}

impl StorageTargetRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, target: &StorageTarget) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO storage_targets (id, owner_id, name, driver, config, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(target.id)
        .bind(target.owner_id)
        .bind(&target.name)
        .bind(target.driver)
        .bind(Json(&target.config))
        .bind(target.created_at)
        .bind(target.updated_at)
        .execute(&self.pool)
        .await
        .context("Failed to create storage target")?;

        Ok(())
    }

    /// Fetch a live (not soft-deleted) target.
    pub async fn get(&self, id: Uuid) -> Result<Option<StorageTarget>> {
        let row = sqlx::query_as::<Postgres, StorageTargetRow>(
            r#"
            SELECT id, owner_id, name, driver, config, created_at, updated_at, deleted_at
            FROM storage_targets
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch storage target")?;

        Ok(row.map(StorageTarget::from))
    }

    pub async fn list_for_owner(&self, owner_id: Uuid) -> Result<Vec<StorageTarget>> {
        let rows = sqlx::query_as::<Postgres, StorageTargetRow>(
            r#"
            SELECT id, owner_id, name, driver, config, created_at, updated_at, deleted_at
            FROM storage_targets
            WHERE owner_id = $1 AND deleted_at IS NULL
            ORDER BY name
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list storage targets")?;

        Ok(rows.into_iter().map(StorageTarget::from).collect())
    }

    /// Hide a target and its listings; stored content is retained.
    pub async fn soft_delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE storage_targets SET deleted_at = NOW(), updated_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .context("Failed to soft-delete storage target")?;

        Ok(result.rows_affected() > 0)
    }

    /// Remove a target, all of its catalog rows, and everything it stores.
    pub async fn force_delete(&self, id: Uuid, storage: &dyn Storage) -> Result<bool> {
        storage
            .delete_all("")
            .await
            .context("Failed to delete target content")?;

        // media rows go with the target via ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM storage_targets WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete storage target row")?;

        tracing::info!(target_id = %id, "Storage target force-deleted");

        Ok(result.rows_affected() > 0)
    }
}
