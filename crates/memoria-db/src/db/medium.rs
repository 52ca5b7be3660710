use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use memoria_core::catalog::{MediumCatalog, NewMedium};
use memoria_core::models::{Medium, MediumMeta};
use memoria_storage::Storage;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

#[derive(sqlx::FromRow)]
struct MediumRow {
    id: Uuid,
    owner_id: Uuid,
    target_id: Uuid,
    name: String,
    path: String,
    content_type: String,
    hash: String,
    size: i64,
    meta: Json<MediumMeta>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl From<MediumRow> for Medium {
    fn from(row: MediumRow) -> Self {
        Medium {
            id: row.id,
            owner_id: row.owner_id,
            target_id: row.target_id,
            name: row.name,
            path: row.path,
            content_type: row.content_type,
            hash: row.hash,
            size: row.size,
            meta: row.meta.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
        }
    }
}

/// Fetch for the public read path: soft-deleted rows are invisible.
const GET_LIVE_SQL: &str = r#"
    SELECT id, owner_id, target_id, name, path, content_type, hash, size,
           meta, created_at, updated_at, deleted_at
    FROM media
    WHERE id = $1 AND deleted_at IS NULL
"#;

/// Fetch for force-delete: trashed rows must still be reachable, or their
/// stored objects could never be removed.
const GET_ANY_SQL: &str = r#"
    SELECT id, owner_id, target_id, name, path, content_type, hash, size,
           meta, created_at, updated_at, deleted_at
    FROM media
    WHERE id = $1
"#;

/// Catalog repository for restored media.
#[derive(Clone)]
pub struct MediumRepository {
    pool: PgPool,
}

impl MediumRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Medium>> {
        let row = sqlx::query_as::<Postgres, MediumRow>(GET_LIVE_SQL)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch medium")?;

        Ok(row.map(Medium::from))
    }

    async fn get_any(&self, id: Uuid) -> Result<Option<Medium>> {
        let row = sqlx::query_as::<Postgres, MediumRow>(GET_ANY_SQL)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch medium")?;

        Ok(row.map(Medium::from))
    }

    pub async fn list_for_target(
        &self,
        owner_id: Uuid,
        target_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Medium>> {
        let rows = sqlx::query_as::<Postgres, MediumRow>(
            r#"
            SELECT id, owner_id, target_id, name, path, content_type, hash, size,
                   meta, created_at, updated_at, deleted_at
            FROM media
            WHERE owner_id = $1 AND target_id = $2 AND deleted_at IS NULL
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(owner_id)
        .bind(target_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list media")?;

        Ok(rows.into_iter().map(Medium::from).collect())
    }

    /// Hide a medium without touching the stored object.
    pub async fn soft_delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE media SET deleted_at = NOW(), updated_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .context("Failed to soft-delete medium")?;

        Ok(result.rows_affected() > 0)
    }

    /// Remove a medium and its underlying stored object. Works on live and
    /// soft-deleted rows alike.
    ///
    /// The object is deleted first; a row without a backing object is worse
    /// than an orphaned object, which a later restore of the same content
    /// would simply overwrite.
    pub async fn force_delete(&self, id: Uuid, storage: &dyn Storage) -> Result<bool> {
        let Some(medium) = self.get_any(id).await? else {
            return Ok(false);
        };

        storage
            .delete(&medium.path)
            .await
            .with_context(|| format!("Failed to delete stored object {}", medium.path))?;

        let result = sqlx::query("DELETE FROM media WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete medium row")?;

        tracing::info!(medium_id = %id, path = %medium.path, "Medium force-deleted");

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl MediumCatalog for MediumRepository {
    async fn upsert(&self, medium: NewMedium) -> Result<Uuid> {
        let (id,): (Uuid,) = sqlx::query_as(
            r#"
            INSERT INTO media (id, owner_id, target_id, name, path, content_type,
                               hash, size, meta, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10)
            ON CONFLICT (owner_id, target_id, name, path, hash)
            DO UPDATE SET
                content_type = EXCLUDED.content_type,
                size = EXCLUDED.size,
                meta = EXCLUDED.meta,
                updated_at = EXCLUDED.updated_at,
                deleted_at = NULL
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(medium.owner_id)
        .bind(medium.target_id)
        .bind(&medium.name)
        .bind(&medium.path)
        .bind(&medium.content_type)
        .bind(&medium.hash)
        .bind(medium.size)
        .bind(Json(&medium.meta))
        .bind(medium.taken_at)
        .fetch_one(&self.pool)
        .await
        .context("Failed to upsert medium")?;

        Ok(id)
    }

    async fn count_for_target(&self, owner_id: Uuid, target_id: Uuid) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM media WHERE owner_id = $1 AND target_id = $2 AND deleted_at IS NULL",
        )
        .bind(owner_id)
        .bind(target_id)
        .fetch_one(&self.pool)
        .await
        .context("Failed to count media")?;

        Ok(count)
    }
}
