//! Database repositories for the media catalog
//!
//! Repositories are thin, cloneable handles over a `PgPool` using runtime
//! queries. The medium repository implements the `MediumCatalog` seam the
//! restore pipeline persists through.

pub mod db;

pub use db::{MediumRepository, StorageTargetRepository};

/// Run pending migrations against a pool.
pub async fn run_migrations(pool: &sqlx::PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
