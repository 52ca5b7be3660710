//! Memoria CLI — restore media archives into storage targets.
//!
//! Set DATABASE_URL for the catalog. Storage configuration lives on the
//! target rows themselves.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use memoria_cli::init_tracing;
use memoria_core::catalog::MediumCatalog;
use memoria_core::config::{RestoreConfig, StorageConfig};
use memoria_core::models::{RestoreJob, StorageTarget};
use memoria_db::{MediumRepository, StorageTargetRepository};
use memoria_restore::{RestorePipeline, TracingNotifier};
use memoria_storage::StorageResolver;

#[derive(Parser)]
#[command(name = "memoria", about = "Media restore pipeline CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Restore a ZIP archive into a storage target
    Restore {
        /// Owner UUID
        owner: Uuid,
        /// Storage target UUID
        target: Uuid,
        /// Path to the ZIP archive
        archive: PathBuf,
        /// Keep the archive after a successful restore
        #[arg(long)]
        keep_archive: bool,
    },
    /// Storage target operations
    Target {
        #[command(subcommand)]
        sub: TargetCommands,
    },
    /// List restored media for a target
    List {
        /// Owner UUID
        owner: Uuid,
        /// Storage target UUID
        target: Uuid,
        /// Maximum number of items
        #[arg(long, default_value = "20")]
        limit: i64,
        /// Offset for pagination
        #[arg(long, default_value = "0")]
        offset: i64,
    },
    /// Run pending database migrations
    Migrate,
}

#[derive(Subcommand)]
enum TargetCommands {
    /// Create a local-filesystem storage target
    CreateLocal {
        /// Owner UUID
        owner: Uuid,
        /// Target name
        name: String,
        /// Base directory for stored files
        root: String,
    },
    /// List an owner's storage targets
    List {
        /// Owner UUID
        owner: Uuid,
    },
}

async fn connect() -> anyhow::Result<sqlx::PgPool> {
    let url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
    sqlx::PgPool::connect(&url)
        .await
        .context("Failed to connect to database")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let pool = connect().await?;

    match cli.command {
        Commands::Restore {
            owner,
            target,
            archive,
            keep_archive,
        } => {
            let targets = StorageTargetRepository::new(pool.clone());
            let target: StorageTarget = targets
                .get(target)
                .await?
                .with_context(|| format!("storage target {} not found", target))?;
            anyhow::ensure!(
                target.owner_id == owner,
                "storage target {} does not belong to owner {}",
                target.id,
                owner
            );

            let catalog: Arc<dyn MediumCatalog> = Arc::new(MediumRepository::new(pool));
            let pipeline = RestorePipeline::new(
                Arc::new(StorageResolver::new()),
                catalog,
                Arc::new(TracingNotifier),
                RestoreConfig::from_env(),
            );

            let mut job = RestoreJob::new(owner, target.id, archive);
            if keep_archive {
                job = job.keep_archive();
            }

            let cancel = CancellationToken::new();
            let ctrl_c_token = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::warn!("Interrupt received, cancelling restore");
                    ctrl_c_token.cancel();
                }
            });

            let summary = pipeline.run(job, &target, cancel).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Commands::Target { sub } => match sub {
            TargetCommands::CreateLocal { owner, name, root } => {
                let targets = StorageTargetRepository::new(pool);
                let target = StorageTarget::new(owner, name, StorageConfig::local(root));
                targets.create(&target).await?;
                println!("{}", target.id);
            }
            TargetCommands::List { owner } => {
                let targets = StorageTargetRepository::new(pool);
                for target in targets.list_for_owner(owner).await? {
                    println!("{}  {}  {}", target.id, target.driver, target.name);
                }
            }
        },
        Commands::List {
            owner,
            target,
            limit,
            offset,
        } => {
            let media = MediumRepository::new(pool);
            for medium in media.list_for_target(owner, target, limit, offset).await? {
                println!(
                    "{}  {}  {}  {}",
                    medium.id, medium.content_type, medium.size, medium.name
                );
            }
        }
        Commands::Migrate => {
            memoria_db::run_migrations(&pool).await?;
            tracing::info!("Migrations applied");
        }
    }

    Ok(())
}
