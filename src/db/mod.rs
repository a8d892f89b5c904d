//! Database module

pub mod queries;

use anyhow::{Context, Result};
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{info, warn};

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Create a database connection pool
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .context("failed to connect to PostgreSQL")?;

    Ok(pool)
}

/// Run database migrations.
///
/// Applied migrations missing from the binary are forgotten and stale
/// checksums (CRLF/LF checkouts) are refreshed before running.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    info!("Running database migrations...");

    sync_migration_history(pool, &MIGRATOR).await?;
    MIGRATOR.run(pool).await.context("failed to run migrations")?;

    info!("Database migrations complete");
    Ok(())
}

async fn sync_migration_history(pool: &PgPool, migrator: &Migrator) -> Result<()> {
    let table_exists: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM information_schema.tables WHERE table_name = '_sqlx_migrations')"
    )
    .fetch_one(pool)
    .await?;

    if !table_exists {
        return Ok(());
    }

    let applied: Vec<(i64, Vec<u8>)> = sqlx::query_as(
        "SELECT version, checksum FROM _sqlx_migrations ORDER BY version"
    )
    .fetch_all(pool)
    .await?;

    for (version, checksum) in applied {
        let compiled = migrator
            .iter()
            .find(|m| m.version == version && !m.migration_type.is_down_migration());

        match compiled {
            None => {
                warn!("Removing record of migration {} (no longer compiled in)", version);
                sqlx::query("DELETE FROM _sqlx_migrations WHERE version = $1")
                    .bind(version)
                    .execute(pool)
                    .await?;
            }
            Some(migration) if checksum.as_slice() != &*migration.checksum => {
                warn!("Migration {} ({}) checksum changed, updating", version, migration.description);
                sqlx::query("UPDATE _sqlx_migrations SET checksum = $1 WHERE version = $2")
                    .bind(&*migration.checksum)
                    .bind(version)
                    .execute(pool)
                    .await?;
            }
            Some(_) => {}
        }
    }

    Ok(())
}
