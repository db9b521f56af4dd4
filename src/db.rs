use anyhow::{Context, Result};
use diesel::{Connection, PgConnection};
use diesel_async::AsyncPgConnection;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::pooled_connection::bb8::Pool;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness};

use crate::aliases::DbPool;

pub async fn create_pool(database_url: &str) -> Result<DbPool> {
    let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url);
    let pool = Pool::builder()
        .build(manager)
        .await
        .context("Failed to build DB connection pool")?;
    Ok(pool)
}

/// Runs embedded migrations on a dedicated blocking thread. diesel's
/// migration harness is synchronous, so it must not run on the async runtime.
pub async fn run_migrations_blocking(
    migrations: EmbeddedMigrations,
    database_url: &str,
) -> Result<usize> {
    let database_url = database_url.to_string();
    tokio::task::spawn_blocking(move || {
        let mut conn =
            PgConnection::establish(&database_url).context("Failed to connect for migrations")?;
        let versions = conn
            .run_pending_migrations(migrations)
            .map_err(|err| anyhow::anyhow!("Failed to run migrations: {err}"))?;
        Ok::<usize, anyhow::Error>(versions.len())
    })
    .await
    .context("Migration task panicked")?
}
