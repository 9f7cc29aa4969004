//! Schema migrations, run once at process startup before any repository
//! touches the pool. SQLite only — there is no Postgres deployment target
//! for this store.

use diesel::Connection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use tracing::info;

use crate::error::StoreError;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations/sqlite");

/// Applies every pending migration against `database_url`. Diesel's
/// migration harness is synchronous, so the connection and the harness
/// call both run on a blocking task.
pub async fn run_migrations(database_url: &str) -> Result<(), StoreError> {
    let url = database_url.strip_prefix("sqlite:").unwrap_or(database_url).to_string();

    tokio::task::spawn_blocking(move || {
        let mut conn = diesel::SqliteConnection::establish(&url)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let applied = conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        for migration in &applied {
            info!(%migration, "applied migration");
        }
        if applied.is_empty() {
            info!("no pending migrations");
        }
        Ok(())
    })
    .await
    .map_err(|e| StoreError::Database(e.to_string()))?
}
