use std::time::Duration;

use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use thiserror::Error;

mod migrate;
mod progress_cache;

/// Local progress cache backed by `SQLite`.
///
/// Scope is deliberately narrow: slide and chapter-quiz completions only.
/// The remote store stays authoritative; this cache supplements it while the
/// network is down and is reconciled by union on load.
#[derive(Clone)]
pub struct SqliteProgressCache {
    pool: SqlitePool,
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SqliteInitError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl SqliteProgressCache {
    /// Connect to `SQLite` using the given URL and run migrations.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if the connection cannot be established,
    /// PRAGMA setup fails, or migrations fail.
    pub async fn connect(database_url: &str) -> Result<Self, SqliteInitError> {
        // One connection: the cache has a single local writer, and a pool of
        // one keeps `sqlite::memory:` URLs pointing at a single database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(5))
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    sqlx::query("PRAGMA foreign_keys = ON;")
                        .execute(&mut *conn)
                        .await?;
                    sqlx::query("PRAGMA journal_mode = WAL;")
                        .execute(&mut *conn)
                        .await?;
                    sqlx::query("PRAGMA busy_timeout = 5000;")
                        .execute(&mut *conn)
                        .await?;
                    Ok(())
                })
            })
            .connect(database_url)
            .await?;
        let cache = Self { pool };
        cache.migrate().await?;
        Ok(cache)
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create tables if they do not exist.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if migration queries fail.
    pub async fn migrate(&self) -> Result<(), SqliteInitError> {
        migrate::run_migrations(&self.pool).await
    }
}
