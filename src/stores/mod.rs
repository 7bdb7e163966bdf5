use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use diesel::sqlite::SqliteConnection;
use diesel::Connection;
use diesel_async::pooled_connection::bb8::{Pool, PooledConnection};
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::sync_connection_wrapper::SyncConnectionWrapper;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

use crate::error::{ArborBotError, Result};

pub mod faq;
pub mod graph;
pub mod schema;
pub mod sessions;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

pub(crate) type SqliteAsyncConn = SyncConnectionWrapper<SqliteConnection>;
pub(crate) type SqlitePool = Pool<SqliteAsyncConn>;
pub(crate) type SqlitePooledConn<'a> = PooledConnection<'a, SqliteAsyncConn>;

pub(crate) async fn connect(sqlite_path: &str) -> Result<SqlitePool> {
    ensure_parent_dir(sqlite_path)?;
    run_migrations(sqlite_path).await?;

    // One connection per store: sqlite takes a single writer, and the
    // denormalized message counter relies on its writes being serialized.
    let manager = AsyncDieselConnectionManager::<SqliteAsyncConn>::new(sqlite_path);
    Pool::builder()
        .max_size(1)
        .build(manager)
        .await
        .map_err(|e| ArborBotError::Runtime(e.to_string()))
}

/// Trim + lowercase, the single normalization applied to graph node text and
/// FAQ questions at match time.
pub(crate) fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

pub(crate) fn map_unique_violation(err: diesel::result::Error, what: &str) -> ArborBotError {
    match err {
        diesel::result::Error::DatabaseError(
            diesel::result::DatabaseErrorKind::UniqueViolation,
            _,
        ) => ArborBotError::Validation(format!("{what} already exists")),
        other => other.into(),
    }
}

pub(crate) fn now_ts() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

fn ensure_parent_dir(path: &str) -> Result<()> {
    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ArborBotError::Runtime(e.to_string()))?;
    }
    Ok(())
}

async fn run_migrations(database_url: &str) -> Result<()> {
    let database_url = database_url.to_string();
    tokio::task::spawn_blocking(move || {
        let mut conn = SqliteConnection::establish(&database_url)
            .map_err(|e| ArborBotError::Runtime(e.to_string()))?;
        conn.run_pending_migrations(MIGRATIONS)
            .map_err(|e| ArborBotError::Runtime(e.to_string()))?;
        Ok::<_, ArborBotError>(())
    })
    .await
    .map_err(|e| ArborBotError::Runtime(e.to_string()))??;
    Ok(())
}
