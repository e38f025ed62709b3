//! `SQLite` pool construction, schema bootstrap, and per-query deadlines.
//!
//! Every repository in this crate funnels its statements through [`with_deadline`], so a
//! stalled database surfaces as [`StoreError::Timeout`] instead of holding the request open.

use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Row, SqlitePool,
};
use std::{future::Future, str::FromStr, time::Duration};
use thiserror::Error;

/// Deadline applied to a single persistence call unless configured otherwise.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(3);

/// Tables for users, their scoped tokens, and the versioned movie resource.
pub const SCHEMA: &str = r"
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
        name TEXT NOT NULL,
        email TEXT NOT NULL UNIQUE,
        activated BOOLEAN NOT NULL DEFAULT 0,
        version INTEGER NOT NULL DEFAULT 1
    );

    CREATE TABLE IF NOT EXISTS tokens (
        hash BLOB PRIMARY KEY,
        user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        expiry INTEGER NOT NULL,
        scope TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_tokens_user_scope ON tokens(user_id, scope);

    CREATE TABLE IF NOT EXISTS movies (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
        title TEXT NOT NULL,
        year INTEGER NOT NULL,
        runtime INTEGER NOT NULL,
        genres TEXT NOT NULL DEFAULT '[]',
        version INTEGER NOT NULL DEFAULT 1
    );
";

/// Error type shared by all persistence operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// No row matched the lookup
    #[error("record not found")]
    RecordNotFound,

    /// A conditional update matched zero rows: the record changed or disappeared since it was read
    #[error("edit conflict")]
    EditConflict,

    /// A unique constraint rejected the write
    #[error("duplicate value: {0}")]
    Duplicate(String),

    /// The statement did not complete before its deadline
    #[error("database operation timed out after {0:?}")]
    Timeout(Duration),

    /// Database operation failed
    #[error("database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::RecordNotFound,
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::Duplicate(db.message().to_string())
            }
            other => StoreError::Database(other.to_string()),
        }
    }
}

/// Runs a database future under `deadline`.
///
/// When the deadline elapses the future is dropped, which abandons the in-flight statement.
///
/// # Errors
///
/// Returns [`StoreError::Timeout`] when the deadline elapses, or the mapped `sqlx` error.
pub async fn with_deadline<T, F>(deadline: Duration, query: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    match tokio::time::timeout(deadline, query).await {
        Ok(result) => result.map_err(StoreError::from),
        Err(_) => {
            tracing::warn!(deadline_ms = deadline.as_millis(), "database operation timed out");
            Err(StoreError::Timeout(deadline))
        }
    }
}

/// Opens a pool against `database_url`, creating the database file and its parent
/// directory if needed.
///
/// Connections are never recycled for idleness or age so that `sqlite::memory:` databases,
/// which live only as long as their connection, survive between statements.
///
/// # Errors
///
/// Returns [`StoreError::Database`] if the URL is invalid, the directory cannot be created,
/// or the connection fails.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<SqlitePool, StoreError> {
    let options =
        SqliteConnectOptions::from_str(database_url)?.create_if_missing(true).foreign_keys(true);

    // in-memory names have no parent
    if let Some(parent) = options.get_filename().parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                StoreError::Database(format!(
                    "cannot create database directory {}: {e}",
                    parent.display()
                ))
            })?;
        }
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// Creates the tables if they do not exist yet.
///
/// # Errors
///
/// Returns [`StoreError::Database`] if any DDL statement fails.
pub async fn init_schema(pool: &SqlitePool) -> Result<(), StoreError> {
    sqlx::raw_sql(SCHEMA).execute(pool).await?;
    Ok(())
}

/// Opens a single-connection in-memory database with the schema applied.
///
/// # Errors
///
/// Returns [`StoreError::Database`] if the pool or schema cannot be created.
pub async fn connect_in_memory() -> Result<SqlitePool, StoreError> {
    let pool = connect("sqlite::memory:", 1).await?;
    init_schema(&pool).await?;
    Ok(pool)
}

/// Extracts a non-nullable column, reporting the column name on failure.
pub(crate) fn get_required<'r, T>(row: &'r SqliteRow, column: &str) -> Result<T, StoreError>
where
    T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get::<T, _>(column)
        .map_err(|e| StoreError::Database(format!("column '{column}': {e}")))
}

/// Extracts an integer column and narrows it to `i32`, rejecting out-of-range values.
pub(crate) fn get_i32(row: &SqliteRow, column: &str) -> Result<i32, StoreError> {
    let value: i64 = get_required(row, column)?;
    i32::try_from(value).map_err(|e| {
        StoreError::Database(format!("column '{column}' value {value} out of i32 range: {e}"))
    })
}
