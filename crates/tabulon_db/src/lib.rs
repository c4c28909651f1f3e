//! SQLite storage layer for Tabulon.
//!
//! This crate is the single storage collaborator of the materialization core:
//! it turns derived [`TableSchema`]s into physical tables, computes
//! missing-key sets by relational set difference, and exposes row inserts
//! under scoped transactions with savepoints.
//!
//! # Usage
//!
//! ```rust,ignore
//! use tabulon_db::TabulonDb;
//!
//! let db = TabulonDb::open("~/.tabulon/tabulon.sqlite3").await?;
//! db.create_schema(registry.schemas()).await?;
//!
//! let missing = db.missing_keys(&session, &[&recording, &subject]).await?;
//! ```

mod ddl;
mod error;
mod keys;
mod rows;
mod tx;
mod value;

pub use error::{ConstraintKind, DbError, Result};
pub use tx::TabulonTx;
pub use value::{Key, Row, Value};

use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use std::path::Path;
use tracing::info;

/// Handle to a Tabulon database.
///
/// Wraps a connection pool; cloning is cheap and shares the pool. Schema
/// creation, key queries, and inserts all go through this handle - the
/// materializer never touches raw SQL.
#[derive(Clone)]
pub struct TabulonDb {
    pool: SqlitePool,
}

impl TabulonDb {
    /// Open or create a database at the given path.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(DbError::from)?;

        info!(path = %path.display(), "database opened");
        Ok(Self { pool })
    }

    /// Open an existing database (fails if not exists).
    pub async fn open_existing(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(DbError::not_found(format!(
                "database not found: {}",
                path.display()
            )));
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(DbError::from)?;

        Ok(Self { pool })
    }

    /// Create an in-memory database.
    ///
    /// Limited to a single connection, since every SQLite `:memory:`
    /// connection is its own database. Fine for schema and row tests; populate
    /// passes that query parents mid-transaction need a file-backed database.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .in_memory(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(DbError::from)?;

        Ok(Self { pool })
    }

    /// Get the underlying connection pool (escape hatch for complex queries).
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the database connection.
    pub async fn close(self) {
        self.pool.close().await;
    }
}
