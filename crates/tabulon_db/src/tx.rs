//! Scoped transactions with savepoints.
//!
//! A populate pass stages all of its inserts inside one transaction, with a
//! named savepoint per key so a failing key can be unwound without losing the
//! keys staged before it. Dropping a [`TabulonTx`] without committing rolls
//! everything back - no exit path leaks an open transaction.

use crate::error::{DbError, Result};
use crate::rows::insert_statement;
use crate::value::{bind_value, Row};
use crate::TabulonDb;
use sqlx::{Sqlite, Transaction};
use tabulon_schema::TableSchema;

/// An open transaction against a Tabulon database.
pub struct TabulonTx {
    inner: Transaction<'static, Sqlite>,
}

impl TabulonDb {
    /// Begin a transaction.
    pub async fn begin(&self) -> Result<TabulonTx> {
        let inner = self.pool().begin().await.map_err(DbError::from)?;
        Ok(TabulonTx { inner })
    }
}

impl TabulonTx {
    /// Stage one row for insertion.
    pub async fn insert(&mut self, schema: &TableSchema, row: &Row) -> Result<()> {
        let (sql, params) = insert_statement(schema, row)?;
        let mut query = sqlx::query(&sql);
        for value in &params {
            query = bind_value(query, value);
        }
        query
            .execute(&mut *self.inner)
            .await
            .map_err(DbError::from)?;
        Ok(())
    }

    /// Open a named savepoint.
    ///
    /// Names are generated internally (`[a-z0-9_]`), never caller data.
    pub async fn savepoint(&mut self, name: &str) -> Result<()> {
        sqlx::query(&format!("SAVEPOINT \"{name}\""))
            .execute(&mut *self.inner)
            .await
            .map_err(DbError::from)?;
        Ok(())
    }

    /// Release a savepoint, keeping everything staged under it.
    pub async fn release(&mut self, name: &str) -> Result<()> {
        sqlx::query(&format!("RELEASE \"{name}\""))
            .execute(&mut *self.inner)
            .await
            .map_err(DbError::from)?;
        Ok(())
    }

    /// Unwind to a savepoint, discarding everything staged under it, and pop
    /// it from the stack.
    pub async fn rollback_to(&mut self, name: &str) -> Result<()> {
        sqlx::query(&format!("ROLLBACK TO \"{name}\""))
            .execute(&mut *self.inner)
            .await
            .map_err(DbError::from)?;
        sqlx::query(&format!("RELEASE \"{name}\""))
            .execute(&mut *self.inner)
            .await
            .map_err(DbError::from)?;
        Ok(())
    }

    /// Commit everything staged, atomically.
    pub async fn commit(self) -> Result<()> {
        self.inner.commit().await.map_err(DbError::from)
    }

    /// Roll back everything staged.
    pub async fn rollback(self) -> Result<()> {
        self.inner.rollback().await.map_err(DbError::from)
    }
}
