//! Key-space queries for computed entities.
//!
//! The candidate key space of a computed entity is the cross product of its
//! parents' primary-key tuples; the builder guarantees the parents' key
//! column sets are disjoint, so the product is exactly the natural join of
//! the parent tables. The missing-key set is that space minus the keys the
//! entity's own table already holds - one `EXCEPT` query, deduplicated and
//! stably ordered by the database.

use crate::ddl::quote_ident;
use crate::error::{DbError, Result};
use crate::value::Key;
use crate::TabulonDb;
use tabulon_schema::TableSchema;
use tracing::debug;

/// The key columns contributed by each parent, in parent order.
fn parent_key_columns<'a>(parents: &[&'a TableSchema]) -> Vec<(&'a str, &'a str)> {
    parents
        .iter()
        .flat_map(|parent| {
            parent
                .primary_key
                .iter()
                .map(|col| (parent.table.as_str(), col.as_str()))
        })
        .collect()
}

fn select_list(columns: &[(&str, &str)]) -> String {
    let parts: Vec<String> = columns
        .iter()
        .map(|(table, col)| format!("{}.{} AS {}", quote_ident(table), quote_ident(col), quote_ident(col)))
        .collect();
    parts.join(", ")
}

fn cross_join(parents: &[&TableSchema]) -> String {
    let parts: Vec<String> = parents.iter().map(|p| quote_ident(&p.table)).collect();
    parts.join(" CROSS JOIN ")
}

fn order_by(n: usize) -> String {
    let parts: Vec<String> = (1..=n).map(|i| i.to_string()).collect();
    parts.join(", ")
}

impl TabulonDb {
    /// Every candidate key combination across the parent tables.
    pub async fn candidate_keys(&self, parents: &[&TableSchema]) -> Result<Vec<Key>> {
        if parents.is_empty() {
            return Ok(Vec::new());
        }
        let columns = parent_key_columns(parents);
        let sql = format!(
            "SELECT {} FROM {} ORDER BY {}",
            select_list(&columns),
            cross_join(parents),
            order_by(columns.len())
        );
        self.fetch_keys(&sql, &columns).await
    }

    /// Candidate keys not yet present in the entity's own table.
    ///
    /// The set difference is exact: no duplicates, no keys already present,
    /// and together with [`existing_keys`](Self::existing_keys) it partitions
    /// the candidate space. Order is stable (sorted by key columns).
    pub async fn missing_keys(
        &self,
        child: &TableSchema,
        parents: &[&TableSchema],
    ) -> Result<Vec<Key>> {
        if parents.is_empty() {
            return Ok(Vec::new());
        }
        let columns = parent_key_columns(parents);
        let own: Vec<String> = columns
            .iter()
            .map(|(_, col)| quote_ident(col))
            .collect();
        let sql = format!(
            "SELECT {} FROM {} EXCEPT SELECT {} FROM {} ORDER BY {}",
            select_list(&columns),
            cross_join(parents),
            own.join(", "),
            quote_ident(&child.table),
            order_by(columns.len())
        );
        let keys = self.fetch_keys(&sql, &columns).await?;
        debug!(table = %child.table, missing = keys.len(), "computed missing-key set");
        Ok(keys)
    }

    /// Parent-key tuples already present in the entity's own table.
    pub async fn existing_keys(
        &self,
        child: &TableSchema,
        parents: &[&TableSchema],
    ) -> Result<Vec<Key>> {
        if parents.is_empty() {
            return Ok(Vec::new());
        }
        let columns = parent_key_columns(parents);
        let own: Vec<String> = columns
            .iter()
            .map(|(_, col)| quote_ident(col))
            .collect();
        let sql = format!(
            "SELECT {} FROM {} ORDER BY {}",
            own.join(", "),
            quote_ident(&child.table),
            order_by(columns.len())
        );
        self.fetch_keys(&sql, &columns).await
    }

    async fn fetch_keys(&self, sql: &str, columns: &[(&str, &str)]) -> Result<Vec<Key>> {
        let names: Vec<&str> = columns.iter().map(|(_, col)| *col).collect();
        let rows = sqlx::query(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(DbError::from)?;
        rows.iter()
            .map(|row| Key::from_sqlite(row, &names))
            .collect()
    }
}
