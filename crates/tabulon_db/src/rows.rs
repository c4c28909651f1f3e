//! Row-level operations: inserts and key-filtered reads.

use crate::ddl::quote_ident;
use crate::error::{DbError, Result};
use crate::value::{bind_value, Key, Row, Value};
use crate::TabulonDb;
use sqlx::Row as _;
use tabulon_schema::TableSchema;

/// Build an INSERT statement for `row`, validating every column against the
/// derived schema.
pub(crate) fn insert_statement(
    schema: &TableSchema,
    row: &Row,
) -> Result<(String, Vec<Value>)> {
    if row.is_empty() {
        return Err(DbError::invalid_state(format!(
            "refusing to insert an empty row into `{}`",
            schema.table
        )));
    }

    let mut names: Vec<String> = Vec::with_capacity(row.len());
    let mut params: Vec<Value> = Vec::with_capacity(row.len());
    for (name, value) in row.columns() {
        if !schema.has_column(name) {
            return Err(DbError::invalid_state(format!(
                "table `{}` has no column `{name}`",
                schema.table
            )));
        }
        names.push(quote_ident(name));
        params.push(value.clone());
    }

    let placeholders: Vec<&str> = std::iter::repeat("?").take(names.len()).collect();
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(&schema.table),
        names.join(", "),
        placeholders.join(", ")
    );
    Ok((sql, params))
}

impl TabulonDb {
    /// Insert one row, autocommitted. Manual entities are fed through here.
    pub async fn insert(&self, schema: &TableSchema, row: &Row) -> Result<()> {
        let (sql, params) = insert_statement(schema, row)?;
        let mut query = sqlx::query(&sql);
        for value in &params {
            query = bind_value(query, value);
        }
        query.execute(&self.pool).await.map_err(DbError::from)?;
        Ok(())
    }

    /// Fetch all rows matching a key, after restricting the key to the
    /// columns the table actually has.
    pub async fn fetch_matching(&self, schema: &TableSchema, key: &Key) -> Result<Vec<Row>> {
        let restricted = key.restrict_to(schema);

        let mut sql = format!("SELECT * FROM {}", quote_ident(&schema.table));
        if !restricted.is_empty() {
            let clauses: Vec<String> = restricted
                .columns()
                .map(|(name, _)| format!("{} = ?", quote_ident(name)))
                .collect();
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }

        let params: Vec<Value> = restricted.columns().map(|(_, v)| v.clone()).collect();
        let mut query = sqlx::query(&sql);
        for value in &params {
            query = bind_value(query, value);
        }
        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(DbError::from)?;
        rows.iter().map(Row::from_sqlite).collect()
    }

    /// Number of rows in a table.
    pub async fn count(&self, schema: &TableSchema) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_ident(&schema.table));
        let row = sqlx::query(&sql)
            .fetch_one(&self.pool)
            .await
            .map_err(DbError::from)?;
        row.try_get::<i64, _>(0).map_err(DbError::from)
    }
}
