//! Physical schema creation from derived table schemas.
//!
//! All DDL rendering lives here - single source of truth. Creation is
//! idempotent: a table that already exists with the identical shape is a
//! no-op, one that exists with a different shape is a conflict.

use crate::error::{DbError, Result};
use crate::TabulonDb;
use sqlx::Row as _;
use tabulon_schema::TableSchema;
use tracing::{debug, info};

pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Render the CREATE TABLE statement for a derived schema.
pub(crate) fn create_table_sql(schema: &TableSchema) -> String {
    let mut items: Vec<String> = Vec::new();

    for column in &schema.columns {
        let mut item = format!(
            "{} {}",
            quote_ident(&column.name),
            column.column_type.as_sql()
        );
        if !column.nullable {
            item.push_str(" NOT NULL");
        }
        if let Some(values) = column.semantic.enum_values() {
            let list: Vec<String> = values.iter().map(|v| quote_literal(v)).collect();
            item.push_str(&format!(
                " CHECK ({} IN ({}))",
                quote_ident(&column.name),
                list.join(", ")
            ));
        }
        items.push(item);
    }

    if !schema.primary_key.is_empty() {
        let cols: Vec<String> = schema.primary_key.iter().map(|c| quote_ident(c)).collect();
        items.push(format!("PRIMARY KEY ({})", cols.join(", ")));
    }

    for fk in &schema.foreign_keys {
        let local: Vec<String> = fk.columns.iter().map(|c| quote_ident(c)).collect();
        let referenced: Vec<String> = fk
            .referenced_columns
            .iter()
            .map(|c| quote_ident(c))
            .collect();
        items.push(format!(
            "FOREIGN KEY ({}) REFERENCES {} ({}) ON DELETE RESTRICT ON UPDATE CASCADE",
            local.join(", "),
            quote_ident(&fk.referenced_table),
            referenced.join(", ")
        ));
    }

    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
        quote_ident(&schema.table),
        items.join(",\n    ")
    )
}

impl TabulonDb {
    /// Materialize physical tables for every given schema, in order.
    ///
    /// Schemas must arrive parents-first, which registration order guarantees.
    pub async fn create_schema<'a, I>(&self, schemas: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a TableSchema>,
    {
        for schema in schemas {
            if self.table_exists(&schema.table).await? {
                self.verify_existing(schema).await?;
                debug!(table = %schema.table, "table already exists; schema matches");
            } else {
                sqlx::query(&create_table_sql(schema))
                    .execute(&self.pool)
                    .await
                    .map_err(DbError::from)?;
                info!(table = %schema.table, "table created");
            }
        }
        Ok(())
    }

    async fn table_exists(&self, table: &str) -> Result<bool> {
        let row = sqlx::query("SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?")
            .bind(table)
            .fetch_optional(&self.pool)
            .await
            .map_err(DbError::from)?;
        Ok(row.is_some())
    }

    /// Compare an existing table against the derived schema.
    ///
    /// Column names, declared types, NOT NULL flags, primary-key ordering,
    /// and foreign-key constraints must all match exactly.
    async fn verify_existing(&self, schema: &TableSchema) -> Result<()> {
        let rows = sqlx::query("SELECT name, type, \"notnull\", pk FROM pragma_table_info(?)")
            .bind(&schema.table)
            .fetch_all(&self.pool)
            .await
            .map_err(DbError::from)?;

        let conflict = |detail: String| DbError::SchemaConflict {
            table: schema.table.clone(),
            detail,
        };

        if rows.len() != schema.columns.len() {
            return Err(conflict(format!(
                "expected {} columns, found {}",
                schema.columns.len(),
                rows.len()
            )));
        }

        for (row, expected) in rows.iter().zip(&schema.columns) {
            let name: String = row.try_get("name").map_err(DbError::from)?;
            let declared: String = row.try_get("type").map_err(DbError::from)?;
            let notnull: i64 = row.try_get("notnull").map_err(DbError::from)?;
            let pk: i64 = row.try_get("pk").map_err(DbError::from)?;

            if name != expected.name {
                return Err(conflict(format!(
                    "column `{name}` where `{}` was expected",
                    expected.name
                )));
            }
            if !declared.eq_ignore_ascii_case(expected.column_type.as_sql()) {
                return Err(conflict(format!(
                    "column `{name}` is {declared}, expected {}",
                    expected.column_type.as_sql()
                )));
            }
            let expected_notnull = i64::from(!expected.nullable);
            if notnull != expected_notnull {
                return Err(conflict(format!(
                    "column `{name}` nullability differs from the derived schema"
                )));
            }
            let expected_pk = schema
                .primary_key
                .iter()
                .position(|c| c == &name)
                .map(|p| p as i64 + 1)
                .unwrap_or(0);
            if pk != expected_pk {
                return Err(conflict(format!(
                    "column `{name}` primary-key position differs from the derived schema"
                )));
            }
        }

        // Foreign keys are part of the derived shape too. The pragma lists
        // constraints in reverse declaration order, so compare as sorted sets.
        let fk_rows = sqlx::query(
            "SELECT id, \"table\", \"from\", \"to\", on_update, on_delete \
             FROM pragma_foreign_key_list(?) ORDER BY id, seq",
        )
        .bind(&schema.table)
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::from)?;

        let mut actual: Vec<(String, Vec<(String, String)>)> = Vec::new();
        let mut last_id: Option<i64> = None;
        for row in &fk_rows {
            let id: i64 = row.try_get("id").map_err(DbError::from)?;
            let table: String = row.try_get("table").map_err(DbError::from)?;
            let from: String = row.try_get("from").map_err(DbError::from)?;
            let to: String = row.try_get("to").map_err(DbError::from)?;
            let on_update: String = row.try_get("on_update").map_err(DbError::from)?;
            let on_delete: String = row.try_get("on_delete").map_err(DbError::from)?;
            if on_update != "CASCADE" || on_delete != "RESTRICT" {
                return Err(conflict(format!(
                    "foreign key to `{table}` has different referential actions"
                )));
            }
            if last_id == Some(id) {
                if let Some(group) = actual.last_mut() {
                    group.1.push((from, to));
                }
            } else {
                actual.push((table, vec![(from, to)]));
                last_id = Some(id);
            }
        }
        actual.sort();

        let mut expected: Vec<(String, Vec<(String, String)>)> = schema
            .foreign_keys
            .iter()
            .map(|fk| {
                (
                    fk.referenced_table.clone(),
                    fk.columns
                        .iter()
                        .cloned()
                        .zip(fk.referenced_columns.iter().cloned())
                        .collect(),
                )
            })
            .collect();
        expected.sort();

        if actual != expected {
            return Err(conflict(
                "foreign keys differ from the derived schema".to_string(),
            ));
        }

        Ok(())
    }
}
