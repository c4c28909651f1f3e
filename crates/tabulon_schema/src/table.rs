//! The derived table schema: resolved columns, keys, and constraints.

use crate::types::{ColumnType, SemanticType};
use serde::{Deserialize, Serialize};

/// One resolved column of a table.
///
/// The storage type is resolved exactly once, at build time, and cached here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub semantic: SemanticType,
    pub column_type: ColumnType,
    pub nullable: bool,
    pub primary: bool,
}

/// A composite foreign-key constraint referencing a parent table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    /// Local column names, in parent primary-key order
    pub columns: Vec<String>,
    /// Referenced (parent) table name
    pub referenced_table: String,
    /// Referenced column names; same length and order as `columns`
    pub referenced_columns: Vec<String>,
}

/// A fully derived relational table schema.
///
/// Invariants, established by the builder and relied on downstream:
/// - `primary_key` names a subset of `columns`, in key order
/// - every foreign key's local columns are a subset of `columns`
/// - there is exactly one foreign key per declared parent, covering all of
///   that parent's primary-key columns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    /// Physical table name (lower-cased entity name)
    pub table: String,
    /// Columns, in declaration order (inherited key columns first)
    pub columns: Vec<ColumnSpec>,
    /// Composite primary key column names
    pub primary_key: Vec<String>,
    /// One constraint per parent
    pub foreign_keys: Vec<ForeignKey>,
}

impl TableSchema {
    /// Look up a column by name.
    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Primary-key columns, in key order.
    pub fn key_columns(&self) -> impl Iterator<Item = &ColumnSpec> {
        self.primary_key.iter().filter_map(|name| self.column(name))
    }

    /// Column names inherited from parents (the union of all foreign-key
    /// local columns, in foreign-key order). For a computed entity this is
    /// the column set of its populate keys.
    pub fn inherited_key_columns(&self) -> Vec<&str> {
        self.foreign_keys
            .iter()
            .flat_map(|fk| fk.columns.iter().map(String::as_str))
            .collect()
    }
}
