//! The schema derivation algorithm.

use crate::entity::EntityDefinition;
use crate::error::{Result, SchemaError};
use crate::registry::EntityRegistry;
use crate::table::{ColumnSpec, ForeignKey, TableSchema};
use tracing::warn;

/// Derives a [`TableSchema`] from an [`EntityDefinition`].
///
/// Building is deterministic and idempotent: an unchanged definition with an
/// unchanged parent chain always yields a structurally identical schema.
pub struct SchemaBuilder;

impl SchemaBuilder {
    /// Derive the table schema for `definition`.
    ///
    /// Parents are resolved through `registry` and must already be registered.
    /// Does not register the result; see [`EntityRegistry::define`] for the
    /// build-and-register path.
    pub fn build(registry: &EntityRegistry, definition: &EntityDefinition) -> Result<TableSchema> {
        let table = definition.name.to_lowercase();

        let mut columns: Vec<ColumnSpec> = Vec::new();
        let mut foreign_keys: Vec<ForeignKey> = Vec::new();

        // Inherited key columns first, in parent declaration order. Each
        // parent contributes all of its primary-key columns, marked primary
        // in the child, plus one composite foreign key.
        for parent_name in &definition.parents {
            let parent = registry.schema(parent_name)?;
            if parent.primary_key.is_empty() {
                return Err(SchemaError::KeylessParent {
                    entity: definition.name.clone(),
                    parent: parent_name.clone(),
                });
            }
            let mut local: Vec<String> = Vec::new();
            for key_col in parent.key_columns() {
                if columns.iter().any(|c| c.name == key_col.name) {
                    return Err(SchemaError::CompositeKeyConflict {
                        entity: definition.name.clone(),
                        column: key_col.name.clone(),
                    });
                }
                columns.push(ColumnSpec {
                    name: key_col.name.clone(),
                    semantic: key_col.semantic.clone(),
                    column_type: key_col.column_type,
                    nullable: false,
                    primary: true,
                });
                local.push(key_col.name.clone());
            }
            foreign_keys.push(ForeignKey {
                referenced_columns: local.clone(),
                columns: local,
                referenced_table: parent.table.clone(),
            });
        }
        let inherited = columns.len();

        // Own fields, in declaration order.
        for field in &definition.fields {
            if field.primary && field.nullable {
                return Err(SchemaError::invalid_field(
                    &definition.name,
                    &field.name,
                    "a primary key column cannot be nullable",
                ));
            }
            if let Some(pos) = columns.iter().position(|c| c.name == field.name) {
                if pos < inherited {
                    return Err(SchemaError::CompositeKeyConflict {
                        entity: definition.name.clone(),
                        column: field.name.clone(),
                    });
                }
                return Err(SchemaError::invalid_field(
                    &definition.name,
                    &field.name,
                    "duplicate column name",
                ));
            }
            let column_type = field.semantic.column_type()?;
            columns.push(ColumnSpec {
                name: field.name.clone(),
                semantic: field.semantic.clone(),
                column_type,
                nullable: field.nullable,
                primary: field.primary,
            });
        }

        let primary_key: Vec<String> = columns
            .iter()
            .filter(|c| c.primary)
            .map(|c| c.name.clone())
            .collect();

        if definition.role.is_computed() && definition.parents.is_empty() {
            warn!(
                entity = %definition.name,
                "computed entity has no parents; populate will be a no-op"
            );
        }
        if primary_key.is_empty() {
            warn!(entity = %definition.name, "table has no primary key");
        }

        Ok(TableSchema {
            table,
            columns,
            primary_key,
            foreign_keys,
        })
    }
}
