//! Process-wide entity registry.

use crate::builder::SchemaBuilder;
use crate::entity::{EntityDefinition, EntityRole};
use crate::error::{Result, SchemaError};
use crate::table::TableSchema;
use std::collections::HashMap;

/// A registered entity: its derived schema plus the declaration facts the
/// materializer needs.
#[derive(Debug, Clone)]
pub struct EntityRecord {
    pub name: String,
    pub schema: TableSchema,
    pub parents: Vec<String>,
    pub role: EntityRole,
}

/// Append-only map from entity name to its resolved record.
///
/// Built once at startup as entities are defined; entries are never removed.
/// The only read failure mode is [`SchemaError::UnknownEntity`].
#[derive(Debug, Default)]
pub struct EntityRegistry {
    records: Vec<EntityRecord>,
    by_name: HashMap<String, usize>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build and register an entity definition.
    ///
    /// All-or-nothing: if the build fails, nothing is registered. Registering
    /// a second entity whose name (or normalized table name) collides with an
    /// existing one is [`SchemaError::DuplicateTable`].
    pub fn define(&mut self, definition: &EntityDefinition) -> Result<&EntityRecord> {
        let table = definition.name.to_lowercase();
        if self.by_name.contains_key(&definition.name)
            || self.records.iter().any(|r| r.schema.table == table)
        {
            return Err(SchemaError::DuplicateTable(table));
        }

        let schema = SchemaBuilder::build(self, definition)?;
        let record = EntityRecord {
            name: definition.name.clone(),
            schema,
            parents: definition.parents.clone(),
            role: definition.role,
        };
        let index = self.records.len();
        self.by_name.insert(definition.name.clone(), index);
        self.records.push(record);
        Ok(&self.records[index])
    }

    /// Look up a registered entity by name.
    pub fn get(&self, name: &str) -> Result<&EntityRecord> {
        self.by_name
            .get(name)
            .map(|&i| &self.records[i])
            .ok_or_else(|| SchemaError::UnknownEntity(name.to_string()))
    }

    /// Look up a registered entity's table schema by name.
    pub fn schema(&self, name: &str) -> Result<&TableSchema> {
        self.get(name).map(|r| &r.schema)
    }

    /// All registered schemas, in registration order. This is the input to
    /// bulk physical schema creation.
    pub fn schemas(&self) -> impl Iterator<Item = &TableSchema> {
        self.records.iter().map(|r| &r.schema)
    }

    /// All registered records, in registration order.
    pub fn records(&self) -> impl Iterator<Item = &EntityRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
