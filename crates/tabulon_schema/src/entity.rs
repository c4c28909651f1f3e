//! Entity declarations: fields, roles, and parent references.

use crate::types::SemanticType;
use serde::{Deserialize, Serialize};

/// One declared field of an entity.
///
/// Declaration order defines column order. A field may be marked primary or
/// nullable, but never both - that combination is rejected at build time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Column name
    pub name: String,
    /// Semantic value type
    pub semantic: SemanticType,
    /// Whether NULL values are allowed
    pub nullable: bool,
    /// Whether this field is part of the primary key
    pub primary: bool,
}

impl FieldSpec {
    /// A required (non-nullable, non-key) field.
    pub fn required(name: impl Into<String>, semantic: SemanticType) -> Self {
        Self {
            name: name.into(),
            semantic,
            nullable: false,
            primary: false,
        }
    }

    /// An optional (nullable) field.
    pub fn optional(name: impl Into<String>, semantic: SemanticType) -> Self {
        Self {
            name: name.into(),
            semantic,
            nullable: true,
            primary: false,
        }
    }

    /// A primary-key field.
    pub fn primary(name: impl Into<String>, semantic: SemanticType) -> Self {
        Self {
            name: name.into(),
            semantic,
            nullable: false,
            primary: true,
        }
    }
}

/// How an entity's rows come into existence.
///
/// This is a behavior tag, deliberately separate from the `parents` list:
/// parents express foreign-key relationships, the role expresses whether rows
/// are inserted externally or derived by a populate pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityRole {
    /// Rows are inserted directly by external code
    #[default]
    Manual,
    /// Rows are derived by the materializer from missing parent keys
    Computed,
}

impl EntityRole {
    pub fn is_computed(&self) -> bool {
        matches!(self, Self::Computed)
    }
}

/// A declared entity: the unit consumed by the schema builder.
///
/// Parents are referenced by name and must already be registered when this
/// definition is built - there are no forward references, which keeps the
/// parent graph a DAG by construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDefinition {
    /// Entity name; the table name is its lower-cased form
    pub name: String,
    /// Own fields, in declaration order
    pub fields: Vec<FieldSpec>,
    /// Parent entity names, in declaration order
    pub parents: Vec<String>,
    /// Manual or computed
    pub role: EntityRole,
}

impl EntityDefinition {
    /// Declare a manual entity.
    pub fn manual(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            parents: Vec::new(),
            role: EntityRole::Manual,
        }
    }

    /// Declare a computed entity.
    pub fn computed(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            parents: Vec::new(),
            role: EntityRole::Computed,
        }
    }

    /// Append an own field.
    pub fn field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    /// Append a parent reference.
    pub fn parent(mut self, name: impl Into<String>) -> Self {
        self.parents.push(name.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_constructors() {
        let f = FieldSpec::required("duration", SemanticType::Float);
        assert!(!f.nullable && !f.primary);

        let f = FieldSpec::optional("path", SemanticType::Text);
        assert!(f.nullable && !f.primary);

        let f = FieldSpec::primary("subject_id", SemanticType::Integer);
        assert!(!f.nullable && f.primary);
    }

    #[test]
    fn test_definition_builder_preserves_order() {
        let def = EntityDefinition::computed("Session")
            .parent("Recording")
            .parent("Subject")
            .field(FieldSpec::primary("session_id", SemanticType::Integer))
            .field(FieldSpec::required("session_date", SemanticType::Text));

        assert_eq!(def.parents, vec!["Recording", "Subject"]);
        assert_eq!(def.fields[0].name, "session_id");
        assert_eq!(def.fields[1].name, "session_date");
        assert!(def.role.is_computed());
    }
}
