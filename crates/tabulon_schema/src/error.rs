//! Error types for schema derivation.

use thiserror::Error;

/// Schema derivation result type.
pub type Result<T> = std::result::Result<T, SchemaError>;

/// Errors raised while deriving or registering a table schema.
///
/// All of these are startup-fatal: a definition that fails to build must not
/// leave any partial state behind in the registry.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// A semantic type with no storage column type
    #[error("unsupported semantic type: {0}")]
    UnsupportedType(String),

    /// Two distinct entities normalize to the same table name,
    /// or the same entity was registered twice
    #[error("duplicate table name: {0}")]
    DuplicateTable(String),

    /// Two parents (or a parent and an own field) contribute
    /// a column of the same name
    #[error("composite key conflict in `{entity}`: column `{column}` is contributed more than once")]
    CompositeKeyConflict { entity: String, column: String },

    /// A parent with no primary key has no key columns to inherit
    #[error("entity `{entity}` references keyless parent `{parent}`")]
    KeylessParent { entity: String, parent: String },

    /// A field declaration that cannot be honored
    #[error("invalid field `{field}` in `{entity}`: {reason}")]
    InvalidFieldSpec {
        entity: String,
        field: String,
        reason: String,
    },

    /// Lookup of an entity that was never registered
    #[error("unknown entity: {0}")]
    UnknownEntity(String),
}

impl SchemaError {
    /// Create an invalid-field error.
    pub fn invalid_field(
        entity: impl Into<String>,
        field: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidFieldSpec {
            entity: entity.into(),
            field: field.into(),
            reason: reason.into(),
        }
    }
}
