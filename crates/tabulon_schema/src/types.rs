//! Semantic value types and their storage column types.
//!
//! Every declared field carries a [`SemanticType`]. Schema building maps it to
//! exactly one SQLite storage class, exactly once per field; a type with no
//! mapping is a build-time error, never a silent coercion.

use crate::error::SchemaError;
use serde::{Deserialize, Serialize};

/// Semantic value type of a declared field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SemanticType {
    /// Free-form text
    Text,
    /// 64-bit signed integer
    Integer,
    /// Double-precision floating point
    Float,
    /// Boolean flag
    Boolean,
    /// Calendar date (ISO 8601 text)
    Date,
    /// Time of day (ISO 8601 text)
    Time,
    /// Point in time (RFC 3339 text)
    Timestamp,
    /// Elapsed time, stored as whole milliseconds
    Duration,
    /// Fixed-point decimal
    Decimal,
    /// Binary blob
    Blob,
    /// UUID, stored in canonical text form
    Uuid,
    /// Enumeration over a fixed value set
    Enum { values: Vec<String> },
}

impl SemanticType {
    /// Resolve the storage column type for this semantic type.
    ///
    /// Total over the enumerated set, with one exception: an [`Enum`] with an
    /// empty value set has no meaningful storage representation and is
    /// rejected with [`SchemaError::UnsupportedType`].
    ///
    /// [`Enum`]: SemanticType::Enum
    pub fn column_type(&self) -> Result<ColumnType, SchemaError> {
        let mapped = match self {
            Self::Text | Self::Date | Self::Time | Self::Timestamp | Self::Uuid => {
                ColumnType::Text
            }
            Self::Enum { values } => {
                if values.is_empty() {
                    return Err(SchemaError::UnsupportedType(
                        "enum with an empty value set".to_string(),
                    ));
                }
                ColumnType::Text
            }
            Self::Integer | Self::Boolean | Self::Duration => ColumnType::Integer,
            Self::Float => ColumnType::Real,
            Self::Decimal => ColumnType::Numeric,
            Self::Blob => ColumnType::Blob,
        };
        Ok(mapped)
    }

    /// The fixed value set, if this is an enumerated type.
    pub fn enum_values(&self) -> Option<&[String]> {
        match self {
            Self::Enum { values } => Some(values),
            _ => None,
        }
    }

    /// Convenience constructor for an enumerated type.
    pub fn enumeration<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Enum {
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

/// SQLite storage column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ColumnType {
    Text,
    Integer,
    Real,
    Numeric,
    Blob,
}

impl ColumnType {
    /// The declared type as it appears in DDL.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Text => "TEXT",
            Self::Integer => "INTEGER",
            Self::Real => "REAL",
            Self::Numeric => "NUMERIC",
            Self::Blob => "BLOB",
        }
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_sql())
    }
}
