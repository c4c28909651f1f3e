//! Error types for the storage layer.

use thiserror::Error;

/// Storage operation result type.
pub type Result<T> = std::result::Result<T, DbError>;

/// Which kind of constraint a violation hit.
///
/// `DuplicateKey` is the one the materializer cares about: a concurrent
/// driver may have produced a key first, and that outcome is benign.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    /// Primary-key or unique violation
    DuplicateKey,
    /// Foreign-key violation
    ForeignKey,
    /// NOT NULL violation
    NotNull,
    /// CHECK violation (enum value sets)
    Check,
}

/// Storage errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// SQLx error (connection, query, etc.)
    #[error("database error: {0}")]
    Sqlx(#[source] sqlx::Error),

    /// IO error (file system operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Resource not found
    #[error("not found: {0}")]
    NotFound(String),

    /// Constraint violation, classified by kind
    #[error("constraint violation: {message}")]
    Constraint {
        kind: ConstraintKind,
        message: String,
    },

    /// An existing physical table does not match the derived schema
    #[error("schema conflict for table `{table}`: {detail}")]
    SchemaConflict { table: String, detail: String },

    /// Invalid state or malformed input
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Schema derivation error surfaced through storage
    #[error(transparent)]
    Schema(#[from] tabulon_schema::SchemaError),
}

// SQLite extended result codes, as reported by sqlx.
const SQLITE_CONSTRAINT_CHECK: &str = "275";
const SQLITE_CONSTRAINT_FOREIGNKEY: &str = "787";
const SQLITE_CONSTRAINT_NOTNULL: &str = "1299";
const SQLITE_CONSTRAINT_PRIMARYKEY: &str = "1555";
const SQLITE_CONSTRAINT_UNIQUE: &str = "2067";

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            let kind = match db.code().as_deref() {
                Some(SQLITE_CONSTRAINT_PRIMARYKEY) | Some(SQLITE_CONSTRAINT_UNIQUE) => {
                    Some(ConstraintKind::DuplicateKey)
                }
                Some(SQLITE_CONSTRAINT_FOREIGNKEY) => Some(ConstraintKind::ForeignKey),
                Some(SQLITE_CONSTRAINT_NOTNULL) => Some(ConstraintKind::NotNull),
                Some(SQLITE_CONSTRAINT_CHECK) => Some(ConstraintKind::Check),
                _ => None,
            };
            if let Some(kind) = kind {
                return DbError::Constraint {
                    kind,
                    message: db.message().to_string(),
                };
            }
        }
        DbError::Sqlx(err)
    }
}

impl DbError {
    /// Create a not found error.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an invalid state error.
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    /// True for primary-key/unique violations - the "already produced" case.
    pub fn is_duplicate_key(&self) -> bool {
        matches!(
            self,
            DbError::Constraint {
                kind: ConstraintKind::DuplicateKey,
                ..
            }
        )
    }
}
