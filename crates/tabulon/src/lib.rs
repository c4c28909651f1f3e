//! Tabulon - declarative schema derivation and incremental materialization
//! for relational tables.
//!
//! Entities are declared as ordered field lists with semantic types plus
//! parent references. From those declarations Tabulon derives a normalized
//! relational schema (composite primary keys and foreign keys propagate down
//! the parent DAG), materializes the physical tables, and - for computed
//! entities - derives the parent-key combinations that should exist but do
//! not, driving a production callback to populate exactly those missing rows.
//!
//! # Usage
//!
//! ```rust,ignore
//! use tabulon::{
//!     EntityDefinition, EntityRegistry, FieldSpec, Materializer,
//!     PopulateOptions, SemanticType, TabulonDb,
//! };
//!
//! let mut registry = EntityRegistry::new();
//! registry.define(
//!     &EntityDefinition::manual("Subject")
//!         .field(FieldSpec::primary("subject_id", SemanticType::Integer))
//!         .field(FieldSpec::required("name", SemanticType::Text)),
//! )?;
//! registry.define(
//!     &EntityDefinition::computed("Session")
//!         .parent("Subject")
//!         .field(FieldSpec::primary("session_id", SemanticType::Integer)),
//! )?;
//!
//! let db = TabulonDb::open("pipeline.sqlite3").await?;
//! db.create_schema(registry.schemas()).await?;
//!
//! let report = Materializer::new(&db, &registry)
//!     .populate("Session", &make_session, &PopulateOptions::default())
//!     .await?;
//! ```

pub mod cancel;
pub mod materialize;

pub use cancel::CancellationToken;
pub use materialize::{
    populate_many, KeyFailure, MaterializeError, Materializer, PopulateJob, PopulateOptions,
    PopulateOutcome, PopulatePolicy, PopulateReport, Produce, ProduceContext, ProduceError,
};

// Re-export the schema and storage layers so a single dependency suffices.
pub use tabulon_db::{ConstraintKind, DbError, Key, Row, TabulonDb, TabulonTx, Value};
pub use tabulon_schema::{
    ColumnSpec, ColumnType, EntityDefinition, EntityRecord, EntityRegistry, EntityRole, FieldSpec,
    ForeignKey, SchemaBuilder, SchemaError, SemanticType, TableSchema,
};
