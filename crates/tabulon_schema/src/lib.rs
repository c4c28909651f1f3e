//! Schema derivation for Tabulon.
//!
//! An entity is declared as an ordered list of fields with semantic types,
//! plus an ordered list of parent entities. From that declaration this crate
//! derives a relational [`TableSchema`]: resolved columns, a composite primary
//! key, and one foreign-key constraint per parent.
//!
//! The central rule is composite key propagation: a child entity's primary key
//! contains every primary-key column of every parent, and each inherited
//! column simultaneously serves as a foreign key back to that parent. Parent
//! graphs form a DAG by construction, because an entity can only reference
//! parents that are already registered.
//!
//! Schema building runs once at startup, single-threaded, before any
//! population begins. A malformed declaration fails the build and registers
//! nothing - there is no partially registered schema.
//!
//! # Modules
//!
//! - [`types`]: semantic value types and their storage column types
//! - [`entity`]: field specs and entity declarations
//! - [`table`]: the derived table schema (columns, keys, constraints)
//! - [`builder`]: the derivation algorithm
//! - [`registry`]: process-wide entity name -> schema map

pub mod builder;
pub mod entity;
pub mod error;
pub mod registry;
pub mod table;
pub mod types;

pub use builder::SchemaBuilder;
pub use entity::{EntityDefinition, EntityRole, FieldSpec};
pub use error::{Result, SchemaError};
pub use registry::{EntityRecord, EntityRegistry};
pub use table::{ColumnSpec, ForeignKey, TableSchema};
pub use types::{ColumnType, SemanticType};
