//! Schema derivation tests: composite key propagation across parent DAGs.

use tabulon_schema::{
    EntityDefinition, EntityRegistry, FieldSpec, SchemaBuilder, SchemaError, SemanticType,
};

fn recording() -> EntityDefinition {
    EntityDefinition::manual("Recording")
        .field(FieldSpec::required("recording_id", SemanticType::Integer))
        .field(FieldSpec::primary("recording_date", SemanticType::Text))
        .field(FieldSpec::required("duration", SemanticType::Float))
}

fn subject() -> EntityDefinition {
    EntityDefinition::manual("Subject")
        .field(FieldSpec::primary("subject_id", SemanticType::Integer))
        .field(FieldSpec::required("name", SemanticType::Text))
}

fn session() -> EntityDefinition {
    EntityDefinition::computed("Session")
        .parent("Recording")
        .parent("Subject")
        .field(FieldSpec::primary("session_id", SemanticType::Integer))
        .field(FieldSpec::required("session_date", SemanticType::Text))
}

#[test]
fn test_child_primary_key_is_union_of_parent_keys_plus_own() {
    let mut registry = EntityRegistry::new();
    registry.define(&recording()).unwrap();
    registry.define(&subject()).unwrap();
    let record = registry.define(&session()).unwrap();

    assert_eq!(record.schema.table, "session");
    // Inherited key columns first, in parent order, then own primary fields.
    assert_eq!(
        record.schema.primary_key,
        vec!["recording_date", "subject_id", "session_id"]
    );
    // Column order: inherited first, then own fields in declaration order.
    let names: Vec<&str> = record
        .schema
        .columns
        .iter()
        .map(|c| c.name.as_str())
        .collect();
    assert_eq!(
        names,
        vec!["recording_date", "subject_id", "session_id", "session_date"]
    );
}

#[test]
fn test_one_foreign_key_per_parent_covering_its_full_key() {
    let mut registry = EntityRegistry::new();
    registry.define(&recording()).unwrap();
    registry.define(&subject()).unwrap();
    let record = registry.define(&session()).unwrap();

    let fks = &record.schema.foreign_keys;
    assert_eq!(fks.len(), 2);
    assert_eq!(fks[0].referenced_table, "recording");
    assert_eq!(fks[0].columns, vec!["recording_date"]);
    assert_eq!(fks[0].referenced_columns, vec!["recording_date"]);
    assert_eq!(fks[1].referenced_table, "subject");
    assert_eq!(fks[1].columns, vec!["subject_id"]);

    assert_eq!(
        record.schema.inherited_key_columns(),
        vec!["recording_date", "subject_id"]
    );
}

#[test]
fn test_inherited_columns_carry_parent_storage_types() {
    let mut registry = EntityRegistry::new();
    registry.define(&recording()).unwrap();
    registry.define(&subject()).unwrap();
    let record = registry.define(&session()).unwrap();

    let date = record.schema.column("recording_date").unwrap();
    assert_eq!(date.column_type.as_sql(), "TEXT");
    assert!(date.primary && !date.nullable);

    let id = record.schema.column("subject_id").unwrap();
    assert_eq!(id.column_type.as_sql(), "INTEGER");
}

#[test]
fn test_composite_key_propagates_through_grandparent() {
    let mut registry = EntityRegistry::new();
    registry.define(&recording()).unwrap();
    registry.define(&subject()).unwrap();
    registry.define(&session()).unwrap();

    let pose = EntityDefinition::computed("Pose")
        .parent("Session")
        .field(FieldSpec::required("frame", SemanticType::Integer));
    let record = registry.define(&pose).unwrap();

    // Pose inherits Session's full composite key, which itself carries both
    // grandparents' keys.
    assert_eq!(
        record.schema.primary_key,
        vec!["recording_date", "subject_id", "session_id"]
    );
    assert_eq!(record.schema.foreign_keys.len(), 1);
    assert_eq!(record.schema.foreign_keys[0].referenced_table, "session");
    assert_eq!(
        record.schema.foreign_keys[0].columns,
        vec!["recording_date", "subject_id", "session_id"]
    );
}

#[test]
fn test_rebuild_of_unchanged_definition_is_identical() {
    let mut registry = EntityRegistry::new();
    registry.define(&recording()).unwrap();
    registry.define(&subject()).unwrap();

    let def = session();
    let first = SchemaBuilder::build(&registry, &def).unwrap();
    let second = SchemaBuilder::build(&registry, &def).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_parent_key_name_clash_is_an_error_not_a_merge() {
    let mut registry = EntityRegistry::new();
    registry
        .define(
            &EntityDefinition::manual("Alpha")
                .field(FieldSpec::primary("shared_id", SemanticType::Integer)),
        )
        .unwrap();
    registry
        .define(
            &EntityDefinition::manual("Beta")
                .field(FieldSpec::primary("shared_id", SemanticType::Integer)),
        )
        .unwrap();

    let child = EntityDefinition::computed("Child")
        .parent("Alpha")
        .parent("Beta");
    let err = registry.define(&child).unwrap_err();
    assert!(matches!(
        err,
        SchemaError::CompositeKeyConflict { ref column, .. } if column == "shared_id"
    ));
    // Nothing partially registered.
    assert!(registry.get("Child").is_err());
}

#[test]
fn test_own_field_clashing_with_inherited_key_is_a_conflict() {
    let mut registry = EntityRegistry::new();
    registry.define(&subject()).unwrap();

    let child = EntityDefinition::computed("Visit")
        .parent("Subject")
        .field(FieldSpec::required("subject_id", SemanticType::Integer));
    assert!(matches!(
        registry.define(&child),
        Err(SchemaError::CompositeKeyConflict { .. })
    ));
}

#[test]
fn test_nullable_primary_field_rejected() {
    let mut registry = EntityRegistry::new();
    let def = EntityDefinition::manual("Bad").field(FieldSpec {
        name: "id".to_string(),
        semantic: SemanticType::Integer,
        nullable: true,
        primary: true,
    });
    assert!(matches!(
        registry.define(&def),
        Err(SchemaError::InvalidFieldSpec { .. })
    ));
}

#[test]
fn test_unknown_parent_rejected() {
    let mut registry = EntityRegistry::new();
    let def = EntityDefinition::computed("Orphan").parent("Missing");
    assert!(matches!(
        registry.define(&def),
        Err(SchemaError::UnknownEntity(ref name)) if name == "Missing"
    ));
}

#[test]
fn test_unsupported_type_registers_no_partial_schema() {
    let mut registry = EntityRegistry::new();
    let def = EntityDefinition::manual("Partial")
        .field(FieldSpec::primary("id", SemanticType::Integer))
        .field(FieldSpec::required(
            "status",
            SemanticType::Enum { values: vec![] },
        ));
    assert!(matches!(
        registry.define(&def),
        Err(SchemaError::UnsupportedType(_))
    ));
    assert!(registry.is_empty());
}

#[test]
fn test_keyless_table_is_legal() {
    let mut registry = EntityRegistry::new();
    let def = EntityDefinition::manual("EventLog")
        .field(FieldSpec::required("message", SemanticType::Text))
        .field(FieldSpec::required("at", SemanticType::Timestamp));
    let record = registry.define(&def).unwrap();
    assert!(record.schema.primary_key.is_empty());
}

#[test]
fn test_keyless_parent_rejected() {
    let mut registry = EntityRegistry::new();
    registry
        .define(
            &EntityDefinition::manual("EventLog")
                .field(FieldSpec::required("message", SemanticType::Text)),
        )
        .unwrap();

    // A keyless parent has no key columns to inherit; the child would end up
    // with an empty foreign key and unbuildable key queries.
    let child = EntityDefinition::computed("Digest")
        .parent("EventLog")
        .field(FieldSpec::required("summary", SemanticType::Text));
    let err = registry.define(&child).unwrap_err();
    assert!(matches!(
        err,
        SchemaError::KeylessParent { ref parent, .. } if parent == "EventLog"
    ));
    assert!(registry.get("Digest").is_err());
}
