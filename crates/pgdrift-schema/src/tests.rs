use super::*;

#[test]
fn test_lenient_policy_conflates_blank_states() {
    let policy = NullPolicy::Lenient;
    assert!(policy.equivalent(&FieldValue::Absent, &FieldValue::ExplicitNull));
    assert!(policy.equivalent(&FieldValue::Absent, &FieldValue::text("")));
    assert!(policy.equivalent(&FieldValue::ExplicitNull, &FieldValue::text("")));
    assert!(!policy.equivalent(&FieldValue::Absent, &FieldValue::text("0")));
}

#[test]
fn test_null_equals_absent_policy_keeps_empty_string() {
    let policy = NullPolicy::NullEqualsAbsent;
    assert!(policy.equivalent(&FieldValue::Absent, &FieldValue::ExplicitNull));
    assert!(!policy.equivalent(&FieldValue::Absent, &FieldValue::text("")));
    assert!(!policy.equivalent(&FieldValue::ExplicitNull, &FieldValue::text("")));
    assert!(policy.equivalent(&FieldValue::text(""), &FieldValue::text("")));
}

#[test]
fn test_strict_policy_distinguishes_everything() {
    let policy = NullPolicy::Strict;
    assert!(!policy.equivalent(&FieldValue::Absent, &FieldValue::ExplicitNull));
    assert!(!policy.equivalent(&FieldValue::Absent, &FieldValue::text("")));
    assert!(policy.equivalent(&FieldValue::ExplicitNull, &FieldValue::ExplicitNull));
}

#[test]
fn test_present_values_compare_exactly() {
    for policy in [NullPolicy::Lenient, NullPolicy::NullEqualsAbsent, NullPolicy::Strict] {
        assert!(policy.equivalent(&"int".into(), &"int".into()));
        assert!(!policy.equivalent(&"int".into(), &"INT".into()));
        assert!(!policy.equivalent(
            &FieldValue::Present(Value::Integer(1)),
            &FieldValue::text("1")
        ));
    }
}

#[test]
fn test_null_policy_parse() {
    assert_eq!("lenient".parse(), Ok(NullPolicy::Lenient));
    assert_eq!("null-equals-absent".parse(), Ok(NullPolicy::NullEqualsAbsent));
    assert_eq!("strict".parse(), Ok(NullPolicy::Strict));
    assert_eq!(
        "loose".parse::<NullPolicy>(),
        Err(ParseNullPolicyError("loose".to_string()))
    );
    assert_eq!(NullPolicy::default(), NullPolicy::Lenient);
    assert_eq!(NullPolicy::NullEqualsAbsent.to_string(), "null-equals-absent");
}

#[test]
fn test_is_blank() {
    assert!(FieldValue::Absent.is_blank());
    assert!(FieldValue::ExplicitNull.is_blank());
    assert!(FieldValue::text("").is_blank());
    assert!(!FieldValue::text(" ").is_blank());
    assert!(!FieldValue::Present(Value::Bool(false)).is_blank());
}

#[test]
fn test_column_key() {
    let col = ColumnRecord::new("public", "loans", "id", "integer");
    assert_eq!(col.key(), Ok(Key::new(["public", "loans", "id"])));
    assert_eq!(col.key().unwrap().to_string(), "public.loans.id");
}

#[test]
fn test_view_and_index_keys() {
    let view = ViewRecord::new("reports", "summary", "SELECT 1");
    assert_eq!(view.key(), Ok(Key::new(["reports", "summary"])));

    let index = IndexRecord::new("public", "loans", "idx_loans_id", "USING btree (id)");
    assert_eq!(index.key(), Ok(Key::new(["public", "loans", "idx_loans_id"])));
}

#[test]
fn test_missing_key_field() {
    let mut col = ColumnRecord::new("public", "loans", "id", "integer");
    col.table = FieldValue::ExplicitNull;
    assert_eq!(
        col.key(),
        Err(MissingKeyField {
            class: ObjectClass::Column,
            field: "table",
        })
    );

    let view = ViewRecord {
        schema: "reports".into(),
        ..Default::default()
    };
    assert_eq!(
        view.key(),
        Err(MissingKeyField {
            class: ObjectClass::View,
            field: "table",
        })
    );
}

#[test]
fn test_blank_key_component_is_missing() {
    let col = ColumnRecord::new("", "loans", "id", "integer");
    assert_eq!(
        col.key(),
        Err(MissingKeyField {
            class: ObjectClass::Column,
            field: "schema",
        })
    );

    let view = ViewRecord::new("reports", "  ", "SELECT 1");
    assert_eq!(
        view.key(),
        Err(MissingKeyField {
            class: ObjectClass::View,
            field: "table",
        })
    );
}

#[test]
fn test_key_ordering_is_component_wise() {
    let mut keys = vec![
        Key::new(["public", "b", "a"]),
        Key::new(["public", "a", "z"]),
        Key::new(["Public", "z", "z"]),
        Key::new(["public", "a", "b"]),
    ];
    keys.sort();
    assert_eq!(
        keys,
        vec![
            Key::new(["Public", "z", "z"]),
            Key::new(["public", "a", "b"]),
            Key::new(["public", "a", "z"]),
            Key::new(["public", "b", "a"]),
        ]
    );
}

#[test]
fn test_set_routes_unknown_fields_to_extra() {
    let col = ColumnRecord::from_fields([
        ("schema", FieldValue::text("public")),
        ("table", FieldValue::text("loans")),
        ("column_name", FieldValue::text("id")),
        ("ordinal_position", FieldValue::Present(Value::Integer(1))),
    ]);
    assert_eq!(col.schema, FieldValue::text("public"));
    assert_eq!(col.data_type, FieldValue::Absent);
    assert_eq!(
        col.field("ordinal_position"),
        &FieldValue::Present(Value::Integer(1))
    );
    assert_eq!(col.field("no_such_field"), &FieldValue::Absent);
    assert_eq!(
        col.field_names(),
        vec![
            "schema",
            "table",
            "column_name",
            "data_type",
            "is_nullable",
            "column_default",
            "ordinal_position",
        ]
    );
}

#[test]
fn test_snapshot_push_dispatches_by_class() {
    let snapshot = Snapshot::new("staging")
        .with(ColumnRecord::new("public", "loans", "id", "integer"))
        .with(ViewRecord::new("reports", "summary", "SELECT 1"))
        .with(IndexRecord::new("public", "loans", "idx", "USING btree (id)"))
        .with(ColumnRecord::new("public", "loans", "amount", "numeric"));

    assert_eq!(snapshot.columns.len(), 2);
    assert_eq!(snapshot.views.len(), 1);
    assert_eq!(snapshot.indexes.len(), 1);
    assert_eq!(snapshot.record_count(), 4);
    assert_eq!(snapshot.views.class(), ObjectClass::View);
}

#[test]
fn test_record_variant() {
    let record = Record::from(IndexRecord::new("public", "loans", "idx", "USING btree (id)"));
    assert_eq!(record.class(), ObjectClass::Index);
    assert_eq!(record.field("index_def").as_text(), Some("USING btree (id)"));
    assert_eq!(record.key(), Ok(Key::new(["public", "loans", "idx"])));
}

#[test]
fn test_field_value_display() {
    assert_eq!(FieldValue::text("int").to_string(), "int");
    assert_eq!(FieldValue::text("").to_string(), "''");
    assert_eq!(FieldValue::ExplicitNull.to_string(), "NULL");
    assert_eq!(FieldValue::Absent.to_string(), "(absent)");
}
