use pgdrift::{
    ColumnRecord, DeltaEntry, IndexRecord, NullPolicy, ObjectClass, Snapshot, ViewRecord, Warning,
    compare,
};
use proptest::prelude::*;

fn ident() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["a", "b", "loans", "reports", "Z"]).prop_map(str::to_string)
}

fn column() -> impl Strategy<Value = ColumnRecord> {
    (
        ident(),
        ident(),
        ident(),
        prop::sample::select(vec!["int", "bigint", "text", ""]),
        prop::option::of(prop::sample::select(vec!["", "0", "now()"])),
    )
        .prop_map(|(schema, table, name, data_type, default)| {
            ColumnRecord::new(&schema, &table, &name, data_type).column_default(default)
        })
}

fn view() -> impl Strategy<Value = ViewRecord> {
    (ident(), ident(), prop::sample::select(vec!["SELECT 1", "SELECT 2;", ""]))
        .prop_map(|(schema, name, body)| ViewRecord::new(&schema, &name, body))
}

fn index() -> impl Strategy<Value = IndexRecord> {
    (ident(), ident(), ident(), prop::sample::select(vec!["USING btree (id)", "USING hash (a)"]))
        .prop_map(|(schema, table, name, def)| IndexRecord::new(&schema, &table, &name, def))
}

fn snapshot(label: &'static str) -> impl Strategy<Value = Snapshot> {
    (
        prop::collection::vec(column(), 0..8),
        prop::collection::vec(view(), 0..4),
        prop::collection::vec(index(), 0..4),
    )
        .prop_map(move |(columns, views, indexes)| Snapshot {
            label: label.to_string(),
            columns: columns.into(),
            views: views.into(),
            indexes: indexes.into(),
        })
}

fn policy() -> impl Strategy<Value = NullPolicy> {
    prop::sample::select(vec![
        NullPolicy::Lenient,
        NullPolicy::NullEqualsAbsent,
        NullPolicy::Strict,
    ])
}

proptest! {
    #[test]
    fn plan_is_deterministic(source in snapshot("a"), target in snapshot("b"), policy in policy()) {
        let first = compare(&source, &target, policy).plan();
        let second = compare(&source, &target, policy).plan();
        prop_assert_eq!(first.to_sql(), second.to_sql());
        prop_assert_eq!(first, second);
    }

    #[test]
    fn never_drops(source in snapshot("a"), target in snapshot("b"), policy in policy()) {
        let plan = compare(&source, &target, policy).plan();
        for statement in &plan.statements {
            prop_assert!(!statement.sql.to_uppercase().contains("DROP"));
            prop_assert!(statement.sql.ends_with(';'));
        }
    }

    #[test]
    fn removed_keys_become_warnings(source in snapshot("a"), target in snapshot("b")) {
        let comparison = compare(&source, &target, NullPolicy::Lenient);
        let plan = comparison.plan();
        if let Ok(columns) = &comparison.columns {
            for entry in columns.removed() {
                let DeltaEntry::RemovedOnRight { key, .. } = entry else { unreachable!() };
                let warned = plan.warnings.iter().any(|w| matches!(
                    w,
                    Warning::RemovedOnRight { class: ObjectClass::Column, key: k } if k == key
                ));
                prop_assert!(warned);
                prop_assert!(!plan
                    .statements
                    .iter()
                    .any(|s| s.class == ObjectClass::Column && &s.key == key));
            }
        }
    }

    #[test]
    fn snapshot_against_itself_is_clean(source in snapshot("a"), policy in policy()) {
        let comparison = compare(&source, &source, policy);
        for result in [
            comparison.columns.as_ref().map(|d| d.entries.len()),
            comparison.views.as_ref().map(|d| d.entries.len()),
            comparison.indexes.as_ref().map(|d| d.entries.len()),
        ] {
            // Duplicate keys fail the class; otherwise nothing may differ.
            if let Ok(len) = result {
                prop_assert_eq!(len, 0);
            }
        }
    }
}
