//! SQL synthesis - turn deltas into statements that reconcile the target.
//!
//! Generation is additive only:
//!
//! | class    | added in source           | differing            |
//! |----------|---------------------------|----------------------|
//! | `column` | `ALTER TABLE .. ADD COLUMN` | reported, no SQL   |
//! | `view`   | `CREATE OR REPLACE VIEW`  | `CREATE OR REPLACE VIEW` |
//! | `index`  | `CREATE INDEX`            | reported, no SQL     |
//!
//! Keys that exist only in the target never produce a `DROP`; they are listed
//! as warnings so an operator can decide what to do with them.
//!
//! Statements are grouped by class (columns, views, indexes) and follow key
//! order within a class.

use crate::{DeltaEntry, DiffError, Side};
use pgdrift_schema::{
    ColumnRecord, FieldValue, IndexRecord, Key, MissingKeyField, ObjectClass, ViewRecord,
};
use std::fmt;

/// A generated SQL statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub class: ObjectClass,
    pub key: Key,
    /// The statement text, terminated with `;`.
    pub sql: String,
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}

/// A difference, or a problem, that did not turn into a statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Warning {
    /// A record was excluded from the comparison.
    MissingKeyField {
        side: Side,
        position: usize,
        error: MissingKeyField,
    },
    /// A whole class could not be compared.
    ClassFailed(DiffError),
    /// The key exists only in the target. Nothing is dropped.
    RemovedOnRight { class: ObjectClass, key: Key },
    /// The key differs between source and target but no statement is
    /// generated for that kind of change.
    Unsupported {
        class: ObjectClass,
        key: Key,
        fields: Vec<String>,
    },
    /// The source record lacks the field the statement would be built from.
    MissingDefinition {
        class: ObjectClass,
        key: Key,
        field: &'static str,
    },
}

impl Warning {
    pub fn class(&self) -> ObjectClass {
        match self {
            Warning::MissingKeyField { error, .. } => error.class,
            Warning::ClassFailed(DiffError::DuplicateKey { class, .. }) => *class,
            Warning::RemovedOnRight { class, .. }
            | Warning::Unsupported { class, .. }
            | Warning::MissingDefinition { class, .. } => *class,
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::MissingKeyField {
                side,
                position,
                error,
            } => write!(
                f,
                "skipped {} record #{} in {} snapshot: missing key field `{}`",
                error.class, position, side, error.field
            ),
            Warning::ClassFailed(err) => write!(f, "comparison aborted: {}", err),
            Warning::RemovedOnRight { class, key } => {
                write!(f, "{} {} exists only in the target (not dropped)", class, key)
            }
            Warning::Unsupported { class, key, fields } => write!(
                f,
                "{} {} differs in {} (no statement generated)",
                class,
                key,
                fields.join(", ")
            ),
            Warning::MissingDefinition { class, key, field } => write!(
                f,
                "{} {} has no {} in the source (no statement generated)",
                class, key, field
            ),
        }
    }
}

/// Statements plus everything that was left out of them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Synthesis {
    pub statements: Vec<Statement>,
    pub warnings: Vec<Warning>,
}

impl Synthesis {
    /// Returns true if there is nothing to apply and nothing to report.
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty() && self.warnings.is_empty()
    }

    /// Count statements generated for one class.
    pub fn statement_count(&self, class: ObjectClass) -> usize {
        self.statements.iter().filter(|s| s.class == class).count()
    }

    /// Generate SQL for all statements, one per line.
    pub fn to_sql(&self) -> String {
        let mut sql = String::new();
        for statement in &self.statements {
            sql.push_str(&statement.sql);
            sql.push('\n');
        }
        sql
    }
}

/// Translate column, view and index deltas into statements.
pub fn synthesize(
    columns: &[DeltaEntry<ColumnRecord>],
    views: &[DeltaEntry<ViewRecord>],
    indexes: &[DeltaEntry<IndexRecord>],
) -> Synthesis {
    let mut synth = Synthesizer::default();
    synth.columns(columns);
    synth.views(views);
    synth.indexes(indexes);
    synth.finish()
}

/// Incremental form of [`synthesize`], fed one class at a time in emission order.
#[derive(Debug, Default)]
pub(crate) struct Synthesizer {
    out: Synthesis,
}

impl Synthesizer {
    pub(crate) fn warn(&mut self, warning: Warning) {
        self.out.warnings.push(warning);
    }

    pub(crate) fn columns(&mut self, entries: &[DeltaEntry<ColumnRecord>]) {
        for entry in entries {
            match entry {
                DeltaEntry::AddedOnRight { key, source } => {
                    let Some(data_type) = definition(&source.data_type) else {
                        self.warn(Warning::MissingDefinition {
                            class: ObjectClass::Column,
                            key: key.clone(),
                            field: "data_type",
                        });
                        continue;
                    };
                    let [schema, table, column] = key_parts(key);
                    self.emit(
                        ObjectClass::Column,
                        key,
                        format!(
                            "ALTER TABLE {}.{} ADD COLUMN {} {};",
                            schema, table, column, data_type
                        ),
                    );
                }
                DeltaEntry::RemovedOnRight { key, .. } => self.removed(ObjectClass::Column, key),
                DeltaEntry::Differing { key, changes, .. } => self.warn(Warning::Unsupported {
                    class: ObjectClass::Column,
                    key: key.clone(),
                    fields: changes.iter().map(|c| c.field.clone()).collect(),
                }),
            }
        }
    }

    pub(crate) fn views(&mut self, entries: &[DeltaEntry<ViewRecord>]) {
        for entry in entries {
            let (key, source) = match entry {
                DeltaEntry::AddedOnRight { key, source }
                | DeltaEntry::Differing { key, source, .. } => (key, source),
                DeltaEntry::RemovedOnRight { key, .. } => {
                    self.removed(ObjectClass::View, key);
                    continue;
                }
            };

            let Some(body) = definition(&source.view_definition) else {
                self.warn(Warning::MissingDefinition {
                    class: ObjectClass::View,
                    key: key.clone(),
                    field: "view_definition",
                });
                continue;
            };
            let [schema, view, _] = key_parts(key);
            self.emit(
                ObjectClass::View,
                key,
                format!("CREATE OR REPLACE VIEW {}.{} AS {};", schema, view, body),
            );
        }
    }

    pub(crate) fn indexes(&mut self, entries: &[DeltaEntry<IndexRecord>]) {
        for entry in entries {
            match entry {
                DeltaEntry::AddedOnRight { key, source } => {
                    let Some(def) = definition(&source.index_def) else {
                        self.warn(Warning::MissingDefinition {
                            class: ObjectClass::Index,
                            key: key.clone(),
                            field: "index_def",
                        });
                        continue;
                    };
                    let sql = if is_create_statement(def) {
                        format!("{};", def)
                    } else {
                        let [schema, table, index_name] = key_parts(key);
                        format!("CREATE INDEX {} ON {}.{} {};", index_name, schema, table, def)
                    };
                    self.emit(ObjectClass::Index, key, sql);
                }
                DeltaEntry::RemovedOnRight { key, .. } => self.removed(ObjectClass::Index, key),
                DeltaEntry::Differing { key, changes, .. } => self.warn(Warning::Unsupported {
                    class: ObjectClass::Index,
                    key: key.clone(),
                    fields: changes.iter().map(|c| c.field.clone()).collect(),
                }),
            }
        }
    }

    pub(crate) fn finish(self) -> Synthesis {
        tracing::debug!(
            statements = self.out.statements.len(),
            warnings = self.out.warnings.len(),
            "synthesized statements"
        );
        self.out
    }

    fn emit(&mut self, class: ObjectClass, key: &Key, sql: String) {
        self.out.statements.push(Statement {
            class,
            key: key.clone(),
            sql,
        });
    }

    fn removed(&mut self, class: ObjectClass, key: &Key) {
        self.warn(Warning::RemovedOnRight {
            class,
            key: key.clone(),
        });
    }
}

/// The first three key components; missing ones are empty.
fn key_parts(key: &Key) -> [&str; 3] {
    [0, 1, 2].map(|i| key.get(i).unwrap_or_default())
}

/// A definition body with trailing whitespace and terminators removed.
///
/// Returns `None` when nothing usable is left.
fn definition(value: &FieldValue) -> Option<&str> {
    let body = value.as_text()?.trim().trim_end_matches(';').trim_end();
    (!body.is_empty()).then_some(body)
}

/// Whether an index definition is already a full `CREATE ... INDEX` statement,
/// as rendered by `pg_get_indexdef`.
fn is_create_statement(def: &str) -> bool {
    def.split_whitespace()
        .next()
        .is_some_and(|word| word.eq_ignore_ascii_case("CREATE"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FieldChange;

    fn added_column(table: &str, name: &str, data_type: &str) -> DeltaEntry<ColumnRecord> {
        DeltaEntry::AddedOnRight {
            key: Key::new(["loans", table, name]),
            source: ColumnRecord::new("loans", table, name, data_type),
        }
    }

    fn added_view(schema: &str, name: &str, body: &str) -> DeltaEntry<ViewRecord> {
        DeltaEntry::AddedOnRight {
            key: Key::new([schema, name]),
            source: ViewRecord::new(schema, name, body),
        }
    }

    fn added_index(name: &str, def: &str) -> DeltaEntry<IndexRecord> {
        DeltaEntry::AddedOnRight {
            key: Key::new(["public", "loans", name]),
            source: IndexRecord::new("public", "loans", name, def),
        }
    }

    #[test]
    fn test_add_column_statement() {
        let out = synthesize(&[added_column("loans", "id", "int")], &[], &[]);
        assert_eq!(out.to_sql(), "ALTER TABLE loans.loans ADD COLUMN id int;\n");
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_add_column_without_data_type_is_reported() {
        let mut entry = added_column("loans", "id", "int");
        if let DeltaEntry::AddedOnRight { source, .. } = &mut entry {
            source.data_type = FieldValue::ExplicitNull;
        }
        let out = synthesize(&[entry], &[], &[]);
        assert!(out.statements.is_empty());
        assert_eq!(
            out.warnings,
            vec![Warning::MissingDefinition {
                class: ObjectClass::Column,
                key: Key::new(["loans", "loans", "id"]),
                field: "data_type",
            }]
        );
    }

    #[test]
    fn test_add_column_with_whitespace_data_type_is_reported() {
        let out = synthesize(&[added_column("loans", "id", "  ")], &[], &[]);
        assert!(out.statements.is_empty());
        assert_eq!(
            out.warnings,
            vec![Warning::MissingDefinition {
                class: ObjectClass::Column,
                key: Key::new(["loans", "loans", "id"]),
                field: "data_type",
            }]
        );
    }

    #[test]
    fn test_add_column_data_type_is_trimmed() {
        let out = synthesize(&[added_column("loans", "id", " bigint \n")], &[], &[]);
        assert_eq!(out.to_sql(), "ALTER TABLE loans.loans ADD COLUMN id bigint;\n");
    }

    #[test]
    fn test_differing_column_is_reported_not_altered() {
        let entry = DeltaEntry::Differing {
            key: Key::new(["loans", "loans", "id"]),
            source: ColumnRecord::new("loans", "loans", "id", "bigint"),
            target: ColumnRecord::new("loans", "loans", "id", "int"),
            changes: vec![FieldChange {
                field: "data_type".to_string(),
                source: FieldValue::text("bigint"),
                target: FieldValue::text("int"),
            }],
        };
        let out = synthesize(&[entry], &[], &[]);
        assert!(out.statements.is_empty());
        assert_eq!(
            out.warnings[0].to_string(),
            "column loans.loans.id differs in data_type (no statement generated)"
        );
    }

    #[test]
    fn test_view_statement_uses_source_definition() {
        let entry = DeltaEntry::Differing {
            key: Key::new(["reports", "summary"]),
            source: ViewRecord::new(
                "reports",
                "summary",
                " SELECT count(*) AS n\n   FROM loans.loans;",
            ),
            target: ViewRecord::new("reports", "summary", " SELECT 0 AS n;"),
            changes: vec![],
        };
        let out = synthesize(&[], &[entry], &[]);
        insta::assert_snapshot!(out.to_sql(), @r"
        CREATE OR REPLACE VIEW reports.summary AS SELECT count(*) AS n
           FROM loans.loans;
        ");
    }

    #[test]
    fn test_view_definition_terminator_not_doubled() {
        let out = synthesize(&[], &[added_view("reports", "v", "SELECT 1;  \n")], &[]);
        assert_eq!(out.statements[0].sql, "CREATE OR REPLACE VIEW reports.v AS SELECT 1;");
    }

    #[test]
    fn test_view_without_definition_is_reported() {
        let mut entry = added_view("reports", "hidden", "");
        if let DeltaEntry::AddedOnRight { source, .. } = &mut entry {
            source.view_definition = FieldValue::ExplicitNull;
        }
        let out = synthesize(&[], &[entry], &[]);
        assert!(out.statements.is_empty());
        assert_eq!(
            out.warnings[0].to_string(),
            "view reports.hidden has no view_definition in the source (no statement generated)"
        );
    }

    #[test]
    fn test_differing_index_is_reported_not_recreated() {
        let entry = DeltaEntry::Differing {
            key: Key::new(["public", "loans", "idx_loans_id"]),
            source: IndexRecord::new(
                "public",
                "loans",
                "idx_loans_id",
                "CREATE UNIQUE INDEX idx_loans_id ON public.loans USING btree (id)",
            ),
            target: IndexRecord::new(
                "public",
                "loans",
                "idx_loans_id",
                "CREATE INDEX idx_loans_id ON public.loans USING btree (id)",
            ),
            changes: vec![FieldChange {
                field: "index_def".to_string(),
                source: FieldValue::text(
                    "CREATE UNIQUE INDEX idx_loans_id ON public.loans USING btree (id)",
                ),
                target: FieldValue::text(
                    "CREATE INDEX idx_loans_id ON public.loans USING btree (id)",
                ),
            }],
        };
        let out = synthesize(&[], &[], &[entry]);
        assert!(out.statements.is_empty());
        assert_eq!(
            out.warnings,
            vec![Warning::Unsupported {
                class: ObjectClass::Index,
                key: Key::new(["public", "loans", "idx_loans_id"]),
                fields: vec!["index_def".to_string()],
            }]
        );
        assert_eq!(out.warnings[0].class(), ObjectClass::Index);
    }

    #[test]
    fn test_index_fragment_uses_template() {
        let out = synthesize(&[], &[], &[added_index("idx_loans_id", "USING btree (id)")]);
        assert_eq!(
            out.to_sql(),
            "CREATE INDEX idx_loans_id ON public.loans USING btree (id);\n"
        );
    }

    #[test]
    fn test_index_full_definition_emitted_verbatim() {
        let out = synthesize(
            &[],
            &[],
            &[added_index(
                "loans_pkey",
                "CREATE UNIQUE INDEX loans_pkey ON public.loans USING btree (id)",
            )],
        );
        assert_eq!(
            out.to_sql(),
            "CREATE UNIQUE INDEX loans_pkey ON public.loans USING btree (id);\n"
        );
    }

    #[test]
    fn test_removed_entries_never_drop() {
        let columns = vec![DeltaEntry::RemovedOnRight {
            key: Key::new(["loans", "loans", "legacy"]),
            target: ColumnRecord::new("loans", "loans", "legacy", "text"),
        }];
        let views = vec![DeltaEntry::RemovedOnRight {
            key: Key::new(["reports", "old"]),
            target: ViewRecord::new("reports", "old", "SELECT 1"),
        }];
        let indexes = vec![DeltaEntry::RemovedOnRight {
            key: Key::new(["public", "loans", "idx_extra"]),
            target: IndexRecord::new("public", "loans", "idx_extra", "USING btree (note)"),
        }];

        let out = synthesize(&columns, &views, &indexes);
        assert!(out.statements.is_empty());
        let warnings: Vec<String> = out.warnings.iter().map(|w| w.to_string()).collect();
        insta::assert_debug_snapshot!(warnings, @r#"
        [
            "column loans.loans.legacy exists only in the target (not dropped)",
            "view reports.old exists only in the target (not dropped)",
            "index public.loans.idx_extra exists only in the target (not dropped)",
        ]
        "#);
    }

    #[test]
    fn test_statements_grouped_by_class() {
        let out = synthesize(
            &[added_column("loans", "amount", "numeric"), added_column("loans", "id", "int")],
            &[added_view("reports", "summary", "SELECT 1")],
            &[added_index("idx_loans_id", "USING btree (id)")],
        );
        insta::assert_snapshot!(out.to_sql(), @r"
        ALTER TABLE loans.loans ADD COLUMN amount numeric;
        ALTER TABLE loans.loans ADD COLUMN id int;
        CREATE OR REPLACE VIEW reports.summary AS SELECT 1;
        CREATE INDEX idx_loans_id ON public.loans USING btree (id);
        ");
        assert_eq!(out.statement_count(ObjectClass::Column), 2);
        assert_eq!(out.statement_count(ObjectClass::View), 1);
        assert_eq!(out.statement_count(ObjectClass::Index), 1);
    }
}
