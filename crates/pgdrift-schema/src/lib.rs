//! Schema metadata record types for pgdrift.
//!
//! This crate contains the data model shared by the differ, the SQL
//! synthesizer and the snapshot stores:
//!
//! - [`Value`] and the three-state [`FieldValue`]
//! - [`NullPolicy`], which decides when two field values count as equal
//! - one typed record per object class ([`ColumnRecord`], [`ViewRecord`],
//!   [`IndexRecord`]) behind the [`SchemaObject`] trait
//! - [`RecordSet`] and [`Snapshot`], the captured metadata of one database
//!
//! # Keys
//!
//! Every object class declares the fields that identify a record within a
//! record set:
//!
//! | class    | key                              |
//! |----------|----------------------------------|
//! | `column` | `(schema, table, column_name)`   |
//! | `view`   | `(schema, table)`                |
//! | `index`  | `(schema, table, index_name)`    |

use indexmap::IndexMap;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

#[cfg(test)]
mod tests;

/// A scalar metadata value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Value {
    Text(String),
    Integer(i64),
    Bool(bool),
}

impl Value {
    /// Returns the string if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => write!(f, "{}", s),
            Value::Integer(n) => write!(f, "{}", n),
            Value::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

/// The value of one field in a metadata record.
///
/// A snapshot source can return a column holding `NULL` ([`ExplicitNull`])
/// or not return the column at all ([`Absent`]). Whether those two states
/// and an empty string are told apart is decided by a [`NullPolicy`].
///
/// [`ExplicitNull`]: FieldValue::ExplicitNull
/// [`Absent`]: FieldValue::Absent
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum FieldValue {
    Present(Value),
    ExplicitNull,
    #[default]
    Absent,
}

impl FieldValue {
    /// A present text value.
    pub fn text(s: impl Into<String>) -> Self {
        FieldValue::Present(Value::Text(s.into()))
    }

    /// `Some` becomes [`FieldValue::Present`], `None` becomes
    /// [`FieldValue::ExplicitNull`].
    pub fn from_option<T: Into<Value>>(value: Option<T>) -> Self {
        match value {
            Some(v) => FieldValue::Present(v.into()),
            None => FieldValue::ExplicitNull,
        }
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            FieldValue::Present(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        self.as_value().and_then(Value::as_text)
    }

    /// True for `Absent`, `ExplicitNull` and the empty string: the values
    /// that carry nothing a SQL statement could be built from.
    pub fn is_blank(&self) -> bool {
        match self {
            FieldValue::Absent | FieldValue::ExplicitNull => true,
            FieldValue::Present(Value::Text(s)) => s.is_empty(),
            FieldValue::Present(_) => false,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Present(Value::Text(s)) if s.is_empty() => write!(f, "''"),
            FieldValue::Present(v) => write!(f, "{}", v),
            FieldValue::ExplicitNull => write!(f, "NULL"),
            FieldValue::Absent => write!(f, "(absent)"),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::text(s)
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::text(s)
    }
}

impl From<Option<String>> for FieldValue {
    fn from(value: Option<String>) -> Self {
        FieldValue::from_option(value)
    }
}

impl From<Option<&str>> for FieldValue {
    fn from(value: Option<&str>) -> Self {
        FieldValue::from_option(value)
    }
}

/// How missing and null field values compare.
///
/// The default, [`NullPolicy::Lenient`], treats a missing field, an explicit
/// `NULL` and an empty string as the same blank placeholder. This hides the
/// difference between "no default" and "an empty default", so the stricter
/// policies exist for callers that need to see it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NullPolicy {
    /// `Absent == ExplicitNull == ''`.
    #[default]
    Lenient,
    /// `Absent == ExplicitNull`, but `''` is a real value.
    NullEqualsAbsent,
    /// All three states are distinct.
    Strict,
}

impl NullPolicy {
    /// Normalized equality between two field values.
    ///
    /// Present values compare exactly (text is case-sensitive).
    pub fn equivalent(self, a: &FieldValue, b: &FieldValue) -> bool {
        use FieldValue::{Absent, ExplicitNull};
        match self {
            NullPolicy::Lenient => (a.is_blank() && b.is_blank()) || a == b,
            NullPolicy::NullEqualsAbsent => match (a, b) {
                (Absent | ExplicitNull, Absent | ExplicitNull) => true,
                _ => a == b,
            },
            NullPolicy::Strict => a == b,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NullPolicy::Lenient => "lenient",
            NullPolicy::NullEqualsAbsent => "null-equals-absent",
            NullPolicy::Strict => "strict",
        }
    }
}

impl fmt::Display for NullPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown [`NullPolicy`] name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown null policy `{0}` (expected lenient, null-equals-absent or strict)")]
pub struct ParseNullPolicyError(pub String);

impl FromStr for NullPolicy {
    type Err = ParseNullPolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lenient" => Ok(NullPolicy::Lenient),
            "null-equals-absent" => Ok(NullPolicy::NullEqualsAbsent),
            "strict" => Ok(NullPolicy::Strict),
            other => Err(ParseNullPolicyError(other.to_string())),
        }
    }
}

/// The kind of schema object a record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ObjectClass {
    Column,
    View,
    Index,
}

impl ObjectClass {
    /// All classes, in the order statements are emitted.
    pub const ALL: [ObjectClass; 3] = [ObjectClass::Column, ObjectClass::View, ObjectClass::Index];

    /// Names of the fields that identify a record of this class.
    pub fn key_fields(self) -> &'static [&'static str] {
        match self {
            ObjectClass::Column => &["schema", "table", "column_name"],
            ObjectClass::View => &["schema", "table"],
            ObjectClass::Index => &["schema", "table", "index_name"],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ObjectClass::Column => "column",
            ObjectClass::View => "view",
            ObjectClass::Index => "index",
        }
    }
}

impl fmt::Display for ObjectClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The identity of a record within a record set.
///
/// Keys order component-wise; strings compare by codepoint.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Key(Vec<String>);

impl Key {
    pub fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Key(parts.into_iter().map(Into::into).collect())
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

/// A record does not carry a usable value for one of its key fields.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{class} record is missing key field `{field}`")]
pub struct MissingKeyField {
    pub class: ObjectClass,
    pub field: &'static str,
}

static ABSENT: FieldValue = FieldValue::Absent;

/// A typed metadata record of one object class.
pub trait SchemaObject: Clone + fmt::Debug + Default {
    const CLASS: ObjectClass;

    /// Fields defined by the snapshot contract, in declaration order.
    const FIELDS: &'static [&'static str];

    /// Additional fields a snapshot source returned, in source order.
    fn extra(&self) -> &IndexMap<String, FieldValue>;

    /// Reference to a contract field, or `None` for names outside [`Self::FIELDS`].
    fn known_field_mut(&mut self, name: &str) -> Option<&mut FieldValue>;

    /// Read a contract field. Names outside [`Self::FIELDS`] are not checked.
    fn known_field(&self, name: &str) -> Option<&FieldValue>;

    fn extra_mut(&mut self) -> &mut IndexMap<String, FieldValue>;

    /// The value of a field. Fields the record does not have are `Absent`.
    fn field(&self, name: &str) -> &FieldValue {
        self.known_field(name)
            .or_else(|| self.extra().get(name))
            .unwrap_or(&ABSENT)
    }

    /// Set a field by name; unknown names land in [`SchemaObject::extra`].
    fn set(&mut self, name: &str, value: FieldValue) {
        match self.known_field_mut(name) {
            Some(slot) => *slot = value,
            None => {
                self.extra_mut().insert(name.to_string(), value);
            }
        }
    }

    /// Build a record from `(name, value)` pairs.
    fn from_fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = (S, FieldValue)>,
        S: AsRef<str>,
    {
        let mut record = Self::default();
        for (name, value) in fields {
            record.set(name.as_ref(), value);
        }
        record
    }

    /// Every field name this record carries: contract fields, then extras.
    fn field_names(&self) -> Vec<&str> {
        Self::FIELDS
            .iter()
            .copied()
            .chain(self.extra().keys().map(String::as_str))
            .collect()
    }

    /// Whether `name` is one of this class's key fields.
    fn is_key_field(name: &str) -> bool {
        Self::CLASS.key_fields().contains(&name)
    }

    /// The record's key. Every key field must hold non-blank text.
    fn key(&self) -> Result<Key, MissingKeyField> {
        let mut parts = Vec::with_capacity(Self::CLASS.key_fields().len());
        for &field in Self::CLASS.key_fields() {
            match self.field(field).as_text() {
                Some(s) if !s.trim().is_empty() => parts.push(s.to_string()),
                _ => {
                    return Err(MissingKeyField {
                        class: Self::CLASS,
                        field,
                    });
                }
            }
        }
        Ok(Key(parts))
    }
}

macro_rules! schema_object {
    ($ty:ident, $class:expr, [$($field:ident),+ $(,)?]) => {
        impl SchemaObject for $ty {
            const CLASS: ObjectClass = $class;
            const FIELDS: &'static [&'static str] = &[$(stringify!($field)),+];

            fn extra(&self) -> &IndexMap<String, FieldValue> {
                &self.extra
            }

            fn extra_mut(&mut self) -> &mut IndexMap<String, FieldValue> {
                &mut self.extra
            }

            fn known_field(&self, name: &str) -> Option<&FieldValue> {
                match name {
                    $(stringify!($field) => Some(&self.$field),)+
                    _ => None,
                }
            }

            fn known_field_mut(&mut self, name: &str) -> Option<&mut FieldValue> {
                match name {
                    $(stringify!($field) => Some(&mut self.$field),)+
                    _ => None,
                }
            }
        }
    };
}

/// One table column, as listed by `information_schema.columns`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ColumnRecord {
    pub schema: FieldValue,
    pub table: FieldValue,
    pub column_name: FieldValue,
    pub data_type: FieldValue,
    /// `"YES"` or `"NO"`.
    pub is_nullable: FieldValue,
    pub column_default: FieldValue,
    pub extra: IndexMap<String, FieldValue>,
}

schema_object!(
    ColumnRecord,
    ObjectClass::Column,
    [schema, table, column_name, data_type, is_nullable, column_default]
);

impl ColumnRecord {
    /// A column with its identity and type. Nullability and default are `Absent`.
    pub fn new(schema: &str, table: &str, column_name: &str, data_type: &str) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
            column_name: column_name.into(),
            data_type: data_type.into(),
            ..Default::default()
        }
    }

    pub fn nullable(mut self, is_nullable: &str) -> Self {
        self.is_nullable = is_nullable.into();
        self
    }

    pub fn column_default(mut self, default: impl Into<FieldValue>) -> Self {
        self.column_default = default.into();
        self
    }
}

/// One view, as listed by `information_schema.views`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ViewRecord {
    pub schema: FieldValue,
    /// The view's name.
    pub table: FieldValue,
    /// The expanded SQL body of the view.
    pub view_definition: FieldValue,
    pub extra: IndexMap<String, FieldValue>,
}

schema_object!(ViewRecord, ObjectClass::View, [schema, table, view_definition]);

impl ViewRecord {
    pub fn new(schema: &str, view: &str, view_definition: &str) -> Self {
        Self {
            schema: schema.into(),
            table: view.into(),
            view_definition: view_definition.into(),
            ..Default::default()
        }
    }
}

/// One index, with its definition as rendered by the database.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IndexRecord {
    pub schema: FieldValue,
    pub table: FieldValue,
    pub index_name: FieldValue,
    pub index_def: FieldValue,
    pub extra: IndexMap<String, FieldValue>,
}

schema_object!(
    IndexRecord,
    ObjectClass::Index,
    [schema, table, index_name, index_def]
);

impl IndexRecord {
    pub fn new(schema: &str, table: &str, index_name: &str, index_def: &str) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
            index_name: index_name.into(),
            index_def: index_def.into(),
            ..Default::default()
        }
    }
}

/// A metadata record of any class.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Column(ColumnRecord),
    View(ViewRecord),
    Index(IndexRecord),
}

impl Record {
    pub fn class(&self) -> ObjectClass {
        match self {
            Record::Column(_) => ObjectClass::Column,
            Record::View(_) => ObjectClass::View,
            Record::Index(_) => ObjectClass::Index,
        }
    }

    pub fn key(&self) -> Result<Key, MissingKeyField> {
        match self {
            Record::Column(r) => r.key(),
            Record::View(r) => r.key(),
            Record::Index(r) => r.key(),
        }
    }

    pub fn field(&self, name: &str) -> &FieldValue {
        match self {
            Record::Column(r) => r.field(name),
            Record::View(r) => r.field(name),
            Record::Index(r) => r.field(name),
        }
    }
}

impl From<ColumnRecord> for Record {
    fn from(r: ColumnRecord) -> Self {
        Record::Column(r)
    }
}

impl From<ViewRecord> for Record {
    fn from(r: ViewRecord) -> Self {
        Record::View(r)
    }
}

impl From<IndexRecord> for Record {
    fn from(r: IndexRecord) -> Self {
        Record::Index(r)
    }
}

/// An ordered sequence of records of one class.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSet<R> {
    records: Vec<R>,
}

impl<R: SchemaObject> RecordSet<R> {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    pub fn class(&self) -> ObjectClass {
        R::CLASS
    }

    pub fn push(&mut self, record: R) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[R] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, R> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl<R: SchemaObject> Default for RecordSet<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> From<Vec<R>> for RecordSet<R> {
    fn from(records: Vec<R>) -> Self {
        Self { records }
    }
}

impl<R> FromIterator<R> for RecordSet<R> {
    fn from_iter<I: IntoIterator<Item = R>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

impl<'a, R> IntoIterator for &'a RecordSet<R> {
    type Item = &'a R;
    type IntoIter = std::slice::Iter<'a, R>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// The captured metadata of one database.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Snapshot {
    /// Human-readable name of the database, used in logs and summaries.
    pub label: String,
    pub columns: RecordSet<ColumnRecord>,
    pub views: RecordSet<ViewRecord>,
    pub indexes: RecordSet<IndexRecord>,
}

impl Snapshot {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Default::default()
        }
    }

    /// Add a record to the set of its class.
    pub fn push(&mut self, record: impl Into<Record>) {
        match record.into() {
            Record::Column(r) => self.columns.push(r),
            Record::View(r) => self.views.push(r),
            Record::Index(r) => self.indexes.push(r),
        }
    }

    /// Builder form of [`Snapshot::push`].
    pub fn with(mut self, record: impl Into<Record>) -> Self {
        self.push(record);
        self
    }

    pub fn record_count(&self) -> usize {
        self.columns.len() + self.views.len() + self.indexes.len()
    }
}
