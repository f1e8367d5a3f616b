//! Record set diffing - align two snapshots of one object class by key.
//!
//! The left side is always the **source** (the reference database) and the
//! right side the **target** (the database to be brought in line). Every key
//! found on at least one side produces at most one [`DeltaEntry`]:
//!
//! - [`DeltaEntry::AddedOnRight`]: the key exists only in the source, so it
//!   would have to be added to the target
//! - [`DeltaEntry::RemovedOnRight`]: the key exists only in the target
//! - [`DeltaEntry::Differing`]: the key exists on both sides and at least one
//!   non-key field differs under the active [`NullPolicy`]
//!
//! Keys whose records are equal produce nothing. Entries come out sorted by
//! key, so the same inputs always yield the same sequence regardless of the
//! order the snapshot store returned the rows in.
//!
//! ```text
//! source                      target
//! public.loans.id   int       (missing)        -> AddedOnRight
//! public.loans.note text      public.loans.note varchar -> Differing(data_type)
//! (missing)                   public.loans.old  -> RemovedOnRight
//! ```

use crate::DiffError;
use indexmap::IndexSet;
use pgdrift_schema::{FieldValue, Key, MissingKeyField, NullPolicy, SchemaObject};
use std::collections::btree_map::{BTreeMap, Entry};
use std::collections::BTreeSet;
use std::fmt;

/// Which snapshot a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Source,
    Target,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Source => write!(f, "source"),
            Side::Target => write!(f, "target"),
        }
    }
}

/// One field whose value differs between source and target.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldChange {
    pub field: String,
    pub source: FieldValue,
    pub target: FieldValue,
}

impl fmt::Display for FieldChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} -> {}", self.field, self.target, self.source)
    }
}

/// The difference found for one key.
#[derive(Debug, Clone, PartialEq)]
pub enum DeltaEntry<R> {
    /// Present in the source, missing from the target.
    AddedOnRight { key: Key, source: R },
    /// Present in the target, missing from the source.
    RemovedOnRight { key: Key, target: R },
    /// Present on both sides with at least one differing field.
    Differing {
        key: Key,
        source: R,
        target: R,
        changes: Vec<FieldChange>,
    },
}

impl<R> DeltaEntry<R> {
    pub fn key(&self) -> &Key {
        match self {
            DeltaEntry::AddedOnRight { key, .. }
            | DeltaEntry::RemovedOnRight { key, .. }
            | DeltaEntry::Differing { key, .. } => key,
        }
    }
}

impl<R> fmt::Display for DeltaEntry<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeltaEntry::AddedOnRight { key, .. } => write!(f, "+ {}", key),
            DeltaEntry::RemovedOnRight { key, .. } => write!(f, "- {}", key),
            DeltaEntry::Differing { key, changes, .. } => {
                let fields: Vec<&str> = changes.iter().map(|c| c.field.as_str()).collect();
                write!(f, "~ {} ({})", key, fields.join(", "))
            }
        }
    }
}

/// A record left out of the comparison because its key is incomplete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRecord {
    pub side: Side,
    /// Zero-based position of the record within its record set.
    pub position: usize,
    pub error: MissingKeyField,
}

/// The result of diffing one object class.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDiff<R> {
    /// Entries sorted by key.
    pub entries: Vec<DeltaEntry<R>>,
    /// Records excluded from the comparison, source side first.
    pub skipped: Vec<SkippedRecord>,
}

impl<R> ClassDiff<R> {
    /// Returns true if both sides hold the same keys with equal fields.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn added(&self) -> impl Iterator<Item = &DeltaEntry<R>> {
        self.entries
            .iter()
            .filter(|e| matches!(e, DeltaEntry::AddedOnRight { .. }))
    }

    pub fn removed(&self) -> impl Iterator<Item = &DeltaEntry<R>> {
        self.entries
            .iter()
            .filter(|e| matches!(e, DeltaEntry::RemovedOnRight { .. }))
    }

    pub fn differing(&self) -> impl Iterator<Item = &DeltaEntry<R>> {
        self.entries
            .iter()
            .filter(|e| matches!(e, DeltaEntry::Differing { .. }))
    }
}

/// Compare the source and target record sets of one object class.
///
/// Records lacking a key field are skipped and reported in
/// [`ClassDiff::skipped`]. A key appearing twice on one side fails the whole
/// class with [`DiffError::DuplicateKey`].
pub fn diff<R: SchemaObject>(
    source: &[R],
    target: &[R],
    policy: NullPolicy,
) -> Result<ClassDiff<R>, DiffError> {
    let mut skipped = Vec::new();
    let source_by_key = index_by_key(source, Side::Source, &mut skipped)?;
    let target_by_key = index_by_key(target, Side::Target, &mut skipped)?;

    let keys: BTreeSet<&Key> = source_by_key.keys().chain(target_by_key.keys()).collect();

    let mut entries = Vec::new();
    for key in keys {
        match (source_by_key.get(key), target_by_key.get(key)) {
            (Some(&source), None) => entries.push(DeltaEntry::AddedOnRight {
                key: key.clone(),
                source: source.clone(),
            }),
            (None, Some(&target)) => entries.push(DeltaEntry::RemovedOnRight {
                key: key.clone(),
                target: target.clone(),
            }),
            (Some(&source), Some(&target)) => {
                let changes = diff_fields(source, target, policy);
                if !changes.is_empty() {
                    entries.push(DeltaEntry::Differing {
                        key: key.clone(),
                        source: source.clone(),
                        target: target.clone(),
                        changes,
                    });
                }
            }
            (None, None) => {}
        }
    }

    let diff = ClassDiff { entries, skipped };
    tracing::debug!(
        class = %R::CLASS,
        source = source.len(),
        target = target.len(),
        added = diff.added().count(),
        removed = diff.removed().count(),
        differing = diff.differing().count(),
        skipped = diff.skipped.len(),
        "diffed record sets"
    );
    Ok(diff)
}

/// Index records by key, skipping those with an incomplete key.
fn index_by_key<'a, R: SchemaObject>(
    records: &'a [R],
    side: Side,
    skipped: &mut Vec<SkippedRecord>,
) -> Result<BTreeMap<Key, &'a R>, DiffError> {
    let mut by_key = BTreeMap::new();

    for (position, record) in records.iter().enumerate() {
        let key = match record.key() {
            Ok(key) => key,
            Err(error) => {
                tracing::warn!(
                    class = %R::CLASS,
                    %side,
                    position,
                    field = error.field,
                    "skipping record without a complete key"
                );
                skipped.push(SkippedRecord {
                    side,
                    position,
                    error,
                });
                continue;
            }
        };

        match by_key.entry(key) {
            Entry::Occupied(existing) => {
                return Err(DiffError::DuplicateKey {
                    class: R::CLASS,
                    side,
                    key: existing.key().clone(),
                });
            }
            Entry::Vacant(slot) => {
                slot.insert(record);
            }
        }
    }

    Ok(by_key)
}

/// Compare every non-key field either record carries.
///
/// A field missing from one record compares as `Absent`. Fields are visited
/// in contract order, then source extras, then target-only extras.
fn diff_fields<R: SchemaObject>(source: &R, target: &R, policy: NullPolicy) -> Vec<FieldChange> {
    let fields: IndexSet<&str> = source
        .field_names()
        .into_iter()
        .chain(target.field_names())
        .filter(|name| !R::is_key_field(name))
        .collect();

    fields
        .into_iter()
        .filter_map(|field| {
            let (s, t) = (source.field(field), target.field(field));
            (!policy.equivalent(s, t)).then(|| FieldChange {
                field: field.to_string(),
                source: s.clone(),
                target: t.clone(),
            })
        })
        .collect()
}
