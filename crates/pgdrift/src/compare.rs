//! Comparison runs - diff every object class of two snapshots.
//!
//! Each class is compared on its own: a duplicate key in the index catalog
//! fails the index comparison only, while columns and views still produce
//! their deltas and statements.

use crate::sync::{Synthesis, Synthesizer, Warning};
use crate::{ClassDiff, DiffError, Error, Result, Side, SnapshotStore, diff};
use pgdrift_schema::{ColumnRecord, IndexRecord, NullPolicy, Snapshot, ViewRecord};

/// The per-class results of comparing a source snapshot against a target.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub source_label: String,
    pub target_label: String,
    pub policy: NullPolicy,
    pub columns: std::result::Result<ClassDiff<ColumnRecord>, DiffError>,
    pub views: std::result::Result<ClassDiff<ViewRecord>, DiffError>,
    pub indexes: std::result::Result<ClassDiff<IndexRecord>, DiffError>,
}

impl Comparison {
    /// Returns true if every class compared cleanly with no differences.
    pub fn is_empty(&self) -> bool {
        fn clean<R>(class: &std::result::Result<ClassDiff<R>, DiffError>) -> bool {
            class
                .as_ref()
                .is_ok_and(|d| d.is_empty() && d.skipped.is_empty())
        }
        clean(&self.columns) && clean(&self.views) && clean(&self.indexes)
    }

    /// Turn the comparison into statements and warnings.
    ///
    /// Classes that failed to compare contribute a [`Warning::ClassFailed`]
    /// and no statements.
    pub fn plan(&self) -> Synthesis {
        let mut synth = Synthesizer::default();

        match &self.columns {
            Ok(diff) => {
                skipped_warnings(&mut synth, diff);
                synth.columns(&diff.entries);
            }
            Err(err) => synth.warn(Warning::ClassFailed(err.clone())),
        }
        match &self.views {
            Ok(diff) => {
                skipped_warnings(&mut synth, diff);
                synth.views(&diff.entries);
            }
            Err(err) => synth.warn(Warning::ClassFailed(err.clone())),
        }
        match &self.indexes {
            Ok(diff) => {
                skipped_warnings(&mut synth, diff);
                synth.indexes(&diff.entries);
            }
            Err(err) => synth.warn(Warning::ClassFailed(err.clone())),
        }

        synth.finish()
    }
}

fn skipped_warnings<R>(synth: &mut Synthesizer, diff: &ClassDiff<R>) {
    for skipped in &diff.skipped {
        synth.warn(Warning::MissingKeyField {
            side: skipped.side,
            position: skipped.position,
            error: skipped.error.clone(),
        });
    }
}

/// Compare two captured snapshots, class by class.
pub fn compare(source: &Snapshot, target: &Snapshot, policy: NullPolicy) -> Comparison {
    let _span = tracing::info_span!(
        "compare",
        source = %source.label,
        target = %target.label,
        %policy,
    )
    .entered();

    let comparison = Comparison {
        source_label: source.label.clone(),
        target_label: target.label.clone(),
        policy,
        columns: diff(source.columns.records(), target.columns.records(), policy),
        views: diff(source.views.records(), target.views.records(), policy),
        indexes: diff(source.indexes.records(), target.indexes.records(), policy),
    };

    let failures = [
        comparison.columns.as_ref().err(),
        comparison.views.as_ref().err(),
        comparison.indexes.as_ref().err(),
    ];
    for err in failures.into_iter().flatten() {
        tracing::warn!(error = %err, "class comparison failed");
    }

    comparison
}

/// Capture both databases concurrently, then compare them.
///
/// Both captures must finish before diffing starts. If either fails, the run
/// fails with [`Error::Extraction`] naming the side that could not be read.
pub async fn compare_stores<S, T>(source: &S, target: &T, policy: NullPolicy) -> Result<Comparison>
where
    S: SnapshotStore + ?Sized,
    T: SnapshotStore + ?Sized,
{
    let (source_snapshot, target_snapshot) = tokio::join!(source.capture(), target.capture());

    let source_snapshot = source_snapshot.map_err(|e| Error::Extraction {
        side: Side::Source,
        label: source.label().to_string(),
        source: e,
    })?;
    let target_snapshot = target_snapshot.map_err(|e| Error::Extraction {
        side: Side::Target,
        label: target.label().to_string(),
        source: e,
    })?;

    Ok(compare(&source_snapshot, &target_snapshot, policy))
}
