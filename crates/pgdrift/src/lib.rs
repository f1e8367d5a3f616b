//! Schema drift detection for Postgres.
//!
//! pgdrift compares the structural metadata (columns, views, indexes) of two
//! databases and produces the SQL that would bring the second one, the
//! **target**, in line with the first one, the **source**.
//!
//! A run has four steps:
//!
//! 1. a [`SnapshotStore`] captures each database into a [`Snapshot`]
//! 2. [`compare`] aligns the two snapshots class by class ([`diff`])
//! 3. [`Comparison::plan`] turns the deltas into [`Statement`]s and
//!    [`Warning`]s ([`synthesize`])
//! 4. a [`ReportWriter`] writes the statements out
//!
//! Generation is additive: missing columns, views and indexes are created and
//! views are replaced, but nothing is ever dropped or altered in place.
//!
//! ```ignore
//! let source = PgSnapshotStore::new("staging", staging_url);
//! let target = PgSnapshotStore::new("production", production_url);
//!
//! let comparison = compare_stores(&source, &target, NullPolicy::default()).await?;
//! let plan = comparison.plan();
//!
//! ReportWriter::new(std::io::stdout()).write_statements(&plan.statements)?;
//! for warning in &plan.warnings {
//!     eprintln!("{}", warning);
//! }
//! ```

mod compare;
mod diff;
mod error;
mod report;
pub mod store;
mod sync;
pub mod traced;

pub use compare::{Comparison, compare, compare_stores};
pub use diff::{ClassDiff, DeltaEntry, FieldChange, Side, SkippedRecord, diff};
pub use error::{DiffError, Error, ExtractionError};
pub use report::ReportWriter;
pub use store::{PgSnapshotStore, SnapshotStore};
pub use sync::{Statement, Synthesis, Warning, synthesize};
pub use traced::{Connection, ConnectionExt, TracedConn};

pub use pgdrift_schema::*;

/// Result type for pgdrift operations.
pub type Result<T> = std::result::Result<T, Error>;
