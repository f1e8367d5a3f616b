//! Human-readable run summary, printed to stderr.

use owo_colors::OwoColorize;
use pgdrift::{ClassDiff, Comparison, DiffError, ObjectClass, Snapshot, Synthesis};
use std::io::{self, Write};

/// Write the per-class delta counts and every warning.
pub fn write_diff<W: Write>(
    out: &mut W,
    comparison: &Comparison,
    plan: &Synthesis,
    color: bool,
) -> io::Result<()> {
    let header = format!(
        "{} -> {} ({} null policy)",
        comparison.source_label, comparison.target_label, comparison.policy
    );
    if color {
        writeln!(out, "{}", header.bold())?;
    } else {
        writeln!(out, "{}", header)?;
    }

    class_line(out, ObjectClass::Column, &comparison.columns, plan, color)?;
    class_line(out, ObjectClass::View, &comparison.views, plan, color)?;
    class_line(out, ObjectClass::Index, &comparison.indexes, plan, color)?;

    let statements = format!("{} statement(s) generated", plan.statements.len());
    if color {
        writeln!(out, "{}", statements.green())?;
    } else {
        writeln!(out, "{}", statements)?;
    }

    for warning in &plan.warnings {
        if color {
            writeln!(out, "  {} {}", "warning:".yellow().bold(), warning)?;
        } else {
            writeln!(out, "  warning: {}", warning)?;
        }
    }
    Ok(())
}

fn class_line<W: Write, R>(
    out: &mut W,
    class: ObjectClass,
    result: &Result<ClassDiff<R>, DiffError>,
    plan: &Synthesis,
    color: bool,
) -> io::Result<()> {
    let plural = match class {
        ObjectClass::Column => "columns",
        ObjectClass::View => "views",
        ObjectClass::Index => "indexes",
    };
    let label = format!("{:>8}", plural);
    let label = if color {
        label.cyan().to_string()
    } else {
        label
    };
    match result {
        Ok(diff) => writeln!(
            out,
            "{}: {} missing, {} extra, {} differing, {} skipped, {} warning(s)",
            label,
            diff.added().count(),
            diff.removed().count(),
            diff.differing().count(),
            diff.skipped.len(),
            plan.warnings.iter().filter(|w| w.class() == class).count()
        ),
        Err(err) if color => writeln!(out, "{}: {}", label, err.red()),
        Err(err) => writeln!(out, "{}: {}", label, err),
    }
}

/// Write the record counts of a captured snapshot.
pub fn write_inspect<W: Write>(out: &mut W, snapshot: &Snapshot) -> io::Result<()> {
    writeln!(
        out,
        "{} ({} records)",
        snapshot.label,
        snapshot.record_count()
    )?;
    writeln!(out, "  columns: {}", snapshot.columns.len())?;
    writeln!(out, "  views:   {}", snapshot.views.len())?;
    writeln!(out, "  indexes: {}", snapshot.indexes.len())
}
