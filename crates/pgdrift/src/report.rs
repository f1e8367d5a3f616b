//! Report output.
//!
//! Statements are written one per line, in plan order, each already carrying
//! its `;`. Nothing wraps them in a transaction unless asked to.

use crate::sync::{Statement, Warning};
use std::io::{self, Write};

/// Writes generated SQL to a file, stdout, or any other writer.
pub struct ReportWriter<W: Write> {
    out: W,
    transaction: bool,
}

impl<W: Write> ReportWriter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            transaction: false,
        }
    }

    /// Wrap the statements in `BEGIN;` / `COMMIT;`.
    pub fn with_transaction(mut self, transaction: bool) -> Self {
        self.transaction = transaction;
        self
    }

    pub fn write_statements(&mut self, statements: &[Statement]) -> io::Result<()> {
        let wrap = self.transaction && !statements.is_empty();
        if wrap {
            writeln!(self.out, "BEGIN;")?;
        }
        for statement in statements {
            writeln!(self.out, "{}", statement.sql)?;
        }
        if wrap {
            writeln!(self.out, "COMMIT;")?;
        }
        self.out.flush()
    }

    /// Write warnings as SQL comments so they can sit next to the statements.
    pub fn write_summary(&mut self, warnings: &[Warning]) -> io::Result<()> {
        if warnings.is_empty() {
            return Ok(());
        }
        writeln!(self.out, "-- {} difference(s) not converted to SQL:", warnings.len())?;
        for warning in warnings {
            writeln!(self.out, "-- {}", warning)?;
        }
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
