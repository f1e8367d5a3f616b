use crate::Side;
use pgdrift_schema::{Key, ObjectClass};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to capture {side} database `{label}`: {source}")]
    Extraction {
        side: Side,
        label: String,
        #[source]
        source: ExtractionError,
    },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Reading metadata from a database failed.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("could not connect: {0}")]
    Connect(#[source] tokio_postgres::Error),

    #[error("{class} metadata query failed: {source}")]
    Query {
        class: ObjectClass,
        #[source]
        source: tokio_postgres::Error,
    },
}

/// Comparing the record sets of one object class failed.
///
/// Only that class is affected; the others are still compared.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiffError {
    #[error("duplicate {class} key `{key}` in {side} snapshot")]
    DuplicateKey {
        class: ObjectClass,
        side: Side,
        key: Key,
    },
}
