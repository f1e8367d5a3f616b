//! Snapshot stores - where record sets come from.
//!
//! A [`SnapshotStore`] yields the column, view and index metadata of one
//! database. [`PgSnapshotStore`] reads it from a live Postgres server; a
//! [`Snapshot`] is itself a store that hands out a copy of its records, which
//! is what tests and embedders use.

use crate::ExtractionError;
use crate::traced::{Connection, ConnectionExt};
use pgdrift_schema::{
    ColumnRecord, FieldValue, IndexRecord, RecordSet, SchemaObject, Snapshot, ViewRecord,
};
use std::future::Future;
use std::pin::Pin;
use tokio_postgres::Row;

/// Schemas left out of every capture unless configured otherwise.
pub const DEFAULT_EXCLUDED_SCHEMAS: &[&str] = &["information_schema", "pg_catalog"];

const COLUMNS_SQL: &str = r#"
SELECT table_schema::text AS schema,
       table_name::text AS "table",
       column_name::text,
       data_type::text,
       is_nullable::text,
       column_default::text
FROM information_schema.columns
WHERE table_schema::text <> ALL($1::text[])
ORDER BY table_schema, table_name, column_name
"#;

const VIEWS_SQL: &str = r#"
SELECT table_schema::text AS schema,
       table_name::text AS "table",
       view_definition::text
FROM information_schema.views
WHERE table_schema::text <> ALL($1::text[])
ORDER BY table_schema, table_name
"#;

const INDEXES_SQL: &str = r#"
SELECT n.nspname::text AS schema,
       t.relname::text AS "table",
       i.relname::text AS index_name,
       pg_get_indexdef(i.oid) AS index_def
FROM pg_index ix
JOIN pg_class t ON t.oid = ix.indrelid
JOIN pg_class i ON i.oid = ix.indexrelid
JOIN pg_namespace n ON n.oid = t.relnamespace
WHERE n.nspname::text <> ALL($1::text[])
ORDER BY n.nspname, t.relname, i.relname
"#;

/// Boxed future returned by [`SnapshotStore::capture`].
pub type CaptureFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Snapshot, ExtractionError>> + Send + 'a>>;

/// A source of schema metadata for one database.
pub trait SnapshotStore: Send + Sync {
    /// Name of the database, for logs and summaries.
    fn label(&self) -> &str;

    /// Read all three record sets.
    fn capture(&self) -> CaptureFuture<'_>;
}

impl SnapshotStore for Snapshot {
    fn label(&self) -> &str {
        &self.label
    }

    fn capture(&self) -> CaptureFuture<'_> {
        let snapshot = self.clone();
        Box::pin(async move { Ok(snapshot) })
    }
}

/// Reads metadata from a Postgres server over one connection.
#[derive(Debug, Clone)]
pub struct PgSnapshotStore {
    label: String,
    url: String,
    excluded_schemas: Vec<String>,
}

impl PgSnapshotStore {
    pub fn new(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            url: url.into(),
            excluded_schemas: DEFAULT_EXCLUDED_SCHEMAS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    /// Replace the list of schemas that are never captured.
    pub fn excluded_schemas(mut self, schemas: Vec<String>) -> Self {
        self.excluded_schemas = schemas;
        self
    }

    async fn capture_snapshot(&self) -> Result<Snapshot, ExtractionError> {
        tracing::info!(database = %self.label, url = %mask_password(&self.url), "connecting");
        let (client, connection) = tokio_postgres::connect(&self.url, tokio_postgres::NoTls)
            .await
            .map_err(ExtractionError::Connect)?;

        let label = self.label.clone();
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!(database = %label, error = %e, "database connection error");
            }
        });

        introspect(&client, &self.label, &self.excluded_schemas).await
    }
}

impl SnapshotStore for PgSnapshotStore {
    fn label(&self) -> &str {
        &self.label
    }

    fn capture(&self) -> CaptureFuture<'_> {
        Box::pin(self.capture_snapshot())
    }
}

/// Run the three catalog queries over an open connection.
pub async fn introspect<C: Connection>(
    conn: &C,
    label: &str,
    excluded_schemas: &[String],
) -> Result<Snapshot, ExtractionError> {
    let snapshot = Snapshot {
        label: label.to_string(),
        columns: fetch::<ColumnRecord, _>(conn, COLUMNS_SQL, excluded_schemas).await?,
        views: fetch::<ViewRecord, _>(conn, VIEWS_SQL, excluded_schemas).await?,
        indexes: fetch::<IndexRecord, _>(conn, INDEXES_SQL, excluded_schemas).await?,
    };

    tracing::info!(
        database = %label,
        columns = snapshot.columns.len(),
        views = snapshot.views.len(),
        indexes = snapshot.indexes.len(),
        "captured snapshot"
    );
    Ok(snapshot)
}

async fn fetch<R: SchemaObject, C: Connection>(
    conn: &C,
    sql: &str,
    excluded: &[String],
) -> Result<RecordSet<R>, ExtractionError> {
    let query_error = |source: tokio_postgres::Error| ExtractionError::Query {
        class: R::CLASS,
        source,
    };
    let rows = conn
        .traced()
        .query(sql, &[&excluded])
        .await
        .map_err(query_error)?;
    rows.iter()
        .map(row_to_record::<R>)
        .collect::<Result<_, _>>()
        .map_err(query_error)
}

/// Every result column becomes a field of the same name; SQL `NULL` is
/// [`FieldValue::ExplicitNull`].
fn row_to_record<R: SchemaObject>(row: &Row) -> Result<R, tokio_postgres::Error> {
    let mut record = R::default();
    for (idx, column) in row.columns().iter().enumerate() {
        let value: Option<String> = row.try_get(idx)?;
        record.set(column.name(), FieldValue::from_option(value));
    }
    Ok(record)
}

/// Mask the password in a database URL for display.
pub fn mask_password(url: &str) -> String {
    if let Some(start) = url.find("://") {
        if let Some(at) = url.rfind('@').filter(|&at| at > start) {
            if let Some(colon) = url[start + 3..at].find(':') {
                let user = &url[start + 3..start + 3 + colon];
                return format!("{}{}:***{}", &url[..start + 3], user, &url[at..]);
            }
        }
    }
    url.to_string()
}
