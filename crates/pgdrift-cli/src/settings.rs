//! Merging command-line arguments with the config file.
//!
//! Flags win over environment variables (clap handles those two), which win
//! over `.config/pgdrift.toml`, which wins over built-in defaults.

use crate::DiffArgs;
use camino::Utf8PathBuf;
use pgdrift::{NullPolicy, PgSnapshotStore};
use pgdrift_config::{Config, DatabaseConfig};

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("no {side} database URL (pass --{side}, set {env}, or add `[{side}] url` to the config file)")]
    MissingUrl {
        side: &'static str,
        env: &'static str,
    },
}

/// One database to capture.
#[derive(Debug, Clone, PartialEq)]
pub struct Endpoint {
    pub label: String,
    pub url: String,
}

impl Endpoint {
    fn resolve(
        flag: Option<&str>,
        config: &DatabaseConfig,
        side: &'static str,
        env: &'static str,
    ) -> Result<Self, SettingsError> {
        let url = flag
            .or(config.url.as_deref())
            .ok_or(SettingsError::MissingUrl { side, env })?;
        Ok(Self {
            label: config.label.clone().unwrap_or_else(|| side.to_string()),
            url: url.to_string(),
        })
    }

    pub fn store(&self, exclude_schemas: Option<&[String]>) -> PgSnapshotStore {
        let store = PgSnapshotStore::new(&self.label, &self.url);
        match exclude_schemas {
            Some(schemas) => store.excluded_schemas(schemas.to_vec()),
            None => store,
        }
    }
}

/// Everything a `diff` run needs, after all sources were merged.
#[derive(Debug, Clone, PartialEq)]
pub struct DiffSettings {
    pub source: Endpoint,
    pub target: Endpoint,
    pub null_policy: NullPolicy,
    pub exclude_schemas: Option<Vec<String>>,
    /// `None` writes to stdout.
    pub output: Option<Utf8PathBuf>,
    pub transaction: bool,
}

impl DiffSettings {
    pub fn resolve(args: &DiffArgs, config: &Config) -> Result<Self, SettingsError> {
        Ok(Self {
            source: Endpoint::resolve(
                args.source_url.as_deref(),
                &config.source,
                "source",
                "PGDRIFT_SOURCE_URL",
            )?,
            target: Endpoint::resolve(
                args.target_url.as_deref(),
                &config.target,
                "target",
                "PGDRIFT_TARGET_URL",
            )?,
            null_policy: args.null_policy.unwrap_or(config.compare.null_policy),
            exclude_schemas: config.compare.exclude_schemas.clone(),
            output: args.output.clone().or_else(|| config.output.path.clone()),
            transaction: args.transaction || config.output.transaction,
        })
    }
}
