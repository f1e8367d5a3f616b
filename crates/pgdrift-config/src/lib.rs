//! Configuration file handling for pgdrift.
//!
//! Looks for `.config/pgdrift.toml` in the current directory or any parent
//! directory. Every setting is optional; command-line flags and environment
//! variables take precedence over the file.
//!
//! ```toml
//! [source]
//! label = "staging"
//! url = "postgresql://postgres@staging/loans"
//!
//! [target]
//! label = "production"
//! url = "postgresql://postgres@production/loans"
//!
//! [compare]
//! null_policy = "lenient"
//! exclude_schemas = ["information_schema", "pg_catalog"]
//!
//! [output]
//! path = "sync_schema.sql"
//! transaction = false
//! ```

use camino::{Utf8Path, Utf8PathBuf};
use pgdrift_schema::NullPolicy;
use serde::Deserialize;

/// Path of the config file relative to the directory it is searched from.
pub const CONFIG_FILE: &str = ".config/pgdrift.toml";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// The reference database.
    pub source: DatabaseConfig,
    /// The database to bring in line with the source.
    pub target: DatabaseConfig,
    pub compare: CompareConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    /// Name used in logs and summaries.
    pub label: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompareConfig {
    pub null_policy: NullPolicy,
    /// Schemas never captured. `None` keeps the store's defaults.
    pub exclude_schemas: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Where to write the SQL. `None` means stdout.
    pub path: Option<Utf8PathBuf>,
    /// Wrap the statements in `BEGIN;` / `COMMIT;`.
    pub transaction: bool,
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// No `.config/pgdrift.toml` found in any parent directory
    #[error("no {CONFIG_FILE} found in current directory or any parent")]
    NotFound,

    #[error("current directory is not valid UTF-8: {0}")]
    NonUtf8Path(std::path::PathBuf),

    #[error("failed to read {path}: {source}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: Utf8PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl Config {
    /// Parse configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

/// Load configuration from `.config/pgdrift.toml`, searching up the directory tree.
pub fn load() -> Result<(Config, Utf8PathBuf), ConfigError> {
    let cwd = std::env::current_dir().map_err(|source| ConfigError::Io {
        path: Utf8PathBuf::from("."),
        source,
    })?;
    let cwd = Utf8PathBuf::try_from(cwd).map_err(|e| ConfigError::NonUtf8Path(e.into_path_buf()))?;
    load_from(&cwd)
}

/// Load configuration starting from a specific directory.
pub fn load_from(start: &Utf8Path) -> Result<(Config, Utf8PathBuf), ConfigError> {
    let config_path = find_config_file(start)?;
    let config = load_file(&config_path)?;
    Ok((config, config_path))
}

/// Load configuration from an explicit file path.
pub fn load_file(path: &Utf8Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_owned(),
        source,
    })?;
    Config::from_toml(&content).map_err(|source| ConfigError::Parse {
        path: path.to_owned(),
        source,
    })
}

/// Find `.config/pgdrift.toml` by searching up the directory tree.
fn find_config_file(start: &Utf8Path) -> Result<Utf8PathBuf, ConfigError> {
    let mut current = start.to_path_buf();

    loop {
        let config_path = current.join(CONFIG_FILE);
        if config_path.exists() {
            return Ok(config_path);
        }

        if !current.pop() {
            return Err(ConfigError::NotFound);
        }
    }
}
