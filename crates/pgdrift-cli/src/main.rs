use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, Parser, Subcommand};
use owo_colors::OwoColorize;
use pgdrift::{
    ExtractionError, NullPolicy, ReportWriter, SnapshotStore, Synthesis, compare_stores,
};
use pgdrift_config::{Config, ConfigError};
use std::io::{self, BufWriter, IsTerminal, Write};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod settings;
mod summary;

use settings::{DiffSettings, Endpoint, SettingsError};

/// Detect schema drift between two Postgres databases.
#[derive(Parser, Debug)]
#[command(name = "pgdrift", version)]
struct Cli {
    /// Config file to use instead of searching for .config/pgdrift.toml
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<Utf8PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compare two databases and write the SQL that brings the target in line
    Diff(DiffArgs),
    /// Capture one database and print what was found
    Inspect {
        /// Database connection URL (defaults to the configured source)
        #[arg(long, env = "DATABASE_URL", value_name = "URL")]
        database_url: Option<String>,
    },
}

#[derive(Args, Debug, Default)]
pub(crate) struct DiffArgs {
    /// The reference database
    #[arg(long = "source", env = "PGDRIFT_SOURCE_URL", value_name = "URL")]
    pub source_url: Option<String>,

    /// The database to bring in line with the source
    #[arg(long = "target", env = "PGDRIFT_TARGET_URL", value_name = "URL")]
    pub target_url: Option<String>,

    /// Write SQL to this file instead of stdout
    #[arg(long, short, value_name = "PATH")]
    pub output: Option<Utf8PathBuf>,

    /// How NULL, missing and empty values compare: lenient, null-equals-absent or strict
    #[arg(long, value_name = "POLICY")]
    pub null_policy: Option<NullPolicy>,

    /// Wrap the statements in BEGIN/COMMIT
    #[arg(long)]
    pub transaction: bool,

    /// Exit with status 2 when any difference was found
    #[arg(long)]
    pub fail_on_drift: bool,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Drift(#[from] pgdrift::Error),

    #[error("no database URL (pass --database-url, set DATABASE_URL, or add `[source] url` to the config file)")]
    NoDatabaseUrl,

    #[error("failed to capture database: {0}")]
    Capture(#[from] ExtractionError),

    #[error("failed to write {path}: {source}")]
    Output {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// Exit status when `--fail-on-drift` is set and differences were found.
const DRIFT_EXIT_CODE: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    // Must run before parsing so `.env` values reach clap's `env` fallbacks.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pgdrift=info")),
        )
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{} {}", "error:".red().bold(), err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode, CliError> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Diff(args) => diff(&args, &config).await,
        Commands::Inspect { database_url } => inspect(database_url, &config).await,
    }
}

fn load_config(explicit: Option<&Utf8Path>) -> Result<Config, ConfigError> {
    if let Some(path) = explicit {
        return pgdrift_config::load_file(path);
    }
    match pgdrift_config::load() {
        Ok((config, path)) => {
            tracing::debug!(%path, "loaded config");
            Ok(config)
        }
        Err(ConfigError::NotFound) => Ok(Config::default()),
        Err(e) => Err(e),
    }
}

async fn diff(args: &DiffArgs, config: &Config) -> Result<ExitCode, CliError> {
    let settings = DiffSettings::resolve(args, config)?;
    let exclude = settings.exclude_schemas.as_deref();
    let source = settings.source.store(exclude);
    let target = settings.target.store(exclude);

    let comparison = compare_stores(&source, &target, settings.null_policy).await?;
    let plan = comparison.plan();

    write_plan(&plan, &settings)?;

    let stderr = io::stderr();
    let color = stderr.is_terminal();
    if let Err(e) = summary::write_diff(&mut stderr.lock(), &comparison, &plan, color) {
        tracing::warn!(error = %e, "failed to write summary");
    }

    if args.fail_on_drift && !plan.is_empty() {
        return Ok(ExitCode::from(DRIFT_EXIT_CODE));
    }
    Ok(ExitCode::SUCCESS)
}

/// Statements go to the output; a file also gets the warnings as SQL comments.
fn write_plan(plan: &Synthesis, settings: &DiffSettings) -> Result<(), CliError> {
    match &settings.output {
        Some(path) => {
            let output_error = |source| CliError::Output {
                path: path.to_string(),
                source,
            };
            let file = std::fs::File::create(path).map_err(output_error)?;
            let mut writer =
                ReportWriter::new(BufWriter::new(file)).with_transaction(settings.transaction);
            writer.write_statements(&plan.statements).map_err(output_error)?;
            writer.write_summary(&plan.warnings).map_err(output_error)?;
            tracing::info!(%path, statements = plan.statements.len(), "wrote SQL");
            Ok(())
        }
        None => {
            let stdout = io::stdout();
            let mut writer =
                ReportWriter::new(stdout.lock()).with_transaction(settings.transaction);
            writer
                .write_statements(&plan.statements)
                .map_err(|source| CliError::Output {
                    path: "stdout".to_string(),
                    source,
                })
        }
    }
}

async fn inspect(database_url: Option<String>, config: &Config) -> Result<ExitCode, CliError> {
    let endpoint = match database_url {
        Some(url) => Endpoint {
            label: "database".to_string(),
            url,
        },
        None => Endpoint {
            label: config
                .source
                .label
                .clone()
                .unwrap_or_else(|| "source".to_string()),
            url: config.source.url.clone().ok_or(CliError::NoDatabaseUrl)?,
        },
    };

    let store = endpoint.store(config.compare.exclude_schemas.as_deref());
    let snapshot = store.capture().await?;

    let mut stdout = io::stdout().lock();
    summary::write_inspect(&mut stdout, &snapshot)
        .and_then(|()| stdout.flush())
        .map_err(|source| CliError::Output {
            path: "stdout".to_string(),
            source,
        })?;
    Ok(ExitCode::SUCCESS)
}
