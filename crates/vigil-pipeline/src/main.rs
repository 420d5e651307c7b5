//! vigil pipeline binary.
//!
//! Reads `config.toml` (or the path given with `--config`), opens the SQLite
//! store, and runs the requested pass. Configuration keys can also be set
//! through `VIGIL_`-prefixed environment variables.

use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use vigil_pipeline::{
  PipelineConfig,
  fetch::Fetcher,
  run::{run_diff_pass, run_dimension_pass},
};
use vigil_store_sqlite::SqliteStore;

#[derive(Parser)]
#[command(author, version, about = "Dataset availability and volatility monitor")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Fetch candidate content and back-fill dimensions on current snapshots.
  Dimensions,
  /// Diff consecutive snapshots and derive volatility metrics.
  Diffs,
  /// Run the dimension pass, then the diff pass.
  All,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("VIGIL"))
    .build()
    .context("failed to read configuration")?;
  let cfg: PipelineConfig = settings
    .try_deserialize()
    .context("failed to deserialise PipelineConfig")?;

  let store = SqliteStore::open(&cfg.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", cfg.store_path))?;
  let fetcher = Fetcher::new(cfg.fetch.clone())
    .context("failed to build HTTP client")?;

  match cli.command {
    Command::Dimensions => {
      dimension_pass(&store, &fetcher, cfg.candidate_limit).await?;
    }
    Command::Diffs => {
      diff_pass(&store).await?;
    }
    Command::All => {
      dimension_pass(&store, &fetcher, cfg.candidate_limit).await?;
      diff_pass(&store).await?;
    }
  }

  Ok(())
}

async fn dimension_pass(
  store: &SqliteStore,
  fetcher: &Fetcher,
  limit: usize,
) -> anyhow::Result<()> {
  let report = run_dimension_pass(store, fetcher, limit)
    .await
    .context("dimension pass failed")?;
  for error in &report.errors {
    tracing::warn!(%error, "dimension item failed");
  }
  Ok(())
}

async fn diff_pass(store: &SqliteStore) -> anyhow::Result<()> {
  let report = run_diff_pass(store).await.context("diff pass failed")?;
  for error in &report.errors {
    tracing::warn!(%error, "dataset diff failed");
  }
  Ok(())
}
