//! # Gazetteer Recon CLI (`recon`)
//!
//! Runs the reconciliation server and offers offline commands for checking
//! a dataset and trying queries against it.
//!
//! ## Usage
//!
//! ```bash
//! recon --config ./config/recon.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `recon serve` | Load the default dataset and start the HTTP server |
//! | `recon match "<query>"` | Rank one query against a dataset |
//! | `recon check` | Load a dataset and print what was recognized |
//!
//! ## Examples
//!
//! ```bash
//! # Start the server with the configured dataset
//! recon serve --config ./config/recon.toml
//!
//! # Try a query without starting the server
//! recon match "ottaw" --dataset ./data/canadacities.csv --explain
//!
//! # Validate a CSV before uploading it
//! recon check --dataset ./towns.csv
//! ```

use clap::{Parser, Subcommand};
use gazetteer_recon::{check, config, lookup, server};
use std::path::{Path, PathBuf};

/// Gazetteer Recon: match free-text place names against a CSV gazetteer.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/recon.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "recon",
    about = "Gazetteer Recon, a reconciliation service for place names",
    version,
    long_about = "Gazetteer Recon loads a CSV gazetteer and answers batch reconciliation \
    queries over HTTP, returning ranked, scored candidates for each query."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/recon.toml`. `match` and `check` fall back to
    /// built-in defaults when the file does not exist and `--dataset` is given.
    #[arg(long, global = true, default_value = "./config/recon.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Start the reconciliation HTTP server.
    ///
    /// Loads `[dataset].path` (if set) and binds to `[server].bind`.
    Serve {
        /// Override the bind address from config.
        #[arg(long)]
        bind: Option<String>,
    },

    /// Rank a single query against a dataset.
    ///
    /// Uses the same scoring, filtering, and limit rules as the server.
    Match {
        /// The place name to reconcile.
        query: String,

        /// Maximum number of results (default from `[reconcile].default_limit`).
        #[arg(long)]
        limit: Option<usize>,

        /// CSV dataset to search instead of `[dataset].path`.
        #[arg(long)]
        dataset: Option<PathBuf>,

        /// Print the score components for each result.
        #[arg(long)]
        explain: bool,
    },

    /// Load a dataset and report recognized columns and row counts.
    Check {
        /// CSV dataset to check instead of `[dataset].path`.
        #[arg(long)]
        dataset: Option<PathBuf>,
    },
}

/// Load the config file, or defaults when it is absent and the command
/// names its own dataset.
fn load_or_minimal(path: &Path, has_dataset: bool) -> anyhow::Result<config::Config> {
    if has_dataset && !path.exists() {
        Ok(config::Config::minimal())
    } else {
        config::load_config(path)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { bind } => {
            let mut cfg = config::load_config(&cli.config)?;
            if let Some(bind) = bind {
                cfg.server.bind = bind;
            }
            server::run_server(&cfg).await?;
        }
        Commands::Match {
            query,
            limit,
            dataset,
            explain,
        } => {
            let cfg = load_or_minimal(&cli.config, dataset.is_some())?;
            lookup::run_match(&cfg, &query, limit, dataset, explain)?;
        }
        Commands::Check { dataset } => {
            let cfg = load_or_minimal(&cli.config, dataset.is_some())?;
            check::run_check(&cfg, dataset)?;
        }
    }

    Ok(())
}
