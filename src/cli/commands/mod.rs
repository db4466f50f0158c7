//! CLI parser and command dispatch.

mod config_cmd;
mod rank;
mod resolve;

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use tournoi_signup::config::Config;

#[derive(Parser)]
#[command(name = "tournoi-signup")]
#[command(about = "Find the registration page of table-tennis tournaments")]
#[command(version)]
pub struct Cli {
    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true, env = "TOURNOI_SIGNUP_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve signup URLs of pending tournaments and store them
    Resolve {
        /// Only tournaments starting on or after this date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Only tournaments starting on or before this date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,
        /// Number of browser sessions (default: from config)
        #[arg(short, long)]
        workers: Option<usize>,
        /// Limit number of tournaments to resolve (0 = unlimited)
        #[arg(short, long, default_value = "0")]
        limit: usize,
        /// Tournament store (overrides config)
        #[arg(long)]
        store: Option<PathBuf>,
    },

    /// Show the candidate URLs found in a rules document, best first
    Rank {
        /// Rules document (PDF or text)
        file: PathBuf,
    },

    /// Print the effective configuration
    Config,
}

/// Run the CLI.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match cli.config {
        Some(ref path) => Config::load_from_path(path)
            .await
            .map_err(|e| anyhow::anyhow!(e))?,
        None => Config::load().await,
    };

    match cli.command {
        Commands::Resolve {
            from,
            to,
            workers,
            limit,
            store,
        } => {
            resolve::cmd_resolve(
                &config,
                resolve::ResolveArgs {
                    from,
                    to,
                    workers,
                    limit,
                    store,
                },
            )
            .await
        }
        Commands::Rank { file } => rank::cmd_rank(&config, &file).await,
        Commands::Config => config_cmd::cmd_config_show(&config),
    }
}
