//! Taskdeck CLI - inspect and replay live collections from the terminal
//!
//! Fetches snapshots from the API, replays recorded push events against them
//! offline, and prints the dashboard figures the web views show.

mod cli;
mod commands;
mod config_profiles;
mod error;

#[cfg(test)]
mod tests;

use clap::Parser;
use taskdeck_core::sync::InsertionPolicy;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::commands::common::load_client_config;
use crate::commands::completions::run_completions;
use crate::commands::config::run_config;
use crate::commands::dashboard::run_dashboard;
use crate::commands::fetch::run_fetch;
use crate::commands::replay::{replay_options, run_replay, ReplayArgs};
use crate::error::CliError;

const DEFAULT_LOG_FILTER: &str = "taskdeck=info,taskdeck_core=info";

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let cli = Cli::parse();
    let profile = cli.profile.as_deref();

    match cli.command {
        Commands::Replay {
            snapshot,
            events,
            kind,
            insertion,
            queue_early,
            reject_stale,
            json,
        } => {
            let config = load_client_config(profile)?;
            let options = replay_options(
                config.sync,
                insertion.map(InsertionPolicy::from),
                queue_early,
                reject_stale,
            );

            run_replay(&ReplayArgs {
                snapshot,
                events,
                kind,
                options,
                events_first: queue_early,
                json,
            })
            .await?;
        }
        Commands::Fetch { resource, json } => run_fetch(&resource, json, profile).await?,
        Commands::Dashboard { snapshot_dir, json } => {
            run_dashboard(snapshot_dir.as_deref(), json, profile).await?;
        }
        Commands::Completions { shell, output } => run_completions(shell, output.as_deref())?,
        Commands::Config { command } => run_config(command, profile)?,
    }

    Ok(())
}
