//! Movie advisor CLI entry point.

use anyhow::{Context, Result};
use clap::Parser;
use movie_advisor::cli::{commands, Cli, Commands};
use movie_advisor::config::Settings;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config_path = cli.config.as_ref().map(|p| Settings::expand_path(p));
    let mut settings = Settings::load_from(config_path.as_ref())?;
    cli.apply_overrides(&mut settings);

    init_logging(cli.verbose, &settings)?;

    // Ensure the data directory exists
    std::fs::create_dir_all(settings.data_dir())?;

    // Execute command
    match &cli.command {
        None | Some(Commands::Chat) => {
            commands::run_chat(settings).await?;
        }

        Some(Commands::Lists { json }) => {
            commands::run_lists(*json, settings).await?;
        }

        Some(Commands::Search { query, limit }) => {
            commands::run_search(query, *limit, settings).await?;
        }

        Some(Commands::Lookup { query }) => {
            commands::run_lookup(query, settings).await?;
        }

        Some(Commands::Config { action }) => {
            commands::run_config(action, config_path, settings)?;
        }
    }

    Ok(())
}

/// Initialize logging to stderr, or to `general.log_file` when set.
fn init_logging(verbose: u8, settings: &Settings) -> Result<()> {
    let log_level = match verbose {
        0 => settings.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| format!("movie_advisor={}", log_level)),
    );

    let (file_layer, stderr_layer) = match &settings.general.log_file {
        Some(path) => {
            let path: PathBuf = Settings::expand_path(path);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(Arc::new(file))
                .with_ansi(false);
            (Some(layer), None)
        }
        None => {
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false);
            (None, Some(layer))
        }
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .init();

    Ok(())
}
