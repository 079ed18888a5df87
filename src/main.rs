// src/main.rs

//! bookwatch CLI
//!
//! Watches a book catalog site for new and changed listings.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use bookwatch::error::Result;
use bookwatch::models::Config;
use bookwatch::pipeline::run_crawl;

/// bookwatch - Book catalog change tracker
#[derive(Parser, Debug)]
#[command(
    name = "bookwatch",
    version,
    about = "Tracks a book catalog site for new and changed listings"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "bookwatch.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl the catalog and record changes
    Crawl {
        /// Resume the most recent interrupted session
        #[arg(long)]
        resume: bool,
    },

    /// Validate the configuration file
    Validate,

    /// Show the effective configuration and data directory state
    Info,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Arc::new(Config::load_or_default(&cli.config));

    match cli.command {
        Command::Crawl { resume } => {
            config.validate()?;

            let outcome = run_crawl(Arc::clone(&config), resume).await?;
            log::info!(
                "Crawl complete: {} created, {} updated, {} unchanged, {} failed",
                outcome.created,
                outcome.updated,
                outcome.unchanged,
                outcome.failed
            );
        }

        Command::Validate => {
            log::info!("Validating configuration from {}", cli.config.display());

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK");
        }

        Command::Info => {
            let data_dir = PathBuf::from(&config.storage.data_dir);
            log::info!("Data directory: {}", data_dir.display());
            log::info!(
                "Catalog data: {}",
                if data_dir.join("books.json").exists() {
                    "exists"
                } else {
                    "not found"
                }
            );

            let rendered = toml::to_string_pretty(config.as_ref())?;
            println!("{rendered}");
        }
    }

    Ok(())
}
