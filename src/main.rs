// (C) Coralbits SL 2025
// This file is part of Cacheprobe and is licensed under the
// GNU Affero General Public License v3.0.
// A commercial license on request is also available;
// contact info@coralbits.com for details.

use std::sync::Arc;

use anyhow::{Context, Result};
use cacheprobe::{
    cache::open_cache,
    classify,
    probe::probe,
    server::{self, action_key, AppState, AJAX_PATH},
    utils::setup_logging,
    ConfigManager, ConfigSource, FileConfigSource,
};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "cacheprobe")]
#[command(about = "Checks that the object cache really keeps values between requests", long_about = None)]
#[command(version)]
struct Cli {
    #[arg(long, default_value = "config.yaml", global = true)]
    config: String,

    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the diagnosis endpoint
    Serve {
        /// Overrides server.host and server.port
        #[arg(long)]
        listen: Option<String>,
        /// Reload the configuration when the file changes
        #[arg(long)]
        watch: bool,
    },
    /// Print the backend detected in an object cache drop-in
    Classify { file: String },
    /// Run both steps against a server and report
    Probe {
        url: String,
        #[arg(long)]
        token: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Print the action name of the diagnosis endpoint
    ActionKey,
}

async fn serve(cli: &Cli, listen: Option<String>, watch: bool) -> Result<()> {
    setup_logging(cli.debug)?;
    let manager = Arc::new(ConfigManager::new());
    manager.load_config(&cli.config).await?;
    info!("Loaded configuration from {}", cli.config);
    let (listen, cache_config, debug) = {
        let config = manager.get_config().await;
        (
            listen.unwrap_or_else(|| config.listen_addr()),
            config.cache.clone(),
            config.debug,
        )
    };
    if debug && !cli.debug {
        warn!("debug is set in {}, pass --debug to enable debug logging", cli.config);
    }
    if watch {
        manager.watch_config(&cli.config).await?;
    }

    let cache = open_cache(&cache_config).await?;
    let state = Arc::new(AppState::new(manager, cache)?);
    server::start(&listen, state).await
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Serve { listen, watch } => serve(&cli, listen.clone(), *watch).await?,
        Commands::Classify { file } => {
            setup_logging(cli.debug)?;
            let source = FileConfigSource::new(file);
            let content = source
                .read_to_string()
                .with_context(|| format!("Can not read object cache file {}", file))?;
            println!("{}", classify(&content));
        }
        Commands::Probe { url, token, json } => {
            setup_logging(cli.debug)?;
            let report = probe(url, token.as_deref()).await?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!(
                    "backend: {}",
                    report.backend.as_deref().unwrap_or("Unknown")
                );
                println!("armed: {}", report.armed);
                println!("verified: {}", report.verified);
            }
            info!(works = report.works(), "Probe finished");
            if !report.works() {
                std::process::exit(1);
            }
        }
        Commands::ActionKey => {
            println!("{}?action={}", AJAX_PATH, action_key());
        }
    }

    Ok(())
}
