//! precache CLI entry point

use clap::Parser;
use console::style;
use precache::cli::{Cli, Commands};
use precache::config::ConfigManager;
use precache::error::PrecacheResult;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> PrecacheResult<()> {
    let cli = Cli::parse();

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    let mut config = config_manager.load().await?;

    // 0 = warn, 1 = info, 2+ = debug
    let filter = match cli.verbose {
        0 => EnvFilter::new("precache=warn"),
        1 => EnvFilter::new("precache=info"),
        _ => EnvFilter::new("precache=debug"),
    };

    if config.general.log_format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .without_time()
            .with_writer(std::io::stderr)
            .init();
    }

    debug!("Loaded config from {}", config_manager.path().display());

    if let Some(dir) = cli.store_dir {
        config.cache.store_dir = Some(dir);
    }
    if let Some(origin) = cli.origin {
        config.origin.base_url = origin;
    }

    precache::ui::init_theme();

    match cli.command {
        Commands::Install => precache::cli::commands::install(&config).await,
        Commands::Fetch(args) => precache::cli::commands::fetch(args, &config).await,
        Commands::Load(args) => precache::cli::commands::load(args, &config).await,
        Commands::List(args) => precache::cli::commands::list(args, &config).await,
        Commands::Identity => precache::cli::commands::identity(&config),
        Commands::Clear(args) => precache::cli::commands::clear(args, &config).await,
        Commands::Config(args) => {
            precache::cli::commands::config(args, &config_manager, &config).await
        }
    }
}
