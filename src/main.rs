use clap::Parser;
use log::{error, info};
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use updaterd::daemon::config::{default_config_path, Config, ConfigStore};
use updaterd::daemon::errors::UpdaterError;
use updaterd::daemon::logging::{self, LogLevel};
use updaterd::Updater;

/// Keeps a deployed checkout in sync with its GitHub branch.
#[derive(Parser)]
#[command(version)]
struct Cli {
    /// Path to config file (JSON, or TOML when it ends in .toml)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Run a single update check and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn Error>> {
    let args = Cli::parse();
    let path = match args.config {
        Some(path) => path,
        None => default_config_path().ok_or(UpdaterError::NoHomeDir)?,
    };

    let loaded = Config::load_or_create(&path);
    let configured = loaded
        .as_ref()
        .map(|config| config.logging.level)
        .unwrap_or_default();
    logging::init(LogLevel::effective(configured)).map_err(UpdaterError::from)?;

    info!("Glide Updater starting...");
    info!("Loading configuration from {}...", path.display());
    let config = loaded.unwrap_or_else(|e| {
        error!("Error loading config: {e}");
        Config::default_at(&path)
    });
    let updater = Updater::with_system_components(ConfigStore::new(path, config))?;

    if args.once {
        let outcome = updater.check_for_updates().await;
        return Ok(if outcome.is_failed() {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        });
    }

    updater
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("ctrl-c handler failed: {e}");
                std::future::pending::<()>().await;
            }
        })
        .await;
    Ok(ExitCode::SUCCESS)
}
