use hmr_watch::cli::Args;
use hmr_watch::error::HmrWatchError;
use hmr_watch::logger::{initialize as LoggerInitialize, level_for};
use hmr_watch::session::watch;

use common::ErrorLocation;

use hmr_core::HmrConfig;

use std::fs::create_dir_all;
use std::panic::Location;
use std::process::ExitCode;

use clap::Parser;
use log::{error, info, warn};

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), HmrWatchError> {
    let log_dir = args.log_dir();
    create_dir_all(&log_dir).map_err(|e| HmrWatchError::Startup {
        message: format!("Failed to create log directory {}: {e}", log_dir.display()),
        location: ErrorLocation::from(Location::caller()),
    })?;

    // Initialize logger FIRST
    LoggerInitialize(&log_dir, level_for(args.verbose))?;

    let config_dir = args.config_dir();
    info!("hmr-watch starting");
    info!("Config directory: {}", config_dir.display());
    info!("Log directory: {}", log_dir.display());

    let mut config = HmrConfig::load(&config_dir).map_err(|e| HmrWatchError::Startup {
        message: format!("Failed to load config: {e}"),
        location: ErrorLocation::from(Location::caller()),
    })?;
    args.apply_to(&mut config);

    if args.accept.is_empty() {
        warn!("No --accept paths given, every update will restart the session");
    }

    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    watch(&config, &args.accept, ctrl_c).await?;
    Ok(())
}
