//! Command-line arguments.

use hmr_core::HmrConfig;

use std::path::PathBuf;

use clap::Parser;

const APP_DIR_NAME: &str = "hmr-watch";

/// Connects to a dev server's HMR socket and reports updates as they arrive.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "hmr-watch")]
#[command(about = "Hot module reload client for a local dev server")]
pub struct Args {
    /// Dev server `host[:port]` (overrides server.host in hmr.json)
    #[arg(long)]
    pub host: Option<String>,

    /// Directory holding hmr.json (defaults to the platform config dir)
    #[arg(long)]
    pub config_dir: Option<PathBuf>,

    /// Directory for hmr-watch.log (defaults to the platform data dir)
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Module path to hot-swap instead of reloading, e.g. /src/main.js (repeatable)
    #[arg(long = "accept", value_name = "PATH")]
    pub accept: Vec<String>,

    /// Reconnect attempts before giving up (overrides retry.max_retries)
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Delay between reconnect attempts in milliseconds (overrides retry.interval_ms)
    #[arg(long)]
    pub retry_interval_ms: Option<u64>,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    /// Applies command-line overrides on top of a loaded config.
    pub fn apply_to(&self, config: &mut HmrConfig) {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(max_retries) = self.max_retries {
            config.retry.max_retries = max_retries;
        }
        if let Some(interval_ms) = self.retry_interval_ms {
            config.retry.interval_ms = interval_ms;
        }
    }

    pub fn config_dir(&self) -> PathBuf {
        self.config_dir
            .clone()
            .unwrap_or_else(|| app_dir(dirs::config_dir()))
    }

    pub fn log_dir(&self) -> PathBuf {
        self.log_dir
            .clone()
            .unwrap_or_else(|| app_dir(dirs::data_local_dir()))
    }
}

/// `<base>/hmr-watch`, or `./hmr-watch` on platforms without the base dir.
fn app_dir(base: Option<PathBuf>) -> PathBuf {
    base.unwrap_or_else(|| PathBuf::from(".")).join(APP_DIR_NAME)
}
