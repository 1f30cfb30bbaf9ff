use crate::connection::RetryPolicy;
use crate::error::config::ConfigError;
use crate::{DEFAULT_DEV_SERVER_HOST, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_INTERVAL, HMR_WS_PATH};

use common::ErrorLocation;

use std::panic::Location;
use std::path::Path;
use std::time::Duration;

use log::{info, warn};
use serde::Deserialize;
use url::Url;

const CONFIG_FILE_NAME: &str = "hmr.json";
const CONFIG_VERSION: u32 = 1;

// ============================================
// CONFIG STRUCTS
// ============================================

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerConfig {
    /// `host[:port]` of the dev server, the same host the page was served from.
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_ws_path")]
    pub ws_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            ws_path: default_ws_path(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            interval_ms: default_interval_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            fetch_timeout_ms: default_fetch_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HmrConfig {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for HmrConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            server: ServerConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

// ============================================
// DEFAULT FUNCTIONS
// ============================================

fn default_version() -> u32 {
    CONFIG_VERSION
}
fn default_host() -> String {
    DEFAULT_DEV_SERVER_HOST.to_string()
}
fn default_ws_path() -> String {
    HMR_WS_PATH.to_string()
}
fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}
fn default_interval_ms() -> u64 {
    DEFAULT_RETRY_INTERVAL.as_millis() as u64
}
fn default_connect_timeout_ms() -> u64 {
    5_000
}
fn default_fetch_timeout_ms() -> u64 {
    10_000
}

// ============================================
// IMPLEMENTATION
// ============================================

impl HmrConfig {
    /// Load config from {config_dir}/hmr.json.
    ///
    /// # Returns
    ///
    /// Returns defaults if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file exists but cannot be read, parsed, or validated.
    pub fn load(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            info!(
                "Config file not found at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path).map_err(|e| {
            warn!("Failed to read config file: {}", e);
            ConfigError::ReadError {
                location: ErrorLocation::from(Location::caller()),
                path: config_path.clone(),
                source: e,
            }
        })?;

        let config: HmrConfig = serde_json::from_str(&contents).map_err(|e| {
            warn!("Failed to parse config JSON: {}", e);
            ConfigError::ParseError {
                location: ErrorLocation::from(Location::caller()),
                path: config_path.clone(),
                reason: e.to_string(),
            }
        })?;

        config.validate()?;

        info!("Config loaded from {}", config_path.display());
        Ok(config)
    }

    /// Validate config values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version == 0 || self.version > CONFIG_VERSION {
            return Err(validation_error(format!(
                "Invalid version: {} (expected 1-{})",
                self.version, CONFIG_VERSION
            )));
        }

        let host = &self.server.host;
        if host.trim().is_empty() {
            return Err(validation_error("server.host cannot be empty".to_string()));
        }
        if host.contains("://") || host.contains('/') {
            return Err(validation_error(format!(
                "server.host must be host[:port] without scheme or path: {host}"
            )));
        }

        if !self.server.ws_path.starts_with('/') {
            return Err(validation_error(format!(
                "server.ws_path must start with '/': {}",
                self.server.ws_path
            )));
        }

        if self.retry.max_retries == 0 {
            return Err(validation_error(
                "retry.max_retries must be at least 1".to_string(),
            ));
        }

        if self.retry.interval_ms == 0
            || self.retry.connect_timeout_ms == 0
            || self.retry.fetch_timeout_ms == 0
        {
            return Err(validation_error(
                "retry intervals and timeouts must be non-zero".to_string(),
            ));
        }

        // Both derived URLs must parse.
        self.endpoint_url()?;
        self.module_base_url()?;

        Ok(())
    }

    /// `ws://<host><ws_path>`
    pub fn endpoint_url(&self) -> Result<Url, ConfigError> {
        parse_url(&format!("ws://{}{}", self.server.host, self.server.ws_path))
    }

    /// `http://<host>/`, the root module specifiers are resolved against.
    pub fn module_base_url(&self) -> Result<Url, ConfigError> {
        parse_url(&format!("http://{}/", self.server.host))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.retry.max_retries,
            interval: Duration::from_millis(self.retry.interval_ms),
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.retry.connect_timeout_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.retry.fetch_timeout_ms)
    }
}

#[track_caller]
fn validation_error(reason: String) -> ConfigError {
    ConfigError::ValidationError {
        location: ErrorLocation::from(Location::caller()),
        reason,
    }
}

#[track_caller]
fn parse_url(raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw).map_err(|e| ConfigError::ValidationError {
        location: ErrorLocation::from(Location::caller()),
        reason: format!("Invalid URL {raw}: {e}"),
    })
}
