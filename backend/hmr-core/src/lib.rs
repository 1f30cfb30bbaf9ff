pub mod client;
pub mod config;
pub mod connection;
pub mod dispatch;
pub mod error;
pub mod protocol;


pub use client::HmrClient;
pub use config::HmrConfig;
pub use connection::{ConnectionPhase, ConnectionStatus, RetryPolicy};
pub use dispatch::{
    CallbackRegistry, DispatchOutcome, Dispatcher, HttpModuleLoader, LoadedModule, ModuleLoader,
    ReloadReason, Reloader,
};
pub use error::HmrError;
pub use protocol::{HmrPayload, UpdateKind, UpdatePayload};

use std::time::Duration;

pub const DEFAULT_DEV_SERVER_HOST: &str = "127.0.0.1:3307";
pub const HMR_WS_PATH: &str = "/ws";
pub const DEFAULT_HMR_ENDPOINT: &str =
    const_format::concatcp!("ws://", DEFAULT_DEV_SERVER_HOST, HMR_WS_PATH);
pub const MODULE_TIMESTAMP_QUERY: &str = "t";
pub const DEFAULT_MAX_RETRIES: u32 = 30;
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_millis(2000);
