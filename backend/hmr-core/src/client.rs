//! The HMR client: one connection manager and one dispatcher, wired together.
//!
//! # Examples
//!
//! ```no_run
//! use hmr_core::{HmrClient, HmrConfig, LoadedModule, ReloadReason, Reloader};
//!
//! struct ExitOnReload;
//!
//! impl Reloader for ExitOnReload {
//!     fn full_reload(&self, reason: ReloadReason) {
//!         eprintln!("reload: {reason}");
//!         std::process::exit(0);
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut client = HmrClient::new(&HmrConfig::default(), ExitOnReload)?;
//!     client.accept("/assets/index.js", |module: LoadedModule| {
//!         println!("new source: {} bytes", module.source.len());
//!     });
//!     client.connect();
//!     client.wait_until_finished().await;
//!     Ok(())
//! }
//! ```

use crate::config::HmrConfig;
use crate::connection::{
    ConnectionManager, ConnectionPhase, ConnectionStatus, Connector, RetryPolicy, WsConnector,
};
use crate::dispatch::{CallbackRegistry, Dispatcher, HttpModuleLoader, ModuleLoader, Reloader};
use crate::error::HmrError;
use crate::error::connection::ConnectionError;

use common::ErrorLocation;

use std::panic::Location;
use std::sync::Arc;

use log::{debug, info};
use tokio::spawn as TokioSpawn;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use url::Url;

/// Parts consumed by the first `connect()`.
struct Pending<C> {
    connector: C,
    status_tx: watch::Sender<ConnectionStatus>,
}

/// Hot-module-reload client.
///
/// Dropping the client stops its connection task.
pub struct HmrClient<C: Connector, L: ModuleLoader, R: Reloader> {
    endpoint: Url,
    policy: RetryPolicy,
    dispatcher: Arc<Dispatcher<L, R>>,
    pending: Option<Pending<C>>,
    status_rx: watch::Receiver<ConnectionStatus>,
    shutdown_tx: watch::Sender<bool>,
    task: Option<JoinHandle<ConnectionPhase>>,
}

impl<R: Reloader> HmrClient<WsConnector, HttpModuleLoader, R> {
    /// Client with the WebSocket transport and HTTP module loader described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`HmrError::Config`] for an invalid config, [`HmrError::Loader`]
    /// if the HTTP client cannot be built.
    pub fn new(config: &HmrConfig, reloader: R) -> Result<Self, HmrError> {
        config.validate()?;

        let endpoint = config.endpoint_url()?;
        let loader =
            HttpModuleLoader::new(config.module_base_url()?.as_str(), config.fetch_timeout())?;
        let connector = WsConnector::new(config.connect_timeout());

        Ok(Self::with_parts(
            endpoint,
            config.retry_policy(),
            connector,
            loader,
            reloader,
        ))
    }
}

impl<C: Connector, L: ModuleLoader, R: Reloader> HmrClient<C, L, R> {
    pub fn with_parts(endpoint: Url, policy: RetryPolicy, connector: C, loader: L, reloader: R) -> Self {
        let (status_tx, status_rx) = watch::channel(ConnectionStatus::default());
        let (shutdown_tx, _) = watch::channel(false);
        let dispatcher = Dispatcher::new(CallbackRegistry::new(), loader, reloader);

        Self {
            endpoint,
            policy,
            dispatcher: Arc::new(dispatcher),
            pending: Some(Pending {
                connector,
                status_tx,
            }),
            status_rx,
            shutdown_tx,
            task: None,
        }
    }

    /// Registers `callback` for updates to `path`. Last registration wins.
    pub fn accept<F>(&self, path: impl Into<String>, callback: F)
    where
        F: Fn(L::Module) + Send + Sync + 'static,
    {
        self.dispatcher.registry().accept(path, callback);
    }

    /// Handle onto the shared registry, for code that registers later.
    pub fn registry(&self) -> CallbackRegistry<L::Module> {
        self.dispatcher.registry().clone()
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Starts the connection task. Calling it again does nothing.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn connect(&mut self) {
        let Some(Pending {
            connector,
            status_tx,
        }) = self.pending.take()
        else {
            debug!("HMR client for {} already started", self.endpoint);
            return;
        };

        info!("Starting HMR client for {}", self.endpoint);

        let mut manager =
            ConnectionManager::new(connector, self.endpoint.clone(), self.policy, status_tx);
        let dispatcher = Arc::clone(&self.dispatcher);
        let shutdown = self.shutdown_tx.subscribe();

        self.task = Some(TokioSpawn(async move {
            manager.run(dispatcher.as_ref(), shutdown).await
        }));
    }

    pub fn status(&self) -> ConnectionStatus {
        *self.status_rx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionStatus> {
        self.status_rx.clone()
    }

    /// Waits for `GaveUp` or `Stopped`.
    ///
    /// A connection task that dies without publishing a terminal phase (a
    /// panic in a reloader or loader) counts as `Stopped`; [`Self::shutdown`]
    /// then reports the failure. Never resolves for a client that was not connected.
    pub async fn wait_until_finished(&self) -> ConnectionPhase {
        let mut status_rx = self.status_rx.clone();
        let finished = status_rx
            .wait_for(|status| status.phase.is_terminal())
            .await
            .map(|status| status.phase);

        finished.unwrap_or_else(|_| {
            let last = status_rx.borrow().phase;
            if last.is_terminal() {
                last
            } else {
                debug!("HMR connection task ended in {last:?}");
                ConnectionPhase::Stopped
            }
        })
    }

    /// Stops the connection task, cancelling a pending retry timer, and waits for it.
    ///
    /// An update that is already being applied finishes first.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::Task`] if the connection task panicked.
    pub async fn shutdown(&mut self) -> Result<ConnectionPhase, HmrError> {
        self.shutdown_tx.send_replace(true);

        if let Some(Pending { status_tx, .. }) = self.pending.take() {
            status_tx.send_replace(ConnectionStatus {
                phase: ConnectionPhase::Stopped,
                retry_count: 0,
            });
            return Ok(ConnectionPhase::Stopped);
        }

        match self.task.take() {
            Some(task) => task.await.map_err(|e| {
                HmrError::from(ConnectionError::Task {
                    message: format!("HMR connection task failed: {e}"),
                    location: ErrorLocation::from(Location::caller()),
                })
            }),
            None => Ok(self.status().phase),
        }
    }
}
