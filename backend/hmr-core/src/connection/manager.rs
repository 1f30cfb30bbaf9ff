//! Connection lifecycle driver.
//!
//! [`ConnectionManager::run`] owns the transport and the [`ConnectionState`]
//! for the lifetime of one client. It opens a transport, feeds every text
//! frame to a [`FrameHandler`] in delivery order, and when the transport goes
//! away either waits the fixed retry delay and opens a fresh one, or gives up
//! for good.
//!
//! # Ordering
//!
//! A frame is handled to completion before the next one is read, so a slow
//! `Update` holds back later `Ping`s without dropping them.
//!
//! # Cancellation
//!
//! Only the shutdown signal cancels anything: a pending connect or a pending
//! retry timer. A frame already being handled always runs to completion.

use crate::connection::state::{
    ConnectionPhase, ConnectionState, ConnectionStatus, RetryDecision, RetryPolicy,
};
use crate::connection::transport::{Connector, TransportEvent, TransportStream};

use std::future::Future;

use futures_util::StreamExt;
use log::{debug, info, trace, warn};
use tokio::sync::watch;
use tokio::time::sleep as TokioSleep;
use url::Url;

/// Receives text frames from the connection manager.
pub trait FrameHandler: Send + Sync {
    fn handle_frame(&self, text: String) -> impl Future<Output = ()> + Send;
}

/// How a single open transport ended.
enum TransportEnd {
    Closed,
    Shutdown,
}

pub struct ConnectionManager<C: Connector> {
    connector: C,
    endpoint: Url,
    state: ConnectionState,
    status_tx: watch::Sender<ConnectionStatus>,
}

impl<C: Connector> ConnectionManager<C> {
    pub fn new(
        connector: C,
        endpoint: Url,
        policy: RetryPolicy,
        status_tx: watch::Sender<ConnectionStatus>,
    ) -> Self {
        let state = ConnectionState::new(policy);
        status_tx.send_replace(state.status());

        Self {
            connector,
            endpoint,
            state,
            status_tx,
        }
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    /// Runs until the retry budget is exhausted or `shutdown` fires.
    ///
    /// Returns the terminal phase: [`ConnectionPhase::GaveUp`] or
    /// [`ConnectionPhase::Stopped`]. Giving up is logged, never returned as
    /// an error.
    ///
    /// `shutdown` fires when its value becomes `true` or its sender is dropped.
    pub async fn run<H: FrameHandler>(
        &mut self,
        handler: &H,
        mut shutdown: watch::Receiver<bool>,
    ) -> ConnectionPhase {
        loop {
            if *shutdown.borrow() {
                return self.stop();
            }

            self.state.on_connecting();
            self.publish();
            debug!("Connecting to {}", self.endpoint);

            let attempt = tokio::select! {
                result = self.connector.connect(&self.endpoint) => Some(result),
                _ = shutdown_signal(&mut shutdown) => None,
            };

            match attempt {
                None => return self.stop(),
                Some(Ok(transport)) => {
                    self.state.on_open();
                    self.publish();
                    info!("Connected to {}", self.endpoint);

                    match self.drive(transport, handler, &mut shutdown).await {
                        TransportEnd::Shutdown => return self.stop(),
                        TransportEnd::Closed => debug!("Disconnected from {}", self.endpoint),
                    }
                }
                Some(Err(e)) => debug!("Connection attempt failed: {e}"),
            }

            match self.state.on_close() {
                RetryDecision::Retry { attempt, delay } => {
                    info!(
                        "Disconnected, retrying in {delay:?}... ({attempt}/{})",
                        self.state.policy().max_retries
                    );
                    self.publish();

                    tokio::select! {
                        _ = TokioSleep(delay) => {}
                        _ = shutdown_signal(&mut shutdown) => return self.stop(),
                    }
                }
                RetryDecision::GiveUp => {
                    let policy = self.state.policy();
                    warn!(
                        "Gave up on {} after {} retries ({:?} apart); restart the client to reconnect",
                        self.endpoint, policy.max_retries, policy.interval
                    );
                    self.publish();
                    return ConnectionPhase::GaveUp;
                }
            }
        }
    }

    /// Pumps one transport until it closes.
    async fn drive<H: FrameHandler>(
        &mut self,
        mut transport: TransportStream,
        handler: &H,
        shutdown: &mut watch::Receiver<bool>,
    ) -> TransportEnd {
        loop {
            tokio::select! {
                event = transport.next() => match event {
                    Some(TransportEvent::Message(text)) => {
                        trace!("Frame received: {text}");
                        handler.handle_frame(text).await;
                    }
                    Some(TransportEvent::Error(reason)) => {
                        self.state.on_error();
                        debug!("Transport error on {}: {reason}", self.endpoint);
                    }
                    None => return TransportEnd::Closed,
                },
                _ = shutdown_signal(shutdown) => return TransportEnd::Shutdown,
            }
        }
    }

    fn stop(&mut self) -> ConnectionPhase {
        self.state.on_stop();
        self.publish();
        info!("HMR connection to {} stopped", self.endpoint);
        ConnectionPhase::Stopped
    }

    fn publish(&self) {
        self.status_tx.send_replace(self.state.status());
    }
}

/// Resolves once shutdown is requested or the requesting side is gone.
async fn shutdown_signal(shutdown: &mut watch::Receiver<bool>) {
    // Err means the sender was dropped, which also ends the client.
    let _ = shutdown.wait_for(|stop| *stop).await;
}
