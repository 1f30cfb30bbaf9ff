//! The watch loop: one client per page lifetime.
//!
//! A full reload discards the whole client (registry, connection, retry
//! count) and starts a fresh one, which is what reloading a page does.

use crate::error::HmrWatchError;
use crate::reloader::ChannelReloader;

use common::ErrorLocation;

use hmr_core::{ConnectionPhase, HmrClient, HmrConfig, LoadedModule, ReloadReason};

use std::future::Future;
use std::panic::Location;
use std::pin::pin;

use log::info;

/// How a watch session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    /// The process was asked to stop.
    Shutdown,
    /// The connection task finished on its own (stopped from elsewhere).
    Finished,
}

/// What ended one client's lifetime.
enum ClientEnd {
    Reload(Option<ReloadReason>),
    Finished(ConnectionPhase),
    Shutdown,
}

/// Runs clients until `shutdown` resolves or a client gives up.
///
/// Every path in `accept` is registered on each new client. Accepted modules
/// are logged, everything else ends in a rebuild.
///
/// # Errors
///
/// - [`HmrWatchError::GaveUp`] - the dev server stayed unreachable for the whole retry budget
/// - [`HmrWatchError::Client`] - the config is invalid or the connection task failed (panicked)
pub async fn watch(
    config: &HmrConfig,
    accept: &[String],
    shutdown: impl Future<Output = ()>,
) -> Result<SessionEnd, HmrWatchError> {
    let mut shutdown = pin!(shutdown);
    let mut generation: u64 = 0;

    loop {
        generation += 1;
        let (reloader, mut reloads) = ChannelReloader::new();
        let mut client = HmrClient::new(config, reloader)?;
        for path in accept {
            client.accept(path.clone(), log_module);
        }

        info!(
            "Watching {} (session {generation}, {} accepted path(s))",
            client.endpoint(),
            accept.len()
        );
        client.connect();

        let end = tokio::select! {
            reason = reloads.recv() => ClientEnd::Reload(reason),
            phase = client.wait_until_finished() => ClientEnd::Finished(phase),
            _ = &mut shutdown => ClientEnd::Shutdown,
        };

        match end {
            ClientEnd::Reload(reason) => {
                match reason {
                    Some(reason) => info!("Full reload ({reason}), starting a new session"),
                    None => info!("Reloader closed, starting a new session"),
                }
                client.shutdown().await?;
            }
            ClientEnd::Finished(ConnectionPhase::GaveUp) => {
                let status = client.status();
                return Err(HmrWatchError::GaveUp {
                    message: format!(
                        "{} unreachable after {} retries",
                        client.endpoint(),
                        status.retry_count
                    ),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
            ClientEnd::Finished(phase) => {
                // Surfaces a panicked connection task as an error.
                client.shutdown().await?;
                info!("HMR client finished in {phase:?}");
                return Ok(SessionEnd::Finished);
            }
            ClientEnd::Shutdown => {
                client.shutdown().await?;
                info!("Shutting down");
                return Ok(SessionEnd::Shutdown);
            }
        }
    }
}

fn log_module(module: LoadedModule) {
    info!(
        "Hot-swapped {} ({} bytes, {})",
        module.specifier,
        module.source.len(),
        module.content_type.as_deref().unwrap_or("unknown type")
    );
}
