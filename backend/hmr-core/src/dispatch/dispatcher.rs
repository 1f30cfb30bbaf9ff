//! Routes decoded frames to accept callbacks or to a full reload.

use crate::connection::FrameHandler;
use crate::dispatch::loader::ModuleLoader;
use crate::dispatch::registry::{CallbackRegistry, UpdateCallback};
use crate::dispatch::reload::{ReloadReason, Reloader};
use crate::protocol::{HmrPayload, UpdatePayload, decode};

use std::panic::{AssertUnwindSafe, catch_unwind};

use futures_util::future::join_all;
use log::{debug, error, info, trace, warn};

/// What handling one frame amounted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Nothing to apply (greeting, ping, server error, bad frame, style-only update).
    Ignored,

    /// Every code update in the frame was hot-swapped.
    Applied { modules: usize },

    /// A full reload was requested.
    Reloaded(ReloadReason),
}

pub struct Dispatcher<L: ModuleLoader, R: Reloader> {
    registry: CallbackRegistry<L::Module>,
    loader: L,
    reloader: R,
}

impl<L: ModuleLoader, R: Reloader> Dispatcher<L, R> {
    pub fn new(registry: CallbackRegistry<L::Module>, loader: L, reloader: R) -> Self {
        Self {
            registry,
            loader,
            reloader,
        }
    }

    pub fn registry(&self) -> &CallbackRegistry<L::Module> {
        &self.registry
    }

    /// Decodes and handles one text frame.
    ///
    /// Frames that fail to decode are logged and dropped. They never reach
    /// the registry, never reload, and never stop the caller's read loop.
    pub async fn handle_text(&self, text: &str) -> DispatchOutcome {
        match decode(text) {
            Ok(payload) => self.handle_message(payload).await,
            Err(e) => {
                warn!("Dropping HMR frame: {e}");
                DispatchOutcome::Ignored
            }
        }
    }

    pub async fn handle_message(&self, payload: HmrPayload) -> DispatchOutcome {
        match payload {
            HmrPayload::Connected => {
                info!("Server connected");
                DispatchOutcome::Ignored
            }
            HmrPayload::Ping => {
                trace!("Ping");
                DispatchOutcome::Ignored
            }
            HmrPayload::Update { updates } => self.apply_updates(updates).await,
            HmrPayload::FullReload => self.reload(ReloadReason::ServerRequested),
            HmrPayload::Error { message } => {
                match message {
                    Some(message) => error!("Error received from server: {message}"),
                    None => error!("Error received from server"),
                }
                DispatchOutcome::Ignored
            }
        }
    }

    /// Fetches all code updates concurrently, then applies them.
    ///
    /// Every entry is resolved before any callback runs: if one of them
    /// cannot be hot-swapped the frame ends in a single reload and no
    /// callback fires.
    async fn apply_updates(&self, updates: Vec<UpdatePayload>) -> DispatchOutcome {
        for update in &updates {
            info!("Updated: {}", update.path);
            if !update.is_code() {
                debug!(
                    "Style update for {} ignored, style hot-swap is not supported",
                    update.path
                );
            }
        }

        let code_updates: Vec<&UpdatePayload> = updates.iter().filter(|u| u.is_code()).collect();
        if code_updates.is_empty() {
            return DispatchOutcome::Ignored;
        }

        let fetched = join_all(code_updates.iter().map(|update| async move {
            let specifier = update.specifier();
            (*update, self.loader.load(&specifier).await)
        }))
        .await;

        let mut ready: Vec<(&UpdatePayload, UpdateCallback<L::Module>, L::Module)> =
            Vec::with_capacity(fetched.len());

        for (update, result) in fetched {
            let module = match result {
                Ok(module) => module,
                Err(e) => {
                    error!("Failed to load {}: {e}", update.specifier());
                    return self.reload(ReloadReason::FetchFailed {
                        path: update.path.clone(),
                        message: e.to_string(),
                    });
                }
            };

            match self.registry.get(&update.path) {
                Some(callback) => ready.push((update, callback, module)),
                None => {
                    return self.reload(ReloadReason::Unaccepted {
                        path: update.path.clone(),
                    });
                }
            }
        }

        let modules = ready.len();
        for (update, callback, module) in ready {
            if catch_unwind(AssertUnwindSafe(|| callback(module))).is_err() {
                error!("Accept callback for {} panicked", update.path);
                return self.reload(ReloadReason::CallbackPanicked {
                    path: update.path.clone(),
                });
            }
            debug!("Hot-swapped {}", update.path);
        }

        DispatchOutcome::Applied { modules }
    }

    fn reload(&self, reason: ReloadReason) -> DispatchOutcome {
        info!("Full reload: {reason}");
        self.reloader.full_reload(reason.clone());
        DispatchOutcome::Reloaded(reason)
    }
}

impl<L: ModuleLoader, R: Reloader> FrameHandler for Dispatcher<L, R> {
    async fn handle_frame(&self, text: String) {
        self.handle_text(&text).await;
    }
}
