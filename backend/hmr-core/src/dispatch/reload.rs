//! The full-reload fallback.

use std::fmt::{Display, Formatter, Result as FormatResult};

/// Why the client asked for a full reload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadReason {
    /// The server sent `FullReload`.
    ServerRequested,

    /// An update arrived for a path nobody accepted.
    Unaccepted { path: String },

    /// The updated module could not be fetched.
    FetchFailed { path: String, message: String },

    /// An accept callback panicked while applying the update.
    CallbackPanicked { path: String },
}

impl Display for ReloadReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> FormatResult {
        match self {
            ReloadReason::ServerRequested => write!(f, "server requested a full reload"),
            ReloadReason::Unaccepted { path } => write!(f, "no accept callback for {path}"),
            ReloadReason::FetchFailed { path, message } => {
                write!(f, "failed to fetch {path}: {message}")
            }
            ReloadReason::CallbackPanicked { path } => {
                write!(f, "accept callback for {path} panicked")
            }
        }
    }
}

/// Discards all client state and starts over.
///
/// In a browser this is a page navigation. Hosts decide what it means for
/// them; `hmr-watch` rebuilds its client from scratch.
pub trait Reloader: Send + Sync + 'static {
    fn full_reload(&self, reason: ReloadReason);
}
