//! Full reloads for a process that has no page to navigate.

use hmr_core::{ReloadReason, Reloader};

use log::debug;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

/// Forwards reload requests to the session loop, which rebuilds the client.
#[derive(Clone)]
pub struct ChannelReloader {
    tx: UnboundedSender<ReloadReason>,
}

impl ChannelReloader {
    pub fn new() -> (Self, UnboundedReceiver<ReloadReason>) {
        let (tx, rx) = unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Reloader for ChannelReloader {
    fn full_reload(&self, reason: ReloadReason) {
        if self.tx.send(reason).is_err() {
            debug!("Reload requested after the session ended");
        }
    }
}
