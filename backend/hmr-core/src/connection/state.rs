//! Retry bookkeeping for the HMR socket.
//!
//! [`ConnectionState`] is the whole mutable state of a connection apart from
//! the transport itself: which phase it is in and how many consecutive
//! reconnects have been scheduled. It performs no I/O, so every transition
//! can be exercised directly in unit tests.

use crate::{DEFAULT_MAX_RETRIES, DEFAULT_RETRY_INTERVAL};

use std::time::Duration;

use backoff::backoff::{Backoff, Constant};

/// Bounded reconnect policy: a fixed number of attempts, a fixed delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            interval: DEFAULT_RETRY_INTERVAL,
        }
    }
}

/// Where the connection currently is.
///
/// ```text
/// Idle -> Connecting -> Connected -> Retrying -> Connecting -> ...
///                   \______________/      \-> GaveUp
/// ```
///
/// `GaveUp` and `Stopped` have no outgoing transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    Idle,
    Connecting,
    Connected,
    Retrying { attempt: u32, delay: Duration },
    GaveUp,
    Stopped,
}

impl ConnectionPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConnectionPhase::GaveUp | ConnectionPhase::Stopped)
    }
}

/// Snapshot published to observers on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionStatus {
    pub phase: ConnectionPhase,
    pub retry_count: u32,
}

impl Default for ConnectionStatus {
    fn default() -> Self {
        Self {
            phase: ConnectionPhase::Idle,
            retry_count: 0,
        }
    }
}

/// What to do after the transport went away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Wait `delay`, then open a new transport. `attempt` is the new retry count.
    Retry { attempt: u32, delay: Duration },

    /// Retry budget exhausted. Nothing more will be attempted.
    GiveUp,
}

pub struct ConnectionState {
    policy: RetryPolicy,
    backoff: Constant,
    retry_count: u32,
    phase: ConnectionPhase,
}

impl ConnectionState {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            backoff: Constant::new(policy.interval),
            retry_count: 0,
            phase: ConnectionPhase::Idle,
        }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn phase(&self) -> ConnectionPhase {
        self.phase
    }

    pub fn status(&self) -> ConnectionStatus {
        ConnectionStatus {
            phase: self.phase,
            retry_count: self.retry_count,
        }
    }

    /// A new transport is being opened.
    pub fn on_connecting(&mut self) {
        if !self.phase.is_terminal() {
            self.phase = ConnectionPhase::Connecting;
        }
    }

    /// The transport opened. Clears the retry budget.
    pub fn on_open(&mut self) {
        if self.phase.is_terminal() {
            return;
        }
        self.retry_count = 0;
        self.backoff.reset();
        self.phase = ConnectionPhase::Connected;
    }

    /// The transport reported an error.
    ///
    /// Informational only. The close that follows drives the retry, so a
    /// single failure is never counted twice.
    pub fn on_error(&mut self) {}

    /// The transport closed, or failed to open at all.
    pub fn on_close(&mut self) -> RetryDecision {
        if self.phase.is_terminal() || self.retry_count >= self.policy.max_retries {
            if self.phase != ConnectionPhase::Stopped {
                self.phase = ConnectionPhase::GaveUp;
            }
            return RetryDecision::GiveUp;
        }

        self.retry_count += 1;
        let delay = self.backoff.next_backoff().unwrap_or(self.policy.interval);
        self.phase = ConnectionPhase::Retrying {
            attempt: self.retry_count,
            delay,
        };

        RetryDecision::Retry {
            attempt: self.retry_count,
            delay,
        }
    }

    /// Explicit shutdown. Final.
    pub fn on_stop(&mut self) {
        self.phase = ConnectionPhase::Stopped;
    }
}
