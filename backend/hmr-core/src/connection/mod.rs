//! Connection Manager: one live transport to the dev server at a time,
//! re-established after loss under a bounded retry policy.
//!
//! - [`state`] - retry bookkeeping, no I/O
//! - [`transport`] - the [`Connector`] seam and its WebSocket implementation
//! - [`manager`] - the async driver tying both together

pub mod manager;
pub mod state;
pub mod transport;

pub use manager::{ConnectionManager, FrameHandler};
pub use state::{ConnectionPhase, ConnectionState, ConnectionStatus, RetryDecision, RetryPolicy};
pub use transport::{Connector, TransportEvent, TransportStream, WsConnector};
