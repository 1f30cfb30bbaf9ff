//! Transport seam between the connection manager and the network.
//!
//! A [`Connector`] opens one transport per attempt and hands back a stream
//! of [`TransportEvent`]s. The stream ending is the close event. Nothing
//! else about the socket leaks upward, which keeps the manager testable
//! with scripted transports.

use crate::error::connection::ConnectionError;

use common::ErrorLocation;

use std::future::Future;
use std::time::Duration;

use futures_util::StreamExt;
use futures_util::stream::{self, BoxStream};
use log::{debug, trace};
use tokio::time::timeout as TokioTimeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

/// Something the transport reported while open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A text frame.
    Message(String),

    /// A transport-level error. Informational; the stream ends right after.
    Error(String),
}

/// Events of one open transport. Ends when the transport closes.
pub type TransportStream = BoxStream<'static, TransportEvent>;

/// Opens transports to the HMR endpoint.
pub trait Connector: Send + Sync + 'static {
    fn connect(
        &self,
        endpoint: &Url,
    ) -> impl Future<Output = Result<TransportStream, ConnectionError>> + Send;
}

/// WebSocket connector backed by `tokio-tungstenite`.
#[derive(Debug, Clone)]
pub struct WsConnector {
    connect_timeout: Duration,
}

impl WsConnector {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

impl Connector for WsConnector {
    async fn connect(&self, endpoint: &Url) -> Result<TransportStream, ConnectionError> {
        let handshake = connect_async(endpoint.as_str());

        let (ws_stream, _response) = TokioTimeout(self.connect_timeout, handshake)
            .await
            .map_err(|_| ConnectionError::Timeout {
                message: format!(
                    "No WebSocket handshake with {endpoint} within {:?}",
                    self.connect_timeout
                ),
                location: ErrorLocation::caller(),
            })??;

        debug!("WebSocket handshake with {endpoint} complete");

        // State is `None` once the socket has errored or closed.
        let events = stream::unfold(Some(ws_stream), |state| async move {
            let mut ws = state?;
            loop {
                match ws.next().await {
                    Some(Ok(Message::Text(text))) => {
                        return Some((TransportEvent::Message(text.as_str().to_owned()), Some(ws)));
                    }
                    Some(Ok(Message::Close(frame))) => {
                        debug!("Server closed the HMR socket: {frame:?}");
                        return None;
                    }
                    Some(Ok(Message::Binary(data))) => {
                        trace!("Skipping {} byte binary frame", data.len());
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Some((TransportEvent::Error(e.to_string()), None)),
                    None => return None,
                }
            }
        });

        Ok(events.boxed())
    }
}
