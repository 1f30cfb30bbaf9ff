//! Test helpers for end-to-end HMR tests.
//!
//! - [`FakeDevServer`] - a WebSocket server on an ephemeral port that greets
//!   each client with `Connected` and then broadcasts whatever the test sends
//! - [`ChannelReloader`] - a reloader that forwards reasons to the test
//! - [`unused_port`] - a port with nothing listening on it

use hmr_core::{HmrPayload, ReloadReason, Reloader, UpdateKind, UpdatePayload};

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

/// Upper bound on any single wait in these tests.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub enum ServerCommand {
    Send(HmrPayload),
    /// Close every open socket with a close frame.
    Close,
}

pub struct FakeDevServer {
    addr: SocketAddr,
    commands: broadcast::Sender<ServerCommand>,
    connections: watch::Receiver<usize>,
    accept_task: JoinHandle<()>,
}

impl FakeDevServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake dev server");
        let addr = listener.local_addr().expect("No local address");
        let (commands, _) = broadcast::channel::<ServerCommand>(16);
        let (connections_tx, connections) = watch::channel(0usize);

        let commands_for_task = commands.clone();
        let accept_task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                // Subscribe before the handshake so nothing sent after
                // `wait_for_connections` can be missed.
                let mut rx = commands_for_task.subscribe();
                let connections_tx = connections_tx.clone();

                tokio::spawn(async move {
                    let Ok(mut ws) = accept_async(stream).await else {
                        return;
                    };
                    if ws.send(text(&HmrPayload::Connected)).await.is_err() {
                        return;
                    }
                    connections_tx.send_modify(|count| *count += 1);

                    loop {
                        tokio::select! {
                            command = rx.recv() => match command {
                                Ok(ServerCommand::Send(payload)) => {
                                    if ws.send(text(&payload)).await.is_err() {
                                        return;
                                    }
                                }
                                Ok(ServerCommand::Close) | Err(_) => {
                                    let _ = ws.close(None).await;
                                    return;
                                }
                            },
                            incoming = ws.next() => {
                                if !matches!(incoming, Some(Ok(_))) {
                                    return;
                                }
                            }
                        }
                    }
                });
            }
        });

        Self {
            addr,
            commands,
            connections,
            accept_task,
        }
    }

    pub fn ws_url(&self) -> url::Url {
        url::Url::parse(&format!("ws://{}/ws", self.addr)).expect("Invalid ws url")
    }

    pub fn send(&self, payload: HmrPayload) {
        self.commands
            .send(ServerCommand::Send(payload))
            .expect("No client connected to the fake dev server");
    }

    pub fn close_all(&self) {
        let _ = self.commands.send(ServerCommand::Close);
    }

    /// Waits until `count` clients have completed the handshake in total.
    pub async fn wait_for_connections(&self, count: usize) {
        let mut connections = self.connections.clone();
        tokio::time::timeout(TEST_TIMEOUT, connections.wait_for(|n| *n >= count))
            .await
            .expect("Timed out waiting for client connections")
            .expect("Fake dev server stopped");
    }
}

impl Drop for FakeDevServer {
    fn drop(&mut self) {
        self.accept_task.abort();
    }
}

fn text(payload: &HmrPayload) -> Message {
    let json = serde_json::to_string(payload).expect("Failed to encode payload");
    Message::Text(json.into())
}

pub fn js_update(path: &str, timestamp: u64) -> HmrPayload {
    HmrPayload::Update {
        updates: vec![UpdatePayload {
            kind: UpdateKind::JsUpdate,
            path: path.to_string(),
            timestamp,
        }],
    }
}

/// Forwards reload reasons to the test.
pub struct ChannelReloader {
    tx: mpsc::UnboundedSender<ReloadReason>,
}

impl ChannelReloader {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ReloadReason>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Reloader for ChannelReloader {
    fn full_reload(&self, reason: ReloadReason) {
        let _ = self.tx.send(reason);
    }
}

/// Receives the next item or fails the test after [`TEST_TIMEOUT`].
pub async fn recv<T>(rx: &mut mpsc::UnboundedReceiver<T>) -> T {
    tokio::time::timeout(TEST_TIMEOUT, rx.recv())
        .await
        .expect("Timed out waiting for channel")
        .expect("Channel closed")
}

/// A localhost port with no listener behind it.
pub async fn unused_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind probe listener");
    listener.local_addr().expect("No local address").port()
}
