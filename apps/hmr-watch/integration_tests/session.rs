use hmr_watch::error::HmrWatchError;
use hmr_watch::session::{SessionEnd, watch};

use hmr_core::HmrConfig;

use std::net::TcpListener;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener as TokioTcpListener;
use tokio::sync::watch as tokio_watch;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

/// Config pointing at a localhost port with nothing listening.
fn unreachable_config(max_retries: u32, interval_ms: u64) -> HmrConfig {
    let port = TcpListener::bind("127.0.0.1:0")
        .and_then(|listener| listener.local_addr())
        .map(|addr| addr.port())
        .expect("Failed to probe a free port");

    let mut config = HmrConfig::default();
    config.server.host = format!("127.0.0.1:{port}");
    config.retry.max_retries = max_retries;
    config.retry.interval_ms = interval_ms;
    config
}

/// **VALUE**: Verifies that exhausting the retry budget ends the watcher with an error.
///
/// **WHY THIS MATTERS**: `main` turns this into a failing exit code. A watcher that idles
/// forever after giving up would look alive while doing nothing.
///
/// **BUG THIS CATCHES**: Would catch `GaveUp` being treated like a normal stop, or the
/// session loop rebuilding the client after giving up.
#[tokio::test]
async fn given_unreachable_server_when_watching_then_gave_up_error() {
    // GIVEN: No dev server, a budget of two retries
    let config = unreachable_config(2, 20);

    // WHEN: Watching with no shutdown request
    let result = tokio::time::timeout(
        Duration::from_secs(5),
        watch(&config, &[], std::future::pending::<()>()),
    )
    .await
    .expect("Watcher never gave up");

    // THEN: GaveUp error
    match result {
        Err(HmrWatchError::GaveUp { message, .. }) => {
            assert!(message.contains("2 retries"), "got {message}");
        }
        other => panic!("Expected GaveUp, got {other:?}"),
    }
}

/// **VALUE**: Verifies a shutdown request ends the watcher cleanly mid-retry.
///
/// **WHY THIS MATTERS**: Ctrl-C during a dev server restart must exit at once, not after
/// the remaining retry budget.
///
/// **BUG THIS CATCHES**: Would catch the retry timer not being cancelled by shutdown.
#[tokio::test]
async fn given_shutdown_requested_when_watching_then_clean_exit() {
    // GIVEN: A long retry interval that would otherwise keep the watcher busy
    let config = unreachable_config(30, 60_000);

    // WHEN: Shutdown fires shortly after start
    let result = tokio::time::timeout(
        Duration::from_secs(5),
        watch(
            &config,
            &["/src/main.js".to_string()],
            tokio::time::sleep(Duration::from_millis(100)),
        ),
    )
    .await
    .expect("Watcher ignored shutdown");

    // THEN: Clean shutdown
    assert_eq!(result.unwrap(), SessionEnd::Shutdown);
}

#[tokio::test]
async fn given_invalid_config_when_watching_then_client_error() {
    let mut config = HmrConfig::default();
    config.server.ws_path = "ws".to_string();

    let result = watch(&config, &[], std::future::pending::<()>()).await;

    assert!(matches!(result, Err(HmrWatchError::Client { .. })));
}

/// Dev server that greets every socket and asks the first `reloads` of them for a
/// full reload. Returns its `host:port` and a running count of completed handshakes.
async fn reloading_dev_server(reloads: usize) -> (String, tokio_watch::Receiver<usize>) {
    let listener = TokioTcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind dev server");
    let host = listener.local_addr().expect("No local address").to_string();
    let (count_tx, count_rx) = tokio_watch::channel(0usize);

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let count_tx = count_tx.clone();
            tokio::spawn(async move {
                let Ok(mut ws) = accept_async(stream).await else {
                    return;
                };
                let mut seen = 0;
                count_tx.send_modify(|count| {
                    *count += 1;
                    seen = *count;
                });

                let mut frames = vec![r#"{"type":"Connected"}"#];
                if seen <= reloads {
                    frames.push(r#"{"type":"FullReload"}"#);
                }
                for frame in frames {
                    if ws.send(Message::Text(frame.into())).await.is_err() {
                        return;
                    }
                }

                // Hold the socket until the client goes away.
                while let Some(Ok(_)) = ws.next().await {}
            });
        }
    });

    (host, count_rx)
}

/// **VALUE**: Verifies a full reload discards the client and starts a fresh one.
///
/// **WHY THIS MATTERS**: This is what a reload means for a process with no page: every
/// `FullReload` (or unaccepted update) must yield a brand new connection with a fresh
/// registry and retry budget, not end the watcher or be ignored.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - The session loop exits on the first reload instead of rebuilding
/// - The old client is not shut down, leaving two sockets open
/// - Reload reasons never reach the session loop
#[tokio::test]
async fn given_server_requesting_reloads_when_watching_then_client_rebuilt_each_time() {
    // GIVEN: A dev server that asks the first two connections to reload
    let (host, connections) = reloading_dev_server(2).await;
    let mut config = HmrConfig::default();
    config.server.host = host;
    config.retry.interval_ms = 50;

    // WHEN: Watching until a third connection shows up
    let mut shutdown_rx = connections.clone();
    let third_connection = async move {
        let _ = shutdown_rx.wait_for(|count| *count >= 3).await;
    };
    let result = tokio::time::timeout(
        Duration::from_secs(10),
        watch(&config, &[], third_connection),
    )
    .await
    .expect("Watcher never reached a third session");

    // THEN: Clean shutdown after exactly two rebuilds
    assert_eq!(result.unwrap(), SessionEnd::Shutdown);
    assert_eq!(*connections.borrow(), 3);
}
