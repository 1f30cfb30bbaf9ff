use crate::helpers::{ChannelReloader, FakeDevServer, TEST_TIMEOUT, js_update, recv, unused_port};

use hmr_core::connection::WsConnector;
use hmr_core::{
    ConnectionPhase, HmrClient, HmrConfig, HmrPayload, HttpModuleLoader, LoadedModule,
    ReloadReason, RetryPolicy,
};

use std::time::Duration;

use tokio::sync::mpsc;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============================================================================
// End-to-end tests: real WebSocket transport, real HTTP module fetches
// ============================================================================

type LiveClient = HmrClient<WsConnector, HttpModuleLoader, ChannelReloader>;

fn live_client(server: &FakeDevServer, modules: &MockServer, max_retries: u32) -> (
    LiveClient,
    mpsc::UnboundedReceiver<ReloadReason>,
) {
    let (reloader, reloads) = ChannelReloader::new();
    let loader = HttpModuleLoader::new(&modules.uri(), Duration::from_secs(2))
        .expect("Failed to build module loader");
    let client = HmrClient::with_parts(
        server.ws_url(),
        RetryPolicy {
            max_retries,
            interval: Duration::from_millis(50),
        },
        WsConnector::new(Duration::from_secs(2)),
        loader,
        reloader,
    );
    (client, reloads)
}

/// **VALUE**: Verifies the whole hot-swap path over real sockets.
///
/// **WHY THIS MATTERS**: The unit tests fake both the socket and the fetch. This is the
/// only place the WebSocket framing, the JSON encoding, and the cache-busted HTTP GET are
/// exercised together.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - Text frames are not surfaced by the WebSocket transport
/// - The specifier is resolved against the wrong base URL
/// - The `t` query parameter is dropped on the way to the server
/// - The callback receives the wrong body
#[tokio::test]
async fn given_accepted_module_when_server_sends_update_then_callback_receives_fresh_source() {
    // GIVEN: A dev server, a module server, and a client accepting /app.js
    let server = FakeDevServer::start().await;
    let modules = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/app.js"))
        .and(query_param("t", "42"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("export const answer = 42;", "application/javascript"),
        )
        .expect(1)
        .mount(&modules)
        .await;

    let (mut client, mut reloads) = live_client(&server, &modules, 3);
    let (module_tx, mut module_rx) = mpsc::unbounded_channel::<LoadedModule>();
    client.accept("/app.js", move |module| {
        let _ = module_tx.send(module);
    });
    client.connect();
    server.wait_for_connections(1).await;

    // WHEN: The server reports a change to /app.js
    server.send(js_update("/app.js", 42));

    // THEN: The callback gets the freshly fetched module and nothing reloads
    let module = recv(&mut module_rx).await;
    assert_eq!(module.specifier, "/app.js?t=42");
    assert_eq!(module.source, "export const answer = 42;");
    assert_eq!(module.url.query(), Some("t=42"));
    assert_eq!(
        module.content_type.as_deref(),
        Some("application/javascript")
    );
    assert!(reloads.try_recv().is_err());

    assert_eq!(client.shutdown().await.unwrap(), ConnectionPhase::Stopped);
}

/// **VALUE**: Verifies that updates without a callback, and server reload requests,
/// reach the host's reloader.
///
/// **WHY THIS MATTERS**: The reloader is the only fallback the host has. If it is not
/// reached, the page keeps running stale code.
///
/// **BUG THIS CATCHES**: Would catch an unaccepted update being dropped, or `FullReload`
/// frames not reaching the dispatcher.
#[tokio::test]
async fn given_unaccepted_update_and_full_reload_when_received_then_reloader_called() {
    // GIVEN: A connected client with no callbacks
    let server = FakeDevServer::start().await;
    let modules = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/main.js"))
        .respond_with(ResponseTemplate::new(200).set_body_string("main"))
        .mount(&modules)
        .await;

    let (mut client, mut reloads) = live_client(&server, &modules, 3);
    client.connect();
    server.wait_for_connections(1).await;

    // WHEN: An update nobody accepted, then an explicit reload request
    server.send(js_update("/main.js", 7));
    server.send(HmrPayload::FullReload);

    // THEN: Two reloads, in order
    assert_eq!(
        recv(&mut reloads).await,
        ReloadReason::Unaccepted {
            path: "/main.js".to_string()
        }
    );
    assert_eq!(recv(&mut reloads).await, ReloadReason::ServerRequested);

    client.shutdown().await.unwrap();
}

/// **VALUE**: Verifies a missing module falls back to a reload.
///
/// **WHY THIS MATTERS**: A module deleted between the change event and the fetch is a
/// normal race during refactors.
///
/// **BUG THIS CATCHES**: Would catch non-2xx responses being handed to callbacks as source.
#[tokio::test]
async fn given_module_missing_on_server_when_update_arrives_then_fetch_failure_reload() {
    let server = FakeDevServer::start().await;
    let modules = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gone.js"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&modules)
        .await;

    let (mut client, mut reloads) = live_client(&server, &modules, 3);
    client.accept("/gone.js", |_module| panic!("callback must not run"));
    client.connect();
    server.wait_for_connections(1).await;

    server.send(js_update("/gone.js", 1));

    match recv(&mut reloads).await {
        ReloadReason::FetchFailed { path, .. } => assert_eq!(path, "/gone.js"),
        other => panic!("Expected FetchFailed, got {other:?}"),
    }

    client.shutdown().await.unwrap();
}

/// **VALUE**: Verifies the client reconnects after the server drops the socket.
///
/// **WHY THIS MATTERS**: Dev servers restart constantly; every restart closes the socket.
///
/// **BUG THIS CATCHES**: Would catch a close frame being treated as terminal, or the
/// retry timer never firing.
#[tokio::test]
async fn given_connected_client_when_server_closes_socket_then_reconnects() {
    // GIVEN: A connected client
    let server = FakeDevServer::start().await;
    let modules = MockServer::start().await;
    let (mut client, _reloads) = live_client(&server, &modules, 5);
    client.connect();
    server.wait_for_connections(1).await;

    // WHEN: The server closes the socket
    server.close_all();

    // THEN: A second handshake arrives and the client is connected again
    server.wait_for_connections(2).await;
    let mut status = client.subscribe();
    let reconnected = tokio::time::timeout(
        TEST_TIMEOUT,
        status.wait_for(|s| s.phase == ConnectionPhase::Connected && s.retry_count == 0),
    )
    .await;
    assert!(reconnected.is_ok(), "client did not report reconnection");
    // Release the watch read guard before shutdown publishes a new status.
    drop(reconnected);

    client.shutdown().await.unwrap();
}

/// **VALUE**: Verifies the config-driven client gives up on an unreachable server.
///
/// **WHY THIS MATTERS**: `HmrClient::new` is the constructor hosts use. It must honour
/// `retry.max_retries` and end in `GaveUp`, not an error or a hang.
///
/// **BUG THIS CATCHES**: Would catch the config's retry section not reaching the
/// connection manager.
#[tokio::test]
async fn given_nothing_listening_when_connecting_then_gives_up_after_budget() {
    // GIVEN: A config pointing at a closed port with a small budget
    let mut config = HmrConfig::default();
    config.server.host = format!("127.0.0.1:{}", unused_port().await);
    config.retry.max_retries = 3;
    config.retry.interval_ms = 20;
    let (reloader, _reloads) = ChannelReloader::new();
    let mut client = HmrClient::new(&config, reloader).expect("Failed to build client");

    // WHEN: Connecting
    client.connect();
    let phase = tokio::time::timeout(TEST_TIMEOUT, client.wait_until_finished())
        .await
        .expect("Client never gave up");

    // THEN: GaveUp after exactly the configured number of retries
    assert_eq!(phase, ConnectionPhase::GaveUp);
    assert_eq!(client.status().retry_count, 3);
    assert_eq!(client.shutdown().await.unwrap(), ConnectionPhase::GaveUp);
}
