// Unit tests for the connection driver, run against scripted transports on
// tokio's paused clock so retry delays cost no wall time.

use crate::connection::{
    ConnectionManager, ConnectionPhase, ConnectionStatus, RetryPolicy, TransportEvent,
};
use crate::tests::support::{RecordingHandler, Script, ScriptedConnector, test_endpoint};

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

fn policy(max_retries: u32) -> RetryPolicy {
    RetryPolicy {
        max_retries,
        interval: Duration::from_secs(2),
    }
}

fn manager(
    connector: ScriptedConnector,
    policy: RetryPolicy,
) -> (
    ConnectionManager<ScriptedConnector>,
    watch::Receiver<ConnectionStatus>,
) {
    let (status_tx, status_rx) = watch::channel(ConnectionStatus::default());
    (
        ConnectionManager::new(connector, test_endpoint(), policy, status_tx),
        status_rx,
    )
}

/// **VALUE**: Verifies the default budget: 30 scheduled reconnects, then silence.
///
/// **WHY THIS MATTERS**: This is the whole failure story of the client. A dev server that
/// never comes back must cost exactly one minute of retries and then nothing.
///
/// **BUG THIS CATCHES**: Would catch an off-by-one in the budget, a growing delay, or a
/// manager that keeps dialling after giving up.
#[tokio::test(start_paused = true)]
async fn given_server_never_reachable_when_running_then_retries_thirty_times_and_gives_up() {
    // GIVEN: A connector that always refuses and the default policy
    let connector = ScriptedConnector::refusing();
    let (mut manager, status_rx) = manager(connector.clone(), RetryPolicy::default());
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    let handler = RecordingHandler::default();
    let started = Instant::now();

    // WHEN: Running to completion
    let phase = manager.run(&handler, shutdown_rx).await;

    // THEN: Initial attempt plus 30 retries, 2s apart, then GaveUp
    assert_eq!(phase, ConnectionPhase::GaveUp);
    assert_eq!(connector.attempts(), 31);
    assert_eq!(manager.state().retry_count(), 30);
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(60), "retried too fast: {elapsed:?}");
    assert!(elapsed < Duration::from_secs(61), "retried too slow: {elapsed:?}");
    assert_eq!(status_rx.borrow().phase, ConnectionPhase::GaveUp);
}

/// **VALUE**: Verifies that a successful open restores the full retry budget.
///
/// **WHY THIS MATTERS**: Restarting the dev server a few times in one session must not
/// eventually exhaust the client.
///
/// **BUG THIS CATCHES**: Would catch if the manager never calls `on_open()`, which would
/// make it give up after 4 attempts here instead of 6.
#[tokio::test(start_paused = true)]
async fn given_open_between_failures_when_running_then_retry_count_restarts() {
    // GIVEN: Two refusals, one short-lived connection, then refusals forever
    let connector = ScriptedConnector::new(vec![
        Script::Refuse,
        Script::Refuse,
        Script::Open(Vec::new()),
    ]);
    let (mut manager, _status_rx) = manager(connector.clone(), policy(3));
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);

    // WHEN: Running to completion
    let phase = manager.run(&RecordingHandler::default(), shutdown_rx).await;

    // THEN: Three attempts before the open, three after
    assert_eq!(phase, ConnectionPhase::GaveUp);
    assert_eq!(connector.attempts(), 6);
}

/// **VALUE**: Verifies in-order delivery and that transport errors do not cost retries.
///
/// **WHY THIS MATTERS**: Updates must be applied in the order the server sent them, and an
/// error followed by a close is one failure, not two.
///
/// **BUG THIS CATCHES**: Would catch reordered frames, frames dropped around an error, or
/// an error that triggers its own reconnect.
#[tokio::test(start_paused = true)]
async fn given_frames_and_errors_when_transport_delivers_then_frames_arrive_in_order() {
    // GIVEN: One connection delivering frames with errors mixed in
    let connector = ScriptedConnector::new(vec![Script::Open(vec![
        TransportEvent::Message("first".to_string()),
        TransportEvent::Error("reset by peer".to_string()),
        TransportEvent::Message("second".to_string()),
        TransportEvent::Error("reset by peer".to_string()),
        TransportEvent::Message("third".to_string()),
    ])]);
    let (mut manager, _status_rx) = manager(connector.clone(), policy(1));
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    let handler = RecordingHandler::default();

    // WHEN: Running to completion
    let phase = manager.run(&handler, shutdown_rx).await;

    // THEN: All frames in order, and exactly one reconnect for the single close
    assert_eq!(handler.frames(), vec!["first", "second", "third"]);
    assert_eq!(phase, ConnectionPhase::GaveUp);
    assert_eq!(connector.attempts(), 2);
}

/// **VALUE**: Verifies that shutdown cancels a pending retry timer.
///
/// **WHY THIS MATTERS**: The retry timer is the one piece of scheduled work the client owns.
/// Shutdown must not leave it behind to open a socket later.
///
/// **BUG THIS CATCHES**: Would catch if the retry sleep is not raced against the shutdown signal.
#[tokio::test(start_paused = true)]
async fn given_retry_pending_when_shutdown_then_stops_without_reconnecting() {
    // GIVEN: Manager waiting on its first retry timer
    let connector = ScriptedConnector::refusing();
    let (mut manager, mut status_rx) = manager(connector.clone(), policy(30));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let task = tokio::spawn(async move {
        let phase = manager.run(&RecordingHandler::default(), shutdown_rx).await;
        (phase, manager.state().retry_count())
    });

    status_rx
        .wait_for(|s| matches!(s.phase, ConnectionPhase::Retrying { .. }))
        .await
        .unwrap();

    // WHEN: Shutdown is requested
    shutdown_tx.send_replace(true);
    let (phase, retry_count) = task.await.unwrap();

    // THEN: Stopped, and the pending retry never dialled
    assert_eq!(phase, ConnectionPhase::Stopped);
    assert_eq!(retry_count, 1);
    assert_eq!(connector.attempts(), 1);
    assert_eq!(status_rx.borrow().phase, ConnectionPhase::Stopped);
}

/// **VALUE**: Verifies that shutdown ends an open connection.
///
/// **WHY THIS MATTERS**: A healthy socket never closes by itself, so shutdown is the only
/// way out of the read loop.
///
/// **BUG THIS CATCHES**: Would catch a read loop that ignores the shutdown signal.
#[tokio::test(start_paused = true)]
async fn given_open_connection_when_shutdown_then_stops() {
    // GIVEN: Manager holding an open transport
    let connector = ScriptedConnector::new(vec![Script::Hold]);
    let (mut manager, mut status_rx) = manager(connector.clone(), policy(30));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let task = tokio::spawn(async move {
        manager.run(&RecordingHandler::default(), shutdown_rx).await
    });

    status_rx
        .wait_for(|s| s.phase == ConnectionPhase::Connected)
        .await
        .unwrap();

    // WHEN: Shutdown is requested
    shutdown_tx.send_replace(true);

    // THEN: Stopped after one attempt
    assert_eq!(task.await.unwrap(), ConnectionPhase::Stopped);
    assert_eq!(connector.attempts(), 1);
}

#[tokio::test(start_paused = true)]
async fn given_shutdown_sender_dropped_when_running_then_stops() {
    let connector = ScriptedConnector::new(vec![Script::Hold]);
    let (mut manager, _status_rx) = manager(connector, policy(30));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    drop(shutdown_tx);

    let phase = manager.run(&RecordingHandler::default(), shutdown_rx).await;

    assert_eq!(phase, ConnectionPhase::Stopped);
}
