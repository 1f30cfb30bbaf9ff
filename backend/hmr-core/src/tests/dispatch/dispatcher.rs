// Unit tests for frame routing: callbacks, full reloads, and dropped frames.

use crate::dispatch::{CallbackRegistry, DispatchOutcome, Dispatcher, ReloadReason};
use crate::protocol::{HmrPayload, UpdateKind, UpdatePayload};
use crate::tests::support::{FakeModule, RecordingLoader, RecordingReloader};

use std::sync::{Arc, Mutex};

type TestDispatcher = Dispatcher<RecordingLoader, RecordingReloader>;

fn dispatcher() -> (TestDispatcher, RecordingLoader, RecordingReloader) {
    let loader = RecordingLoader::default();
    let reloader = RecordingReloader::default();
    let dispatcher = Dispatcher::new(CallbackRegistry::new(), loader.clone(), reloader.clone());
    (dispatcher, loader, reloader)
}

/// Callback that records the modules it receives.
fn recording_callback(
    seen: &Arc<Mutex<Vec<FakeModule>>>,
) -> impl Fn(FakeModule) + Send + Sync + 'static {
    let seen = Arc::clone(seen);
    move |module| seen.lock().unwrap().push(module)
}

const APP_UPDATE: &str =
    r#"{"type":"Update","updates":[{"type":"JsUpdate","path":"/app.js","timestamp":42}]}"#;

/// **VALUE**: The canonical hot-swap: accepted path, fresh fetch, callback, no reload.
///
/// **WHY THIS MATTERS**: This is the feature. If it regresses every edit becomes a full reload.
///
/// **BUG THIS CATCHES**: Would catch a missing cache-buster, a callback invoked zero or two
/// times, or a reload fired alongside a successful swap.
#[tokio::test]
async fn given_accepted_path_when_js_update_arrives_then_callback_gets_fresh_module() {
    // GIVEN: Registry {"/app.js": cb}
    let (dispatcher, loader, reloader) = dispatcher();
    let seen = Arc::new(Mutex::new(Vec::new()));
    dispatcher
        .registry()
        .accept("/app.js", recording_callback(&seen));

    // WHEN: Update for /app.js at timestamp 42 arrives
    let outcome = dispatcher.handle_text(APP_UPDATE).await;

    // THEN: Fetched /app.js?t=42, callback ran once with that module, no reload
    assert_eq!(outcome, DispatchOutcome::Applied { modules: 1 });
    assert_eq!(loader.requests(), vec!["/app.js?t=42"]);
    assert_eq!(
        *seen.lock().unwrap(),
        vec![FakeModule {
            specifier: "/app.js?t=42".to_string()
        }]
    );
    assert!(reloader.reasons().is_empty());
}

/// **VALUE**: An update nobody accepted falls back to a full reload.
///
/// **WHY THIS MATTERS**: Running stale code silently is worse than reloading.
///
/// **BUG THIS CATCHES**: Would catch if unaccepted updates are dropped instead of reloading.
#[tokio::test]
async fn given_empty_registry_when_js_update_arrives_then_full_reload() {
    // GIVEN: Empty registry
    let (dispatcher, loader, reloader) = dispatcher();

    // WHEN: Same update arrives
    let outcome = dispatcher.handle_text(APP_UPDATE).await;

    // THEN: Module was still fetched, then a single reload naming the path
    let reason = ReloadReason::Unaccepted {
        path: "/app.js".to_string(),
    };
    assert_eq!(outcome, DispatchOutcome::Reloaded(reason.clone()));
    assert_eq!(loader.requests(), vec!["/app.js?t=42"]);
    assert_eq!(reloader.reasons(), vec![reason]);
}

/// **VALUE**: An unaccepted path in a batch suppresses every other callback.
///
/// **WHY THIS MATTERS**: The reload throws the runtime away; half-applying the batch first
/// would run callbacks against state that is about to be discarded.
///
/// **BUG THIS CATCHES**: Would catch callbacks firing before the unroutable entry is seen.
#[tokio::test]
async fn given_batch_with_unaccepted_path_when_update_arrives_then_no_callback_runs() {
    // GIVEN: Only /a.js is accepted
    let (dispatcher, _loader, reloader) = dispatcher();
    let seen = Arc::new(Mutex::new(Vec::new()));
    dispatcher.registry().accept("/a.js", recording_callback(&seen));

    // WHEN: Batch updates /a.js and /b.js
    let outcome = dispatcher
        .handle_message(HmrPayload::Update {
            updates: vec![
                UpdatePayload {
                    kind: UpdateKind::JsUpdate,
                    path: "/a.js".to_string(),
                    timestamp: 1,
                },
                UpdatePayload {
                    kind: UpdateKind::JsUpdate,
                    path: "/b.js".to_string(),
                    timestamp: 1,
                },
            ],
        })
        .await;

    // THEN: One reload for /b.js, and /a.js's callback never ran
    assert_eq!(
        outcome,
        DispatchOutcome::Reloaded(ReloadReason::Unaccepted {
            path: "/b.js".to_string()
        })
    );
    assert_eq!(reloader.reasons().len(), 1);
    assert!(seen.lock().unwrap().is_empty());
}

/// **VALUE**: Every code entry is fetched, and callbacks run in message order.
///
/// **WHY THIS MATTERS**: A batch comes from one file-system event; applying it out of order
/// could leave a dependent module bound to the old version of its dependency.
///
/// **BUG THIS CATCHES**: Would catch fetches that skip entries or callbacks that run in
/// completion order instead of message order.
#[tokio::test]
async fn given_batch_of_accepted_paths_when_update_arrives_then_all_applied_in_order() {
    // GIVEN: Both paths accepted, sharing one recorder
    let (dispatcher, loader, reloader) = dispatcher();
    let seen = Arc::new(Mutex::new(Vec::new()));
    dispatcher.registry().accept("/a.js", recording_callback(&seen));
    dispatcher.registry().accept("/b.js", recording_callback(&seen));

    // WHEN: Batch with a style entry in between
    let outcome = dispatcher
        .handle_text(
            r#"{"type":"Update","updates":[
                {"type":"JsUpdate","path":"/a.js","timestamp":7},
                {"type":"CssUpdate","path":"/style.css","timestamp":7},
                {"type":"JsUpdate","path":"/b.js","timestamp":8}
            ]}"#,
        )
        .await;

    // THEN: Two modules applied, CSS not fetched, order preserved
    assert_eq!(outcome, DispatchOutcome::Applied { modules: 2 });
    let mut requests = loader.requests();
    requests.sort();
    assert_eq!(requests, vec!["/a.js?t=7", "/b.js?t=8"]);
    let specifiers: Vec<String> = seen
        .lock()
        .unwrap()
        .iter()
        .map(|m| m.specifier.clone())
        .collect();
    assert_eq!(specifiers, vec!["/a.js?t=7", "/b.js?t=8"]);
    assert!(reloader.reasons().is_empty());
}

/// **VALUE**: Style updates are a no-op.
///
/// **WHY THIS MATTERS**: Style hot-swap is not implemented. Treating a CSS edit as
/// unaccepted code would reload on every stylesheet save.
///
/// **BUG THIS CATCHES**: Would catch CSS entries being fetched or routed to the registry.
#[tokio::test]
async fn given_css_only_update_when_handled_then_nothing_happens() {
    let (dispatcher, loader, reloader) = dispatcher();

    let outcome = dispatcher
        .handle_text(
            r#"{"type":"Update","updates":[{"type":"CssUpdate","path":"/style.css","timestamp":3}]}"#,
        )
        .await;

    assert_eq!(outcome, DispatchOutcome::Ignored);
    assert!(loader.requests().is_empty());
    assert!(reloader.reasons().is_empty());
}

/// **VALUE**: `FullReload` always reloads, whatever is registered.
///
/// **WHY THIS MATTERS**: It is the server's escape hatch for changes it cannot describe.
///
/// **BUG THIS CATCHES**: Would catch a reload gated on registry contents.
#[tokio::test]
async fn given_any_registry_when_full_reload_arrives_then_reloads() {
    let (dispatcher, _loader, reloader) = dispatcher();
    dispatcher.registry().accept("/app.js", |_module: FakeModule| {});

    let outcome = dispatcher.handle_text(r#"{"type":"FullReload"}"#).await;

    assert_eq!(
        outcome,
        DispatchOutcome::Reloaded(ReloadReason::ServerRequested)
    );
    assert_eq!(reloader.reasons(), vec![ReloadReason::ServerRequested]);
}

/// **VALUE**: `Connected`, `Ping` and `Error` are observe-only.
///
/// **WHY THIS MATTERS**: These arrive constantly; any side effect would be visible to users.
///
/// **BUG THIS CATCHES**: Would catch a reload on server errors or registry mutation on greetings.
#[tokio::test]
async fn given_informational_frames_when_handled_then_no_side_effects() {
    let (dispatcher, loader, reloader) = dispatcher();
    dispatcher.registry().accept("/app.js", |_module: FakeModule| {});

    for frame in [
        r#"{"type":"Connected"}"#,
        r#"{"type":"Ping"}"#,
        r#"{"type":"Error"}"#,
        r#"{"type":"Error","message":"build failed"}"#,
    ] {
        assert_eq!(dispatcher.handle_text(frame).await, DispatchOutcome::Ignored);
    }

    assert_eq!(dispatcher.registry().len(), 1);
    assert!(loader.requests().is_empty());
    assert!(reloader.reasons().is_empty());
}

/// **VALUE**: Bad frames are dropped without side effects.
///
/// **WHY THIS MATTERS**: One bad frame must not take the dispatcher down or reload the page.
///
/// **BUG THIS CATCHES**: Would catch decode errors escaping as panics or triggering reloads.
#[tokio::test]
async fn given_malformed_or_unknown_frames_when_handled_then_dropped() {
    let (dispatcher, loader, reloader) = dispatcher();

    for frame in [
        "not json",
        "[]",
        r#"{"kind":"Ping"}"#,
        r#"{"type":"Prune","paths":["/a.js"]}"#,
        r#"{"type":"Update"}"#,
        r#"{"type":"Update","updates":[{"type":"HtmlUpdate","path":"/","timestamp":1}]}"#,
    ] {
        assert_eq!(dispatcher.handle_text(frame).await, DispatchOutcome::Ignored);
    }

    assert!(loader.requests().is_empty());
    assert!(reloader.reasons().is_empty());
}

/// **VALUE**: A failed fetch falls back to a full reload.
///
/// **WHY THIS MATTERS**: The server said the module changed; keeping the old one running
/// would show stale behaviour with no hint why.
///
/// **BUG THIS CATCHES**: Would catch fetch errors being swallowed, or the accepted
/// callback running with nothing to run.
#[tokio::test]
async fn given_fetch_failure_when_update_arrives_then_reloads_without_callback() {
    let (dispatcher, loader, reloader) = dispatcher();
    let seen = Arc::new(Mutex::new(Vec::new()));
    dispatcher.registry().accept("/app.js", recording_callback(&seen));
    loader.fail_on("/app.js?t=42");

    let outcome = dispatcher.handle_text(APP_UPDATE).await;

    match outcome {
        DispatchOutcome::Reloaded(ReloadReason::FetchFailed { path, message }) => {
            assert_eq!(path, "/app.js");
            assert!(message.contains("404"), "got {message}");
        }
        other => panic!("Expected FetchFailed reload, got {other:?}"),
    }
    assert_eq!(reloader.reasons().len(), 1);
    assert!(seen.lock().unwrap().is_empty());
}

/// **VALUE**: A panicking callback is contained and escalated to a reload.
///
/// **WHY THIS MATTERS**: Callbacks are consumer code. A panic must not kill the connection
/// task, which would silently end HMR for the session.
///
/// **BUG THIS CATCHES**: Would catch the `catch_unwind` guard being removed.
#[tokio::test]
async fn given_panicking_callback_when_update_arrives_then_reloads() {
    let (dispatcher, _loader, reloader) = dispatcher();
    dispatcher
        .registry()
        .accept("/app.js", |_module: FakeModule| panic!("render failed"));

    let outcome = dispatcher.handle_text(APP_UPDATE).await;

    assert_eq!(
        outcome,
        DispatchOutcome::Reloaded(ReloadReason::CallbackPanicked {
            path: "/app.js".to_string()
        })
    );
    assert_eq!(reloader.reasons().len(), 1);
}
