use crate::helpers::unused_port;

use hmr_core::dispatch::{HttpModuleLoader, ModuleLoader};
use hmr_core::error::loader::LoaderError;

use std::time::Duration;

use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ----------------------------------------------------------------------------
// HttpModuleLoader
// ----------------------------------------------------------------------------

/// **VALUE**: Verifies a module is fetched with its cache-busting query intact.
///
/// **WHY THIS MATTERS**: The query is what makes the dev server hand back the new
/// version instead of a cached one.
///
/// **BUG THIS CATCHES**: Would catch `Url::join` dropping the query or resolving
/// against the wrong directory.
#[tokio::test]
async fn given_served_module_when_loading_specifier_then_source_returned() {
    // GIVEN: A server with /src/app.js
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/src/app.js"))
        .and(query_param("t", "1700000000000"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("let x = 1;", "text/javascript"))
        .mount(&server)
        .await;
    let loader = HttpModuleLoader::new(&server.uri(), Duration::from_secs(2)).unwrap();

    // WHEN: Loading the specifier
    let module = loader.load("/src/app.js?t=1700000000000").await.unwrap();

    // THEN: Body, URL and content type are reported
    assert_eq!(module.source, "let x = 1;");
    assert_eq!(module.url.path(), "/src/app.js");
    assert_eq!(module.content_type.as_deref(), Some("text/javascript"));
}

/// **VALUE**: Verifies non-success statuses become `LoaderError::Status`.
///
/// **WHY THIS MATTERS**: A 404 page body is not a module. Passing it on as source
/// would break the host's evaluation in confusing ways.
///
/// **BUG THIS CATCHES**: Would catch missing status checks.
#[tokio::test]
async fn given_missing_module_when_loading_then_status_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
        .mount(&server)
        .await;
    let loader = HttpModuleLoader::new(&server.uri(), Duration::from_secs(2)).unwrap();

    let err = loader.load("/missing.js?t=1").await.unwrap_err();

    match err {
        LoaderError::Status { status, url, .. } => {
            assert!(status.is_gone());
            assert!(url.ends_with("/missing.js?t=1"), "got {url}");
        }
        other => panic!("Expected Status error, got {other:?}"),
    }
}

/// **VALUE**: Verifies an unreachable server surfaces as a request error.
///
/// **WHY THIS MATTERS**: The dev server may die between the change event and the fetch.
///
/// **BUG THIS CATCHES**: Would catch transport errors being mapped to a status error.
#[tokio::test]
async fn given_server_gone_when_loading_then_request_error() {
    let base = format!("http://127.0.0.1:{}/", unused_port().await);
    let loader = HttpModuleLoader::new(&base, Duration::from_secs(2)).unwrap();

    let err = loader.load("/app.js?t=1").await.unwrap_err();

    assert!(matches!(err, LoaderError::Request { .. }), "got {err:?}");
}

#[test]
fn given_invalid_base_url_when_building_loader_then_url_error() {
    let result = HttpModuleLoader::new("not a url", Duration::from_secs(1));

    assert!(matches!(result, Err(LoaderError::Url { .. })));
}
