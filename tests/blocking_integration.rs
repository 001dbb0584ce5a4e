mod common;

use std::time::Duration;

use axum::http::StatusCode;
use nexon_openapi::{
    blocking::NexonClient, ClientConfig, NexonError, RequestOptions, TradeType, UnknownJson,
};
use serde_json::json;

use common::{error_body, spawn_server, user_basic_body, MockResponse, TestServer};

/// Runs the mock server on its own runtime so the blocking client can own the
/// test thread.
fn start(responses: Vec<MockResponse>) -> (tokio::runtime::Runtime, TestServer) {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .expect("runtime must build");
    let server = runtime.block_on(spawn_server(responses));
    (runtime, server)
}

fn client_for(base_url: &str) -> NexonClient {
    NexonClient::new(
        ClientConfig::builder()
            .api_key("test-key")
            .base_url(base_url)
            .build()
            .expect("config must build"),
    )
    .expect("client must build")
}

#[test]
fn blocking_get_user_basic() {
    let (_runtime, server) = start(vec![MockResponse::json(StatusCode::OK, user_basic_body())]);
    let client = client_for(&server.base_url);

    let basic = client
        .fc_online()
        .get_user_basic("abc123", &RequestOptions::new())
        .expect("request must succeed");

    assert_eq!(basic.nickname, "Kit");
    assert_eq!(server.seen()[0].headers["x-nxopen-api-key"], "test-key");
}

#[test]
fn blocking_match_history_sends_paging() {
    let (_runtime, server) = start(vec![MockResponse::json(
        StatusCode::OK,
        json!(["match-1", "match-2"]),
    )]);
    let client = client_for(&server.base_url);

    let matches = client
        .fc_online()
        .get_user_match_history("abc123", 50, Some(0), Some(2), &RequestOptions::new())
        .expect("request must succeed");

    assert_eq!(matches, vec!["match-1".to_owned(), "match-2".to_owned()]);
    assert_eq!(
        server.seen()[0].query.as_deref(),
        Some("ouid=abc123&matchtype=50&offset=0&limit=2")
    );
}

#[test]
fn blocking_retries_then_succeeds() {
    let (_runtime, server) = start(vec![
        MockResponse::json(StatusCode::BAD_GATEWAY, error_body("GW", "upstream")).with_retry_after("0.05"),
        MockResponse::json(StatusCode::OK, json!([])),
    ]);
    let client = client_for(&server.base_url);

    let trades = client
        .fc_online()
        .get_user_trade_history("abc123", TradeType::Buy, None, None, &RequestOptions::new())
        .expect("request must succeed after retry");

    assert!(trades.is_empty());
    assert_eq!(server.hits(), 2);
}

#[test]
fn blocking_bad_request_maps_to_typed_error() {
    let (_runtime, server) = start(vec![MockResponse::json(
        StatusCode::BAD_REQUEST,
        error_body("OPENAPI00003", "invalid parameter"),
    )]);
    let client = client_for(&server.base_url);

    let err = client
        .get::<UnknownJson>("fconline/v1/id", &RequestOptions::new())
        .expect_err("400 must fail");

    match err {
        NexonError::BadRequest(status) => {
            assert_eq!(status.error_message(), Some("invalid parameter"));
        }
        other => panic!("expected bad request, got {other:?}"),
    }
    assert_eq!(server.hits(), 1);
}

#[test]
fn blocking_redirects_are_not_followed() {
    let (runtime, target) = start(vec![MockResponse::json(StatusCode::OK, json!({}))]);
    let server = runtime.block_on(spawn_server(vec![MockResponse::redirect(format!(
        "{}/steal",
        target.base_url
    ))]));
    let client = client_for(&server.base_url);

    let err = client
        .get::<UnknownJson>("fconline/v1/id", &RequestOptions::new())
        .expect_err("302 must fail");

    assert!(matches!(err, NexonError::Status(_)));
    assert_eq!(err.status(), Some(302));
    assert_eq!(server.hits(), 1);
    assert_eq!(target.hits(), 0);
}

#[test]
fn blocking_timeout_surfaces_timeout_error() {
    let (_runtime, server) = start(vec![
        MockResponse::json(StatusCode::OK, json!({})).with_delay(Duration::from_millis(300))
    ]);
    let client = client_for(&server.base_url);

    let err = client
        .get::<UnknownJson>(
            "fconline/v1/id",
            &RequestOptions::new()
                .with_timeout(Duration::from_millis(50))
                .with_max_retries(0),
        )
        .expect_err("request must time out");

    assert!(matches!(err, NexonError::Timeout { .. }));
}

#[test]
fn blocking_close_refuses_requests() {
    let (_runtime, server) = start(vec![MockResponse::json(StatusCode::OK, json!({}))]);
    let client = client_for(&server.base_url);

    client.close();

    assert!(client.is_closed());
    let err = client
        .get::<UnknownJson>("fconline/v1/id", &RequestOptions::new())
        .expect_err("client is closed");
    assert!(matches!(err, NexonError::Closed));
    assert_eq!(server.hits(), 0);
}
