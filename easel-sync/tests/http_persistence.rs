//! HTTP persistence client against a mock server.

use std::sync::Arc;

use easel_core::Document;
use easel_sync::{
    AutosaveConfig, AutosaveHandle, AutosaveState, HttpPersistence, PersistenceApi,
    PersistenceError, RetryConfig,
};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> HttpPersistence {
    HttpPersistence::new(&format!("{}/api", server.uri())).expect("client")
}

#[tokio::test]
async fn test_save_posts_document_with_version() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/documents/d1"))
        .and(body_partial_json(json!({ "id": "d1", "version": 0 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "version": 0 })))
        .expect(1)
        .mount(&server)
        .await;

    let receipt = client(&server)
        .save(&Document::new("Remote").with_id("d1"))
        .await
        .expect("save");
    assert_eq!(receipt.version, 0);
}

#[tokio::test]
async fn test_save_conflict_carries_remote_version() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/documents/d1"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({ "remoteVersion": 7 })))
        .mount(&server)
        .await;

    let err = client(&server)
        .save(&Document::new("Remote").with_id("d1"))
        .await
        .expect_err("conflict");
    assert!(matches!(
        err,
        PersistenceError::Conflict {
            local_version: 0,
            remote_version: 7
        }
    ));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_load_round_trips_document() {
    let server = MockServer::start().await;
    let doc = Document::new("Stored").with_id("d1");
    Mock::given(method("GET"))
        .and(path("/api/documents/d1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::to_value(&doc).expect("json")),
        )
        .mount(&server)
        .await;

    let loaded = client(&server).load(&"d1".into()).await.expect("load");
    assert_eq!(loaded, doc);
}

#[tokio::test]
async fn test_load_missing_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/documents/ghost"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = client(&server)
        .load(&"ghost".into())
        .await
        .expect_err("missing");
    assert!(matches!(err, PersistenceError::NotFound(id) if id == "ghost"));
}

#[tokio::test]
async fn test_id_with_reserved_characters_stays_in_path() {
    let server = MockServer::start().await;
    let doc = Document::new("Odd").with_id("a/b?c");
    Mock::given(method("GET"))
        .and(path("/api/documents/a%2Fb%3Fc"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::to_value(&doc).expect("json")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let loaded = client(&server).load(&"a/b?c".into()).await.expect("load");
    assert_eq!(loaded.id.as_str(), "a/b?c");
}

#[tokio::test]
async fn test_list_and_delete() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/documents"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": "d1", "title": "First", "version": 3 },
            { "id": "d2", "title": "Second", "version": 1 }
        ])))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/documents/d1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let api = client(&server);
    let listed = api.list().await.expect("list");
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].title, "First");
    assert_eq!(listed[0].version, 3);

    api.delete(&"d1".into()).await.expect("delete");
}

#[tokio::test]
async fn test_server_error_is_retryable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/documents/d1"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let err = client(&server)
        .save(&Document::new("Remote").with_id("d1"))
        .await
        .expect_err("unavailable");
    assert!(matches!(&err, PersistenceError::Status { status: 503, body } if body == "maintenance"));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_autosave_retries_through_server_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/documents/d1"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/documents/d1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "version": 0 })))
        .mount(&server)
        .await;

    let api = Arc::new(client(&server));
    let config = AutosaveConfig::default().with_retry(RetryConfig::new(2, 10, 100, 2.0));
    let handle = AutosaveHandle::spawn(api, config);

    handle.notify_changed(&Document::new("Remote").with_id("d1"));
    let status = handle.flush().await;
    assert_eq!(status.state, AutosaveState::Saved);
    assert_eq!(status.saved_version, Some(0));

    handle.shutdown().await;
}
