//! HTTP-level tests for the docbridge router.
//!
//! The router is driven with `tower::ServiceExt::oneshot` against an
//! in-memory document store.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use docbridge_api::{router, AppConfig, AppState};
use docbridge_core::{Document, MetadataKind};
use docbridge_jobs::{ProcessingQueue, QueueReceiver};
use docbridge_store::{InMemoryStore, MetadataCache};

const INBOX: i64 = 1;
const CALL: i64 = 4;

fn config(extra: &[(&str, &str)]) -> AppConfig {
    let mut vars: HashMap<&str, &str> = HashMap::from([
        ("PAPERLESS_BASE_URL", "http://paperless:8000/api"),
        ("AUTH_TOKEN", "secret"),
        ("OLLAMA_MODEL", "gemma2"),
    ]);
    vars.extend(extra.iter().copied());
    AppConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap()
}

fn document(id: i64, title: &str, tags: Vec<i64>) -> Document {
    Document {
        id,
        title: title.to_string(),
        content: format!("Content of {}", title),
        tags,
        correspondent: None,
        document_type: None,
        storage_path: None,
    }
}

fn seeded_store() -> Arc<InMemoryStore> {
    let mut invoice = document(42, "scan_0042", vec![INBOX, CALL]);
    invoice.correspondent = Some(10);
    invoice.document_type = Some(20);
    invoice.storage_path = Some(99);

    Arc::new(
        InMemoryStore::new()
            .with_item(MetadataKind::Tag, INBOX, "Inbox")
            .with_item(MetadataKind::Tag, 2, "ai-processed")
            .with_item(MetadataKind::Tag, 3, "ai-error")
            .with_item(MetadataKind::Tag, CALL, "webhook-call")
            .with_item(MetadataKind::Tag, 5, "ai-title")
            .with_item(MetadataKind::Correspondent, 10, "ACME Corp")
            .with_item(MetadataKind::DocumentType, 20, "Invoice")
            .with_document(invoice)
            .with_document(document(43, "Lease", vec![INBOX]))
            .with_document(document(44, "Archived letter", vec![]))
            .with_thumbnail(42, "image/webp", vec![0x52, 0x49, 0x46, 0x46]),
    )
}

struct TestApp {
    app: axum::Router,
    store: Arc<InMemoryStore>,
    queue: ProcessingQueue,
    _receiver: QueueReceiver,
}

fn test_app(config: AppConfig) -> TestApp {
    let store = seeded_store();
    let cache = MetadataCache::new(store.clone(), Duration::from_secs(3600));
    let (queue, receiver) = ProcessingQueue::channel();
    let state = AppState::new(config, store.clone(), cache, queue.clone());
    TestApp {
        app: router(state),
        store,
        queue,
        _receiver: receiver,
    }
}

async fn send(app: &axum::Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

// =============================================================================
// INTAKE
// =============================================================================

#[tokio::test]
async fn test_valid_webhook_is_queued() {
    let t = test_app(config(&[]));

    let (status, body) = send(
        &t.app,
        Method::POST,
        "/ai/request",
        Some(json!({
            "tag": "webhook-call",
            "url": "http://paperless:8000/api/documents/42/",
            "title": "Extract a short title"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["message"], "Request added to processing queue");
    assert_eq!(body["queue_length"], 1);
    assert!(body["entry_id"].is_string());
    assert_eq!(t.queue.len(), 1);
}

#[tokio::test]
async fn test_queue_length_grows_per_request() {
    let t = test_app(config(&[]));
    let payload = json!({
        "tag": "webhook-call",
        "url": "http://paperless:8000/api/documents/43/",
        "title": "Extract a short title"
    });

    send(&t.app, Method::POST, "/ai/request", Some(payload.clone())).await;
    let (_, body) = send(&t.app, Method::POST, "/ai/request", Some(payload)).await;
    assert_eq!(body["queue_length"], 2);
}

#[tokio::test]
async fn test_missing_url_is_rejected() {
    let t = test_app(config(&[]));

    let (status, body) = send(
        &t.app,
        Method::POST,
        "/ai/request",
        Some(json!({"tag": "webhook-call", "title": "Extract a short title"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("url"));
    assert_eq!(t.queue.len(), 0);
}

#[tokio::test]
async fn test_missing_tag_is_rejected() {
    let t = test_app(config(&[]));

    let (status, body) = send(
        &t.app,
        Method::POST,
        "/ai/request",
        Some(json!({"url": "http://paperless/api/documents/42/", "title": "x"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("tag"));
    assert_eq!(t.queue.len(), 0);
}

#[tokio::test]
async fn test_no_extractable_fields_is_rejected() {
    let t = test_app(config(&[]));

    let (status, body) = send(
        &t.app,
        Method::POST,
        "/ai/request",
        Some(json!({
            "tag": "webhook-call",
            "url": "http://paperless/api/documents/42/",
            "title": "   ",
            "correspondent": "Who sent this?"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No valid fields have been provided");
    assert_eq!(t.queue.len(), 0);
}

#[tokio::test]
async fn test_unknown_document_is_not_found() {
    let t = test_app(config(&[]));

    let (status, _) = send(
        &t.app,
        Method::POST,
        "/ai/request",
        Some(json!({
            "tag": "webhook-call",
            "url": "http://paperless/api/documents/404/",
            "title": "Extract a short title"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(t.queue.len(), 0);
}

#[tokio::test]
async fn test_non_json_body_is_rejected() {
    let t = test_app(config(&[]));
    let request = Request::builder()
        .method(Method::POST)
        .uri("/ai/request")
        .body(Body::from("tag=webhook-call"))
        .unwrap();

    let response = t.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_response_carries_request_id() {
    let t = test_app(config(&[]));
    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();

    let response = t.app.clone().oneshot(request).await.unwrap();
    assert!(response.headers().contains_key("x-request-id"));
}

// =============================================================================
// DOCUMENT HELPERS
// =============================================================================

#[tokio::test]
async fn test_set_tag_adds_and_removes() {
    let t = test_app(config(&[]));

    let (status, body) = send(
        &t.app,
        Method::POST,
        "/doc/set_tag",
        Some(json!({"doc_id": 42, "tags": ["ai-title", "-Inbox"]})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true}));
    assert_eq!(t.store.tag_names(42), vec!["webhook-call", "ai-title"]);
}

#[tokio::test]
async fn test_set_tag_accepts_tag_names_alias() {
    let t = test_app(config(&[]));

    let (status, _) = send(
        &t.app,
        Method::POST,
        "/doc/set_tag",
        Some(json!({"doc_id": 43, "tag_names": ["-Inbox"]})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(t.store.tag_names(43).is_empty());
}

#[tokio::test]
async fn test_set_tag_unknown_tag_changes_nothing() {
    let t = test_app(config(&[]));

    let (status, body) = send(
        &t.app,
        Method::POST,
        "/doc/set_tag",
        Some(json!({"doc_id": 42, "tags": ["-Inbox", "nonexistent"]})),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("nonexistent"));
    assert!(t.store.patches().is_empty());
}

#[tokio::test]
async fn test_set_tag_rejected_patch_is_bad_gateway() {
    let t = test_app(config(&[]));
    t.store.set_reject_patches(true);

    let (status, _) = send(
        &t.app,
        Method::POST,
        "/doc/set_tag",
        Some(json!({"doc_id": 42, "tags": ["ai-title"]})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_set_tag_without_doc_id_is_json_bad_request() {
    let t = test_app(config(&[]));

    let (status, body) = send(
        &t.app,
        Method::POST,
        "/doc/set_tag",
        Some(json!({"tags": ["Inbox"]})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "doc_id and tags (list) are required");
    assert!(t.store.patches().is_empty());
}

#[tokio::test]
async fn test_set_tag_with_empty_list_is_bad_request() {
    let t = test_app(config(&[]));

    let (status, body) = send(
        &t.app,
        Method::POST,
        "/doc/set_tag",
        Some(json!({"doc_id": 42, "tags": []})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_list_inbox() {
    let t = test_app(config(&[]));

    let (status, body) = send(&t.app, Method::GET, "/doc/list_inbox", None).await;

    assert_eq!(status, StatusCode::OK);
    let ids: Vec<i64> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![43, 42]);
    assert_eq!(body[0]["title"], "Lease");
}

#[tokio::test]
async fn test_document_info_resolves_names() {
    let t = test_app(config(&[]));

    let (status, body) = send(&t.app, Method::GET, "/doc/get_info/42", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "id": 42,
            "title": "scan_0042",
            "correspondent": "ACME Corp",
            "document_type": "Invoice",
            "storage_path": "Unknown",
            "tags": ["Inbox", "webhook-call"],
            "thumbnail_url": "/doc/get_thumbnail/42"
        })
    );
}

#[tokio::test]
async fn test_document_info_unknown_document() {
    let t = test_app(config(&[]));
    let (status, _) = send(&t.app, Method::GET, "/doc/get_info/999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_thumbnail_proxy_keeps_content_type() {
    let t = test_app(config(&[]));
    let request = Request::builder()
        .uri("/doc/get_thumbnail/42")
        .body(Body::empty())
        .unwrap();

    let response = t.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/webp");
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(bytes.as_ref(), b"RIFF");
}

#[tokio::test]
async fn test_button_actions() {
    let t = test_app(config(&[]));

    let (status, actions) = send(&t.app, Method::GET, "/doc/actions", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(actions["send_to_ai"], json!(["ai-title", "-Inbox"]));

    let (status, _) = send(
        &t.app,
        Method::POST,
        "/doc/actions/send_to_ai",
        Some(json!({"doc_id": 43})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(t.store.tag_names(43), vec!["ai-title"]);

    let (status, _) = send(
        &t.app,
        Method::POST,
        "/doc/actions/shred",
        Some(json!({"doc_id": 43})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_button_action_without_doc_id_is_json_bad_request() {
    let t = test_app(config(&[]));

    let (status, body) = send(
        &t.app,
        Method::POST,
        "/doc/actions/send_to_ai",
        Some(json!({"document": 43})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "doc_id is required");
    assert!(t.store.patches().is_empty());
}

// =============================================================================
// STATUS
// =============================================================================

#[tokio::test]
async fn test_health_reports_queue_length() {
    let t = test_app(config(&[]));
    send(
        &t.app,
        Method::POST,
        "/ai/request",
        Some(json!({
            "tag": "webhook-call",
            "url": "http://paperless/api/documents/42/",
            "title": "Extract a short title"
        })),
    )
    .await;

    let (status, body) = send(&t.app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["queue_length"], 1);
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_refresh_metadata_reloads_all_kinds() {
    let t = test_app(config(&[]));

    let (status, _) = send(&t.app, Method::POST, "/refresh_metadata", None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&t.app, Method::GET, "/refresh_metadata", None).await;
    assert_eq!(status, StatusCode::OK);

    for kind in MetadataKind::ALL {
        assert_eq!(t.store.list_calls(kind), 2, "{}", kind);
    }
}

#[tokio::test]
async fn test_refresh_metadata_upstream_failure() {
    let t = test_app(config(&[]));
    t.store.set_fail_listings(true);

    let (status, body) = send(&t.app, Method::GET, "/refresh_metadata", None).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_debug_echo_disabled_by_default() {
    let t = test_app(config(&[]));
    let (status, _) = send(&t.app, Method::GET, "/status/debug", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_debug_echo_when_enabled() {
    let t = test_app(config(&[("DEBUG", "true")]));

    let (status, body) = send(
        &t.app,
        Method::PUT,
        "/status/debug?source=workflow",
        Some(json!({"hello": "world"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let data = &body["request_data"];
    assert_eq!(data["method"], "PUT");
    assert_eq!(data["path"], "/status/debug");
    assert_eq!(data["query_params"]["source"], "workflow");
    assert_eq!(data["json"]["hello"], "world");
    assert_eq!(data["client_ip"], "unknown");
}
