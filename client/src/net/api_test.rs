use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::json;

use super::*;
use crate::test_helpers::{StubBackend, alice, api_client, closed_port_url, seeded_storage};
use crate::util::credentials::MemoryStorage;

// =============================================================================
// build_headers
// =============================================================================

#[test]
fn build_headers_defaults_to_json_without_token() {
    let headers = build_headers(None, &[]).unwrap();
    assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "application/json");
    assert!(headers.get(AUTHORIZATION).is_none());
}

#[test]
fn build_headers_attaches_bearer_token() {
    let headers = build_headers(Some("abc"), &[]).unwrap();
    assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer abc");
}

#[test]
fn build_headers_ignores_empty_token() {
    let headers = build_headers(Some(""), &[]).unwrap();
    assert!(headers.get(AUTHORIZATION).is_none());
}

#[test]
fn build_headers_caller_headers_win() {
    let extra = vec![
        ("Content-Type".to_owned(), "text/plain".to_owned()),
        ("X-Trace".to_owned(), "t-1".to_owned()),
    ];
    let headers = build_headers(Some("abc"), &extra).unwrap();
    assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "text/plain");
    assert_eq!(headers.get("x-trace").unwrap(), "t-1");
    assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer abc");
}

#[test]
fn build_headers_rejects_invalid_header_name() {
    let extra = vec![("bad header".to_owned(), "v".to_owned())];
    assert!(matches!(build_headers(None, &extra), Err(ApiError::Url(_))));
}

// =============================================================================
// body helpers
// =============================================================================

#[test]
fn decode_body_treats_empty_as_null() {
    let value: Value = decode_body("  ").unwrap();
    assert_eq!(value, Value::Null);
}

#[test]
fn decode_body_reports_shape_mismatch() {
    let err = decode_body::<Vec<i64>>("{\"a\":1}").unwrap_err();
    assert!(matches!(err, ApiError::Decode(_)));
}

#[test]
fn parse_error_body_keeps_json_or_text() {
    assert_eq!(parse_error_body("{\"error\":\"x\"}"), json!({ "error": "x" }));
    assert_eq!(parse_error_body("Bad Gateway"), json!("Bad Gateway"));
    assert_eq!(parse_error_body(""), Value::Null);
}

#[test]
fn extract_list_accepts_bare_array_envelope_and_null() {
    let bare: Vec<i64> = extract_list(json!([1, 2]), "items").unwrap();
    assert_eq!(bare, vec![1, 2]);
    let wrapped: Vec<i64> = extract_list(json!({ "items": [3] }), "items").unwrap();
    assert_eq!(wrapped, vec![3]);
    let null_inner: Vec<i64> = extract_list(json!({ "items": null }), "items").unwrap();
    assert!(null_inner.is_empty());
    let null: Vec<i64> = extract_list(Value::Null, "items").unwrap();
    assert!(null.is_empty());
}

#[test]
fn extract_list_rejects_scalars() {
    assert!(matches!(extract_list::<i64>(json!("nope"), "items"), Err(ApiError::Decode(_))));
}

// =============================================================================
// outbound interceptor
// =============================================================================

#[tokio::test]
async fn request_without_token_has_no_authorization_header() {
    let stub = StubBackend::start().await;
    stub.respond(Method::GET, "/api/servers", 200, json!([]));
    let client = api_client(&stub, Arc::new(MemoryStorage::new()));

    let _: Value = client.get_json("/api/servers").await.unwrap();

    let req = stub.last_request();
    assert!(req.header("authorization").is_none());
    assert_eq!(req.header("content-type"), Some("application/json"));
}

#[tokio::test]
async fn request_with_token_sends_bearer() {
    let stub = StubBackend::start().await;
    stub.respond(Method::GET, "/api/servers", 200, json!([]));
    let client = api_client(&stub, seeded_storage("abc", &alice()));

    let _: Value = client.get_json("/api/servers").await.unwrap();

    assert_eq!(stub.last_request().header("authorization"), Some("Bearer abc"));
}

#[tokio::test]
async fn token_is_read_per_request() {
    let stub = StubBackend::start().await;
    stub.respond(Method::GET, "/api/servers", 200, json!([]));
    let storage = Arc::new(MemoryStorage::new());
    let client = api_client(&stub, storage.clone());

    let _: Value = client.get_json("/api/servers").await.unwrap();
    assert!(stub.last_request().header("authorization").is_none());

    storage.set_item(credentials::TOKEN_KEY, "later").unwrap();
    let _: Value = client.get_json("/api/servers").await.unwrap();
    assert_eq!(stub.last_request().header("authorization"), Some("Bearer later"));
}

#[tokio::test]
async fn custom_headers_are_preserved_alongside_bearer() {
    let stub = StubBackend::start().await;
    stub.respond(Method::GET, "/api/servers", 200, json!([]));
    let client = api_client(&stub, seeded_storage("abc", &alice()));

    let options = RequestOptions::default().header("X-Request-Id", "r-42");
    client.request(Method::GET, "/api/servers", None, options).await.unwrap();

    let req = stub.last_request();
    assert_eq!(req.header("x-request-id"), Some("r-42"));
    assert_eq!(req.header("authorization"), Some("Bearer abc"));
}

#[tokio::test]
async fn post_sends_json_body() {
    let stub = StubBackend::start().await;
    stub.respond(Method::POST, "/api/servers", 201, json!({ "id": 9 }));
    let client = api_client(&stub, Arc::new(MemoryStorage::new()));

    let created: Value = client.post_json("/api/servers", &json!({ "name": "box-1" })).await.unwrap();

    assert_eq!(created["id"], 9);
    assert_eq!(stub.last_request().json(), json!({ "name": "box-1" }));
}

#[tokio::test]
async fn caller_content_type_survives_json_body() {
    let stub = StubBackend::start().await;
    stub.respond(Method::POST, "/api/servers", 201, json!({ "id": 9 }));
    let client = api_client(&stub, Arc::new(MemoryStorage::new()));

    let options = RequestOptions::default().header("Content-Type", "application/merge-patch+json");
    client.request(Method::POST, "/api/servers", Some(&json!({ "name": "box-2" })), options).await.unwrap();

    let req = stub.last_request();
    assert_eq!(req.header("content-type"), Some("application/merge-patch+json"));
    assert_eq!(req.json(), json!({ "name": "box-2" }));
}

#[tokio::test]
async fn delete_with_empty_body_decodes_as_null() {
    let stub = StubBackend::start().await;
    stub.respond_raw(Method::DELETE, "/api/servers/3", 204, "");
    let client = api_client(&stub, Arc::new(MemoryStorage::new()));

    let ack = client.delete_json("/api/servers/3").await.unwrap();
    assert_eq!(ack, Value::Null);
}

// =============================================================================
// transport failures
// =============================================================================

#[tokio::test]
async fn per_request_timeout_overrides_default() {
    let stub = StubBackend::start().await;
    stub.respond_delayed(Method::GET, "/api/slow", 200, json!({}), Duration::from_millis(500));
    let client = api_client(&stub, Arc::new(MemoryStorage::new()));

    let options = RequestOptions::default().timeout(Duration::from_millis(50));
    let err = client.request(Method::GET, "/api/slow", None, options).await.unwrap_err();

    assert!(matches!(err, ApiError::Timeout));
    assert!(err.is_transport());
}

#[tokio::test]
async fn configured_timeout_applies_by_default() {
    let stub = StubBackend::start().await;
    stub.respond_delayed(Method::GET, "/api/slow", 200, json!({}), Duration::from_millis(500));
    let config = ApiConfig::new(stub.base_url()).with_timeout(Duration::from_millis(50));
    let client = ApiClient::new(config, Arc::new(MemoryStorage::new())).unwrap();

    let err = client.get_json::<Value>("/api/slow").await.unwrap_err();
    assert!(matches!(err, ApiError::Timeout));
}

#[tokio::test]
async fn closed_port_is_network_error() {
    let client = ApiClient::new(ApiConfig::new(closed_port_url().await), Arc::new(MemoryStorage::new())).unwrap();

    let err = client.get_json::<Value>("/api/servers").await.unwrap_err();
    assert!(matches!(err, ApiError::Network(_)), "got {err:?}");
}

#[tokio::test]
async fn empty_base_url_fails_to_build_request() {
    let client = ApiClient::new(ApiConfig::new(""), Arc::new(MemoryStorage::new())).unwrap();

    let err = client.get_json::<Value>("/api/servers").await.unwrap_err();
    assert!(matches!(err, ApiError::Url(_)), "got {err:?}");
}

// =============================================================================
// inbound interceptor
// =============================================================================

fn counting_listener(client: &ApiClient) -> Arc<AtomicUsize> {
    let count = Arc::new(AtomicUsize::new(0));
    let seen = count.clone();
    client.on_unauthorized(move || {
        seen.fetch_add(1, Ordering::SeqCst);
    });
    count
}

#[tokio::test]
async fn unauthorized_notifies_listeners_and_returns_error() {
    let stub = StubBackend::start().await;
    stub.respond(Method::GET, "/api/servers", 401, json!({ "error": "Invalid token" }));
    let client = api_client(&stub, seeded_storage("stale", &alice()));
    let count = counting_listener(&client);

    let err = client.get_json::<Value>("/api/servers").await.unwrap_err();

    assert!(err.is_auth_failure());
    assert_eq!(err.message(), Some("Invalid token"));
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn listeners_run_in_registration_order() {
    let stub = StubBackend::start().await;
    stub.respond(Method::GET, "/api/servers", 401, Value::Null);
    let client = api_client(&stub, Arc::new(MemoryStorage::new()));
    let order = Arc::new(Mutex::new(Vec::new()));
    for tag in ["first", "second"] {
        let order = order.clone();
        client.on_unauthorized(move || order.lock().unwrap().push(tag));
    }

    let _ = client.get_json::<Value>("/api/servers").await;

    assert_eq!(*order.lock().unwrap(), vec!["first", "second"]);
}

#[tokio::test]
async fn credential_exchange_does_not_notify() {
    let stub = StubBackend::start().await;
    stub.respond(Method::POST, "/api/auth/login", 401, json!({ "error": "Invalid credentials" }));
    let client = api_client(&stub, Arc::new(MemoryStorage::new()));
    let count = counting_listener(&client);

    let err = client
        .request(Method::POST, "/api/auth/login", Some(&json!({})), RequestOptions::credential_exchange())
        .await
        .unwrap_err();

    assert!(err.is_auth_failure());
    assert_eq!(count.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn forbidden_passes_through_without_notifying() {
    let stub = StubBackend::start().await;
    stub.respond(Method::GET, "/api/users", 403, json!({ "error": "Root access required" }));
    let client = api_client(&stub, seeded_storage("abc", &alice()));
    let count = counting_listener(&client);

    let err = client.get_json::<Value>("/api/users").await.unwrap_err();

    assert!(matches!(err, ApiError::Forbidden { .. }));
    assert_eq!(count.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn validation_error_keeps_body() {
    let stub = StubBackend::start().await;
    let body = json!({ "error": "name is required", "field": "name" });
    stub.respond(Method::POST, "/api/servers", 400, body.clone());
    let client = api_client(&stub, seeded_storage("abc", &alice()));

    let err = client.post_json::<_, Value>("/api/servers", &json!({})).await.unwrap_err();

    assert_eq!(err.status(), Some(400));
    assert_eq!(err.body(), Some(&body));
}

#[tokio::test]
async fn plain_text_error_body_is_kept_as_string() {
    let stub = StubBackend::start().await;
    stub.respond_raw(Method::GET, "/api/servers", 502, "upstream down");
    let client = api_client(&stub, Arc::new(MemoryStorage::new()));

    let err = client.get_json::<Value>("/api/servers").await.unwrap_err();

    assert_eq!(err.status(), Some(502));
    assert_eq!(err.body(), Some(&json!("upstream down")));
}

#[test]
fn into_ack_reads_message_or_defaults() {
    assert_eq!(into_ack(json!({ "message": "done" })).unwrap().message, "done");
    assert_eq!(into_ack(Value::Null).unwrap(), MessageResponse::default());
}
