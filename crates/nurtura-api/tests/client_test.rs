#![allow(clippy::unwrap_used)]
// Integration tests for `ApiClient` using wiremock.

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use nurtura_api::{
    ApiClient, ApiEnvelope, Error, ErrorKind, MemorySessionStore, Method, RequestConfig, Role,
    Session, SessionProvider, SessionStatus, SessionUser, TransportConfig, normalize,
};

// ── Helpers ─────────────────────────────────────────────────────────

fn admin_session(token: &str) -> Session {
    Session::new(
        SecretString::from(token.to_owned()),
        SessionUser {
            id: "u-1".into(),
            email: "ada@nurtura.app".into(),
            name: Some("Ada".into()),
            role: Role::Admin,
        },
    )
}

async fn setup_private(session: Option<Session>) -> (MockServer, ApiClient, Arc<MemorySessionStore>) {
    let server = MockServer::start().await;
    let store = Arc::new(match session {
        Some(session) => MemorySessionStore::with_session(session),
        None => MemorySessionStore::new(),
    });
    let client = ApiClient::private(
        &format!("{}/api", server.uri()),
        &TransportConfig::default(),
        store.clone(),
        "/login",
    )
    .unwrap();
    (server, client, store)
}

async fn setup_public() -> (MockServer, ApiClient) {
    let server = MockServer::start().await;
    let client = ApiClient::public(&format!("{}/api", server.uri()), &TransportConfig::default())
        .unwrap();
    (server, client)
}

// ── Authorization header ────────────────────────────────────────────

#[tokio::test]
async fn test_private_client_sends_bearer_token() {
    let (server, client, _store) = setup_private(Some(admin_session("abc"))).await;

    Mock::given(method("GET"))
        .and(path("/api/admin/team"))
        .and(header("authorization", "Bearer abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let env: ApiEnvelope<Vec<serde_json::Value>> = client.get("/admin/team").await.unwrap();
    assert!(env.data.is_empty());
}

#[tokio::test]
async fn test_token_is_read_per_request() {
    let (server, client, store) = setup_private(Some(admin_session("first"))).await;

    Mock::given(method("GET"))
        .and(path("/api/invoices"))
        .and(header("authorization", "Bearer second"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .expect(1)
        .mount(&server)
        .await;

    store.sign_in(admin_session("second"));
    let _: ApiEnvelope<Vec<serde_json::Value>> = client.get("invoices").await.unwrap();
}

#[tokio::test]
async fn test_no_session_sends_no_authorization_header() {
    let (server, client, _store) = setup_private(None).await;

    Mock::given(method("GET"))
        .and(path("/api/analytics/overview"))
        .respond_with(|req: &Request| {
            if req.headers.contains_key("authorization") {
                ResponseTemplate::new(400)
            } else {
                ResponseTemplate::new(200).set_body_json(json!({ "data": {} }))
            }
        })
        .mount(&server)
        .await;

    let result: Result<ApiEnvelope<serde_json::Value>, _> =
        client.get("/analytics/overview").await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_public_client_never_sends_token() {
    let (server, client) = setup_public().await;

    Mock::given(method("POST"))
        .and(path("/api/admin/team/invite/complete"))
        .and(body_json(json!({ "token": "inv-1", "password": "pw" })))
        .respond_with(|req: &Request| {
            if req.headers.contains_key("authorization") {
                ResponseTemplate::new(400)
            } else {
                ResponseTemplate::new(201).set_body_json(json!({ "data": { "ok": true } }))
            }
        })
        .mount(&server)
        .await;

    let env: ApiEnvelope<serde_json::Value> = client
        .post(
            "/admin/team/invite/complete",
            &json!({ "token": "inv-1", "password": "pw" }),
        )
        .await
        .unwrap();
    assert_eq!(env.data["ok"], true);
}

// ── 401 handling ────────────────────────────────────────────────────

#[tokio::test]
async fn test_401_signs_out_once() {
    let (server, client, store) = setup_private(Some(admin_session("expired"))).await;

    Mock::given(method("GET"))
        .and(path("/api/admin/reviews"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "message": "jwt expired" })))
        .expect(1)
        .mount(&server)
        .await;

    let result: Result<serde_json::Value, _> = client.get("/admin/reviews").await;
    assert!(matches!(result, Err(Error::Unauthorized)));
    assert_eq!(store.sign_out_count(), 1);
    assert!(store.current_session().is_none());
    assert_eq!(
        store.status(),
        SessionStatus::SignedOut {
            callback_url: "/login".into()
        }
    );
}

#[tokio::test]
async fn test_each_401_response_signs_out() {
    let (server, client, store) = setup_private(Some(admin_session("expired"))).await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let _: Result<serde_json::Value, _> = client.get("/admin/reviews").await;
    let _: Result<serde_json::Value, _> = client.get("/admin/team").await;
    assert_eq!(store.sign_out_count(), 2);
}

#[tokio::test]
async fn test_public_client_401_does_not_sign_out() {
    let (server, client) = setup_public().await;
    let store = MemorySessionStore::with_session(admin_session("abc"));

    Mock::given(method("POST"))
        .and(path("/api/admin/team/invite/complete"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let result: Result<serde_json::Value, _> = client
        .post("/admin/team/invite/complete", &json!({ "token": "bad" }))
        .await;
    assert!(matches!(result, Err(Error::Unauthorized)));
    assert_eq!(store.sign_out_count(), 0);
    assert!(!client.is_private());
}

// ── Errors and normalization ────────────────────────────────────────

#[tokio::test]
async fn test_server_message_passes_through_normalization() {
    let (server, client, _store) = setup_private(Some(admin_session("abc"))).await;

    Mock::given(method("PATCH"))
        .and(path("/api/admin/team/m-1"))
        .respond_with(
            ResponseTemplate::new(403).set_body_json(json!({ "message": "Cannot demote owner" })),
        )
        .mount(&server)
        .await;

    let err = client
        .patch::<serde_json::Value, _>("/admin/team/m-1", &json!({ "role": "manager" }))
        .await
        .unwrap_err();
    let normalized = normalize(&err, "Failed to update member", serde_json::Value::Null);

    assert!(!normalized.success());
    assert_eq!(normalized.message(), "Cannot demote owner");
    assert_eq!(normalized.kind(), ErrorKind::Rejected { status: 403 });
    assert!(!normalized.is_retryable());
}

#[tokio::test]
async fn test_server_error_without_message_uses_library_message() {
    let (server, client, _store) = setup_private(Some(admin_session("abc"))).await;

    Mock::given(method("GET"))
        .and(path("/api/invoices"))
        .respond_with(ResponseTemplate::new(500).set_body_string("oops"))
        .mount(&server)
        .await;

    let err = client.get::<serde_json::Value>("/invoices").await.unwrap_err();
    let normalized = normalize(&err, "Failed to load invoices", json!([]));

    assert_eq!(normalized.message(), "Request failed with status code 500");
    assert_eq!(normalized.data(), &json!([]));
    assert!(normalized.is_retryable());
}

#[tokio::test]
async fn test_timeout_normalizes_to_fallback() {
    let server = MockServer::start().await;
    let store = Arc::new(MemorySessionStore::with_session(admin_session("abc")));
    let transport = TransportConfig::default().with_timeout(Duration::from_millis(100));
    let client = ApiClient::private(&server.uri(), &transport, store.clone(), "/login").unwrap();

    Mock::given(method("GET"))
        .and(path("/analytics/revenue"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "data": [] }))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let err = client.get::<serde_json::Value>("/analytics/revenue").await.unwrap_err();
    assert!(matches!(err, Error::Timeout { .. }));

    let normalized = normalize(&err, "Failed to load revenue", serde_json::Value::Null);
    assert_eq!(normalized.message(), "Failed to load revenue");
    assert_eq!(normalized.data(), &serde_json::Value::Null);
    assert_eq!(normalized.kind(), ErrorKind::Timeout);
    assert_eq!(store.sign_out_count(), 0);
}

#[tokio::test]
async fn test_per_request_timeout_override() {
    let (server, client, _store) = setup_private(Some(admin_session("abc"))).await;

    Mock::given(method("GET"))
        .and(path("/api/analytics/bookings"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let config = RequestConfig::default().timeout(Duration::from_millis(50));
    let err = client
        .request::<serde_json::Value, ()>(Method::GET, "/analytics/bookings", None, &config)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Timeout { .. }));
}

// ── Bodies ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_empty_body_decodes_to_unit() {
    let (server, client, _store) = setup_private(Some(admin_session("abc"))).await;

    Mock::given(method("DELETE"))
        .and(path("/api/admin/reviews/r-9"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client.delete::<()>("/admin/reviews/r-9").await.unwrap();
}

#[tokio::test]
async fn test_query_parameters_are_forwarded() {
    let (server, client, _store) = setup_private(Some(admin_session("abc"))).await;

    Mock::given(method("GET"))
        .and(path("/api/admin/users"))
        .and(query_param("page", "2"))
        .and(query_param("role", "provider"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let _: ApiEnvelope<Vec<serde_json::Value>> = client
        .get_with_query(
            "/admin/users",
            vec![("page".into(), "2".into()), ("role".into(), "provider".into())],
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_malformed_json_is_deserialization_error() {
    let (server, client, _store) = setup_private(Some(admin_session("abc"))).await;

    Mock::given(method("GET"))
        .and(path("/api/subscriptions"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{not json"))
        .mount(&server)
        .await;

    let err = client.get::<serde_json::Value>("/subscriptions").await.unwrap_err();
    match err {
        Error::Deserialization { body, .. } => assert_eq!(body, "{not json"),
        other => panic!("expected Deserialization, got {other:?}"),
    }
}
