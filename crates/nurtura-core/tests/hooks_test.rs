#![allow(clippy::unwrap_used)]
// Integration tests for the dashboard hooks against a wiremock backend.

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use nurtura_core::hooks::{analytics, team};
use nurtura_core::{
    ChannelNotifier, CoreError, DashboardConfig, DashboardContext, ErrorKind, InviteMember,
    ListParams, MemorySessionStore, MutationStatus, NotificationLevel, QueryOptions, ReviewStatus,
    Role, Session, SessionUser, UpdateReviewStatus, UpdateUserStatus, UserStatus,
};

// ── Helpers ─────────────────────────────────────────────────────────

struct Harness {
    server: MockServer,
    ctx: DashboardContext,
    store: Arc<MemorySessionStore>,
    notifier: Arc<ChannelNotifier>,
}

fn admin_session() -> Session {
    Session::new(
        SecretString::from("token-1".to_owned()),
        SessionUser {
            id: "u-1".into(),
            email: "ada@nurtura.app".into(),
            name: Some("Ada".into()),
            role: Role::Admin,
        },
    )
}

async fn setup_with(configure: impl FnOnce(DashboardConfig) -> DashboardConfig) -> Harness {
    let server = MockServer::start().await;
    let store = Arc::new(MemorySessionStore::with_session(admin_session()));
    let notifier = Arc::new(ChannelNotifier::new());
    let config = configure(DashboardConfig::new(
        Url::parse(&format!("{}/api", server.uri())).unwrap(),
    ));
    let ctx = DashboardContext::new(config, store.clone(), notifier.clone()).unwrap();
    Harness {
        server,
        ctx,
        store,
        notifier,
    }
}

async fn setup() -> Harness {
    // Keep retries but make them quick.
    setup_with(|config| {
        config.with_query_options(QueryOptions::default().retry_delay(Duration::from_millis(10)))
    })
    .await
}

fn member(id: &str, email: &str) -> serde_json::Value {
    json!({ "id": id, "email": email, "role": "manager", "status": "active" })
}

// ── Caching ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_team_list_within_stale_window_hits_network_once() {
    let h = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/admin/team"))
        .and(query_param("page", "1"))
        .and(query_param("limit", "10"))
        .and(header("authorization", "Bearer token-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "items": [member("m-1", "a@x.io")], "meta": { "total": 1, "page": 1, "limit": 10 } }
        })))
        .expect(1)
        .mount(&h.server)
        .await;

    let params = ListParams::page(1, 10);
    let first = h.ctx.team().list(&params).await.unwrap();
    let second = h.ctx.team().list(&params).await.unwrap();

    assert_eq!(first.items.len(), 1);
    assert!(Arc::ptr_eq(&first, &second));
}

#[tokio::test]
async fn test_different_filters_are_cached_separately() {
    let h = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/admin/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [], "total": 0 })))
        .expect(2)
        .mount(&h.server)
        .await;

    h.ctx.users().list(&ListParams::page(1, 10)).await.unwrap();
    h.ctx
        .users()
        .list(&ListParams::page(1, 10).with_role(Role::Provider))
        .await
        .unwrap();
    h.ctx.users().list(&ListParams::page(1, 10)).await.unwrap();
}

#[tokio::test]
async fn test_concurrent_hook_calls_share_one_request() {
    let h = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/analytics/overview"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "data": { "totalUsers": 12, "totalRevenue": 99.5 } }))
                .set_delay(Duration::from_millis(100)),
        )
        .expect(1)
        .mount(&h.server)
        .await;

    let params = ListParams::default();
    let hooks = h.ctx.analytics();
    let (a, b) = tokio::join!(hooks.overview(&params), hooks.overview(&params));
    assert_eq!(a.unwrap().total_users, 12);
    assert!((b.unwrap().total_revenue - 99.5).abs() < f64::EPSILON);
}

// ── Invalidation ────────────────────────────────────────────────────

#[tokio::test]
async fn test_invite_invalidates_team_and_observed_list_refetches() {
    let h = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/admin/team"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "data": [member("m-1", "a@x.io")] })),
        )
        .up_to_n_times(1)
        .expect(1)
        .mount(&h.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/admin/team"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [member("m-1", "a@x.io"), member("m-2", "b@x.io")]
        })))
        .expect(1)
        .mount(&h.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/admin/team/invite"))
        .and(body_json(json!({ "email": "b@x.io", "role": "manager" })))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!({ "message": "Invitation sent", "data": member("m-2", "b@x.io") })),
        )
        .expect(1)
        .mount(&h.server)
        .await;

    let mut notes = h.notifier.subscribe();
    let mut observer = h.ctx.team().watch_list(&ListParams::page(1, 10));
    let state = observer.settled().await;
    assert_eq!(state.data.unwrap().items.len(), 1);

    let invite = h.ctx.team().invite();
    let ack = invite
        .mutate(InviteMember {
            email: "b@x.io".into(),
            role: Role::Manager,
            name: None,
        })
        .await
        .unwrap();
    assert_eq!(ack.message.as_deref(), Some("Invitation sent"));
    assert_eq!(invite.status(), MutationStatus::Success);

    let refreshed = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let state = observer.changed().await.unwrap();
            if !state.is_fetching && !state.is_stale {
                break state;
            }
        }
    })
    .await
    .unwrap();
    assert_eq!(refreshed.data.unwrap().items.len(), 2);

    let note = notes.recv().await.unwrap();
    assert_eq!(note.level, NotificationLevel::Success);
    assert_eq!(note.message, "Invitation sent");
}

#[tokio::test]
async fn test_review_moderation_invalidates_reviews_and_analytics_only() {
    let h = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/admin/reviews"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .expect(2)
        .mount(&h.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/analytics/overview"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": {} })))
        .expect(2)
        .mount(&h.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/invoices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .expect(1)
        .mount(&h.server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/api/admin/reviews/r-1/status"))
        .and(body_json(json!({ "status": "approved" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": null })))
        .expect(1)
        .mount(&h.server)
        .await;

    let params = ListParams::default();
    h.ctx.reviews().list(&params).await.unwrap();
    h.ctx.analytics().overview(&params).await.unwrap();
    h.ctx.invoices().list(&params).await.unwrap();

    h.ctx
        .reviews()
        .update_status()
        .mutate(UpdateReviewStatus {
            id: "r-1".into(),
            status: ReviewStatus::Approved,
            reason: None,
        })
        .await
        .unwrap();

    h.ctx.reviews().list(&params).await.unwrap();
    h.ctx.analytics().overview(&params).await.unwrap();
    h.ctx.invoices().list(&params).await.unwrap();
}

#[tokio::test]
async fn test_repeated_invalidation_refetches_once() {
    let h = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/subscriptions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "data": [] }))
                .set_delay(Duration::from_millis(50)),
        )
        .expect(2)
        .mount(&h.server)
        .await;

    let mut observer = h.ctx.subscriptions().watch_list(&ListParams::default());
    observer.settled().await;

    let prefix = nurtura_core::hooks::subscriptions::keys::all();
    assert_eq!(h.ctx.cache().invalidate(&prefix), 1);
    assert_eq!(h.ctx.cache().invalidate(&prefix), 1);

    let state = observer.settled().await;
    assert!(state.is_success());
}

// ── Failures ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_timeout_resolves_to_fallback_message() {
    let h = setup_with(|config| {
        config
            .with_timeout(Duration::from_millis(100))
            .with_query_options(QueryOptions::default().retry_delay(Duration::from_millis(10)))
    })
    .await;

    Mock::given(method("GET"))
        .and(path("/api/analytics/revenue"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "data": [] }))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&h.server)
        .await;

    let err = h.ctx.analytics().revenue(&ListParams::default()).await.unwrap_err();

    assert_eq!(
        serde_json::to_value(&err).unwrap(),
        json!({ "success": false, "data": null, "message": "Failed to load revenue" })
    );
    assert_eq!(err.kind(), ErrorKind::Timeout);
    // Timed out once, retried once.
    assert_eq!(h.server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_401_signs_out_once_and_is_not_retried() {
    let h = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/invoices"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&h.server)
        .await;

    let err = h.ctx.invoices().list(&ListParams::default()).await.unwrap_err();
    assert!(err.is_unauthorized());
    assert_eq!(h.store.sign_out_count(), 1);
    assert!(h.ctx.current_user().is_none());
}

#[tokio::test]
async fn test_server_error_retries_then_surfaces_server_message() {
    let h = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/subscriptions/plans"))
        .respond_with(
            ResponseTemplate::new(503).set_body_json(json!({ "message": "Billing is down" })),
        )
        .expect(2)
        .mount(&h.server)
        .await;

    let err = h.ctx.subscriptions().plans().await.unwrap_err();
    assert_eq!(err.message(), "Billing is down");
}

#[tokio::test]
async fn test_rejected_mutation_notifies_server_message() {
    let h = setup().await;

    Mock::given(method("PATCH"))
        .and(path("/api/admin/users/u-9/status"))
        .and(body_json(json!({ "status": "suspended" })))
        .respond_with(
            ResponseTemplate::new(403).set_body_json(json!({ "message": "Cannot suspend an admin" })),
        )
        .expect(1)
        .mount(&h.server)
        .await;

    let mut notes = h.notifier.subscribe();
    let mutation = h.ctx.users().update_status();
    let err = mutation
        .mutate(UpdateUserStatus {
            id: "u-9".into(),
            status: UserStatus::Suspended,
        })
        .await
        .unwrap_err();

    assert_eq!(err.message(), "Cannot suspend an admin");
    assert_eq!(mutation.status(), MutationStatus::Error(err));
    let note = notes.recv().await.unwrap();
    assert_eq!(note.level, NotificationLevel::Error);
    assert_eq!(note.message, "Cannot suspend an admin");
    assert_eq!(h.store.sign_out_count(), 0);
}

#[tokio::test]
async fn test_role_without_permission_is_refused_before_any_request() {
    let h = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/admin/team/invite"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": null })))
        .expect(0)
        .mount(&h.server)
        .await;

    let mut manager = admin_session();
    manager.user.role = Role::Manager;
    h.store.sign_in(manager);

    let mut notes = h.notifier.subscribe();
    let err = h
        .ctx
        .team()
        .invite()
        .mutate(InviteMember {
            email: "b@x.io".into(),
            role: Role::Provider,
            name: None,
        })
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Rejected { status: 403 });
    assert_eq!(err.message(), "The manager role cannot manage the team");
    let note = notes.recv().await.unwrap();
    assert_eq!(note.level, NotificationLevel::Error);
    assert_eq!(h.store.sign_out_count(), 0);
}

// ── Public client ───────────────────────────────────────────────────

#[tokio::test]
async fn test_complete_invite_goes_out_without_credentials() {
    let h = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/admin/team/invite/complete"))
        .respond_with(|req: &Request| {
            if req.headers.contains_key("authorization") {
                ResponseTemplate::new(400).set_body_json(json!({ "message": "unexpected token" }))
            } else {
                ResponseTemplate::new(200).set_body_json(json!({ "message": "Welcome" }))
            }
        })
        .expect(1)
        .mount(&h.server)
        .await;

    let ack = h
        .ctx
        .team()
        .complete_invite()
        .mutate(nurtura_core::CompleteInvite {
            token: "inv-1".into(),
            password: "hunter2hunter2".into(),
            name: Some("Grace".into()),
        })
        .await
        .unwrap();
    assert_eq!(ack.message.as_deref(), Some("Welcome"));
}

// ── Context lifecycle ───────────────────────────────────────────────

#[tokio::test]
async fn test_end_session_clears_cache_and_request_scope_is_fresh() {
    let h = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/invoices/inv-7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "id": "inv-7", "amount": 120.0, "status": "sent" }
        })))
        .expect(3)
        .mount(&h.server)
        .await;

    let invoice = h.ctx.invoices().detail("inv-7").await.unwrap();
    assert!(invoice.is_voidable());
    assert_eq!(invoice.currency, "USD");
    assert_eq!(h.ctx.cache().len(), 1);

    let scoped = h.ctx.for_request();
    assert!(scoped.cache().is_empty());
    scoped.invoices().detail("inv-7").await.unwrap();

    h.ctx.end_session();
    assert!(h.ctx.cache().is_empty());
    h.ctx.invoices().detail("inv-7").await.unwrap();
}

#[test]
fn test_prefix_keys_match_hook_keys() {
    let params = ListParams::page(1, 10);
    assert!(team::keys::list(&params).starts_with(&team::keys::all()));
    assert!(!team::keys::list(&params).starts_with(&analytics::keys::all()));
}

#[tokio::test]
async fn test_realtime_requires_a_session() {
    let h = setup().await;
    h.ctx.sign_out();
    assert!(matches!(h.ctx.connect_realtime(), Err(CoreError::NoSession)));
}
