//! Router-level tests over the local-only backend: response shapes, input
//! validation, rate limiting, and the guarded sync routes.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

use kaze::application::engagement::{EngagementBackend, EngagementService};
use kaze::infra::fallback::JsonFileStore;
use kaze::infra::http::api::auth::SharedSecret;
use kaze::infra::http::api::rate_limit::ApiRateLimiter;
use kaze::infra::http::{ApiState, build_router};

struct TestApp {
    router: Router,
    _dir: tempfile::TempDir,
}

fn local_app(max_requests: u32, secret: Option<&str>) -> TestApp {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = Arc::new(JsonFileStore::open(dir.path()).expect("fallback store"));
    let engagement = Arc::new(EngagementService::new(EngagementBackend::LocalOnly, store));

    let state = ApiState {
        engagement,
        articles: None,
        sync: None,
        db: None,
        rate_limiter: Arc::new(ApiRateLimiter::new(Duration::from_secs(60), max_requests)),
        sync_secret: secret.map(|secret| Arc::new(SharedSecret::new(secret))),
    };

    TestApp {
        router: build_router(state),
        _dir: dir,
    }
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("body");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, value)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

#[tokio::test]
async fn reaction_toggle_responds_with_counts_and_degraded_flag() {
    let app = local_app(10, None);

    let (status, body) = send(
        &app.router,
        post_json(
            "/api/v1/reactions/b1",
            json!({"user_id": "u1", "reaction_type": "like"}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["action"], json!("added"));
    assert_eq!(body["reaction_counts"]["like"], json!(1));
    assert_eq!(body["total_reactions"], json!(1));
    assert_eq!(body["degraded"], json!(true));

    let (status, body) = send(
        &app.router,
        post_json(
            "/api/v1/reactions/b1",
            json!({"user_id": "u1", "reaction_type": "like"}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["action"], json!("removed"));
    assert_eq!(body["reaction_counts"]["like"], json!(0));
}

#[tokio::test]
async fn invalid_reaction_kind_is_a_400() {
    let app = local_app(10, None);

    let (status, body) = send(
        &app.router,
        post_json(
            "/api/v1/reactions/b1",
            json!({"user_id": "u1", "reaction_type": "meh"}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], json!("bad_request"));
}

#[tokio::test]
async fn blank_user_id_is_a_400() {
    let app = local_app(10, None);

    let (status, _) = send(
        &app.router,
        post_json(
            "/api/v1/reactions/b1",
            json!({"user_id": "  ", "reaction_type": "like"}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn reaction_status_reports_user_membership() {
    let app = local_app(10, None);

    send(
        &app.router,
        post_json(
            "/api/v1/reactions/b1",
            json!({"user_id": "u1", "reaction_type": "insightful"}),
        ),
    )
    .await;

    let (status, body) = send(&app.router, get("/api/v1/reactions/b1?user_id=u1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_reactions"], json!(["insightful"]));
    assert_eq!(body["reaction_counts"]["insightful"], json!(1));
    assert_eq!(body["degraded"], json!(true));

    // Another session sees the counts but no membership.
    let (_, body) = send(&app.router, get("/api/v1/reactions/b1?user_id=u2")).await;
    assert_eq!(body["user_reactions"], json!([]));
    assert_eq!(body["reaction_counts"]["insightful"], json!(1));
}

#[tokio::test]
async fn rate_limiter_rejects_with_retry_after() {
    let app = local_app(2, None);

    for _ in 0..2 {
        let (status, _) = send(
            &app.router,
            post_json(
                "/api/v1/reactions/b1",
                json!({"user_id": "u1", "reaction_type": "like"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let response = app
        .router
        .clone()
        .oneshot(post_json(
            "/api/v1/reactions/b1",
            json!({"user_id": "u1", "reaction_type": "like"}),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key(header::RETRY_AFTER));
}

#[tokio::test]
async fn bookmark_flow_toggle_status_list() {
    let app = local_app(10, None);

    let (status, body) = send(
        &app.router,
        post_json(
            "/api/v1/bookmarks/b1",
            json!({
                "user_id": "u1",
                "metadata": {"title": "First post", "categories": ["rust"]}
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["action"], json!("added"));
    assert_eq!(body["bookmark_count"], json!(1));

    let (_, body) = send(&app.router, get("/api/v1/bookmarks/b1?user_id=u1")).await;
    assert_eq!(body["is_bookmarked"], json!(true));
    assert_eq!(body["bookmark_count"], json!(1));

    let (_, body) = send(&app.router, get("/api/v1/bookmarks?user_id=u1")).await;
    assert_eq!(body["article_ids"], json!(["b1"]));

    let (_, body) = send(
        &app.router,
        post_json("/api/v1/bookmarks/b1", json!({"user_id": "u1"})),
    )
    .await;
    assert_eq!(body["action"], json!("removed"));
    assert_eq!(body["bookmark_count"], json!(0));
}

#[tokio::test]
async fn bookmark_list_requires_a_user() {
    let app = local_app(10, None);
    let (status, body) = send(&app.router, get("/api/v1/bookmarks")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], json!("bad_request"));
}

#[tokio::test]
async fn views_increment_per_post() {
    let app = local_app(10, None);

    let (status, body) = send(&app.router, post_json("/api/v1/articles/b1/view", json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["view_count"], json!(1));

    let (_, body) = send(&app.router, post_json("/api/v1/articles/b1/view", json!({}))).await;
    assert_eq!(body["view_count"], json!(2));
}

#[tokio::test]
async fn health_reports_the_local_backend() {
    let app = local_app(10, None);
    let (status, body) = send(&app.router, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["backend"], json!("local_only"));
    assert_eq!(body["database"], json!("absent"));
    assert_eq!(body["cms"], json!("absent"));
}

#[tokio::test]
async fn article_routes_answer_503_without_a_cms() {
    let app = local_app(10, None);
    let (status, body) = send(&app.router, get("/api/v1/articles")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["code"], json!("cms_unavailable"));
}

#[tokio::test]
async fn webhook_requires_the_shared_secret() {
    let app = local_app(10, Some("hunter2"));

    let payload = json!({"service": "demo", "api": "blogs", "id": "b1", "type": "delete"});

    let (status, body) = send(&app.router, post_json("/api/v1/webhooks/cms", payload.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], json!("unauthorized"));

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/webhooks/cms")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, "Bearer hunter2")
        .body(Body::from(payload.to_string()))
        .expect("request");
    // Authorized, but the local-only backend has no sync service.
    let (status, body) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["code"], json!("sync_unavailable"));
}

#[tokio::test]
async fn cleanup_without_remote_store_is_unavailable() {
    let app = local_app(10, None);
    let (status, body) = send(
        &app.router,
        post_json("/api/v1/sync/cleanup", json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["code"], json!("sync_unavailable"));
}
