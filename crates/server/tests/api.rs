mod common;

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode};
use common::{CapturingNotifier, DownIndex, memory_index, settings, setup_db};
use probmark_core::search::SearchIndex;
use probmark_server::api::{AppState, create_router};
use probmark_server::config::{FailurePolicy, ServerConfig};
use probmark_server::search::SearchClient;
use serde_json::{Value, json};
use tower::ServiceExt;

struct TestApp {
    router: Router,
    notifier: Arc<CapturingNotifier>,
}

async fn app_with(backend: Arc<dyn SearchIndex>, policy: FailurePolicy, admin_token: Option<&str>) -> TestApp {
    let db = setup_db().await;
    let mut config = ServerConfig::default();
    config.problems_per_page = 2;
    config.search = settings(policy);
    config.auth.secret = Some("test-secret".to_string());
    config.auth.admin_token = admin_token.map(str::to_string);
    let client = SearchClient::new(Some(backend), &config.search);

    let notifier = Arc::new(CapturingNotifier::default());
    let state = AppState::new(db, client, &config).with_reset_notifier(notifier.clone());

    TestApp {
        router: create_router(Arc::new(state)),
        notifier,
    }
}

async fn app() -> Router {
    app_with(memory_index(), FailurePolicy::FailClosed, None)
        .await
        .router
}

async fn send_raw(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    content_type: Option<&str>,
    body: Body,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    if let Some(content_type) = content_type {
        builder = builder.header("content-type", content_type);
    }
    let request = builder.body(body).expect("request should build");

    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("router should respond");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should be readable");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("body should be json")
    };

    (status, value)
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    match body {
        Some(body) => {
            send_raw(
                app,
                method,
                uri,
                token,
                Some("application/json"),
                Body::from(body.to_string()),
            )
            .await
        }
        None => send_raw(app, method, uri, token, None, Body::empty()).await,
    }
}

async fn register(app: &Router, username: &str) {
    let (status, _) = send(
        app,
        Method::POST,
        "/api/users",
        None,
        Some(json!({
            "username": username,
            "email": format!("{username}@example.com"),
            "password": "hunter22",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}

async fn login_with(app: &Router, username: &str, password: &str) -> (StatusCode, Value) {
    send(
        app,
        Method::POST,
        "/api/login",
        None,
        Some(json!({"username": username, "password": password})),
    )
    .await
}

/// Registers `username` and returns a session token for it.
async fn sign_up(app: &Router, username: &str) -> String {
    register(app, username).await;
    let (status, body) = login_with(app, username, "hunter22").await;
    assert_eq!(status, StatusCode::OK);
    body["token"].as_str().expect("session token").to_string()
}

fn problem_body(n: u32, keywords: &str) -> Value {
    json!({
        "problem_name": format!("Problem {n}"),
        "problem_link": format!("https://judge.example.com/{n}"),
        "keywords": keywords,
        "platform": "atcoder",
    })
}

async fn create_problem(app: &Router, n: u32, keywords: &str) -> i64 {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/problems",
        None,
        Some(problem_body(n, keywords)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_i64().expect("problem id")
}

async fn search_total(app: &Router, token: &str, username: &str, query: &str) -> Value {
    let uri = format!("/api/users/{username}/search?q={query}");
    let (status, body) = send(app, Method::GET, &uri, Some(token), None).await;
    assert_eq!(status, StatusCode::OK);
    body["total"].clone()
}

#[tokio::test]
async fn health_reports_ok() {
    let app = app().await;

    let (status, body) = send(&app, Method::GET, "/api/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn register_and_login() {
    let app = app().await;
    register(&app, "carol").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/users",
        None,
        Some(json!({"username": "carol", "email": "other@example.com", "password": "x"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "username_taken");

    let (status, body) = login_with(&app, "carol", "hunter22").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "Bearer");
    assert!(body["token"].as_str().is_some_and(|token| !token.is_empty()));
    assert_eq!(body["user"]["username"], "carol");
    assert_eq!(body["user"]["marked_count"], 0);

    let (status, body) = login_with(&app, "carol", "wrong").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "invalid_credentials");
}

#[tokio::test]
async fn created_problems_are_searchable_with_paging() {
    let app = app().await;
    let token = sign_up(&app, "dave").await;
    for n in 1..=3 {
        create_problem(&app, n, "convex hull trick").await;
    }
    create_problem(&app, 4, "suffix array").await;

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/users/dave/search?q=hull",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 3);
    assert_eq!(body["problems"].as_array().map(Vec::len), Some(2));
    assert_eq!(body["next_page"], 2);
    assert_eq!(body["last_page"], 2);
    assert_eq!(body["prev_page"], Value::Null);

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/users/dave/search?q=hull&page=2",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["problems"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["next_page"], Value::Null);
}

#[tokio::test]
async fn invalid_page_is_rejected() {
    let app = app().await;
    let token = sign_up(&app, "erin").await;

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/users/erin/search?q=dp&page=0",
        Some(&token),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_request");
}

#[tokio::test]
async fn malformed_requests_get_json_errors() {
    let app = app().await;
    let token = sign_up(&app, "ivan").await;

    let (status, body) = send(&app, Method::GET, "/api/problems/abc", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_request");

    let (status, body) = send(&app, Method::GET, "/api/users/ivan/search", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_request");

    let (status, body) = send_raw(
        &app,
        Method::POST,
        "/api/problems",
        None,
        Some("application/json"),
        Body::from("{not json"),
    )
    .await;
    assert!(status.is_client_error());
    assert_eq!(body["code"], "invalid_request");
}

#[tokio::test]
async fn deleted_problem_disappears_from_search() {
    let app = app().await;
    let token = sign_up(&app, "frank").await;
    let id = create_problem(&app, 1, "centroid decomposition").await;

    let (status, _) = send(&app, Method::DELETE, &format!("/api/problems/{id}"), None, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    assert_eq!(search_total(&app, &token, "frank", "centroid").await, 0);
}

#[tokio::test]
async fn updated_problem_is_reindexed() {
    let app = app().await;
    let token = sign_up(&app, "judy").await;
    let id = create_problem(&app, 1, "monotonic stack").await;
    create_problem(&app, 2, "sparse table").await;
    let uri = format!("/api/problems/{id}");

    let (status, body) = send(&app, Method::PUT, &uri, None, Some(problem_body(1, "sliding window"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["keywords"], "sliding window");
    assert_eq!(search_total(&app, &token, "judy", "monotonic").await, 0);
    assert_eq!(search_total(&app, &token, "judy", "sliding").await, 1);

    let (status, body) = send(&app, Method::PUT, &uri, None, Some(problem_body(2, "sliding window"))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "problem_link_taken");

    let (status, body) = send(
        &app,
        Method::PUT,
        "/api/problems/999",
        None,
        Some(problem_body(9, "anything")),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "problem_not_found");
}

#[tokio::test]
async fn duplicate_problem_link_is_a_conflict() {
    let app = app().await;
    create_problem(&app, 1, "lca").await;

    let (status, body) = send(&app, Method::POST, "/api/problems", None, Some(problem_body(1, "lca"))).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "problem_link_taken");
}

#[tokio::test]
async fn concurrent_creates_with_one_link_yield_one_conflict() {
    let app = app().await;

    for n in 1..=10 {
        let body = problem_body(n, "race");
        let (first, second) = tokio::join!(
            send(&app, Method::POST, "/api/problems", None, Some(body.clone())),
            send(&app, Method::POST, "/api/problems", None, Some(body)),
        );

        let mut statuses = [first.0, second.0];
        statuses.sort();
        assert_eq!(statuses, [StatusCode::CREATED, StatusCode::CONFLICT]);
        let loser = if first.0 == StatusCode::CONFLICT { first.1 } else { second.1 };
        assert_eq!(loser["code"], "problem_link_taken");
    }
}

#[tokio::test]
async fn fail_closed_backend_surfaces_service_unavailable() {
    let app = app_with(Arc::new(DownIndex), FailurePolicy::FailClosed, None)
        .await
        .router;
    let token = sign_up(&app, "kate").await;

    let (status, body) = send(&app, Method::POST, "/api/problems", None, Some(problem_body(1, "bfs"))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], "search_unavailable");

    // The row committed before the sync failed.
    let (status, body) = send(&app, Method::GET, "/api/problems/1", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["keywords"], "bfs");

    let (status, body) = send(&app, Method::GET, "/api/users/kate/search?q=bfs", Some(&token), None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], "search_unavailable");
}

#[tokio::test]
async fn mark_and_unmark_are_idempotent() {
    let app = app().await;
    let token = sign_up(&app, "grace").await;
    let id = create_problem(&app, 1, "dsu").await;
    let uri = format!("/api/users/grace/marked/{id}");

    let (status, first) = send(&app, Method::POST, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["changed"], true);
    let (_, second) = send(&app, Method::POST, &uri, Some(&token), None).await;
    assert_eq!(second["changed"], false);

    let (_, marked) = send(&app, Method::GET, "/api/users/grace/marked", Some(&token), None).await;
    assert_eq!(marked.as_array().map(Vec::len), Some(1));
    assert_eq!(marked[0]["id"], id);

    let (_, removed) = send(&app, Method::DELETE, &uri, Some(&token), None).await;
    assert_eq!(removed["changed"], true);
    let (_, removed_again) = send(&app, Method::DELETE, &uri, Some(&token), None).await;
    assert_eq!(removed_again["changed"], false);
    assert_eq!(removed_again["marked"], false);
}

#[tokio::test]
async fn marking_a_missing_problem_is_reported() {
    let app = app().await;
    let token = sign_up(&app, "heidi").await;

    let (status, body) = send(&app, Method::POST, "/api/users/heidi/marked/999", Some(&token), None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "problem_not_found");
    assert_eq!(body["message"], "Problem 999 not found.");

    let (_, marked) = send(&app, Method::GET, "/api/users/heidi/marked", Some(&token), None).await;
    assert_eq!(marked.as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn unknown_user_is_not_found() {
    let app = app().await;
    let token = sign_up(&app, "liam").await;

    let (status, body) = send(&app, Method::GET, "/api/users/nobody/marked", Some(&token), None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "user_not_found");
}

#[tokio::test]
async fn user_routes_require_a_session() {
    let app = app().await;
    register(&app, "mallory").await;
    let id = create_problem(&app, 1, "hashing").await;
    let uri = format!("/api/users/mallory/marked/{id}");

    let (status, body) = send(&app, Method::POST, &uri, None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "missing_token");

    let (status, body) = send(&app, Method::POST, &uri, Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "invalid_token");

    let (status, _) = send(&app, Method::GET, "/api/users/mallory/search?q=hashing", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn marks_of_another_user_cannot_be_changed() {
    let app = app().await;
    let victim = sign_up(&app, "nina").await;
    let intruder = sign_up(&app, "oscar").await;
    let id = create_problem(&app, 1, "treap").await;
    let uri = format!("/api/users/nina/marked/{id}");

    let (status, body) = send(&app, Method::POST, &uri, Some(&intruder), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "forbidden");
    let (status, _) = send(&app, Method::DELETE, &uri, Some(&intruder), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, marked) = send(&app, Method::GET, "/api/users/nina/marked", Some(&victim), None).await;
    assert_eq!(marked.as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn logout_revokes_the_session() {
    let app = app().await;
    let token = sign_up(&app, "peggy").await;

    let (status, _) = send(&app, Method::POST, "/api/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&app, Method::GET, "/api/users/peggy", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "invalid_token");
}

#[tokio::test]
async fn password_reset_replaces_the_password_once() {
    let test_app = app_with(memory_index(), FailurePolicy::FailClosed, None).await;
    let app = &test_app.router;
    register(app, "quinn").await;

    let (status, _) = send(
        app,
        Method::POST,
        "/api/password-reset",
        None,
        Some(json!({"email": "nobody@example.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert!(test_app.notifier.sent().is_empty());

    let (status, _) = send(
        app,
        Method::POST,
        "/api/password-reset",
        None,
        Some(json!({"email": "quinn@example.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let sent = test_app.notifier.sent();
    assert_eq!(sent.len(), 1);
    let (email, reset_token) = sent[0].clone();
    assert_eq!(email, "quinn@example.com");

    // A reset token is not a session.
    let (status, _) = send(app, Method::GET, "/api/users/quinn", Some(&reset_token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let confirm = json!({"token": reset_token, "password": "n3w-password"});
    let (status, _) = send(
        app,
        Method::POST,
        "/api/password-reset/confirm",
        None,
        Some(confirm.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = login_with(app, "quinn", "hunter22").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = login_with(app, "quinn", "n3w-password").await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(app, Method::POST, "/api/password-reset/confirm", None, Some(confirm)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "invalid_token");
}

#[tokio::test]
async fn admin_token_guards_problem_writes() {
    let app = app_with(memory_index(), FailurePolicy::FailClosed, Some("ops-token"))
        .await
        .router;

    let (status, body) = send(&app, Method::POST, "/api/problems", None, Some(problem_body(1, "kmp"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "missing_token");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/problems",
        Some("guess"),
        Some(problem_body(1, "kmp")),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "forbidden");

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/problems",
        Some("ops-token"),
        Some(problem_body(1, "kmp")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = send(&app, Method::POST, "/api/admin/reindex", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, body) = send(&app, Method::POST, "/api/admin/reindex", Some("ops-token"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["indexed"], 1);
}

#[tokio::test]
async fn reindex_reports_indexed_rows() {
    let app = app().await;
    create_problem(&app, 1, "fft").await;
    create_problem(&app, 2, "ntt").await;

    let (status, body) = send(&app, Method::POST, "/api/admin/reindex", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["namespace"], "problem");
    assert_eq!(body["indexed"], 2);
    assert_eq!(body["failed"], 0);
}

#[tokio::test]
async fn reindex_reports_rows_a_down_backend_dropped() {
    let app = app_with(Arc::new(DownIndex), FailurePolicy::FailOpen, None)
        .await
        .router;
    create_problem(&app, 1, "fft").await;
    create_problem(&app, 2, "ntt").await;

    let (status, body) = send(&app, Method::POST, "/api/admin/reindex", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["indexed"], 0);
    assert_eq!(body["failed"], 2);
}
