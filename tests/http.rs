//! End-to-end tests for the auth routes over the in-memory credential store.

use authkit::{
    handlers, AppState, AuthConfig, AuthService, MemoryCredentialStore, PasswordHasher,
    TokenIssuer,
};

use axum::body::{to_bytes, Body};
use axum::http::{header, HeaderMap, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

fn test_config() -> AuthConfig {
    AuthConfig {
        access_secret: "access-secret-access-secret-1234".to_string(),
        refresh_secret: "refresh-secret-refresh-secret-12".to_string(),
        access_ttl_secs: 900,
        refresh_ttl_secs: 604800,
        database_url: String::new(),
        bind_addr: String::new(),
        cors_origins: vec![],
        cookie_secure: false,
        argon2_memory_cost: 1024,
        argon2_time_cost: 1,
        argon2_parallelism: 1,
        store_timeout_secs: 5,
    }
}

fn test_app() -> Router {
    let config = test_config();
    let auth = Arc::new(AuthService::new(
        Arc::new(MemoryCredentialStore::new()),
        PasswordHasher::new(1024, 1, 1).unwrap(),
        TokenIssuer::new(&config),
        Duration::from_secs(5),
    ));
    handlers::create_routes(AppState::new(auth, Arc::new(config)))
}

fn post_json(path: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn call(app: Router, req: Request<Body>) -> (StatusCode, HeaderMap, Value) {
    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, headers, body)
}

fn signup_body(email: &str) -> Value {
    json!({ "email": email, "name": "Ann", "password": "Abcd123!" })
}

fn set_cookie(headers: &HeaderMap) -> String {
    headers
        .get(header::SET_COOKIE)
        .expect("missing Set-Cookie")
        .to_str()
        .unwrap()
        .to_string()
}

/// The `refresh_token=<value>` pair from a Set-Cookie header
fn cookie_pair(set_cookie: &str) -> String {
    set_cookie
        .split(';')
        .map(str::trim)
        .find(|part| part.starts_with("refresh_token="))
        .expect("no refresh_token in Set-Cookie")
        .to_string()
}

// ============================================
// Signup
// ============================================

#[tokio::test]
async fn signup_returns_user_access_token_and_refresh_cookie() {
    let app = test_app();
    let (status, headers, body) =
        call(app, post_json("/auth/signup", signup_body("a@x.com"))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email"], "a@x.com");
    assert_eq!(body["user"]["name"], "Ann");
    assert!(body["accessToken"].is_string());

    // The password hash never leaves the store
    let raw = body.to_string();
    assert!(!raw.contains("passwordHash"));
    assert!(!raw.contains("password_hash"));

    let cookie = set_cookie(&headers);
    assert!(cookie.starts_with("refresh_token="));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Lax"));
    assert!(cookie.contains("Path=/auth/refresh"));
    assert!(cookie.contains("Max-Age=604800"));
}

#[tokio::test]
async fn signup_duplicate_email_is_conflict_case_insensitive() {
    let app = test_app();

    let (status, _, _) = call(app.clone(), post_json("/auth/signup", signup_body("A@X.com"))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, body) =
        call(app, post_json("/auth/signup", signup_body("a@x.com"))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "email_taken");
}

#[tokio::test]
async fn concurrent_duplicate_signups_yield_exactly_one_success() {
    let app = test_app();

    let (a, b) = tokio::join!(
        call(app.clone(), post_json("/auth/signup", signup_body("a@x.com"))),
        call(app.clone(), post_json("/auth/signup", signup_body("a@x.com"))),
    );

    let statuses = [a.0, b.0];
    assert_eq!(
        statuses.iter().filter(|s| **s == StatusCode::OK).count(),
        1,
        "exactly one signup must succeed: {statuses:?}"
    );
    assert_eq!(
        statuses
            .iter()
            .filter(|s| **s == StatusCode::CONFLICT)
            .count(),
        1,
        "the loser must see a conflict: {statuses:?}"
    );
}

#[tokio::test]
async fn signup_validation_failures_are_bad_requests() {
    let cases = [
        json!({ "email": "not-an-email", "name": "Ann", "password": "Abcd123!" }),
        json!({ "email": "a@x.com", "name": "Al", "password": "Abcd123!" }),
        json!({ "email": "a@x.com", "name": "Ann", "password": "abcdefgh" }),
        json!({ "email": "a@x.com", "name": "Ann", "password": "Ab1!" }),
    ];

    for body in cases {
        let app = test_app();
        let (status, _, res) = call(app, post_json("/auth/signup", body.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
        assert_eq!(res["error"], "validation_error");
    }
}

// ============================================
// Signin
// ============================================

#[tokio::test]
async fn signin_returns_tokens_for_valid_credentials() {
    let app = test_app();
    call(app.clone(), post_json("/auth/signup", signup_body("a@x.com"))).await;

    let (status, headers, body) = call(
        app,
        post_json("/auth/signin", json!({ "email": "a@x.com", "password": "Abcd123!" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email"], "a@x.com");
    assert!(body["accessToken"].is_string());
    assert!(set_cookie(&headers).starts_with("refresh_token="));
}

#[tokio::test]
async fn signin_failure_modes_are_indistinguishable() {
    let app = test_app();
    call(app.clone(), post_json("/auth/signup", signup_body("a@x.com"))).await;

    let (wrong_status, _, wrong_body) = call(
        app.clone(),
        post_json("/auth/signin", json!({ "email": "a@x.com", "password": "Wrong123!" })),
    )
    .await;
    let (missing_status, _, missing_body) = call(
        app,
        post_json("/auth/signin", json!({ "email": "b@x.com", "password": "Abcd123!" })),
    )
    .await;

    assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
    assert_eq!(missing_status, StatusCode::UNAUTHORIZED);
    // Same kind, same message; nothing reveals which half failed
    assert_eq!(wrong_body, missing_body);
    assert_eq!(wrong_body["error"], "invalid_credentials");
}

// ============================================
// Refresh
// ============================================

#[tokio::test]
async fn refresh_rotates_cookie_and_mints_new_access_token() {
    let app = test_app();
    let (_, headers, signup_body_json) =
        call(app.clone(), post_json("/auth/signup", signup_body("a@x.com"))).await;
    let original_pair = cookie_pair(&set_cookie(&headers));

    // A later issue second guarantees the rotated token differs
    tokio::time::sleep(Duration::from_millis(1100)).await;

    let req = Request::builder()
        .method("POST")
        .uri("/auth/refresh")
        .header(header::COOKIE, original_pair.clone())
        .body(Body::empty())
        .unwrap();
    let (status, headers, body) = call(app, req).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["accessToken"].is_string());
    assert_ne!(body["accessToken"], signup_body_json["accessToken"]);

    let rotated_pair = cookie_pair(&set_cookie(&headers));
    assert_ne!(rotated_pair, original_pair);
}

#[tokio::test]
async fn refresh_without_cookie_is_unauthenticated() {
    let app = test_app();
    let req = Request::builder()
        .method("POST")
        .uri("/auth/refresh")
        .body(Body::empty())
        .unwrap();
    let (status, _, body) = call(app, req).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthenticated");
}

#[tokio::test]
async fn refresh_rejects_garbage_and_access_tokens() {
    let app = test_app();
    let (_, _, body) =
        call(app.clone(), post_json("/auth/signup", signup_body("a@x.com"))).await;
    let access_token = body["accessToken"].as_str().unwrap();

    for value in ["garbage", access_token] {
        let req = Request::builder()
            .method("POST")
            .uri("/auth/refresh")
            .header(header::COOKIE, format!("refresh_token={value}"))
            .body(Body::empty())
            .unwrap();
        let (status, _, _) = call(app.clone(), req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}

// ============================================
// Logout
// ============================================

#[tokio::test]
async fn logout_clears_the_refresh_cookie() {
    let app = test_app();
    call(app.clone(), post_json("/auth/signup", signup_body("a@x.com"))).await;

    let req = Request::builder()
        .method("POST")
        .uri("/auth/logout")
        .body(Body::empty())
        .unwrap();
    let (status, headers, body) = call(app.clone(), req).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].is_string());

    // Same name and path as the set cookie, expired immediately
    let cookie = set_cookie(&headers);
    assert!(cookie.starts_with("refresh_token="));
    assert!(cookie.contains("Path=/auth/refresh"));
    assert!(cookie.contains("Max-Age=0"));

    // With the cookie gone, the browser's next refresh carries nothing
    let req = Request::builder()
        .method("POST")
        .uri("/auth/refresh")
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = call(app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// ============================================
// Protected routes
// ============================================

#[tokio::test]
async fn me_returns_profile_for_bearer_access_token() {
    let app = test_app();
    let (_, _, body) =
        call(app.clone(), post_json("/auth/signup", signup_body("a@x.com"))).await;
    let access_token = body["accessToken"].as_str().unwrap().to_string();

    let req = Request::builder()
        .uri("/users/me")
        .header(header::AUTHORIZATION, format!("Bearer {access_token}"))
        .body(Body::empty())
        .unwrap();
    let (status, _, profile) = call(app, req).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["email"], "a@x.com");
    assert_eq!(profile["name"], "Ann");
    assert!(!profile.to_string().contains("passwordHash"));
}

#[tokio::test]
async fn me_rejects_missing_malformed_and_refresh_tokens() {
    let app = test_app();
    let (_, headers, _) =
        call(app.clone(), post_json("/auth/signup", signup_body("a@x.com"))).await;
    let refresh_token = cookie_pair(&set_cookie(&headers))
        .trim_start_matches("refresh_token=")
        .to_string();

    let no_header = Request::builder()
        .uri("/users/me")
        .body(Body::empty())
        .unwrap();
    let bad_scheme = Request::builder()
        .uri("/users/me")
        .header(header::AUTHORIZATION, "Basic abc")
        .body(Body::empty())
        .unwrap();
    // A refresh token must never pass the access guard
    let wrong_class = Request::builder()
        .uri("/users/me")
        .header(header::AUTHORIZATION, format!("Bearer {refresh_token}"))
        .body(Body::empty())
        .unwrap();

    for req in [no_header, bad_scheme, wrong_class] {
        let (status, _, body) = call(app.clone(), req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "unauthenticated");
    }
}
