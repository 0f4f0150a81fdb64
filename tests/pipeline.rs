//! Request pipeline behavior driven through the full router.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use storefront::admin::{HmacSessionAuthenticator, SessionAuthenticator, SessionClaims};
use storefront::config::{DatabaseConfig, Environment, RateLimitPolicy};
use storefront::db::ConnectionPool;

mod common;
use common::{body_json, get, json_request};

const SECURITY_HEADERS: [&str; 7] = [
    "content-security-policy",
    "x-frame-options",
    "x-content-type-options",
    "referrer-policy",
    "permissions-policy",
    "x-dns-prefetch-control",
    "x-xss-protection",
];

fn uninitialized_pool() -> Arc<ConnectionPool> {
    Arc::new(ConnectionPool::new(DatabaseConfig::default()))
}

fn token(claims: &SessionClaims) -> String {
    HmacSessionAuthenticator::new(common::SECRET).issue(claims).unwrap()
}

fn with_cookie(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::COOKIE, format!("admin_session={token}"))
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn protected_route_without_cookie_redirects_to_login() {
    // The dashboard handler would fail on the uninitialized pool if it ran.
    let (_, app) = common::app(common::test_config(Environment::Development), uninitialized_pool());

    let response = app.oneshot(get("/admin/dashboard")).await.unwrap();
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(response.headers()[header::LOCATION], "/admin/login");
    assert!(response.headers().get(header::SET_COOKIE).is_none());
}

#[tokio::test]
async fn expired_cookie_is_cleared_and_redirected() {
    let (_, app) = common::app(common::test_config(Environment::Development), uninitialized_pool());
    let expired = token(&SessionClaims::issued_at(common::ADMIN_EMAIL, 1_000, 60));

    let response = app.oneshot(with_cookie("/admin/orders", &expired)).await.unwrap();
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(response.headers()[header::LOCATION], "/admin/login");
    let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(cookie.starts_with("admin_session=;"));
    assert!(cookie.contains("Max-Age=0"));
}

#[tokio::test]
async fn forged_cookie_is_cleared_and_redirected() {
    let (_, app) = common::app(common::test_config(Environment::Development), uninitialized_pool());
    let forged = HmacSessionAuthenticator::new("someone-else")
        .issue(&SessionClaims::new(common::ADMIN_EMAIL, 3600))
        .unwrap();

    let response = app.oneshot(with_cookie("/admin", &forged)).await.unwrap();
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert!(response.headers()[header::SET_COOKIE]
        .to_str()
        .unwrap()
        .contains("Max-Age=0"));
}

#[tokio::test]
async fn login_page_redirects_when_already_signed_in() {
    let (_, app) = common::app(common::test_config(Environment::Development), uninitialized_pool());
    let valid = token(&SessionClaims::new(common::ADMIN_EMAIL, 3600));

    let response = app.clone().oneshot(with_cookie("/admin/login", &valid)).await.unwrap();
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(response.headers()[header::LOCATION], "/admin/dashboard");

    let response = app.oneshot(get("/admin/login")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["loginEndpoint"], "/api/auth/login");
}

#[tokio::test]
async fn valid_session_reaches_the_dashboard() {
    let (_dir, pool) = common::temp_pool(2).await;
    common::seed_product(&pool, "Hoodie", 250_000, 4).await;
    let (_, app) = common::app(common::test_config(Environment::Development), pool);
    let valid = token(&SessionClaims::new(common::ADMIN_EMAIL, 3600));

    let response = app.oneshot(with_cookie("/admin/dashboard", &valid)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["admin"], common::ADMIN_EMAIL);
    assert_eq!(body["data"]["products"], 1);
    assert_eq!(body["data"]["confirmedRevenue"], 0);
}

#[tokio::test]
async fn security_headers_on_success_and_error_in_development() {
    let (_, app) = common::app(common::test_config(Environment::Development), uninitialized_pool());

    let ok = app.clone().oneshot(get("/admin/login")).await.unwrap();
    let missing = app.oneshot(get("/no/such/page")).await.unwrap();
    assert_eq!(ok.status(), StatusCode::OK);
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);

    for response in [&ok, &missing] {
        for name in SECURITY_HEADERS {
            assert!(response.headers().contains_key(name), "missing {name}");
        }
        assert!(!response.headers().contains_key("strict-transport-security"));
    }
}

#[tokio::test]
async fn production_adds_hsts_everywhere() {
    let (_, app) = common::app(common::test_config(Environment::Production), uninitialized_pool());

    let redirect = app.clone().oneshot(get("/admin/orders")).await.unwrap();
    let missing = app.oneshot(get("/nothing-here")).await.unwrap();

    for response in [&redirect, &missing] {
        for name in SECURITY_HEADERS {
            assert!(response.headers().contains_key(name), "missing {name}");
        }
        assert_eq!(
            response.headers()["strict-transport-security"],
            "max-age=31536000; includeSubDomains; preload"
        );
    }
}

#[tokio::test]
async fn api_requests_are_rate_limited_per_route() {
    let mut config = common::test_config(Environment::Development);
    config.rate_limit.policies = vec![
        RateLimitPolicy::new("/api/", 60_000, 100),
        RateLimitPolicy::new("/api/auth/", 60_000, 2),
    ];
    let (_, app) = common::app(config, uninitialized_pool());
    let attempt = || {
        let mut request = json_request(
            "POST",
            "/api/auth/login",
            &json!({ "email": "x@y.z", "password": "wrong" }),
        );
        request
            .headers_mut()
            .insert("x-forwarded-for", "198.51.100.7".parse().unwrap());
        request
    };

    for remaining in ["1", "0"] {
        let response = app.clone().oneshot(attempt()).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()["x-ratelimit-limit"], "2");
        assert_eq!(response.headers()["x-ratelimit-remaining"], remaining);
    }

    let denied = app.clone().oneshot(attempt()).await.unwrap();
    assert_eq!(denied.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(denied.headers().contains_key(header::RETRY_AFTER));
    assert!(denied.headers().contains_key("content-security-policy"));
    let body = body_json(denied).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "RATE_LIMITED");

    // Another client is unaffected.
    let mut other = attempt();
    other
        .headers_mut()
        .insert("x-forwarded-for", "198.51.100.8".parse().unwrap());
    assert_eq!(app.oneshot(other).await.unwrap().status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn health_reports_unhealthy_database_without_failing() {
    let (_, app) = common::app(common::test_config(Environment::Development), uninitialized_pool());

    let response = app.oneshot(get("/api/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let request_id = response.headers()["x-request-id"].to_str().unwrap().to_string();

    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["requestId"], request_id);
    assert_eq!(body["data"]["status"], "unhealthy");
    assert_eq!(body["data"]["database"]["status"], "disconnected");
    assert_eq!(body["data"]["checks"]["database"], false);
    assert!(body["data"]["memory"]["total"].as_u64().is_some());
    assert!(body["data"]["performance"]["totalRequests"].is_u64());
}

#[tokio::test]
async fn health_answers_within_the_request_timeout_when_the_pool_is_exhausted() {
    let (_dir, mut db) = common::sqlite_config(1);
    db.acquire_timeout_ms = 60_000;
    let pool = Arc::new(ConnectionPool::connect(db).await.unwrap());
    let _held = pool.acquire().await.unwrap();

    let mut config = common::test_config(Environment::Development);
    config.timeouts.request_secs = 1;
    let (_, app) = common::app(config, pool.clone());

    let started = std::time::Instant::now();
    let response = app.oneshot(get("/api/health")).await.unwrap();
    assert!(started.elapsed() < std::time::Duration::from_secs(1));
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["data"]["status"], "unhealthy");
    assert_eq!(body["data"]["database"]["status"], "disconnected");
    assert_eq!(pool.stats().leased, 1);
}

#[tokio::test]
async fn health_reports_connected_database() {
    let (_dir, pool) = common::temp_pool(2).await;
    let (_, app) = common::app(common::test_config(Environment::Development), pool);

    let body = body_json(app.oneshot(get("/api/health")).await.unwrap()).await;
    assert_eq!(body["data"]["database"]["status"], "connected");
    assert_eq!(body["data"]["checks"]["database"], true);
    assert_eq!(body["data"]["environment"], "development");
}

#[tokio::test]
async fn errors_carry_the_request_id() {
    let (_, app) = common::app(common::test_config(Environment::Development), uninitialized_pool());
    let request = Request::builder()
        .uri("/api/products/abc")
        .header("x-request-id", "fixed-id-123")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response.headers()["x-request-id"], "fixed-id-123");
    let body = body_json(response).await;
    assert_eq!(body["requestId"], "fixed-id-123");
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn production_redacts_internal_errors() {
    let (_dir, pool) = common::temp_pool(2).await;
    pool.run("DROP TABLE payments", &[]).await.unwrap();
    pool.run("DROP TABLE order_items", &[]).await.unwrap();
    pool.run("DROP TABLE products", &[]).await.unwrap();

    let (_, dev) = common::app(common::test_config(Environment::Development), pool.clone());
    let body = body_json(dev.oneshot(get("/api/products")).await.unwrap()).await;
    assert_eq!(body["error"]["code"], "INTERNAL_ERROR");
    assert_ne!(body["error"]["message"], "Internal server error");

    let (_, prod) = common::app(common::test_config(Environment::Production), pool);
    let response = prod.oneshot(get("/api/products")).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["error"]["message"], "Internal server error");
}

#[tokio::test]
async fn framework_rejections_become_envelopes() {
    let (_dir, pool) = common::temp_pool(2).await;
    let (_, app) = common::app(common::test_config(Environment::Development), pool);

    let wrong_method = app
        .clone()
        .oneshot(Request::builder().method("DELETE").uri("/api/products").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(wrong_method.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body_json(wrong_method).await["success"], false);

    let malformed = Request::builder()
        .method("POST")
        .uri("/api/orders")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.oneshot(malformed).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"]["code"], "VALIDATION_ERROR");
}
