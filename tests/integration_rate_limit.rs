mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use sqlx::PgPool;
use tower::ServiceExt;

use common::{create_test_institution, create_test_user, test_state};
use rollcall::router::init_router;
use rollcall_config::RateLimitConfig;
use rollcall_core::{InstitutionKind, UserRole};

/// One auth request per client, then nothing for a minute.
fn strict_rate_limit_config() -> RateLimitConfig {
    RateLimitConfig {
        enabled: true,
        general_per_second: 60,
        general_burst_size: 3,
        auth_per_second: 60,
        auth_burst_size: 1,
    }
}

fn setup_test_app_with_rate_limit(pool: PgPool, config: RateLimitConfig) -> axum::Router {
    init_router(test_state(pool, config))
}

async fn post_from(app: &axum::Router, uri: &str, ip: &str, body: Value) -> StatusCode {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header("x-forwarded-for", ip)
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap();

    app.clone().oneshot(request).await.unwrap().status()
}

async fn get_from(app: &axum::Router, uri: &str, ip: &str) -> StatusCode {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .header("x-forwarded-for", ip)
        .body(Body::empty())
        .unwrap();

    app.clone().oneshot(request).await.unwrap().status()
}

fn bad_login() -> Value {
    json!({ "email": "nobody@example.com", "password": "password123" })
}

#[sqlx::test(migrations = "./migrations")]
async fn test_auth_rate_limit_exceeded(pool: PgPool) {
    let app = setup_test_app_with_rate_limit(pool, strict_rate_limit_config());

    let status = post_from(&app, "/api/auth/login", "192.168.1.100", bad_login()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let status = post_from(&app, "/api/auth/login", "192.168.1.100", bad_login()).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_different_ips_have_separate_limits(pool: PgPool) {
    let app = setup_test_app_with_rate_limit(pool, strict_rate_limit_config());

    let status = post_from(&app, "/api/auth/login", "10.0.0.1", bad_login()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let status = post_from(&app, "/api/auth/login", "10.0.0.2", bad_login()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_successful_login_still_counts_toward_rate_limit(pool: PgPool) {
    let institution_id = create_test_institution(&pool, InstitutionKind::School).await;
    let user = create_test_user(&pool, institution_id, UserRole::Student, "testpass123").await;
    let app = setup_test_app_with_rate_limit(pool, strict_rate_limit_config());
    let login = json!({ "email": user.email, "password": user.password });

    let status = post_from(&app, "/api/auth/login", "203.0.113.50", login.clone()).await;
    assert_eq!(status, StatusCode::OK);

    let status = post_from(&app, "/api/auth/login", "203.0.113.50", login).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_otp_and_password_reset_share_the_auth_bucket(pool: PgPool) {
    let app = setup_test_app_with_rate_limit(pool, strict_rate_limit_config());

    let status = post_from(
        &app,
        "/api/auth/forgot-password",
        "192.0.2.1",
        json!({ "email": "someone@example.com" }),
    )
    .await;
    assert_ne!(status, StatusCode::TOO_MANY_REQUESTS);

    let status = post_from(
        &app,
        "/api/auth/signup/otp",
        "192.0.2.1",
        json!({ "email": "another@example.com", "invite_code": "NOPE123456", "role": "student" }),
    )
    .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_general_limit_applies_to_api_routes(pool: PgPool) {
    let app = setup_test_app_with_rate_limit(pool, strict_rate_limit_config());

    for _ in 0..3 {
        let status = get_from(&app, "/api/sections", "172.16.0.1").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    let status = get_from(&app, "/api/sections", "172.16.0.1").await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_api_docs_are_not_rate_limited(pool: PgPool) {
    let app = setup_test_app_with_rate_limit(pool, strict_rate_limit_config());

    for _ in 0..5 {
        let status = get_from(&app, "/api-docs/openapi.json", "172.16.0.2").await;
        assert_eq!(status, StatusCode::OK);
    }
}

#[sqlx::test(migrations = "./migrations")]
async fn test_disabled_config_never_limits(pool: PgPool) {
    let app = setup_test_app_with_rate_limit(pool, RateLimitConfig::disabled());

    for _ in 0..5 {
        let status = post_from(&app, "/api/auth/login", "192.168.7.7", bad_login()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
