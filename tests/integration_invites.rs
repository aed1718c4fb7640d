mod common;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use serde_json::json;
use sqlx::PgPool;

use common::{create_test_institution, create_test_user, send, setup_test_app};
use rollcall_core::{InstitutionKind, UserRole};

#[sqlx::test(migrations = "./migrations")]
async fn test_admin_creates_invite_with_generated_code(pool: PgPool) {
    let institution_id = create_test_institution(&pool, InstitutionKind::School).await;
    let admin = create_test_user(&pool, institution_id, UserRole::Admin, "password123").await;
    let app = setup_test_app(pool);

    let (status, body) = send(
        &app,
        "POST",
        "/api/invites",
        Some(&admin.token),
        Some(json!({
            "allowed_roles": ["student", "parent", "student"],
            "max_uses": 40
        })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["code"].as_str().unwrap().len(), 10);
    assert_eq!(body["allowed_roles"].as_array().unwrap().len(), 2);
    assert_eq!(body["used_count"], 0);
    assert_eq!(body["active"], true);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_custom_code_is_uppercased_and_unique(pool: PgPool) {
    let institution_id = create_test_institution(&pool, InstitutionKind::College).await;
    let admin = create_test_user(&pool, institution_id, UserRole::Admin, "password123").await;
    let app = setup_test_app(pool);
    let body = json!({ "allowed_roles": ["faculty"], "max_uses": 5, "code": "cse-staff-25" });

    let (status, created) =
        send(&app, "POST", "/api/invites", Some(&admin.token), Some(body.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["code"], "CSE-STAFF-25");

    let (status, error) = send(&app, "POST", "/api/invites", Some(&admin.token), Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"], "Invite code already exists");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_invite_validation(pool: PgPool) {
    let institution_id = create_test_institution(&pool, InstitutionKind::School).await;
    let admin = create_test_user(&pool, institution_id, UserRole::Admin, "password123").await;
    let app = setup_test_app(pool);

    let (status, _) = send(
        &app,
        "POST",
        "/api/invites",
        Some(&admin.token),
        Some(json!({ "allowed_roles": [], "max_uses": 5 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let past = Utc::now() - Duration::hours(1);
    let (status, _) = send(
        &app,
        "POST",
        "/api/invites",
        Some(&admin.token),
        Some(json!({ "allowed_roles": ["student"], "max_uses": 5, "expires_at": past })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_faculty_cannot_manage_invites(pool: PgPool) {
    let institution_id = create_test_institution(&pool, InstitutionKind::School).await;
    let faculty = create_test_user(&pool, institution_id, UserRole::Faculty, "password123").await;
    let app = setup_test_app(pool);

    let (status, _) = send(&app, "GET", "/api/invites", Some(&faculty.token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, "GET", "/api/invites", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_list_and_revoke_are_scoped_to_institution(pool: PgPool) {
    let institution_id = create_test_institution(&pool, InstitutionKind::School).await;
    let other_id = create_test_institution(&pool, InstitutionKind::School).await;
    let admin = create_test_user(&pool, institution_id, UserRole::Admin, "password123").await;
    let other_admin = create_test_user(&pool, other_id, UserRole::Admin, "password123").await;
    let app = setup_test_app(pool);

    let (_, created) = send(
        &app,
        "POST",
        "/api/invites",
        Some(&admin.token),
        Some(json!({ "allowed_roles": ["student"], "max_uses": 5 })),
    )
    .await;
    let invite_id = created["id"].as_str().unwrap().to_string();

    let (status, list) = send(&app, "GET", "/api/invites", Some(&other_admin.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["meta"]["total"], 0);

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/invites/{}", invite_id),
        Some(&other_admin.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, revoked) = send(
        &app,
        "DELETE",
        &format!("/api/invites/{}", invite_id),
        Some(&admin.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(revoked["active"], false);
    assert!(revoked["revoked_at"].is_string());

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/auth/invites/{}", revoked["code"].as_str().unwrap()),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invite code has been revoked");
}
