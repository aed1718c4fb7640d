mod common;

use axum::http::StatusCode;
use serde_json::json;
use sqlx::PgPool;

use common::{
    create_test_institution, create_test_user, link_parent, send, setup_test_app,
};
use rollcall_core::{InstitutionKind, UserRole};

#[sqlx::test(migrations = "./migrations")]
async fn test_admin_lists_users_with_filters(pool: PgPool) {
    let institution_id = create_test_institution(&pool, InstitutionKind::School).await;
    let admin = create_test_user(&pool, institution_id, UserRole::Admin, "password123").await;
    for _ in 0..3 {
        create_test_user(&pool, institution_id, UserRole::Student, "password123").await;
    }
    create_test_user(&pool, institution_id, UserRole::Faculty, "password123").await;

    let other_id = create_test_institution(&pool, InstitutionKind::School).await;
    create_test_user(&pool, other_id, UserRole::Student, "password123").await;

    let app = setup_test_app(pool);

    let (status, body) = send(&app, "GET", "/api/users", Some(&admin.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"]["total"], 5);

    let (status, body) = send(
        &app,
        "GET",
        "/api/users?role=student&limit=2",
        Some(&admin.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"]["total"], 3);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
    assert_eq!(body["meta"]["has_more"], true);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_non_admin_cannot_list_users(pool: PgPool) {
    let institution_id = create_test_institution(&pool, InstitutionKind::School).await;
    let faculty = create_test_user(&pool, institution_id, UserRole::Faculty, "password123").await;
    let app = setup_test_app(pool);

    let (status, _) = send(&app, "GET", "/api/users", Some(&faculty.token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_get_user_from_another_institution_is_not_found(pool: PgPool) {
    let institution_id = create_test_institution(&pool, InstitutionKind::School).await;
    let admin = create_test_user(&pool, institution_id, UserRole::Admin, "password123").await;
    let other_id = create_test_institution(&pool, InstitutionKind::College).await;
    let outsider = create_test_user(&pool, other_id, UserRole::Student, "password123").await;
    let app = setup_test_app(pool);

    let (status, _) = send(
        &app,
        "GET",
        &format!("/api/users/{}", outsider.id),
        Some(&admin.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_deactivated_user_cannot_log_in(pool: PgPool) {
    let institution_id = create_test_institution(&pool, InstitutionKind::School).await;
    let admin = create_test_user(&pool, institution_id, UserRole::Admin, "password123").await;
    let student = create_test_user(&pool, institution_id, UserRole::Student, "password123").await;
    let app = setup_test_app(pool);

    let (status, body) = send(
        &app,
        "PATCH",
        &format!("/api/users/{}/status", student.id),
        Some(&admin.token),
        Some(json!({ "is_active": false })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_active"], false);

    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": student.email, "password": "password123" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_admin_cannot_deactivate_self(pool: PgPool) {
    let institution_id = create_test_institution(&pool, InstitutionKind::School).await;
    let admin = create_test_user(&pool, institution_id, UserRole::Admin, "password123").await;
    let app = setup_test_app(pool);

    let (status, body) = send(
        &app,
        "PATCH",
        &format!("/api/users/{}/status", admin.id),
        Some(&admin.token),
        Some(json!({ "is_active": false })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "You cannot deactivate your own account");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_update_own_profile_and_phone_conflict(pool: PgPool) {
    let institution_id = create_test_institution(&pool, InstitutionKind::School).await;
    let first = create_test_user(&pool, institution_id, UserRole::Student, "password123").await;
    let second = create_test_user(&pool, institution_id, UserRole::Student, "password123").await;
    let app = setup_test_app(pool);

    let (status, body) = send(
        &app,
        "PUT",
        "/api/users/me",
        Some(&first.token),
        Some(json!({ "first_name": "Meera", "phone": "+919876543210" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["first_name"], "Meera");
    assert_eq!(body["last_name"], "User");
    assert_eq!(body["phone"], "919876543210");

    // Same number, different formatting.
    let (status, body) = send(
        &app,
        "PUT",
        "/api/users/me",
        Some(&second.token),
        Some(json!({ "phone": "91 98765 43210" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Phone number already registered");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_update_profile_rejects_malformed_phone(pool: PgPool) {
    let institution_id = create_test_institution(&pool, InstitutionKind::School).await;
    let user = create_test_user(&pool, institution_id, UserRole::Parent, "password123").await;
    let app = setup_test_app(pool.clone());

    for phone in ["not-a-phone", "98765.43210", "12345"] {
        let (status, _) = send(
            &app,
            "PUT",
            "/api/users/me",
            Some(&user.token),
            Some(json!({ "phone": phone })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{}", phone);
    }

    let stored: Option<String> = sqlx::query_scalar("SELECT phone FROM users WHERE id = $1")
        .bind(user.id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert!(stored.is_none());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_change_password(pool: PgPool) {
    let institution_id = create_test_institution(&pool, InstitutionKind::School).await;
    let user = create_test_user(&pool, institution_id, UserRole::Faculty, "password123").await;
    let app = setup_test_app(pool);

    let (status, body) = send(
        &app,
        "PUT",
        "/api/users/me/password",
        Some(&user.token),
        Some(json!({ "current_password": "nope-nope", "new_password": "newpassword1" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Current password is incorrect");

    let (status, _) = send(
        &app,
        "PUT",
        "/api/users/me/password",
        Some(&user.token),
        Some(json!({ "current_password": "password123", "new_password": "newpassword1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": user.email, "password": "newpassword1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_parent_lists_children(pool: PgPool) {
    let institution_id = create_test_institution(&pool, InstitutionKind::School).await;
    let parent = create_test_user(&pool, institution_id, UserRole::Parent, "password123").await;
    let child = create_test_user(&pool, institution_id, UserRole::Student, "password123").await;
    link_parent(&pool, parent.id, child.id).await;
    let app = setup_test_app(pool);

    let (status, body) =
        send(&app, "GET", "/api/users/me/children", Some(&parent.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["student_id"], child.id.to_string());

    let (status, _) = send(&app, "GET", "/api/users/me/children", Some(&child.token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_institution_settings(pool: PgPool) {
    let institution_id = create_test_institution(&pool, InstitutionKind::College).await;
    let admin = create_test_user(&pool, institution_id, UserRole::Admin, "password123").await;
    let student = create_test_user(&pool, institution_id, UserRole::Student, "password123").await;
    let app = setup_test_app(pool);

    let (status, body) = send(&app, "GET", "/api/institution", Some(&student.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["kind"], "college");

    let update = json!({ "name": "Riverside College", "contact_email": "office@riverside.edu" });
    let (status, _) = send(
        &app,
        "PUT",
        "/api/institution",
        Some(&student.token),
        Some(update.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) =
        send(&app, "PUT", "/api/institution", Some(&admin.token), Some(update)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Riverside College");
    assert_eq!(body["kind"], "college");
}
