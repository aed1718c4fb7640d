mod common;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use serde_json::json;
use sqlx::PgPool;

use common::{
    create_test_institution, create_test_invite, create_test_user, generate_unique_email,
    insert_known_otp, registration_number, send, setup_test_app,
};
use rollcall::utils::codes::hash_code;
use rollcall_config::OtpConfig;
use rollcall_core::{InstitutionKind, UserRole};
use rollcall_models::OtpPurpose;

fn signup_body(invite: &str, role: &str, email: &str, otp: &str) -> serde_json::Value {
    json!({
        "invite_code": invite,
        "role": role,
        "email": email,
        "otp": otp,
        "first_name": "Asha",
        "last_name": "Rao",
        "password": "supersecret1"
    })
}

#[sqlx::test(migrations = "./migrations")]
async fn test_check_invite_returns_institution(pool: PgPool) {
    let institution_id = create_test_institution(&pool, InstitutionKind::College).await;
    let code = create_test_invite(&pool, institution_id, &[UserRole::Student], 5, None).await;
    let app = setup_test_app(pool);

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/auth/invites/{}", code.to_lowercase()),
        None,
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], code);
    assert_eq!(body["institution_kind"], "college");
    assert_eq!(body["allowed_roles"], json!(["student"]));
}

#[sqlx::test(migrations = "./migrations")]
async fn test_check_unknown_invite_is_not_found(pool: PgPool) {
    let app = setup_test_app(pool);
    let (status, body) = send(&app, "GET", "/api/auth/invites/NOPE1234", None, None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Invite code not found");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_check_expired_invite_is_rejected(pool: PgPool) {
    let institution_id = create_test_institution(&pool, InstitutionKind::School).await;
    let expired = Utc::now() - Duration::days(1);
    let code =
        create_test_invite(&pool, institution_id, &[UserRole::Student], 5, Some(expired)).await;
    let app = setup_test_app(pool);

    let (status, body) =
        send(&app, "GET", &format!("/api/auth/invites/{}", code), None, None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invite code has expired");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_request_signup_otp_stores_code(pool: PgPool) {
    let institution_id = create_test_institution(&pool, InstitutionKind::School).await;
    let code = create_test_invite(&pool, institution_id, &[UserRole::Student], 5, None).await;
    let email = generate_unique_email();
    let app = setup_test_app(pool.clone());

    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/signup/otp",
        None,
        Some(json!({ "email": email, "invite_code": code, "role": "student" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let stored: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM otps WHERE email = $1 AND purpose = 'signup' AND consumed_at IS NULL",
    )
    .bind(&email)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(stored, 1);

    // A second request inside the cooldown is throttled.
    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/signup/otp",
        None,
        Some(json!({ "email": email, "invite_code": code, "role": "student" })),
    )
    .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_request_signup_otp_rejects_disallowed_role(pool: PgPool) {
    let institution_id = create_test_institution(&pool, InstitutionKind::School).await;
    let code = create_test_invite(&pool, institution_id, &[UserRole::Student], 5, None).await;
    let app = setup_test_app(pool);

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/signup/otp",
        None,
        Some(json!({ "email": generate_unique_email(), "invite_code": code, "role": "faculty" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invite code does not allow signing up as faculty");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_student_signup_allocates_registration_number(pool: PgPool) {
    let institution_id = create_test_institution(&pool, InstitutionKind::School).await;
    let code = create_test_invite(&pool, institution_id, &[UserRole::Student], 2, None).await;
    let email = generate_unique_email();
    insert_known_otp(&pool, &email, OtpPurpose::Signup, "123456").await;
    let app = setup_test_app(pool.clone());

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/signup",
        None,
        Some(signup_body(&code, "student", &email, "123456")),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert!(body["access_token"].is_string());
    assert!(body["refresh_token"].is_string());
    assert_eq!(body["user"]["email"], email);
    assert_eq!(body["user"]["role"], "student");
    assert_eq!(
        body["user"]["student_profile"]["registration_number"],
        "STU-000001"
    );

    let used: i32 = sqlx::query_scalar("SELECT used_count FROM invites WHERE code = $1")
        .bind(&code)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(used, 1);

    // The code cannot be replayed.
    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/signup",
        None,
        Some(signup_body(&code, "student", &email, "123456")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_signup_with_wrong_otp_counts_attempt(pool: PgPool) {
    let institution_id = create_test_institution(&pool, InstitutionKind::School).await;
    let code = create_test_invite(&pool, institution_id, &[UserRole::Faculty], 2, None).await;
    let email = generate_unique_email();
    insert_known_otp(&pool, &email, OtpPurpose::Signup, "123456").await;
    let app = setup_test_app(pool.clone());

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/signup",
        None,
        Some(signup_body(&code, "faculty", &email, "654321")),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid OTP");

    let attempts: i32 = sqlx::query_scalar("SELECT attempts FROM otps WHERE email = $1")
        .bind(&email)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(attempts, 1);

    let users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = $1")
        .bind(&email)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(users, 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_signup_with_used_up_invite_fails(pool: PgPool) {
    let institution_id = create_test_institution(&pool, InstitutionKind::School).await;
    let code = create_test_invite(&pool, institution_id, &[UserRole::Student], 1, None).await;
    sqlx::query("UPDATE invites SET used_count = 1 WHERE code = $1")
        .bind(&code)
        .execute(&pool)
        .await
        .unwrap();
    let email = generate_unique_email();
    insert_known_otp(&pool, &email, OtpPurpose::Signup, "123456").await;
    let app = setup_test_app(pool);

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/signup",
        None,
        Some(signup_body(&code, "student", &email, "123456")),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invite code has reached its usage limit");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_parent_signup_links_student(pool: PgPool) {
    let institution_id = create_test_institution(&pool, InstitutionKind::School).await;
    let student = create_test_user(&pool, institution_id, UserRole::Student, "password123").await;
    let registration = registration_number(&pool, student.id).await;
    let code = create_test_invite(&pool, institution_id, &[UserRole::Parent], 5, None).await;
    let email = generate_unique_email();
    insert_known_otp(&pool, &email, OtpPurpose::Signup, "123456").await;
    let app = setup_test_app(pool);

    let mut body = signup_body(&code, "parent", &email, "123456");
    body["parent"] = json!({
        "student_registration_number": registration.to_lowercase(),
        "relationship": "Mother"
    });

    let (status, body) = send(&app, "POST", "/api/auth/signup", None, Some(body)).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["children"][0]["student_id"], student.id.to_string());
    assert_eq!(body["user"]["children"][0]["relationship"], "Mother");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_parent_signup_requires_known_student(pool: PgPool) {
    let institution_id = create_test_institution(&pool, InstitutionKind::School).await;
    let code = create_test_invite(&pool, institution_id, &[UserRole::Parent], 5, None).await;
    let email = generate_unique_email();
    insert_known_otp(&pool, &email, OtpPurpose::Signup, "123456").await;
    let app = setup_test_app(pool.clone());

    let mut body = signup_body(&code, "parent", &email, "123456");
    body["parent"] = json!({ "student_registration_number": "STU-999999" });

    let (status, _) = send(&app, "POST", "/api/auth/signup", None, Some(body)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Nothing was written and the invite was not spent.
    let used: i32 = sqlx::query_scalar("SELECT used_count FROM invites WHERE code = $1")
        .bind(&code)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(used, 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_login_success_and_failures(pool: PgPool) {
    let institution_id = create_test_institution(&pool, InstitutionKind::School).await;
    let user = create_test_user(&pool, institution_id, UserRole::Faculty, "password123").await;
    let app = setup_test_app(pool.clone());

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": user.email.to_uppercase(), "password": "password123" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["access_token"].is_string());
    assert!(body["user"]["faculty_profile"]["employee_id"].is_string());

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": user.email, "password": "wrong-password" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid email or password");

    sqlx::query("UPDATE users SET is_active = false WHERE id = $1")
        .bind(user.id)
        .execute(&pool)
        .await
        .unwrap();

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": user.email, "password": "password123" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Account is deactivated");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_refresh_issues_access_token(pool: PgPool) {
    let institution_id = create_test_institution(&pool, InstitutionKind::School).await;
    let user = create_test_user(&pool, institution_id, UserRole::Admin, "password123").await;
    let app = setup_test_app(pool);

    let (_, login) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": user.email, "password": "password123" })),
    )
    .await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/refresh",
        None,
        Some(json!({ "refresh_token": login["refresh_token"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["access_token"].is_string());

    // An access token is not accepted as a refresh token.
    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/refresh",
        None,
        Some(json!({ "refresh_token": login["access_token"] })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_forgot_password_does_not_reveal_accounts(pool: PgPool) {
    let app = setup_test_app(pool.clone());
    let email = generate_unique_email();

    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/forgot-password",
        None,
        Some(json!({ "email": email })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let stored: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM otps WHERE email = $1")
        .bind(&email)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(stored, 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_reset_password_with_otp(pool: PgPool) {
    let institution_id = create_test_institution(&pool, InstitutionKind::School).await;
    let user = create_test_user(&pool, institution_id, UserRole::Student, "password123").await;
    insert_known_otp(&pool, &user.email, OtpPurpose::PasswordReset, "246810").await;
    let app = setup_test_app(pool);

    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/reset-password",
        None,
        Some(json!({ "email": user.email, "otp": "246810", "new_password": "brandnewpass" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": user.email, "password": "brandnewpass" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": user.email, "password": "password123" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_me_requires_token(pool: PgPool) {
    let institution_id = create_test_institution(&pool, InstitutionKind::School).await;
    let user = create_test_user(&pool, institution_id, UserRole::Student, "password123").await;
    let app = setup_test_app(pool);

    let (status, _) = send(&app, "GET", "/api/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(&app, "GET", "/api/auth/me", Some(&user.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], user.id.to_string());
    assert!(body["student_profile"]["registration_number"].is_string());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_signup_with_expired_otp_fails(pool: PgPool) {
    let institution_id = create_test_institution(&pool, InstitutionKind::School).await;
    let code = create_test_invite(&pool, institution_id, &[UserRole::Student], 2, None).await;
    let email = generate_unique_email();
    sqlx::query(
        "INSERT INTO otps (email, purpose, code_hash, expires_at, created_at)
         VALUES ($1, $2, $3, NOW() - INTERVAL '1 minute', NOW() - INTERVAL '11 minutes')",
    )
    .bind(&email)
    .bind(OtpPurpose::Signup)
    .bind(hash_code("123456"))
    .execute(&pool)
    .await
    .unwrap();
    let app = setup_test_app(pool.clone());

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/signup",
        None,
        Some(signup_body(&code, "student", &email, "123456")),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "OTP has expired");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_otp_stops_working_after_attempt_budget(pool: PgPool) {
    let institution_id = create_test_institution(&pool, InstitutionKind::School).await;
    let user = create_test_user(&pool, institution_id, UserRole::Faculty, "password123").await;
    insert_known_otp(&pool, &user.email, OtpPurpose::PasswordReset, "246810").await;
    sqlx::query("UPDATE otps SET attempts = $2 WHERE email = $1")
        .bind(&user.email)
        .bind(OtpConfig::default().max_attempts)
        .execute(&pool)
        .await
        .unwrap();
    let app = setup_test_app(pool);

    // Even the right code is refused once the budget is spent.
    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/reset-password",
        None,
        Some(json!({ "email": user.email, "otp": "246810", "new_password": "brandnewpass" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Too many incorrect attempts, request a new code");

    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": user.email, "password": "password123" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_forgot_password_within_cooldown_still_succeeds(pool: PgPool) {
    let institution_id = create_test_institution(&pool, InstitutionKind::College).await;
    let user = create_test_user(&pool, institution_id, UserRole::Student, "password123").await;
    let app = setup_test_app(pool.clone());

    for _ in 0..2 {
        let (status, _) = send(
            &app,
            "POST",
            "/api/auth/forgot-password",
            None,
            Some(json!({ "email": user.email })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let stored: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM otps WHERE email = $1")
        .bind(&user.email)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(stored, 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_generated_employee_id_skips_custom_ids(pool: PgPool) {
    let institution_id = create_test_institution(&pool, InstitutionKind::College).await;
    let code = create_test_invite(&pool, institution_id, &[UserRole::Faculty], 3, None).await;
    let app = setup_test_app(pool.clone());

    let custom_email = generate_unique_email();
    insert_known_otp(&pool, &custom_email, OtpPurpose::Signup, "111111").await;
    let mut body = signup_body(&code, "faculty", &custom_email, "111111");
    body["faculty"] = json!({ "employee_id": "emp-000001" });
    let (status, body) = send(&app, "POST", "/api/auth/signup", None, Some(body)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["faculty_profile"]["employee_id"], "EMP-000001");

    let email = generate_unique_email();
    insert_known_otp(&pool, &email, OtpPurpose::Signup, "222222").await;
    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/signup",
        None,
        Some(signup_body(&code, "faculty", &email, "222222")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["faculty_profile"]["employee_id"], "EMP-000002");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_signup_stores_phone_digits(pool: PgPool) {
    let institution_id = create_test_institution(&pool, InstitutionKind::School).await;
    let code = create_test_invite(&pool, institution_id, &[UserRole::Student], 3, None).await;
    let app = setup_test_app(pool.clone());

    let email = generate_unique_email();
    insert_known_otp(&pool, &email, OtpPurpose::Signup, "123456").await;
    let mut body = signup_body(&code, "student", &email, "123456");
    body["phone"] = json!("not-a-phone");
    let (status, _) = send(&app, "POST", "/api/auth/signup", None, Some(body.clone())).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    body["phone"] = json!("+44 (0) 20 - 7946 - 0958");
    body["student"] = json!({ "guardian_phone": "+91 98765-43210" });
    let (status, body) = send(&app, "POST", "/api/auth/signup", None, Some(body)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["phone"], "4402079460958");
    assert_eq!(body["user"]["student_profile"]["guardian_phone"], "919876543210");
}
