#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{DateTime, Duration, Utc};
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;

use rollcall::router::init_router;
use rollcall::state::AppState;
use rollcall::utils::codes::hash_code;
use rollcall_auth::create_access_token;
use rollcall_config::{
    CorsConfig, EmailConfig, ImportConfig, JwtConfig, OtpConfig, RateLimitConfig,
};
use rollcall_core::{InstitutionKind, UserRole};
use rollcall_models::OtpPurpose;

pub fn test_jwt_config() -> JwtConfig {
    JwtConfig {
        secret: "integration-test-secret-at-least-32-chars".to_string(),
        access_token_expiry: 3600,
        refresh_token_expiry: 604800,
    }
}

pub fn test_state(pool: PgPool, rate_limit_config: RateLimitConfig) -> AppState {
    AppState {
        db: pool,
        jwt_config: test_jwt_config(),
        email_config: EmailConfig {
            enabled: false,
            smtp_host: "localhost".to_string(),
            smtp_port: 1025,
            smtp_username: String::new(),
            smtp_password: String::new(),
            from_email: "noreply@rollcall.test".to_string(),
            from_name: "Rollcall".to_string(),
            frontend_url: "http://localhost:5173".to_string(),
        },
        cors_config: CorsConfig {
            allowed_origins: vec!["http://localhost:5173".to_string()],
        },
        rate_limit_config,
        otp_config: OtpConfig::default(),
        import_config: ImportConfig::default(),
    }
}

pub fn setup_test_app(pool: PgPool) -> axum::Router {
    init_router(test_state(pool, RateLimitConfig::disabled()))
}

pub struct TestUser {
    pub id: Uuid,
    pub email: String,
    pub password: String,
    pub role: UserRole,
    pub institution_id: Uuid,
    pub token: String,
}

pub fn generate_unique_email() -> String {
    format!("test-{}@test.com", Uuid::new_v4())
}

pub async fn create_test_institution(pool: &PgPool, kind: InstitutionKind) -> Uuid {
    let code = format!("T{}", &Uuid::new_v4().simple().to_string()[..8]).to_uppercase();
    sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO institutions (name, kind, code) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(format!("Test {} {}", kind, code))
    .bind(kind)
    .bind(code)
    .fetch_one(pool)
    .await
    .unwrap()
}

/// Inserts an active, verified user with the profile its role needs.
pub async fn create_test_user(
    pool: &PgPool,
    institution_id: Uuid,
    role: UserRole,
    password: &str,
) -> TestUser {
    let email = generate_unique_email();
    let hashed = bcrypt::hash(password, 4).unwrap();

    let id = sqlx::query_scalar::<_, Uuid>(
        r#"
        INSERT INTO users (institution_id, first_name, last_name, email, password, role, email_verified_at)
        VALUES ($1, 'Test', 'User', $2, $3, $4, NOW())
        RETURNING id
        "#,
    )
    .bind(institution_id)
    .bind(&email)
    .bind(&hashed)
    .bind(role)
    .fetch_one(pool)
    .await
    .unwrap();

    let tag = id.simple().to_string()[..8].to_uppercase();
    match role {
        UserRole::Student => {
            sqlx::query(
                "INSERT INTO student_profiles (user_id, institution_id, registration_number)
                 VALUES ($1, $2, $3)",
            )
            .bind(id)
            .bind(institution_id)
            .bind(format!("REG-{}", tag))
            .execute(pool)
            .await
            .unwrap();
        }
        UserRole::Faculty => {
            sqlx::query(
                "INSERT INTO faculty_profiles (user_id, institution_id, employee_id)
                 VALUES ($1, $2, $3)",
            )
            .bind(id)
            .bind(institution_id)
            .bind(format!("EMP-{}", tag))
            .execute(pool)
            .await
            .unwrap();
        }
        UserRole::Parent | UserRole::Admin => {}
    }

    let token =
        create_access_token(id, &email, role, institution_id, &test_jwt_config()).unwrap();

    TestUser {
        id,
        email,
        password: password.to_string(),
        role,
        institution_id,
        token,
    }
}

pub async fn registration_number(pool: &PgPool, student_id: Uuid) -> String {
    sqlx::query_scalar("SELECT registration_number FROM student_profiles WHERE user_id = $1")
        .bind(student_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

pub async fn link_parent(pool: &PgPool, parent_id: Uuid, student_id: Uuid) {
    sqlx::query("INSERT INTO parent_students (parent_id, student_id) VALUES ($1, $2)")
        .bind(parent_id)
        .bind(student_id)
        .execute(pool)
        .await
        .unwrap();
}

pub async fn create_test_section(pool: &PgPool, institution_id: Uuid, class_name: &str) -> Uuid {
    sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO sections (institution_id, name, academic_year, class_name)
         VALUES ($1, 'A', '2025-26', $2) RETURNING id",
    )
    .bind(institution_id)
    .bind(class_name)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn enroll(pool: &PgPool, section_id: Uuid, student_id: Uuid, roll_number: &str) {
    sqlx::query("INSERT INTO enrollments (section_id, student_id, roll_number) VALUES ($1, $2, $3)")
        .bind(section_id)
        .bind(student_id)
        .bind(roll_number)
        .execute(pool)
        .await
        .unwrap();
}

pub async fn assign_faculty(pool: &PgPool, section_id: Uuid, faculty_id: Uuid) {
    sqlx::query("INSERT INTO faculty_sections (section_id, faculty_id) VALUES ($1, $2)")
        .bind(section_id)
        .bind(faculty_id)
        .execute(pool)
        .await
        .unwrap();
}

pub async fn create_test_invite(
    pool: &PgPool,
    institution_id: Uuid,
    roles: &[UserRole],
    max_uses: i32,
    expires_at: Option<DateTime<Utc>>,
) -> String {
    let code = Uuid::new_v4().simple().to_string()[..10].to_uppercase();
    sqlx::query(
        "INSERT INTO invites (institution_id, code, allowed_roles, max_uses, expires_at)
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(institution_id)
    .bind(&code)
    .bind(roles)
    .bind(max_uses)
    .bind(expires_at)
    .execute(pool)
    .await
    .unwrap();
    code
}

/// Stores a known one-time code, as if it had been emailed.
pub async fn insert_known_otp(pool: &PgPool, email: &str, purpose: OtpPurpose, code: &str) {
    sqlx::query(
        "INSERT INTO otps (email, purpose, code_hash, expires_at, created_at)
         VALUES ($1, $2, $3, $4, NOW() - INTERVAL '5 minutes')",
    )
    .bind(email)
    .bind(purpose)
    .bind(hash_code(code))
    .bind(Utc::now() + Duration::minutes(10))
    .execute(pool)
    .await
    .unwrap();
}

/// Sends a request and returns the status with the parsed JSON body
/// (`Value::Null` for empty bodies).
pub async fn send(
    app: &axum::Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}
