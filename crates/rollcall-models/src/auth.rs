//! Authentication and signup DTOs.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use rollcall_core::UserRole;

use crate::institutions::InstitutionKind;
use crate::users::{UserWithProfile, validate_phone};

/// What the stored OTP is for. A code issued for one purpose cannot be
/// redeemed for the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[sqlx(type_name = "otp_purpose", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OtpPurpose {
    Signup,
    PasswordReset,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InviteCheckResponse {
    pub code: String,
    pub institution_name: String,
    pub institution_kind: InstitutionKind,
    pub allowed_roles: Vec<UserRole>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RequestSignupOtpDto {
    #[validate(email)]
    #[schema(example = "asha@example.com")]
    pub email: String,
    #[validate(length(min = 1, max = 32))]
    pub invite_code: String,
    pub role: UserRole,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct StudentSignupDetails {
    pub date_of_birth: Option<NaiveDate>,
    #[validate(length(max = 200))]
    pub guardian_name: Option<String>,
    #[validate(custom(function = "validate_phone"))]
    pub guardian_phone: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct FacultySignupDetails {
    /// Allocated automatically when omitted.
    #[validate(length(min = 1, max = 32))]
    pub employee_id: Option<String>,
    #[validate(length(max = 100))]
    pub department: Option<String>,
    #[validate(length(max = 100))]
    pub designation: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ParentSignupDetails {
    /// Registration number of a student in the same institution.
    #[validate(length(min = 1, max = 32))]
    pub student_registration_number: String,
    #[validate(length(max = 50))]
    pub relationship: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct SignupDto {
    #[validate(length(min = 1, max = 32))]
    pub invite_code: String,
    pub role: UserRole,
    #[validate(email)]
    pub email: String,
    #[validate(length(equal = 6))]
    #[schema(example = "123456")]
    pub otp: String,
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
    #[validate(custom(function = "validate_phone"))]
    pub phone: Option<String>,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    #[validate(nested)]
    pub student: Option<StudentSignupDetails>,
    #[validate(nested)]
    pub faculty: Option<FacultySignupDetails>,
    #[validate(nested)]
    pub parent: Option<ParentSignupDetails>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    #[schema(example = "password123")]
    pub password: String,
}

/// Returned by login and signup.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: UserWithProfile,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RefreshTokenRequest {
    #[validate(length(min = 1))]
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AccessTokenResponse {
    pub access_token: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ForgotPasswordRequest {
    #[validate(email)]
    #[schema(example = "user@example.com")]
    pub email: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ResetPasswordRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(equal = 6))]
    pub otp: String,
    #[validate(length(min = 8, max = 128))]
    pub new_password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signup_validates_nested_details() {
        let dto: SignupDto = serde_json::from_value(serde_json::json!({
            "invite_code": "ABC123",
            "role": "student",
            "email": "asha@example.com",
            "otp": "123456",
            "first_name": "Asha",
            "last_name": "Rao",
            "password": "password123",
            "student": { "guardian_phone": "123" }
        }))
        .unwrap();

        let errors = dto.validate().unwrap_err();
        assert!(errors.errors().contains_key("student"));
    }

    #[test]
    fn test_otp_must_be_six_characters() {
        let dto = ResetPasswordRequest {
            email: "asha@example.com".to_string(),
            otp: "12345".to_string(),
            new_password: "password123".to_string(),
        };
        assert!(dto.validate().is_err());
    }
}
