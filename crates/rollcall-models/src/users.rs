//! User entities, profiles and DTOs.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use rollcall_core::serde::{deserialize_optional_i64, deserialize_trimmed_option};
use rollcall_core::{PaginationMeta, PaginationParams, UserRole};

/// Phones are stored as bare digits; see [`rollcall_import::normalize_phone`].
pub fn validate_phone(value: &str) -> Result<(), ValidationError> {
    match rollcall_import::normalize_phone(value) {
        Some(_) => Ok(()),
        None => Err(ValidationError::new("phone")
            .with_message("Phone number must contain 10 to 15 digits".into())),
    }
}

/// Column list matching [`User`], for `SELECT` statements.
pub const USER_COLUMNS: &str = "id, institution_id, first_name, last_name, email, phone, role, \
     is_active, email_verified_at, last_login_at, created_at, updated_at";

/// A user account. The password hash is never loaded into this type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub institution_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: UserRole,
    pub is_active: bool,
    pub email_verified_at: Option<DateTime<Utc>>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct StudentProfile {
    pub registration_number: String,
    pub date_of_birth: Option<NaiveDate>,
    pub guardian_name: Option<String>,
    pub guardian_phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct FacultyProfile {
    pub employee_id: String,
    pub department: Option<String>,
    pub designation: Option<String>,
}

/// A student linked to a parent account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct LinkedStudent {
    pub student_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub registration_number: String,
    pub relationship: Option<String>,
}

/// A user together with whichever profile their role carries.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserWithProfile {
    #[serde(flatten)]
    pub user: User,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_profile: Option<StudentProfile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub faculty_profile: Option<FacultyProfile>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<LinkedStudent>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserFilterParams {
    pub role: Option<UserRole>,
    /// Substring of first name, last name or email
    #[serde(default, deserialize_with = "deserialize_trimmed_option")]
    pub search: Option<String>,
    pub is_active: Option<bool>,
    #[serde(default, deserialize_with = "deserialize_optional_i64")]
    pub page: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_optional_i64")]
    pub limit: Option<i64>,
}

impl UserFilterParams {
    pub fn pagination(&self) -> PaginationParams {
        PaginationParams::new(self.page, self.limit)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaginatedUsersResponse {
    pub data: Vec<User>,
    pub meta: PaginationMeta,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateUserStatusDto {
    pub is_active: bool,
}

/// Fields a user may change on their own account.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateProfileDto {
    #[validate(length(min = 1, max = 100))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub last_name: Option<String>,
    #[validate(custom(function = "validate_phone"))]
    #[schema(example = "+919876543210")]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ChangePasswordDto {
    #[validate(length(min = 1))]
    pub current_password: String,
    #[validate(length(min = 8, max = 128))]
    #[schema(example = "newPassword123")]
    pub new_password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: Uuid::nil(),
            institution_id: Uuid::nil(),
            first_name: "Asha".to_string(),
            last_name: "Rao".to_string(),
            email: "asha@example.com".to_string(),
            phone: None,
            role: UserRole::Student,
            is_active: true,
            email_verified_at: None,
            last_login_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_profile_is_flattened() {
        let value = serde_json::to_value(UserWithProfile {
            user: user(),
            student_profile: Some(StudentProfile {
                registration_number: "STU-000001".to_string(),
                date_of_birth: None,
                guardian_name: None,
                guardian_phone: None,
            }),
            faculty_profile: None,
            children: Vec::new(),
        })
        .unwrap();

        assert_eq!(value["email"], "asha@example.com");
        assert_eq!(value["role"], "student");
        assert_eq!(
            value["student_profile"]["registration_number"],
            "STU-000001"
        );
        assert!(value.get("faculty_profile").is_none());
        assert!(value.get("children").is_none());
    }

    #[test]
    fn test_profile_phone_must_be_digits() {
        let dto = |phone: &str| UpdateProfileDto {
            first_name: None,
            last_name: None,
            phone: Some(phone.to_string()),
        };

        assert!(dto("+91 98765-43210").validate().is_ok());
        assert!(dto("+44 (0) 20 - 7946 - 0958").validate().is_ok());
        assert!(dto("not-a-phone").validate().is_err());
        assert!(dto("98765.43210").validate().is_err());
        assert!(dto("12345").validate().is_err());
    }

    #[test]
    fn test_filter_params_ignore_empty_values() {
        let params: UserFilterParams =
            serde_json::from_str(r#"{"search": " ", "page": "", "limit": "5"}"#).unwrap();
        assert!(params.search.is_none());
        assert_eq!(params.pagination().page(), 1);
        assert_eq!(params.pagination().limit(), 5);
    }
}
