//! Invite codes gating signup.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use rollcall_core::{PaginationMeta, UserRole};

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Invite {
    pub id: Uuid,
    pub institution_id: Uuid,
    pub code: String,
    pub allowed_roles: Vec<UserRole>,
    pub max_uses: i32,
    pub used_count: i32,
    pub expires_at: Option<DateTime<Utc>>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Invite {
    /// Why the invite can no longer be redeemed, if it can't.
    pub fn unusable_reason(&self, now: DateTime<Utc>) -> Option<&'static str> {
        if self.revoked_at.is_some() {
            Some("Invite code has been revoked")
        } else if self.expires_at.is_some_and(|at| at <= now) {
            Some("Invite code has expired")
        } else if self.used_count >= self.max_uses {
            Some("Invite code has reached its usage limit")
        } else {
            None
        }
    }

    pub fn allows(&self, role: UserRole) -> bool {
        self.allowed_roles.contains(&role)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InviteResponse {
    pub id: Uuid,
    pub code: String,
    pub allowed_roles: Vec<UserRole>,
    pub max_uses: i32,
    pub used_count: i32,
    pub expires_at: Option<DateTime<Utc>>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    /// Whether the invite can still be redeemed
    pub active: bool,
}

impl From<Invite> for InviteResponse {
    fn from(invite: Invite) -> Self {
        let active = invite.unusable_reason(Utc::now()).is_none();
        Self {
            id: invite.id,
            code: invite.code,
            allowed_roles: invite.allowed_roles,
            max_uses: invite.max_uses,
            used_count: invite.used_count,
            expires_at: invite.expires_at,
            revoked_at: invite.revoked_at,
            created_at: invite.created_at,
            active,
        }
    }
}

fn validate_invite_code(code: &str) -> Result<(), ValidationError> {
    let valid = (6..=32).contains(&code.len())
        && code
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-');
    if valid {
        Ok(())
    } else {
        Err(ValidationError::new("invite_code")
            .with_message("Code must be 6 to 32 letters, digits or '-'".into()))
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateInviteDto {
    #[validate(length(min = 1, message = "At least one role is required"))]
    pub allowed_roles: Vec<UserRole>,
    #[validate(range(min = 1, max = 10000))]
    pub max_uses: i32,
    pub expires_at: Option<DateTime<Utc>>,
    /// Custom code; uppercased. A random code is generated when omitted.
    #[validate(custom(function = "validate_invite_code"))]
    #[schema(example = "GHS-2025-STAFF")]
    pub code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaginatedInvitesResponse {
    pub data: Vec<InviteResponse>,
    pub meta: PaginationMeta,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn invite() -> Invite {
        Invite {
            id: Uuid::new_v4(),
            institution_id: Uuid::new_v4(),
            code: "ABCDEF".to_string(),
            allowed_roles: vec![UserRole::Student, UserRole::Parent],
            max_uses: 2,
            used_count: 0,
            expires_at: None,
            revoked_at: None,
            created_by: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_usable_invite() {
        let invite = invite();
        assert_eq!(invite.unusable_reason(Utc::now()), None);
        assert!(invite.allows(UserRole::Parent));
        assert!(!invite.allows(UserRole::Admin));
    }

    #[test]
    fn test_unusable_invites() {
        let now = Utc::now();

        let revoked = Invite {
            revoked_at: Some(now),
            ..invite()
        };
        assert_eq!(
            revoked.unusable_reason(now),
            Some("Invite code has been revoked")
        );

        let expired = Invite {
            expires_at: Some(now - Duration::minutes(1)),
            ..invite()
        };
        assert_eq!(expired.unusable_reason(now), Some("Invite code has expired"));

        let exhausted = Invite {
            used_count: 2,
            ..invite()
        };
        assert_eq!(
            exhausted.unusable_reason(now),
            Some("Invite code has reached its usage limit")
        );
        assert!(!InviteResponse::from(exhausted).active);
    }

    #[test]
    fn test_custom_code_rules() {
        assert!(validate_invite_code("GHS-2025").is_ok());
        assert!(validate_invite_code("ABC").is_err());
        assert!(validate_invite_code("HAS SPACE").is_err());
    }
}
