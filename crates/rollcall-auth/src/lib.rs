//! # Rollcall Auth
//!
//! JWT claim structures and token helpers.
//!
//! - **Access token** ([`Claims`]): short-lived, carries the user's role and
//!   institution so handlers can authorize without a database round trip.
//! - **Refresh token** ([`RefreshTokenClaims`]): long-lived, exchanged for a
//!   new access token after the account is re-checked.
//!
//! # Example
//!
//! ```ignore
//! use rollcall_auth::{create_access_token, verify_token};
//! use rollcall_config::JwtConfig;
//! use rollcall_core::UserRole;
//!
//! let config = JwtConfig::from_env();
//! let token = create_access_token(user_id, "ada@school.edu", UserRole::Faculty, institution_id, &config)?;
//! let claims = verify_token(&token, &config)?;
//! assert_eq!(claims.role, UserRole::Faculty);
//! ```

pub mod claims;
pub mod jwt;

pub use claims::{Claims, RefreshTokenClaims};
pub use jwt::{create_access_token, create_refresh_token, verify_refresh_token, verify_token};
