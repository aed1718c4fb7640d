//! # Rollcall Config
//!
//! Configuration types for the Rollcall API.
//!
//! Every structure is loaded from environment variables with a `from_env()`
//! constructor and falls back to development defaults:
//!
//! - [`jwt`]: JWT signing secret and token lifetimes
//! - [`cors`]: allowed browser origins
//! - [`email`]: SMTP delivery settings
//! - [`otp`]: one-time code lifetime, attempt budget and resend cooldown
//! - [`rate_limit`]: per-IP request limits
//! - [`import`]: roster upload limits
//!
//! # Example
//!
//! ```ignore
//! use rollcall_config::{JwtConfig, OtpConfig};
//!
//! let jwt_config = JwtConfig::from_env();
//! let otp_config = OtpConfig::from_env();
//! ```

pub mod cors;
pub mod email;
pub mod import;
pub mod jwt;
pub mod otp;
pub mod rate_limit;

pub use cors::CorsConfig;
pub use email::EmailConfig;
pub use import::ImportConfig;
pub use jwt::JwtConfig;
pub use otp::OtpConfig;
pub use rate_limit::RateLimitConfig;

pub(crate) fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

pub(crate) fn env_flag(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
        .unwrap_or(default)
}
