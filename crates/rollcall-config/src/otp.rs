//! One-time code settings shared by signup verification and password reset.

use crate::env_or;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OtpConfig {
    /// Seconds a code stays valid after it is issued.
    pub ttl_seconds: i64,
    /// Wrong guesses allowed before the code is burned.
    pub max_attempts: i32,
    /// Minimum seconds between two codes for the same email and purpose.
    pub resend_cooldown_seconds: i64,
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: 600,
            max_attempts: 5,
            resend_cooldown_seconds: 60,
        }
    }
}

impl OtpConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            ttl_seconds: env_or("OTP_TTL_SECONDS", defaults.ttl_seconds),
            max_attempts: env_or("OTP_MAX_ATTEMPTS", defaults.max_attempts),
            resend_cooldown_seconds: env_or(
                "OTP_RESEND_COOLDOWN_SECONDS",
                defaults.resend_cooldown_seconds,
            ),
        }
    }

    /// Code lifetime rounded up to whole minutes, for email copy.
    pub fn ttl_minutes(&self) -> i64 {
        (self.ttl_seconds + 59) / 60
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ttl_minutes_rounds_up() {
        assert_eq!(OtpConfig::default().ttl_minutes(), 10);
        let config = OtpConfig {
            ttl_seconds: 90,
            ..OtpConfig::default()
        };
        assert_eq!(config.ttl_minutes(), 2);
    }
}
