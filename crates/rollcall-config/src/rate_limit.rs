//! Rate limiting configuration for API endpoints.
//!
//! Limits are applied per client IP with a token bucket:
//!
//! - Tokens are added at the configured rate (per second)
//! - Each request consumes one token
//! - Burst size defines the maximum tokens that can accumulate
//! - Requests are rejected with `429` when no tokens are available
//!
//! The client IP is taken from `X-Forwarded-For`, `X-Real-Ip` or `Forwarded`
//! when present and from the peer address otherwise, so the server must be
//! started with connect info.
//!
//! # Environment Variables
//!
//! - `RATE_LIMIT_ENABLED`: Turn limiting on or off (default: true)
//! - `RATE_LIMIT_GENERAL_PER_SECOND`: Replenish interval in seconds for general endpoints (default: 2)
//! - `RATE_LIMIT_GENERAL_BURST_SIZE`: Burst size for general endpoints (default: 30)
//! - `RATE_LIMIT_AUTH_PER_SECOND`: Replenish interval in seconds for auth endpoints (default: 10)
//! - `RATE_LIMIT_AUTH_BURST_SIZE`: Burst size for auth endpoints (default: 5)

use tower_governor::governor::{GovernorConfig, GovernorConfigBuilder};
use tower_governor::key_extractor::SmartIpKeyExtractor;

use crate::{env_flag, env_or};

pub type IpGovernorConfig =
    GovernorConfig<SmartIpKeyExtractor, ::governor::middleware::NoOpMiddleware>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub general_per_second: u64,
    pub general_burst_size: u32,
    /// Auth endpoints send mail and check passwords, so they get a smaller bucket.
    pub auth_per_second: u64,
    pub auth_burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            general_per_second: 2,
            general_burst_size: 30,
            auth_per_second: 10,
            auth_burst_size: 5,
        }
    }
}

impl RateLimitConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            enabled: env_flag("RATE_LIMIT_ENABLED", defaults.enabled),
            general_per_second: env_or(
                "RATE_LIMIT_GENERAL_PER_SECOND",
                defaults.general_per_second,
            ),
            general_burst_size: env_or(
                "RATE_LIMIT_GENERAL_BURST_SIZE",
                defaults.general_burst_size,
            ),
            auth_per_second: env_or("RATE_LIMIT_AUTH_PER_SECOND", defaults.auth_per_second),
            auth_burst_size: env_or("RATE_LIMIT_AUTH_BURST_SIZE", defaults.auth_burst_size),
        }
    }

    /// A configuration with limiting switched off.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Governor configuration for general API endpoints.
    pub fn general_governor_config(&self) -> Option<IpGovernorConfig> {
        Self::build(self.general_per_second, self.general_burst_size)
    }

    /// Governor configuration for auth endpoints (stricter limits).
    pub fn auth_governor_config(&self) -> Option<IpGovernorConfig> {
        Self::build(self.auth_per_second, self.auth_burst_size)
    }

    fn build(per_second: u64, burst_size: u32) -> Option<IpGovernorConfig> {
        GovernorConfigBuilder::default()
            .per_second(per_second)
            .burst_size(burst_size)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = RateLimitConfig::default();
        assert!(config.enabled);
        assert_eq!(config.general_burst_size, 30);
        assert_eq!(config.auth_burst_size, 5);
    }

    #[test]
    fn test_disabled_keeps_limits() {
        let config = RateLimitConfig::disabled();
        assert!(!config.enabled);
        assert_eq!(config.auth_per_second, 10);
    }

    #[test]
    fn test_governor_configs_build() {
        let config = RateLimitConfig::default();
        assert!(config.general_governor_config().is_some());
        assert!(config.auth_governor_config().is_some());
    }

    #[test]
    fn test_zero_burst_is_rejected() {
        let config = RateLimitConfig {
            auth_burst_size: 0,
            ..RateLimitConfig::default()
        };
        assert!(config.auth_governor_config().is_none());
    }
}
