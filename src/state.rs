use sqlx::PgPool;

use rollcall_config::{
    CorsConfig, EmailConfig, ImportConfig, JwtConfig, OtpConfig, RateLimitConfig,
};
use rollcall_db::init_db_pool;

#[derive(Clone, Debug)]
pub struct AppState {
    pub db: PgPool,
    pub jwt_config: JwtConfig,
    pub email_config: EmailConfig,
    pub cors_config: CorsConfig,
    pub rate_limit_config: RateLimitConfig,
    pub otp_config: OtpConfig,
    pub import_config: ImportConfig,
}

pub async fn init_app_state() -> AppState {
    AppState {
        db: init_db_pool().await,
        jwt_config: JwtConfig::from_env(),
        email_config: EmailConfig::from_env(),
        cors_config: CorsConfig::from_env(),
        rate_limit_config: RateLimitConfig::from_env(),
        otp_config: OtpConfig::from_env(),
        import_config: ImportConfig::from_env(),
    }
}
