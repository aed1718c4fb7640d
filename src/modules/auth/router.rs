use axum::{
    Router,
    routing::{get, post},
};

use super::controller::{
    check_invite, forgot_password, login, me, refresh, request_signup_otp, reset_password, signup,
};
use crate::state::AppState;

pub fn init_auth_router() -> Router<AppState> {
    Router::new()
        .route("/invites/{code}", get(check_invite))
        .route("/signup/otp", post(request_signup_otp))
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password", post(reset_password))
        .route("/me", get(me))
}
