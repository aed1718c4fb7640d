use axum::{
    Router,
    routing::{get, patch, put},
};

use super::controller::{
    change_password, get_user, list_users, my_children, update_me, update_user_status,
};
use crate::state::AppState;

pub fn init_users_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users))
        .route("/me", put(update_me))
        .route("/me/password", put(change_password))
        .route("/me/children", get(my_children))
        .route("/{id}", get(get_user))
        .route("/{id}/status", patch(update_user_status))
}
