use axum::{
    Router,
    routing::{delete, get},
};

use super::controller::{create_invite, list_invites, revoke_invite};
use crate::state::AppState;

pub fn init_invites_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_invites).post(create_invite))
        .route("/{id}", delete(revoke_invite))
}
