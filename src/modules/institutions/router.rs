use axum::{Router, routing::get};

use super::controller::{get_institution, update_institution};
use crate::state::AppState;

pub fn init_institution_router() -> Router<AppState> {
    Router::new().route("/", get(get_institution).put(update_institution))
}
