use axum::{
    Router,
    routing::{get, post, put},
};

use super::controller::{
    close_session, create_session, delete_session, get_session, list_sessions, mark_punches,
    student_summary,
};
use crate::state::AppState;

pub fn init_attendance_router() -> Router<AppState> {
    Router::new()
        .route("/sessions", get(list_sessions).post(create_session))
        .route("/sessions/{id}", get(get_session).delete(delete_session))
        .route("/sessions/{id}/punches", put(mark_punches))
        .route("/sessions/{id}/close", post(close_session))
        .route("/students/{student_id}/summary", get(student_summary))
}
