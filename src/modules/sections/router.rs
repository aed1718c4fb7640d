use axum::{
    Router,
    routing::{delete, get, post},
};

use super::controller::{
    assign_faculty, create_section, delete_section, enroll_student, get_section, list_faculty,
    list_sections, list_students, remove_faculty, unenroll_student, update_section,
};
use crate::state::AppState;

pub fn init_sections_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_sections).post(create_section))
        .route(
            "/{id}",
            get(get_section).put(update_section).delete(delete_section),
        )
        .route("/{id}/enrollments", post(enroll_student))
        .route("/{id}/enrollments/{student_id}", delete(unenroll_student))
        .route("/{id}/students", get(list_students))
        .route("/{id}/faculty", get(list_faculty).post(assign_faculty))
        .route("/{id}/faculty/{faculty_id}", delete(remove_faculty))
}
