use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post, put},
};

use super::controller::{
    commit, delete_draft, get_draft, get_template, remove_row, update_row, upload,
};
use crate::state::AppState;

pub fn init_imports_router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/templates/{kind}", get(get_template))
        // `{id}` doubles as the import kind for uploads.
        .route(
            "/{id}",
            post(upload)
                .layer(DefaultBodyLimit::max(max_upload_bytes))
                .get(get_draft)
                .delete(delete_draft),
        )
        .route("/{id}/rows/{index}", put(update_row).delete(remove_row))
        .route("/{id}/commit", post(commit))
}
