//! Route definitions for the `/projects` resource.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;

use crate::handlers::cad_files::UPLOAD_BODY_LIMIT;
use crate::handlers::{cad_files, processing, projects};
use crate::state::AppState;

/// Routes mounted at `/projects`.
///
/// ```text
/// GET    /                    -> list
/// POST   /                    -> create
/// GET    /{id}                -> get_by_id
/// DELETE /{id}                -> delete
/// GET    /{id}/cad-files      -> list_cad_files
/// POST   /{id}/cad-files      -> upload
/// POST   /{id}/process        -> process_project
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(projects::list).post(projects::create))
        .route("/{id}", get(projects::get_by_id).delete(projects::delete))
        .route(
            "/{id}/cad-files",
            get(projects::list_cad_files)
                .post(cad_files::upload)
                .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route("/{id}/process", post(processing::process_project))
}
