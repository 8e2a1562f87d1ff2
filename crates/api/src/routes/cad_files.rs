//! Route definitions for the `/cad-files` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{cad_files, processing};
use crate::state::AppState;

/// Routes mounted at `/cad-files`.
///
/// ```text
/// GET    /{id}                    -> get_by_id
/// DELETE /{id}                    -> delete
/// POST   /{id}/process            -> process_cad_file
/// GET    /{id}/processing-plan    -> processing_plan
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{id}", get(cad_files::get_by_id).delete(cad_files::delete))
        .route("/{id}/process", post(processing::process_cad_file))
        .route("/{id}/processing-plan", get(processing::processing_plan))
}
