pub mod cad_files;
pub mod health;
pub mod projects;
pub mod tasks;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Every route requires a Bearer token.
///
/// ```text
/// /projects                          list, create
/// /projects/{id}                     get
/// /projects/{id}/cad-files           list, upload (multipart)
/// /projects/{id}/process             batch dispatch (POST)
///
/// /cad-files/{id}                    get, delete
/// /cad-files/{id}/process            single dispatch (POST)
/// /cad-files/{id}/processing-plan    stored plan
///
/// /tasks                             list (cached)
/// /tasks/{id}                        get
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/projects", projects::router())
        .nest("/cad-files", cad_files::router())
        .nest("/tasks", tasks::router())
}
