use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use sheetflow_core::error::CoreError;
use sheetflow_db::StoreError;
use sheetflow_pipeline::PipelineError;

/// Application-level error type for HTTP handlers.
///
/// Implements [`IntoResponse`] to produce consistent JSON error bodies:
/// `{ "error": <human message>, "code": <MACHINE_CODE>, "detail": <detail> }`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

/// Status, machine code, human message and detail of one error response.
type Classified = (StatusCode, &'static str, String, String);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, detail) = match &self {
            AppError::Core(core) => classify_core(core),
            AppError::Pipeline(err) => classify_pipeline(err),
            AppError::Store(err) => classify_store(err),
            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                "BAD_REQUEST",
                msg.clone(),
                "bad_request".to_string(),
            ),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                internal("internal")
            }
        };

        let body = json!({
            "error": message,
            "code": code,
            "detail": detail,
        });

        (status, axum::Json(body)).into_response()
    }
}

fn internal(detail: &str) -> Classified {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
        detail.to_string(),
    )
}

fn classify_core(core: &CoreError) -> Classified {
    match core {
        CoreError::NotFound { entity, id } => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("{entity} not found"),
            format!("{entity} with id {id} not found"),
        ),
        CoreError::Validation(msg) => (
            StatusCode::BAD_REQUEST,
            "VALIDATION_ERROR",
            "Validation failed".to_string(),
            msg.clone(),
        ),
        CoreError::Conflict(msg) => (
            StatusCode::CONFLICT,
            "CONFLICT",
            "Duplicate request".to_string(),
            msg.clone(),
        ),
        CoreError::Unauthorized(msg) => (
            StatusCode::UNAUTHORIZED,
            "UNAUTHORIZED",
            "User not authenticated".to_string(),
            msg.clone(),
        ),
        CoreError::Forbidden(msg) => (
            StatusCode::FORBIDDEN,
            "FORBIDDEN",
            "Access denied".to_string(),
            msg.clone(),
        ),
        CoreError::Internal(msg) => {
            tracing::error!(error = %msg, "Internal core error");
            internal("internal")
        }
    }
}

fn classify_pipeline(err: &PipelineError) -> Classified {
    match err {
        PipelineError::Core(core) => classify_core(core),
        PipelineError::Store(store) => classify_store(store),
        PipelineError::Bus(e) => {
            tracing::error!(error = %e, "Event bus error");
            internal("event_bus")
        }
        PipelineError::Io(e) => {
            tracing::error!(error = %e, "File storage error");
            internal(&format!("file_storage: {:?}", e.kind()))
        }
    }
}

/// Classify a store error.
///
/// - A missing row maps to 404.
/// - Unique constraint violations map to 409.
/// - Everything else maps to 500 with a sanitized message.
fn classify_store(err: &StoreError) -> Classified {
    match err {
        StoreError::Missing { entity, id } => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("{entity} not found"),
            format!("{entity} with id {id} not found"),
        ),
        StoreError::Database(sqlx::Error::RowNotFound) => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Resource not found".to_string(),
            "row_not_found".to_string(),
        ),
        StoreError::Database(sqlx::Error::Database(db_err))
            if db_err.code().as_deref() == Some("23505") =>
        {
            let constraint = db_err.constraint().unwrap_or("unknown");
            (
                StatusCode::CONFLICT,
                "CONFLICT",
                "Duplicate request".to_string(),
                format!("Duplicate value violates unique constraint: {constraint}"),
            )
        }
        StoreError::Database(e) => {
            tracing::error!(error = %e, "Database error");
            internal("database")
        }
        StoreError::Unavailable(msg) => {
            tracing::error!(error = %msg, "Store unavailable");
            internal("store_unavailable")
        }
    }
}
