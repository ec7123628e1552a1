use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use edupub_core::error::CoreError;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce the standard error envelope:
///
/// ```text
/// { "success": false, "error": { "kind": "NOT_FOUND", "message": "..." } }
/// ```
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `edupub_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

const SANITIZED: &str = "An internal error occurred";

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, kind, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => {
                let kind = core.kind();
                match core {
                    CoreError::NotFound { entity, id } => (
                        StatusCode::NOT_FOUND,
                        kind,
                        format!("{entity} with id {id} not found"),
                    ),
                    CoreError::Validation(msg) => (StatusCode::BAD_REQUEST, kind, msg.clone()),
                    CoreError::PreconditionFailed(msg) => {
                        (StatusCode::PRECONDITION_FAILED, kind, msg.clone())
                    }
                    CoreError::Conflict(msg) => (StatusCode::CONFLICT, kind, msg.clone()),
                    CoreError::Forbidden(msg) => (StatusCode::FORBIDDEN, kind, msg.clone()),
                    CoreError::ExternalService(msg) => {
                        (StatusCode::BAD_GATEWAY, kind, msg.clone())
                    }
                    CoreError::Inconsistent { .. } => {
                        (StatusCode::BAD_GATEWAY, kind, core.to_string())
                    }
                    CoreError::Internal(msg) => {
                        tracing::error!(error = %msg, "Internal core error");
                        (StatusCode::INTERNAL_SERVER_ERROR, kind, SANITIZED.to_string())
                    }
                }
            }

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    SANITIZED.to_string(),
                )
            }
        };

        let body = json!({
            "success": false,
            "error": {
                "kind": kind,
                "message": message,
            },
        });

        (status, axum::Json(body)).into_response()
    }
}
