//! Shared response envelope for API handlers.
//!
//! Successful responses use `{ "success": true, "data": ..., "message"? }`.
//! Errors use the same envelope with `success: false` and an `error`
//! object; see [`crate::error::AppError`].

use serde::Serialize;

/// Standard success envelope.
///
/// ```ignore
/// Ok(Json(ApiResponse::ok(item)))
/// ```
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            message: None,
        }
    }

    pub fn with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data,
            message: Some(message.into()),
        }
    }
}
