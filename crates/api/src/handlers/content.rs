//! Handlers for content items as a whole.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use edupub_core::types::DbId;

use crate::error::AppResult;
use crate::response::ApiResponse;
use crate::state::AppState;
use crate::workflow::lifecycle::CreateContentItemRequest;

/// GET /api/v1/content-items
pub async fn list_items(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let items = state.lifecycle.list().await?;
    Ok(Json(ApiResponse::ok(items)))
}

/// POST /api/v1/content-items
///
/// Create a content item; its first version is generated from the
/// supplied prompt.
pub async fn create_item(
    State(state): State<AppState>,
    Json(input): Json<CreateContentItemRequest>,
) -> AppResult<impl IntoResponse> {
    let item = state.lifecycle.create_item(input).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(item))))
}

/// GET /api/v1/content-items/{id}
pub async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let item = state.lifecycle.get(id).await?;
    Ok(Json(ApiResponse::ok(item)))
}

/// DELETE /api/v1/content-items/{id}
///
/// Refused while any version is published or the item is linked to a
/// remote document.
pub async fn delete_item(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    state.lifecycle.delete_item(id).await?;
    Ok(Json(ApiResponse::with_message(
        json!({ "id": id }),
        "Content item deleted",
    )))
}
