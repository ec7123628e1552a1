//! Handlers for version generation and lifecycle transitions.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use edupub_core::types::{DbId, VersionSeq};

use crate::error::AppResult;
use crate::response::ApiResponse;
use crate::state::AppState;
use crate::workflow::lifecycle::{CompareRequest, GenerateVersionRequest, RejectRequest};

/// POST /api/v1/content-items/{id}/versions
pub async fn generate_version(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<GenerateVersionRequest>,
) -> AppResult<impl IntoResponse> {
    let item = state.lifecycle.generate_version(id, input).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(item))))
}

/// POST /api/v1/content-items/{id}/comparisons
///
/// Generate one `comparing` version per requested model.
pub async fn generate_comparison(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<CompareRequest>,
) -> AppResult<impl IntoResponse> {
    let item = state.lifecycle.generate_comparison(id, input).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(item))))
}

/// POST /api/v1/content-items/{id}/versions/{seq}/publish
///
/// Waits for the queued call to the publishing service, so this may take
/// a while when the outbound quota is saturated.
pub async fn publish_version(
    State(state): State<AppState>,
    Path((id, seq)): Path<(DbId, VersionSeq)>,
) -> AppResult<impl IntoResponse> {
    let outcome = state.publication.publish(id, seq).await?;
    Ok(Json(ApiResponse::with_message(outcome, "Version published")))
}

/// POST /api/v1/content-items/{id}/unpublish
pub async fn unpublish(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let item = state.publication.unpublish(id).await?;
    Ok(Json(ApiResponse::with_message(item, "Content item unpublished")))
}

/// POST /api/v1/content-items/{id}/versions/{seq}/reject
pub async fn reject_version(
    State(state): State<AppState>,
    Path((id, seq)): Path<(DbId, VersionSeq)>,
    Json(input): Json<RejectRequest>,
) -> AppResult<impl IntoResponse> {
    let item = state.lifecycle.reject(id, seq, input.reason).await?;
    Ok(Json(ApiResponse::ok(item)))
}

/// POST /api/v1/content-items/{id}/versions/{seq}/promote
pub async fn promote_version(
    State(state): State<AppState>,
    Path((id, seq)): Path<(DbId, VersionSeq)>,
) -> AppResult<impl IntoResponse> {
    let item = state.lifecycle.promote(id, seq).await?;
    Ok(Json(ApiResponse::ok(item)))
}

/// POST /api/v1/content-items/{id}/versions/{seq}/select
pub async fn select_version(
    State(state): State<AppState>,
    Path((id, seq)): Path<(DbId, VersionSeq)>,
) -> AppResult<impl IntoResponse> {
    let item = state.lifecycle.select(id, seq).await?;
    Ok(Json(ApiResponse::ok(item)))
}

/// DELETE /api/v1/content-items/{id}/versions/{seq}
pub async fn delete_version(
    State(state): State<AppState>,
    Path((id, seq)): Path<(DbId, VersionSeq)>,
) -> AppResult<impl IntoResponse> {
    let item = state.lifecycle.delete_version(id, seq).await?;
    Ok(Json(ApiResponse::with_message(item, "Version deleted")))
}
