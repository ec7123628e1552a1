use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use edupub_core::bulk::BulkRequest;

use crate::error::AppResult;
use crate::response::ApiResponse;
use crate::state::AppState;

/// POST /api/v1/content-items/bulk
///
/// Always 200 once the request itself is valid; per-item failures are
/// reported in the summary.
pub async fn run_bulk(
    State(state): State<AppState>,
    Json(input): Json<BulkRequest>,
) -> AppResult<impl IntoResponse> {
    let summary = state.bulk.run(input).await?;
    let message = format!("{} succeeded, {} failed", summary.succeeded, summary.failed);
    Ok(Json(ApiResponse::with_message(summary, message)))
}
