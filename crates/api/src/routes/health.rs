use std::time::Duration;

use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;
use crate::workflow::publication::UnreconciledDocument;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Overall service status.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    /// `postgres` or `memory`.
    pub store: &'static str,
    /// Whether the database is reachable (absent for the in-memory store).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_healthy: Option<bool>,
    /// Outbound publishing calls waiting for dispatch.
    pub publish_queue_pending: usize,
    /// Tokens in the publishing rate limiter; absent while callers are
    /// queued on it.
    pub publish_tokens_available: Option<u32>,
    /// Remote documents awaiting manual reconciliation.
    pub unreconciled_documents: Vec<UnreconciledDocument>,
}

/// GET /health -- returns service, database and publish-queue health.
///
/// Reports `degraded` while any remote document awaits reconciliation.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let db_healthy = match &state.pool {
        Some(pool) => Some(edupub_db::health_check(pool).await.is_ok()),
        None => None,
    };

    let unreconciled_documents = state.publication.unreconciled();
    let status = if db_healthy == Some(false)
        || state.publication.queue().is_closed()
        || !unreconciled_documents.is_empty()
    {
        "degraded"
    } else {
        "ok"
    };

    let publish_tokens_available = tokio::time::timeout(
        Duration::from_millis(50),
        state.rate_limiter.available_tokens(),
    )
    .await
    .ok();

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        store: if state.pool.is_some() { "postgres" } else { "memory" },
        db_healthy,
        publish_queue_pending: state.publication.queue().pending(),
        publish_tokens_available,
        unreconciled_documents,
    })
}

/// Mount health check routes (intended for root-level, NOT under `/api/v1`).
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
