pub mod content;
pub mod health;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /content-items                                   list, create
/// /content-items/bulk                              bulk action (POST)
/// /content-items/{id}                              get, delete
/// /content-items/{id}/versions                     generate version (POST)
/// /content-items/{id}/comparisons                  generate comparison batch (POST)
/// /content-items/{id}/unpublish                    unpublish (POST)
/// /content-items/{id}/versions/{seq}               delete version
/// /content-items/{id}/versions/{seq}/publish       publish (POST)
/// /content-items/{id}/versions/{seq}/reject        reject (POST)
/// /content-items/{id}/versions/{seq}/promote       promote (POST)
/// /content-items/{id}/versions/{seq}/select        select (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/content-items", content::router())
}
