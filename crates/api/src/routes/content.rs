//! Route definitions for content items and their versions.

use axum::routing::{delete, get, post};
use axum::Router;

use crate::handlers::{bulk, content, versions};
use crate::state::AppState;

/// Routes mounted at `/content-items`.
///
/// ```text
/// GET    /                                  list_items
/// POST   /                                  create_item
/// POST   /bulk                              run_bulk
/// GET    /{id}                              get_item
/// DELETE /{id}                              delete_item
/// POST   /{id}/versions                     generate_version
/// POST   /{id}/comparisons                  generate_comparison
/// POST   /{id}/unpublish                    unpublish
/// DELETE /{id}/versions/{seq}               delete_version
/// POST   /{id}/versions/{seq}/publish       publish_version
/// POST   /{id}/versions/{seq}/reject        reject_version
/// POST   /{id}/versions/{seq}/promote       promote_version
/// POST   /{id}/versions/{seq}/select        select_version
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(content::list_items).post(content::create_item))
        .route("/bulk", post(bulk::run_bulk))
        .route("/{id}", get(content::get_item).delete(content::delete_item))
        .route("/{id}/versions", post(versions::generate_version))
        .route("/{id}/comparisons", post(versions::generate_comparison))
        .route("/{id}/unpublish", post(versions::unpublish))
        .route("/{id}/versions/{seq}", delete(versions::delete_version))
        .route("/{id}/versions/{seq}/publish", post(versions::publish_version))
        .route("/{id}/versions/{seq}/reject", post(versions::reject_version))
        .route("/{id}/versions/{seq}/promote", post(versions::promote_version))
        .route("/{id}/versions/{seq}/select", post(versions::select_version))
}
