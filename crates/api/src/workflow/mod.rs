//! Orchestration between the HTTP layer, the lifecycle state machine, the
//! content store and the outbound publishing queue.
//!
//! Every state change goes through [`commit`]: load the item, run a pure
//! lifecycle transition on the snapshot, and write the result back with a
//! compare-and-swap on its revision.

pub mod bulk;
pub mod lifecycle;
pub mod publication;

use edupub_core::content::ContentItem;
use edupub_core::error::CoreError;
use edupub_core::lifecycle::check_invariants;
use edupub_core::store::{ContentStore, StoreError};
use edupub_core::types::DbId;

pub use bulk::BulkCoordinator;
pub use lifecycle::LifecycleService;
pub use publication::PublicationAdapter;

/// Extra attempts after a revision conflict before giving up.
pub const COMMIT_RETRIES: usize = 3;

/// Load item `id` or fail with `NotFound`.
pub async fn load(store: &dyn ContentStore, id: DbId) -> Result<ContentItem, CoreError> {
    store.get(id).await?.ok_or(CoreError::NotFound {
        entity: "ContentItem",
        id,
    })
}

/// Apply `transition` to the latest snapshot of item `id` and persist it.
///
/// On a revision conflict the item is reloaded and the transition re-run,
/// so its preconditions are checked against fresh state each time.
pub async fn commit<F>(
    store: &dyn ContentStore,
    id: DbId,
    operation: &'static str,
    transition: F,
) -> Result<ContentItem, CoreError>
where
    F: Fn(&ContentItem) -> Result<ContentItem, CoreError>,
{
    let mut attempt = 0;
    loop {
        let current = load(store, id).await?;
        let next = transition(&current)?;
        if let Err(violation) = check_invariants(&next) {
            tracing::error!(content_id = id, operation, %violation, "Transition broke an invariant");
            return Err(CoreError::Internal(format!(
                "{operation} produced an invalid content item: {violation}"
            )));
        }

        match store.update(&next, current.revision).await {
            Ok(saved) => return Ok(saved),
            Err(StoreError::RevisionConflict { .. }) if attempt < COMMIT_RETRIES => {
                attempt += 1;
                tracing::debug!(
                    content_id = id,
                    operation,
                    attempt,
                    "Revision conflict, retrying"
                );
            }
            Err(e) => return Err(e.into()),
        }
    }
}
