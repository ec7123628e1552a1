//! Bulk operation coordinator.

use std::sync::Arc;

use edupub_core::bulk::{
    validate_bulk_request, BulkAction, BulkItemResult, BulkRequest, BulkSummary,
};
use edupub_core::content::VersionStatus;
use edupub_core::error::CoreError;
use edupub_core::types::{DbId, VersionSeq};

use super::{LifecycleService, PublicationAdapter};

/// Applies one action to many items, one item at a time. A failure on one
/// item is recorded and the batch carries on; nothing is rolled back.
pub struct BulkCoordinator {
    lifecycle: Arc<LifecycleService>,
    publication: Arc<PublicationAdapter>,
}

impl BulkCoordinator {
    pub fn new(lifecycle: Arc<LifecycleService>, publication: Arc<PublicationAdapter>) -> Self {
        Self {
            lifecycle,
            publication,
        }
    }

    /// Run the request. Only request-level validation fails the call as a
    /// whole; per-item failures end up in the summary.
    pub async fn run(&self, request: BulkRequest) -> Result<BulkSummary, CoreError> {
        let ids = validate_bulk_request(&request)?;
        let action = request.action.name();
        tracing::info!(action, count = ids.len(), "Bulk operation started");

        let mut summary = BulkSummary::default();
        for id in ids {
            match self.apply(id, &request.action).await {
                Ok(result) => summary.record_success(result),
                Err(e) => {
                    tracing::warn!(action, content_id = id, error = %e, "Bulk item failed");
                    summary.record_failure(id, &e);
                }
            }
        }

        tracing::info!(
            action,
            total = summary.total,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "Bulk operation finished"
        );
        Ok(summary)
    }

    async fn apply(&self, id: DbId, action: &BulkAction) -> Result<BulkItemResult, CoreError> {
        match action {
            BulkAction::Delete => {
                self.lifecycle.delete_item(id).await?;
                Ok(BulkItemResult::removed(id))
            }
            BulkAction::Publish => self.publish_current(id).await,
            BulkAction::Unpublish => {
                let item = self.publication.unpublish(id).await?;
                Ok(BulkItemResult::from_item(&item))
            }
            BulkAction::UpdateStatus { status, reason } => match status {
                VersionStatus::Rejected => {
                    let (seq, _) = self.current(id).await?;
                    let item = self.lifecycle.reject(id, seq, reason.clone()).await?;
                    Ok(BulkItemResult::from_item(&item))
                }
                VersionStatus::Draft => {
                    let (seq, current) = self.current(id).await?;
                    let item = match current {
                        VersionStatus::Published => self.publication.unpublish(id).await?,
                        VersionStatus::Comparing => self.lifecycle.select(id, seq).await?,
                        VersionStatus::Draft | VersionStatus::Rejected => {
                            return Err(CoreError::PreconditionFailed(format!(
                                "Cannot move version {seq} to draft: status is '{current}', requires published or comparing"
                            )));
                        }
                    };
                    Ok(BulkItemResult::from_item(&item))
                }
                VersionStatus::Published => self.publish_current(id).await,
                VersionStatus::Comparing => Err(CoreError::Validation(
                    "'comparing' is not a valid bulk status target".to_string(),
                )),
            },
        }
    }

    async fn publish_current(&self, id: DbId) -> Result<BulkItemResult, CoreError> {
        let (seq, _) = self.current(id).await?;
        let outcome = self.publication.publish(id, seq).await?;
        Ok(BulkItemResult::from_item(&outcome.item))
    }

    /// Sequence and status of the item's current version.
    async fn current(&self, id: DbId) -> Result<(VersionSeq, VersionStatus), CoreError> {
        let item = self.lifecycle.get(id).await?;
        item.current_version()
            .map(|v| (v.seq, v.status))
            .ok_or_else(|| {
                CoreError::PreconditionFailed(format!("Content item {id} has no current version"))
            })
    }
}
