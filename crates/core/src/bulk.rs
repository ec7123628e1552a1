//! Bulk operation request and summary types.
//!
//! A bulk request names up to [`MAX_BULK_ITEMS`] content items and one
//! action. Items are processed one after another; each item's outcome is
//! recorded independently and a failure never aborts the batch.

use serde::{Deserialize, Serialize};

use crate::content::{validate_reason, ContentItem, VersionStatus};
use crate::error::CoreError;
use crate::types::{DbId, VersionSeq};

/// Hard cap on identifiers per bulk request.
pub const MAX_BULK_ITEMS: usize = 50;

/// Action applied to every item of a bulk request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum BulkAction {
    Delete,
    /// Drive each item's current version to `status`.
    UpdateStatus {
        status: VersionStatus,
        #[serde(default)]
        reason: Option<String>,
    },
    /// Publish each item's current version.
    Publish,
    Unpublish,
}

impl BulkAction {
    pub fn name(&self) -> &'static str {
        match self {
            BulkAction::Delete => "delete",
            BulkAction::UpdateStatus { .. } => "update_status",
            BulkAction::Publish => "publish",
            BulkAction::Unpublish => "unpublish",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkRequest {
    pub ids: Vec<DbId>,
    #[serde(flatten)]
    pub action: BulkAction,
}

/// Validate a bulk request and return its identifiers with duplicates
/// removed (first occurrence wins, order preserved).
pub fn validate_bulk_request(request: &BulkRequest) -> Result<Vec<DbId>, CoreError> {
    if request.ids.is_empty() {
        return Err(CoreError::Validation(
            "A bulk request needs at least one id".to_string(),
        ));
    }
    if request.ids.len() > MAX_BULK_ITEMS {
        return Err(CoreError::Validation(format!(
            "A bulk request accepts at most {MAX_BULK_ITEMS} ids, got {}",
            request.ids.len()
        )));
    }
    if let Some(bad) = request.ids.iter().find(|id| **id <= 0) {
        return Err(CoreError::Validation(format!("Invalid content item id {bad}")));
    }
    if let BulkAction::UpdateStatus { status, reason } = &request.action {
        if *status == VersionStatus::Comparing {
            return Err(CoreError::Validation(
                "'comparing' is not a valid bulk status target".to_string(),
            ));
        }
        validate_reason(reason.as_deref())?;
    }

    let mut ids = Vec::with_capacity(request.ids.len());
    for id in &request.ids {
        if !ids.contains(id) {
            ids.push(*id);
        }
    }
    Ok(ids)
}

/// Successful outcome for one item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BulkItemResult {
    pub id: DbId,
    pub current_version_seq: Option<VersionSeq>,
    pub current_status: Option<VersionStatus>,
}

impl BulkItemResult {
    pub fn from_item(item: &ContentItem) -> Self {
        let current = item.current_version();
        Self {
            id: item.id,
            current_version_seq: current.map(|v| v.seq),
            current_status: current.map(|v| v.status),
        }
    }

    /// Result for an item that no longer exists (bulk delete).
    pub fn removed(id: DbId) -> Self {
        Self {
            id,
            current_version_seq: None,
            current_status: None,
        }
    }
}

/// Failed outcome for one item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BulkItemError {
    pub id: DbId,
    pub kind: &'static str,
    pub message: String,
}

/// Aggregate outcome of a bulk request.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BulkSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub results: Vec<BulkItemResult>,
    pub errors: Vec<BulkItemError>,
}

impl BulkSummary {
    pub fn record_success(&mut self, result: BulkItemResult) {
        self.total += 1;
        self.succeeded += 1;
        self.results.push(result);
    }

    pub fn record_failure(&mut self, id: DbId, err: &CoreError) {
        self.total += 1;
        self.failed += 1;
        self.errors.push(BulkItemError {
            id,
            kind: err.kind(),
            message: err.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn request(ids: Vec<DbId>, action: BulkAction) -> BulkRequest {
        BulkRequest { ids, action }
    }

    #[test]
    fn empty_request_rejected() {
        let err = validate_bulk_request(&request(vec![], BulkAction::Delete)).unwrap_err();
        assert_matches!(err, CoreError::Validation(_));
    }

    #[test]
    fn fifty_ids_accepted_fifty_one_rejected() {
        let ids: Vec<DbId> = (1..=50).collect();
        assert_eq!(
            validate_bulk_request(&request(ids, BulkAction::Publish))
                .unwrap()
                .len(),
            50
        );
        let ids: Vec<DbId> = (1..=51).collect();
        let err = validate_bulk_request(&request(ids, BulkAction::Publish)).unwrap_err();
        assert!(err.to_string().contains("at most 50"));
    }

    #[test]
    fn duplicates_collapse_in_order() {
        let ids = validate_bulk_request(&request(vec![3, 1, 3, 2, 1], BulkAction::Unpublish))
            .unwrap();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[test]
    fn non_positive_ids_rejected() {
        assert!(validate_bulk_request(&request(vec![1, 0], BulkAction::Delete)).is_err());
    }

    #[test]
    fn comparing_is_not_a_status_target() {
        let action = BulkAction::UpdateStatus {
            status: VersionStatus::Comparing,
            reason: None,
        };
        assert!(validate_bulk_request(&request(vec![1], action)).is_err());
    }

    #[test]
    fn action_deserializes_from_tagged_json() {
        let json = serde_json::json!({
            "ids": [4, 5],
            "action": "update_status",
            "status": "rejected",
            "reason": "outdated curriculum"
        });
        let req: BulkRequest = serde_json::from_value(json).unwrap();
        assert_eq!(req.ids, vec![4, 5]);
        assert_eq!(
            req.action,
            BulkAction::UpdateStatus {
                status: VersionStatus::Rejected,
                reason: Some("outdated curriculum".into())
            }
        );

        let req: BulkRequest =
            serde_json::from_value(serde_json::json!({"ids": [1], "action": "publish"})).unwrap();
        assert_eq!(req.action, BulkAction::Publish);
    }

    #[test]
    fn summary_counts_both_sides() {
        let mut summary = BulkSummary::default();
        summary.record_success(BulkItemResult::removed(1));
        summary.record_failure(
            2,
            &CoreError::NotFound {
                entity: "ContentItem",
                id: 2,
            },
        );
        assert_eq!(summary.total, 2);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.errors[0].kind, "NOT_FOUND");
        assert_eq!(summary.errors[0].id, 2);
    }
}
