//! Version lifecycle state machine.
//!
//! Every transition takes a [`ContentItem`] snapshot by reference and returns
//! a new snapshot, or an error if a precondition does not hold. Nothing here
//! touches storage: callers commit the returned snapshot with a
//! compare-and-swap on [`ContentItem::revision`].
//!
//! Invariants maintained by every transition (see [`check_invariants`]):
//!
//! - the current pointer, when set, is in bounds and never points at a
//!   `rejected` version;
//! - at most one version is `published`;
//! - the version list is never empty.

use crate::content::{ContentItem, NewContentItem, Version, VersionDraft, VersionStatus};
use crate::error::CoreError;
use crate::types::{Timestamp, VersionSeq};

/// Reason attached to comparison siblings that lost a `select`.
pub const NOT_SELECTED_REASON: &str = "not selected during comparison";

/// Status-gated operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Publish,
    Reject,
    Promote,
    Select,
}

impl Transition {
    /// Statuses the target version may be in for this transition.
    pub fn allowed_from(self) -> &'static [VersionStatus] {
        match self {
            Transition::Publish | Transition::Reject => {
                &[VersionStatus::Draft, VersionStatus::Comparing]
            }
            Transition::Promote => &[VersionStatus::Rejected],
            Transition::Select => &[VersionStatus::Comparing],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Transition::Publish => "publish",
            Transition::Reject => "reject",
            Transition::Promote => "promote",
            Transition::Select => "select",
        }
    }

    /// Whether `status` is an accepted source state. The match is
    /// exhaustive so a new status forces every transition to be revisited.
    pub fn accepts(self, status: VersionStatus) -> bool {
        match status {
            VersionStatus::Draft | VersionStatus::Comparing => {
                matches!(
                    (self, status),
                    (Transition::Publish, _)
                        | (Transition::Reject, _)
                        | (Transition::Select, VersionStatus::Comparing)
                )
            }
            VersionStatus::Rejected => self == Transition::Promote,
            VersionStatus::Published => false,
        }
    }
}

/* --------------------------------------------------------------------------
Helpers
-------------------------------------------------------------------------- */

fn find_index(item: &ContentItem, seq: VersionSeq) -> Result<usize, CoreError> {
    item.version_index(seq).ok_or(CoreError::NotFound {
        entity: "Version",
        id: i64::from(seq),
    })
}

/// Fail with `PreconditionFailed` unless the version at `index` may undergo
/// `transition`. The message names both the current and required states.
fn require_status(
    item: &ContentItem,
    index: usize,
    transition: Transition,
) -> Result<(), CoreError> {
    let version = &item.versions[index];
    if transition.accepts(version.status) {
        return Ok(());
    }
    let required = transition
        .allowed_from()
        .iter()
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join(" or ");
    Err(CoreError::PreconditionFailed(format!(
        "Cannot {} version {}: status is '{}', requires {required}",
        transition.as_str(),
        version.seq,
        version.status
    )))
}

fn build_version(
    seq: VersionSeq,
    status: VersionStatus,
    draft: VersionDraft,
    now: Timestamp,
) -> Version {
    Version {
        seq,
        status,
        authorship: draft.authorship,
        body: draft.body,
        generation: draft.generation,
        created_at: now,
        published_at: None,
        rejected_at: None,
        rejection_reason: None,
    }
}

fn mark_rejected(version: &mut Version, reason: Option<String>, now: Timestamp) {
    version.status = VersionStatus::Rejected;
    version.published_at = None;
    version.rejected_at = Some(now);
    version.rejection_reason = reason;
}

/* --------------------------------------------------------------------------
Creation and generation
-------------------------------------------------------------------------- */

/// Build a new content item holding exactly one `draft` version (seq 1),
/// which is current. The id is assigned by the store on insert.
pub fn create_item(new: NewContentItem, first: VersionDraft, now: Timestamp) -> ContentItem {
    ContentItem {
        id: 0,
        content_type: new.content_type,
        title: new.title,
        subject_id: new.subject_id,
        versions: vec![build_version(1, VersionStatus::Draft, first, now)],
        current_version_index: Some(0),
        external_document_id: None,
        next_sequence: 2,
        revision: 0,
        created_at: now,
        updated_at: now,
    }
}

/// Append a new `draft` version with the next sequence number. The current
/// pointer only moves when nothing was current.
pub fn generate_new_version(
    item: &ContentItem,
    draft: VersionDraft,
    now: Timestamp,
) -> Result<ContentItem, CoreError> {
    let mut next = item.clone();
    next.versions
        .push(build_version(next.next_sequence, VersionStatus::Draft, draft, now));
    next.next_sequence += 1;
    if next.current_version_index.is_none() {
        next.current_version_index = Some(next.versions.len() - 1);
    }
    next.updated_at = now;
    Ok(next)
}

/// Append a batch of `comparing` versions, one per draft, to be resolved
/// later with [`select`]. The current pointer is left alone.
pub fn append_comparison_batch(
    item: &ContentItem,
    drafts: Vec<VersionDraft>,
    now: Timestamp,
) -> Result<ContentItem, CoreError> {
    if drafts.len() < 2 {
        return Err(CoreError::Validation(format!(
            "A comparison batch needs at least 2 versions, got {}",
            drafts.len()
        )));
    }
    let mut next = item.clone();
    for draft in drafts {
        next.versions.push(build_version(
            next.next_sequence,
            VersionStatus::Comparing,
            draft,
            now,
        ));
        next.next_sequence += 1;
    }
    next.updated_at = now;
    Ok(next)
}

/* --------------------------------------------------------------------------
Publication
-------------------------------------------------------------------------- */

/// Check, without mutating, that version `seq` may be published. Used by
/// the publication adapter before it makes the remote call.
pub fn ensure_publishable(item: &ContentItem, seq: VersionSeq) -> Result<(), CoreError> {
    let index = find_index(item, seq)?;
    require_status(item, index, Transition::Publish)
}

/// Publish version `seq` and link it to `remote_document_id`.
///
/// Any other published version is demoted to `draft`; the target becomes
/// current.
pub fn publish(
    item: &ContentItem,
    seq: VersionSeq,
    remote_document_id: &str,
    now: Timestamp,
) -> Result<ContentItem, CoreError> {
    let index = find_index(item, seq)?;
    require_status(item, index, Transition::Publish)?;

    let mut next = item.clone();
    for version in next
        .versions
        .iter_mut()
        .filter(|v| v.status == VersionStatus::Published)
    {
        version.status = VersionStatus::Draft;
        version.published_at = None;
    }
    let target = &mut next.versions[index];
    target.status = VersionStatus::Published;
    target.published_at = Some(now);
    next.current_version_index = Some(index);
    next.external_document_id = Some(remote_document_id.to_string());
    next.updated_at = now;
    Ok(next)
}

/// Return the published version to `draft`, clear the current pointer and
/// drop the link to the remote document. The remote document itself is
/// left untouched.
pub fn unpublish(item: &ContentItem, now: Timestamp) -> Result<ContentItem, CoreError> {
    let index = item.published_index().ok_or_else(|| {
        CoreError::PreconditionFailed(format!(
            "Cannot unpublish content item {}: no version is 'published'",
            item.id
        ))
    })?;

    let mut next = item.clone();
    let version = &mut next.versions[index];
    version.status = VersionStatus::Draft;
    version.published_at = None;
    next.current_version_index = None;
    next.external_document_id = None;
    next.updated_at = now;
    Ok(next)
}

/* --------------------------------------------------------------------------
Review
-------------------------------------------------------------------------- */

/// Reject version `seq`. A published version must be unpublished first.
///
/// Rejecting the current version clears the current pointer, which may
/// leave the item with no viable version.
pub fn reject(
    item: &ContentItem,
    seq: VersionSeq,
    reason: Option<String>,
    now: Timestamp,
) -> Result<ContentItem, CoreError> {
    let index = find_index(item, seq)?;
    if item.versions[index].status == VersionStatus::Published {
        return Err(CoreError::PreconditionFailed(format!(
            "Cannot reject version {seq}: it is 'published'; unpublish it first"
        )));
    }
    require_status(item, index, Transition::Reject)?;

    let mut next = item.clone();
    mark_rejected(&mut next.versions[index], reason, now);
    if next.current_version_index == Some(index) {
        next.current_version_index = None;
    }
    next.updated_at = now;
    Ok(next)
}

/// Bring a rejected version back as the current `draft`.
///
/// The previously current version, if any, is demoted to `rejected` with a
/// reason naming the promoted version. If that version was published, the
/// remote link is dropped as well.
pub fn promote(
    item: &ContentItem,
    seq: VersionSeq,
    now: Timestamp,
) -> Result<ContentItem, CoreError> {
    let index = find_index(item, seq)?;
    require_status(item, index, Transition::Promote)?;

    let mut next = item.clone();
    let promoted_label = next.versions[index].label();

    if let Some(current) = next.current_version_index {
        if next.versions[current].status == VersionStatus::Published {
            next.external_document_id = None;
        }
        mark_rejected(
            &mut next.versions[current],
            Some(format!("superseded by {promoted_label}")),
            now,
        );
    }

    let target = &mut next.versions[index];
    target.status = VersionStatus::Draft;
    target.rejected_at = None;
    target.rejection_reason = None;
    next.current_version_index = Some(index);
    next.updated_at = now;
    Ok(next)
}

/// Resolve a comparison: version `seq` becomes the current `draft` and every
/// other `comparing` version is rejected.
pub fn select(
    item: &ContentItem,
    seq: VersionSeq,
    now: Timestamp,
) -> Result<ContentItem, CoreError> {
    let index = find_index(item, seq)?;
    require_status(item, index, Transition::Select)?;

    let mut next = item.clone();
    let reason = format!(
        "{NOT_SELECTED_REASON}; {} chosen",
        next.versions[index].label()
    );
    for (i, version) in next.versions.iter_mut().enumerate() {
        if i != index && version.status == VersionStatus::Comparing {
            mark_rejected(version, Some(reason.clone()), now);
        }
    }
    next.versions[index].status = VersionStatus::Draft;
    next.current_version_index = Some(index);
    next.updated_at = now;
    Ok(next)
}

/* --------------------------------------------------------------------------
Deletion
-------------------------------------------------------------------------- */

/// Remove version `seq`. The only version, the published version and the
/// current version cannot be deleted.
pub fn delete_version(
    item: &ContentItem,
    seq: VersionSeq,
    now: Timestamp,
) -> Result<ContentItem, CoreError> {
    let index = find_index(item, seq)?;
    if item.versions.len() == 1 {
        return Err(CoreError::PreconditionFailed(format!(
            "Cannot delete version {seq}: it is the only version"
        )));
    }
    if item.versions[index].status == VersionStatus::Published {
        return Err(CoreError::PreconditionFailed(format!(
            "Cannot delete version {seq}: status is 'published'; unpublish it first"
        )));
    }
    if item.current_version_index == Some(index) {
        return Err(CoreError::PreconditionFailed(format!(
            "Cannot delete version {seq}: it is the current version"
        )));
    }

    let mut next = item.clone();
    next.versions.remove(index);
    if let Some(current) = next.current_version_index {
        if current > index {
            next.current_version_index = Some(current - 1);
        }
    }
    next.updated_at = now;
    Ok(next)
}

/// Check that the whole item may be destroyed: nothing may be published or
/// linked to a remote document.
pub fn ensure_item_deletable(item: &ContentItem) -> Result<(), CoreError> {
    if let Some(index) = item.published_index() {
        return Err(CoreError::PreconditionFailed(format!(
            "Cannot delete content item {}: version {} is 'published'; unpublish it first",
            item.id, item.versions[index].seq
        )));
    }
    if item.external_document_id.is_some() {
        return Err(CoreError::PreconditionFailed(format!(
            "Cannot delete content item {}: it is still linked to a remote document",
            item.id
        )));
    }
    Ok(())
}

/* --------------------------------------------------------------------------
Invariants
-------------------------------------------------------------------------- */

/// Verify the structural invariants of a content item.
pub fn check_invariants(item: &ContentItem) -> Result<(), String> {
    if item.versions.is_empty() {
        return Err(format!("content item {} has no versions", item.id));
    }
    let published = item.count_status(VersionStatus::Published);
    if published > 1 {
        return Err(format!(
            "content item {} has {published} published versions",
            item.id
        ));
    }
    if let Some(current) = item.current_version_index {
        let version = item.versions.get(current).ok_or_else(|| {
            format!(
                "content item {} current index {current} is out of bounds",
                item.id
            )
        })?;
        if version.status == VersionStatus::Rejected {
            return Err(format!(
                "content item {} current version {} is rejected",
                item.id, version.seq
            ));
        }
    }
    let mut seen = std::collections::HashSet::new();
    for version in &item.versions {
        if version.seq == 0 || version.seq >= item.next_sequence {
            return Err(format!(
                "content item {} has version seq {} outside 1..{}",
                item.id, version.seq, item.next_sequence
            ));
        }
        if !seen.insert(version.seq) {
            return Err(format!(
                "content item {} has duplicate version seq {}",
                item.id, version.seq
            ));
        }
    }
    Ok(())
}

/* --------------------------------------------------------------------------
Tests
-------------------------------------------------------------------------- */
