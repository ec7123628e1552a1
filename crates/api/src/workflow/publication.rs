//! Publication adapter: turns "publish this version" into a queued call to
//! the external publishing service followed by a local commit.
//!
//! ```text
//! guard item ──> check preconditions ──> queue create/update ──> commit
//!                     (no remote call                (CAS, bounded retries;
//!                      if this fails)                 failure = inconsistent)
//!                                                  └─> queue public-URL lookup
//! ```
//!
//! The remote create is never retried. If it succeeded but the local commit
//! did not land, or the caller had already stopped waiting for it, the
//! remote document is logged with both ids and kept in the adapter's
//! unreconciled list for manual reconciliation.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;

use edupub_core::content::ContentItem;
use edupub_core::error::CoreError;
use edupub_core::lifecycle;
use edupub_core::store::ContentStore;
use edupub_core::types::{DbId, Timestamp, VersionSeq};
use edupub_publisher::dispatch::{DispatchError, DispatchQueue};
use edupub_publisher::document::{DocumentPublisher, PublisherError, RemoteDocument};

use super::{commit, load};

/// Result of a successful publish.
#[derive(Debug, Clone, Serialize)]
pub struct PublishOutcome {
    pub item: ContentItem,
    /// Absent when the URL lookup failed; the publish itself still stands.
    pub public_url: Option<String>,
}

/// A remote document that no local record points at.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnreconciledDocument {
    pub content_id: DbId,
    pub version_seq: VersionSeq,
    pub remote_document_id: String,
    pub detail: String,
    pub detected_at: Timestamp,
}

type Unreconciled = Arc<Mutex<Vec<UnreconciledDocument>>>;

pub struct PublicationAdapter {
    store: Arc<dyn ContentStore>,
    publisher: Arc<dyn DocumentPublisher>,
    queue: DispatchQueue,
    wait_timeout: Duration,
    in_flight: Arc<Mutex<HashSet<DbId>>>,
    unreconciled: Unreconciled,
}

/// Marks an item as having a publish in progress until dropped.
struct InFlight {
    id: DbId,
    set: Arc<Mutex<HashSet<DbId>>>,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if let Ok(mut set) = self.set.lock() {
            set.remove(&self.id);
        }
    }
}

impl PublicationAdapter {
    pub fn new(
        store: Arc<dyn ContentStore>,
        publisher: Arc<dyn DocumentPublisher>,
        queue: DispatchQueue,
        wait_timeout: Duration,
    ) -> Self {
        Self {
            store,
            publisher,
            queue,
            wait_timeout,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
            unreconciled: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn queue(&self) -> &DispatchQueue {
        &self.queue
    }

    /// Remote documents created without a matching local commit, oldest
    /// first.
    pub fn unreconciled(&self) -> Vec<UnreconciledDocument> {
        self.unreconciled
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn begin(&self, id: DbId) -> Result<InFlight, CoreError> {
        let mut set = self
            .in_flight
            .lock()
            .map_err(|_| CoreError::Internal("publish guard poisoned".to_string()))?;
        if !set.insert(id) {
            return Err(CoreError::Conflict(format!(
                "A publish is already in progress for content item {id}"
            )));
        }
        Ok(InFlight {
            id,
            set: Arc::clone(&self.in_flight),
        })
    }

    /// Publish version `seq` of item `id`.
    pub async fn publish(&self, id: DbId, seq: VersionSeq) -> Result<PublishOutcome, CoreError> {
        let _guard = self.begin(id)?;

        let item = load(self.store.as_ref(), id).await?;
        ensure_not_published(&item)?;
        lifecycle::ensure_publishable(&item, seq)?;
        let document = RemoteDocument::from_item(&item, seq)?;

        let publisher = Arc::clone(&self.publisher);
        let unreconciled = Arc::clone(&self.unreconciled);
        let handle = self.queue.submit_or_else(
            format!("create_or_update_document content={id} seq={seq}"),
            move || async move {
                let created = publisher.create_or_update_document(&document).await;
                if let Ok(remote_document_id) = &created {
                    tracing::info!(
                        content_id = id,
                        version_seq = seq,
                        remote_document_id = %remote_document_id,
                        "Remote document created"
                    );
                }
                created
            },
            move |created| {
                // The caller gave up waiting, so nothing will commit this.
                if let Ok(remote_document_id) = created {
                    record_unreconciled(
                        &unreconciled,
                        id,
                        seq,
                        remote_document_id,
                        "the create finished after the caller stopped waiting".to_string(),
                    );
                }
            },
        );
        let remote_document_id = self.await_remote(id, seq, handle.wait_timeout(self.wait_timeout).await)?;

        let committed = commit(self.store.as_ref(), id, "publish", |current| {
            ensure_not_published(current)?;
            lifecycle::publish(current, seq, &remote_document_id, Utc::now())
        })
        .await;
        let item = match committed {
            Ok(item) => item,
            Err(cause) => {
                let detail = format!("the local commit failed: {cause}");
                record_unreconciled(
                    &self.unreconciled,
                    id,
                    seq,
                    remote_document_id.clone(),
                    detail.clone(),
                );
                return Err(CoreError::Inconsistent {
                    content_id: id,
                    remote_document_id,
                    detail,
                });
            }
        };

        tracing::info!(
            content_id = id,
            version_seq = seq,
            remote_document_id = %remote_document_id,
            "Version published"
        );

        let public_url = self.public_url(id, &remote_document_id).await;
        Ok(PublishOutcome { item, public_url })
    }

    /// Unlink the item from its remote document locally. The remote
    /// document is left as it is.
    pub async fn unpublish(&self, id: DbId) -> Result<ContentItem, CoreError> {
        let before = load(self.store.as_ref(), id).await?;
        let saved = commit(self.store.as_ref(), id, "unpublish", |current| {
            lifecycle::unpublish(current, Utc::now())
        })
        .await?;
        tracing::info!(
            content_id = id,
            remote_document_id = ?before.external_document_id,
            "Content item unpublished; remote document left untouched"
        );
        Ok(saved)
    }

    fn await_remote(
        &self,
        id: DbId,
        seq: VersionSeq,
        waited: Result<Result<String, PublisherError>, DispatchError>,
    ) -> Result<String, CoreError> {
        match waited {
            Ok(Ok(remote_id)) => Ok(remote_id),
            Ok(Err(e)) => {
                tracing::error!(content_id = id, version_seq = seq, error = %e, "Publishing service call failed");
                Err(e.into())
            }
            Err(e @ DispatchError::TimedOut(_)) => {
                tracing::warn!(
                    content_id = id,
                    version_seq = seq,
                    "Publishing call outcome unknown: caller stopped waiting; a late result is recorded as unreconciled"
                );
                Err(CoreError::ExternalService(e.to_string()))
            }
            Err(e @ DispatchError::QueueClosed) => {
                tracing::error!(content_id = id, version_seq = seq, "Dispatch queue closed");
                Err(CoreError::ExternalService(e.to_string()))
            }
        }
    }

    async fn public_url(&self, id: DbId, remote_document_id: &str) -> Option<String> {
        let publisher = Arc::clone(&self.publisher);
        let document_id = remote_document_id.to_string();
        let handle = self
            .queue
            .submit(format!("get_public_url content={id}"), move || async move {
                publisher.get_public_url(&document_id).await
            });
        match handle.wait_timeout(self.wait_timeout).await {
            Ok(Ok(url)) => Some(url),
            Ok(Err(e)) => {
                tracing::warn!(content_id = id, remote_document_id, error = %e, "Public URL lookup failed");
                None
            }
            Err(e) => {
                tracing::warn!(content_id = id, remote_document_id, error = %e, "Public URL lookup failed");
                None
            }
        }
    }
}

fn record_unreconciled(
    unreconciled: &Mutex<Vec<UnreconciledDocument>>,
    content_id: DbId,
    version_seq: VersionSeq,
    remote_document_id: String,
    detail: String,
) {
    tracing::error!(
        content_id,
        version_seq,
        remote_document_id = %remote_document_id,
        detail = %detail,
        "Remote document exists without a local publish; manual reconciliation required"
    );
    unreconciled
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(UnreconciledDocument {
            content_id,
            version_seq,
            remote_document_id,
            detail,
            detected_at: Utc::now(),
        });
}

fn ensure_not_published(item: &ContentItem) -> Result<(), CoreError> {
    if let Some(index) = item.published_index() {
        return Err(CoreError::Conflict(format!(
            "Content item {} already has version {} published; unpublish it first",
            item.id, item.versions[index].seq
        )));
    }
    if let Some(remote) = &item.external_document_id {
        return Err(CoreError::Conflict(format!(
            "Content item {} is already linked to remote document {remote}",
            item.id
        )));
    }
    Ok(())
}
