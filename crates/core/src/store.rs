//! Persistence seam for content items.
//!
//! The lifecycle never writes storage itself. Callers read a snapshot,
//! run a transition, then write it back with [`ContentStore::update`],
//! passing the revision they read. A store must reject the write with
//! [`StoreError::RevisionConflict`] if the stored revision moved in the
//! meantime; that check closes the gap between "read state" and "write
//! state" for concurrent operations on the same item.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::content::ContentItem;
use crate::error::CoreError;
use crate::lifecycle::check_invariants;
use crate::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Content item {0} not found")]
    NotFound(DbId),

    #[error("Content item {id} was modified concurrently (expected revision {expected})")]
    RevisionConflict { id: DbId, expected: i64 },

    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => CoreError::NotFound {
                entity: "ContentItem",
                id,
            },
            StoreError::RevisionConflict { .. } => CoreError::Conflict(err.to_string()),
            StoreError::Backend(msg) => CoreError::Internal(msg),
        }
    }
}

/// Atomic single-document storage for content items.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Persist a new item, assigning its id. Returns the stored item.
    async fn insert(&self, item: ContentItem) -> Result<ContentItem, StoreError>;

    async fn get(&self, id: DbId) -> Result<Option<ContentItem>, StoreError>;

    /// All items ordered by id.
    async fn list(&self) -> Result<Vec<ContentItem>, StoreError>;

    /// Replace the stored item if its revision still equals
    /// `expected_revision`. The stored copy gets `expected_revision + 1`.
    async fn update(
        &self,
        item: &ContentItem,
        expected_revision: i64,
    ) -> Result<ContentItem, StoreError>;

    /// Remove the item if its revision still equals `expected_revision`.
    async fn delete(&self, id: DbId, expected_revision: i64) -> Result<(), StoreError>;
}

/* --------------------------------------------------------------------------
In-memory implementation
-------------------------------------------------------------------------- */

#[derive(Default)]
struct MemoryState {
    items: BTreeMap<DbId, ContentItem>,
    last_id: DbId,
}

/// Process-local store used by tests and by the server when no
/// `DATABASE_URL` is configured.
#[derive(Default)]
pub struct InMemoryContentStore {
    state: RwLock<MemoryState>,
}

impl InMemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ContentStore for InMemoryContentStore {
    async fn insert(&self, mut item: ContentItem) -> Result<ContentItem, StoreError> {
        let mut state = self.state.write().await;
        state.last_id += 1;
        item.id = state.last_id;
        item.revision = 0;
        debug_assert_eq!(check_invariants(&item), Ok(()), "invalid item snapshot");
        state.items.insert(item.id, item.clone());
        Ok(item)
    }

    async fn get(&self, id: DbId) -> Result<Option<ContentItem>, StoreError> {
        Ok(self.state.read().await.items.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<ContentItem>, StoreError> {
        Ok(self.state.read().await.items.values().cloned().collect())
    }

    async fn update(
        &self,
        item: &ContentItem,
        expected_revision: i64,
    ) -> Result<ContentItem, StoreError> {
        let mut state = self.state.write().await;
        let stored = state
            .items
            .get_mut(&item.id)
            .ok_or(StoreError::NotFound(item.id))?;
        if stored.revision != expected_revision {
            return Err(StoreError::RevisionConflict {
                id: item.id,
                expected: expected_revision,
            });
        }
        debug_assert_eq!(check_invariants(item), Ok(()), "invalid item snapshot");
        let mut next = item.clone();
        next.revision = expected_revision + 1;
        *stored = next.clone();
        Ok(next)
    }

    async fn delete(&self, id: DbId, expected_revision: i64) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let stored = state.items.get(&id).ok_or(StoreError::NotFound(id))?;
        if stored.revision != expected_revision {
            return Err(StoreError::RevisionConflict {
                id,
                expected: expected_revision,
            });
        }
        state.items.remove(&id);
        Ok(())
    }
}
