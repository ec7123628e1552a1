//! [`ContentStore`] backed by PostgreSQL.

use async_trait::async_trait;

use edupub_core::content::ContentItem;
use edupub_core::store::{ContentStore, StoreError};
use edupub_core::types::DbId;

use crate::models::content_item::{ContentItemRow, ContentItemValues, InvalidRow};
use crate::repositories::ContentItemRepo;
use crate::DbPool;

pub struct PgContentStore {
    pool: DbPool,
}

impl PgContentStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Tell a missing row apart from a stale revision after a conditional
    /// write matched nothing.
    async fn miss(&self, id: DbId, expected: i64) -> StoreError {
        match ContentItemRepo::exists(&self.pool, id).await {
            Ok(true) => StoreError::RevisionConflict { id, expected },
            Ok(false) => StoreError::NotFound(id),
            Err(e) => backend(e),
        }
    }
}

fn backend(err: sqlx::Error) -> StoreError {
    tracing::error!(error = %err, "Content store query failed");
    StoreError::Backend(err.to_string())
}

fn invalid(err: InvalidRow) -> StoreError {
    tracing::error!(content_id = err.id, detail = %err.detail, "Invalid content item row");
    StoreError::Backend(err.to_string())
}

fn to_item(row: ContentItemRow) -> Result<ContentItem, StoreError> {
    ContentItem::try_from(row).map_err(invalid)
}

#[async_trait]
impl ContentStore for PgContentStore {
    async fn insert(&self, item: ContentItem) -> Result<ContentItem, StoreError> {
        let values = ContentItemValues::from_item(&item).map_err(invalid)?;
        let row = ContentItemRepo::create(&self.pool, &values)
            .await
            .map_err(backend)?;
        to_item(row)
    }

    async fn get(&self, id: DbId) -> Result<Option<ContentItem>, StoreError> {
        ContentItemRepo::find_by_id(&self.pool, id)
            .await
            .map_err(backend)?
            .map(to_item)
            .transpose()
    }

    async fn list(&self) -> Result<Vec<ContentItem>, StoreError> {
        ContentItemRepo::list(&self.pool)
            .await
            .map_err(backend)?
            .into_iter()
            .map(to_item)
            .collect()
    }

    async fn update(
        &self,
        item: &ContentItem,
        expected_revision: i64,
    ) -> Result<ContentItem, StoreError> {
        let values = ContentItemValues::from_item(item).map_err(invalid)?;
        match ContentItemRepo::update_if_revision(&self.pool, item.id, expected_revision, &values)
            .await
            .map_err(backend)?
        {
            Some(row) => to_item(row),
            None => Err(self.miss(item.id, expected_revision).await),
        }
    }

    async fn delete(&self, id: DbId, expected_revision: i64) -> Result<(), StoreError> {
        if ContentItemRepo::delete_if_revision(&self.pool, id, expected_revision)
            .await
            .map_err(backend)?
        {
            Ok(())
        } else {
            Err(self.miss(id, expected_revision).await)
        }
    }
}
