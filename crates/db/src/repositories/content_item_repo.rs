//! Repository for the `content_items` table.

use sqlx::PgPool;

use edupub_core::types::DbId;

use crate::models::content_item::{ContentItemRow, ContentItemValues};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, content_type, title, subject_id, versions, \
    current_version_index, external_document_id, next_sequence, revision, \
    created_at, updated_at";

/// Row-level access to content items. Writes after the initial insert are
/// conditional on the caller's expected revision.
pub struct ContentItemRepo;

impl ContentItemRepo {
    /// Insert a new content item at revision 0.
    pub async fn create(
        pool: &PgPool,
        values: &ContentItemValues,
    ) -> Result<ContentItemRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO content_items
                (content_type, title, subject_id, versions, current_version_index,
                 external_document_id, next_sequence, revision, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, 0, $8, $9)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ContentItemRow>(&query)
            .bind(values.content_type)
            .bind(&values.title)
            .bind(values.subject_id)
            .bind(&values.versions)
            .bind(values.current_version_index)
            .bind(&values.external_document_id)
            .bind(values.next_sequence)
            .bind(values.created_at)
            .bind(values.updated_at)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<ContentItemRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM content_items WHERE id = $1");
        sqlx::query_as::<_, ContentItemRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List all content items, oldest first.
    pub async fn list(pool: &PgPool) -> Result<Vec<ContentItemRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM content_items ORDER BY id");
        sqlx::query_as::<_, ContentItemRow>(&query)
            .fetch_all(pool)
            .await
    }

    /// Overwrite the mutable columns if the stored revision still equals
    /// `expected_revision`, bumping it by one.
    ///
    /// Returns `None` when the row is missing or its revision moved.
    pub async fn update_if_revision(
        pool: &PgPool,
        id: DbId,
        expected_revision: i64,
        values: &ContentItemValues,
    ) -> Result<Option<ContentItemRow>, sqlx::Error> {
        let query = format!(
            "UPDATE content_items SET
                title = $3,
                versions = $4,
                current_version_index = $5,
                external_document_id = $6,
                next_sequence = $7,
                updated_at = $8,
                revision = revision + 1
             WHERE id = $1 AND revision = $2
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ContentItemRow>(&query)
            .bind(id)
            .bind(expected_revision)
            .bind(&values.title)
            .bind(&values.versions)
            .bind(values.current_version_index)
            .bind(&values.external_document_id)
            .bind(values.next_sequence)
            .bind(values.updated_at)
            .fetch_optional(pool)
            .await
    }

    /// Delete the row if its revision still equals `expected_revision`.
    /// Returns `true` if a row was removed.
    pub async fn delete_if_revision(
        pool: &PgPool,
        id: DbId,
        expected_revision: i64,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM content_items WHERE id = $1 AND revision = $2")
            .bind(id)
            .bind(expected_revision)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn exists(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let row: (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM content_items WHERE id = $1)")
                .bind(id)
                .fetch_one(pool)
                .await?;
        Ok(row.0)
    }
}
