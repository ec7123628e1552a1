//! Content item row model.

use serde::Serialize;
use sqlx::types::Json;
use sqlx::FromRow;

use edupub_core::content::{ContentItem, ContentType, Version};
use edupub_core::types::{DbId, Timestamp};

/// A row from the `content_items` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ContentItemRow {
    pub id: DbId,
    pub content_type: String,
    pub title: String,
    pub subject_id: DbId,
    pub versions: Json<Vec<Version>>,
    pub current_version_index: Option<i32>,
    pub external_document_id: Option<String>,
    pub next_sequence: i32,
    pub revision: i64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Column values written by inserts and updates.
#[derive(Debug, Clone)]
pub struct ContentItemValues {
    pub content_type: &'static str,
    pub title: String,
    pub subject_id: DbId,
    pub versions: Json<Vec<Version>>,
    pub current_version_index: Option<i32>,
    pub external_document_id: Option<String>,
    pub next_sequence: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A stored row that does not describe a valid content item.
#[derive(Debug)]
pub struct InvalidRow {
    pub id: DbId,
    pub detail: String,
}

impl std::fmt::Display for InvalidRow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "content_items row {} is invalid: {}", self.id, self.detail)
    }
}

impl TryFrom<ContentItemRow> for ContentItem {
    type Error = InvalidRow;

    fn try_from(row: ContentItemRow) -> Result<Self, Self::Error> {
        let invalid = |detail: String| InvalidRow { id: row.id, detail };

        let content_type = ContentType::parse(&row.content_type)
            .ok_or_else(|| invalid(format!("unknown content type '{}'", row.content_type)))?;
        let current_version_index = row
            .current_version_index
            .map(usize::try_from)
            .transpose()
            .map_err(|_| invalid("negative current_version_index".to_string()))?;
        let next_sequence = u32::try_from(row.next_sequence)
            .map_err(|_| invalid("negative next_sequence".to_string()))?;

        Ok(ContentItem {
            id: row.id,
            content_type,
            title: row.title,
            subject_id: row.subject_id,
            versions: row.versions.0,
            current_version_index,
            external_document_id: row.external_document_id,
            next_sequence,
            revision: row.revision,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl ContentItemValues {
    /// Column values for `item`. Fails only for counters that do not fit
    /// the integer columns.
    pub fn from_item(item: &ContentItem) -> Result<Self, InvalidRow> {
        let invalid = |detail: &str| InvalidRow {
            id: item.id,
            detail: detail.to_string(),
        };
        let current_version_index = item
            .current_version_index
            .map(i32::try_from)
            .transpose()
            .map_err(|_| invalid("current_version_index overflows INTEGER"))?;
        let next_sequence = i32::try_from(item.next_sequence)
            .map_err(|_| invalid("next_sequence overflows INTEGER"))?;

        Ok(Self {
            content_type: item.content_type.as_str(),
            title: item.title.clone(),
            subject_id: item.subject_id,
            versions: Json(item.versions.clone()),
            current_version_index,
            external_document_id: item.external_document_id.clone(),
            next_sequence,
            created_at: item.created_at,
            updated_at: item.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use edupub_core::content::{
        Authorship, GenerationMetadata, NewContentItem, SamplingParams, VersionDraft,
    };
    use edupub_core::lifecycle::create_item;

    use super::*;

    fn row() -> ContentItemRow {
        let item = create_item(
            NewContentItem {
                content_type: ContentType::ExerciseSet,
                title: "Loops practice".into(),
                subject_id: 3,
            },
            VersionDraft {
                authorship: Authorship {
                    model: "writer".into(),
                    prompt: "Five loop exercises".into(),
                },
                body: "1. Print 1..10".into(),
                generation: GenerationMetadata {
                    tokens_used: 40,
                    duration_ms: 300,
                    model_id: "writer-1".into(),
                    sampling: SamplingParams::default(),
                },
            },
            Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        );
        let values = ContentItemValues::from_item(&item).unwrap();
        ContentItemRow {
            id: 11,
            content_type: values.content_type.to_string(),
            title: values.title,
            subject_id: values.subject_id,
            versions: values.versions,
            current_version_index: values.current_version_index,
            external_document_id: values.external_document_id,
            next_sequence: values.next_sequence,
            revision: 4,
            created_at: values.created_at,
            updated_at: values.updated_at,
        }
    }

    #[test]
    fn row_converts_to_item() {
        let item = ContentItem::try_from(row()).unwrap();
        assert_eq!(item.id, 11);
        assert_eq!(item.content_type, ContentType::ExerciseSet);
        assert_eq!(item.current_version_index, Some(0));
        assert_eq!(item.next_sequence, 2);
        assert_eq!(item.revision, 4);
        assert_eq!(item.versions[0].body, "1. Print 1..10");
    }

    #[test]
    fn unknown_content_type_is_rejected() {
        let mut bad = row();
        bad.content_type = "podcast".into();
        let err = ContentItem::try_from(bad).unwrap_err();
        assert!(err.to_string().contains("podcast"));
    }

    #[test]
    fn negative_index_is_rejected() {
        let mut bad = row();
        bad.current_version_index = Some(-1);
        assert!(ContentItem::try_from(bad).is_err());
    }
}
