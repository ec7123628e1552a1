//! Lifecycle service: validation, generation and committed transitions for
//! single content items.

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;

use edupub_core::content::{
    validate_comparison_models, validate_model, validate_prompt, validate_reason,
    validate_sampling, validate_title, ContentItem, ContentType, NewContentItem, SamplingParams,
    VersionDraft,
};
use edupub_core::error::CoreError;
use edupub_core::generation::{ContentGenerator, GenerationRequest};
use edupub_core::lifecycle;
use edupub_core::store::{ContentStore, StoreError};
use edupub_core::types::{DbId, VersionSeq};

use super::{commit, load, COMMIT_RETRIES};

/* --------------------------------------------------------------------------
Request DTOs
-------------------------------------------------------------------------- */

/// Body of `POST /content-items`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateContentItemRequest {
    pub content_type: ContentType,
    pub title: String,
    pub subject_id: DbId,
    pub model: String,
    pub prompt: String,
    pub system_context: Option<String>,
    #[serde(default)]
    pub sampling: SamplingParams,
}

/// Body of `POST /content-items/{id}/versions`.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateVersionRequest {
    pub model: String,
    pub prompt: String,
    pub system_context: Option<String>,
    #[serde(default)]
    pub sampling: SamplingParams,
}

/// Body of `POST /content-items/{id}/comparisons`.
#[derive(Debug, Clone, Deserialize)]
pub struct CompareRequest {
    pub models: Vec<String>,
    pub prompt: String,
    pub system_context: Option<String>,
    #[serde(default)]
    pub sampling: SamplingParams,
}

/// Body of `POST /content-items/{id}/versions/{seq}/reject`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RejectRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

/// System context used when the caller does not supply one.
pub fn default_system_context(content_type: ContentType, title: &str) -> String {
    let kind = match content_type {
        ContentType::Course => "a course",
        ContentType::ExerciseSet => "an exercise set",
        ContentType::Assessment => "an assessment",
    };
    format!("You are writing {kind} titled \"{title}\" for learners. Respond with the full body text.")
}

fn validate_generation(model: &str, prompt: &str, sampling: &SamplingParams) -> Result<(), CoreError> {
    validate_model(model)?;
    validate_prompt(prompt)?;
    validate_sampling(sampling)
}

/* --------------------------------------------------------------------------
Service
-------------------------------------------------------------------------- */

/// Drives lifecycle transitions that never touch the publishing service.
pub struct LifecycleService {
    store: Arc<dyn ContentStore>,
    generator: Arc<dyn ContentGenerator>,
}

impl LifecycleService {
    pub fn new(store: Arc<dyn ContentStore>, generator: Arc<dyn ContentGenerator>) -> Self {
        Self { store, generator }
    }

    pub async fn list(&self) -> Result<Vec<ContentItem>, CoreError> {
        Ok(self.store.list().await?)
    }

    pub async fn get(&self, id: DbId) -> Result<ContentItem, CoreError> {
        load(self.store.as_ref(), id).await
    }

    /// Validate input, generate the first version, and store the new item.
    pub async fn create_item(
        &self,
        input: CreateContentItemRequest,
    ) -> Result<ContentItem, CoreError> {
        validate_title(&input.title)?;
        if input.subject_id <= 0 {
            return Err(CoreError::Validation(format!(
                "Invalid subject id {}",
                input.subject_id
            )));
        }
        validate_generation(&input.model, &input.prompt, &input.sampling)?;

        let request = GenerationRequest {
            system_context: input
                .system_context
                .unwrap_or_else(|| default_system_context(input.content_type, &input.title)),
            model: input.model,
            prompt: input.prompt,
            sampling: input.sampling,
        };
        let first = self.generate(&request).await?;

        let item = lifecycle::create_item(
            NewContentItem {
                content_type: input.content_type,
                title: input.title,
                subject_id: input.subject_id,
            },
            first,
            Utc::now(),
        );
        let item = self.store.insert(item).await?;

        tracing::info!(
            content_id = item.id,
            content_type = item.content_type.as_str(),
            subject_id = item.subject_id,
            "Content item created"
        );
        Ok(item)
    }

    /// Generate one more `draft` version for item `id`.
    pub async fn generate_version(
        &self,
        id: DbId,
        input: GenerateVersionRequest,
    ) -> Result<ContentItem, CoreError> {
        validate_generation(&input.model, &input.prompt, &input.sampling)?;
        let item = self.get(id).await?;

        let request = GenerationRequest {
            system_context: input
                .system_context
                .unwrap_or_else(|| default_system_context(item.content_type, &item.title)),
            model: input.model,
            prompt: input.prompt,
            sampling: input.sampling,
        };
        let draft = self.generate(&request).await?;

        let saved = commit(self.store.as_ref(), id, "generate_version", |current| {
            lifecycle::generate_new_version(current, draft.clone(), Utc::now())
        })
        .await?;

        tracing::info!(
            content_id = id,
            version_seq = saved.next_sequence - 1,
            model = %request.model,
            "Version generated"
        );
        Ok(saved)
    }

    /// Generate one `comparing` version per model, concurrently.
    pub async fn generate_comparison(
        &self,
        id: DbId,
        input: CompareRequest,
    ) -> Result<ContentItem, CoreError> {
        validate_comparison_models(&input.models)?;
        validate_prompt(&input.prompt)?;
        validate_sampling(&input.sampling)?;
        let item = self.get(id).await?;

        let system_context = input
            .system_context
            .unwrap_or_else(|| default_system_context(item.content_type, &item.title));
        let requests: Vec<GenerationRequest> = input
            .models
            .iter()
            .map(|model| GenerationRequest {
                model: model.clone(),
                prompt: input.prompt.clone(),
                system_context: system_context.clone(),
                sampling: input.sampling,
            })
            .collect();

        let drafts =
            futures::future::try_join_all(requests.iter().map(|r| self.generate(r))).await?;

        let saved = commit(self.store.as_ref(), id, "generate_comparison", |current| {
            lifecycle::append_comparison_batch(current, drafts.clone(), Utc::now())
        })
        .await?;

        tracing::info!(
            content_id = id,
            models = ?input.models,
            "Comparison batch generated"
        );
        Ok(saved)
    }

    pub async fn reject(
        &self,
        id: DbId,
        seq: VersionSeq,
        reason: Option<String>,
    ) -> Result<ContentItem, CoreError> {
        validate_reason(reason.as_deref())?;
        let saved = commit(self.store.as_ref(), id, "reject", |current| {
            lifecycle::reject(current, seq, reason.clone(), Utc::now())
        })
        .await?;
        tracing::info!(content_id = id, version_seq = seq, reason = ?reason, "Version rejected");
        Ok(saved)
    }

    pub async fn promote(&self, id: DbId, seq: VersionSeq) -> Result<ContentItem, CoreError> {
        let saved = commit(self.store.as_ref(), id, "promote", |current| {
            lifecycle::promote(current, seq, Utc::now())
        })
        .await?;
        tracing::info!(content_id = id, version_seq = seq, "Version promoted");
        Ok(saved)
    }

    pub async fn select(&self, id: DbId, seq: VersionSeq) -> Result<ContentItem, CoreError> {
        let saved = commit(self.store.as_ref(), id, "select", |current| {
            lifecycle::select(current, seq, Utc::now())
        })
        .await?;
        tracing::info!(content_id = id, version_seq = seq, "Comparison resolved");
        Ok(saved)
    }

    pub async fn delete_version(
        &self,
        id: DbId,
        seq: VersionSeq,
    ) -> Result<ContentItem, CoreError> {
        let saved = commit(self.store.as_ref(), id, "delete_version", |current| {
            lifecycle::delete_version(current, seq, Utc::now())
        })
        .await?;
        tracing::info!(content_id = id, version_seq = seq, "Version deleted");
        Ok(saved)
    }

    /// Delete the whole item. Published or remotely linked items are kept.
    pub async fn delete_item(&self, id: DbId) -> Result<(), CoreError> {
        let mut attempt = 0;
        loop {
            let item = self.get(id).await?;
            lifecycle::ensure_item_deletable(&item)?;
            match self.store.delete(id, item.revision).await {
                Ok(()) => {
                    tracing::info!(content_id = id, "Content item deleted");
                    return Ok(());
                }
                Err(StoreError::RevisionConflict { .. }) if attempt < COMMIT_RETRIES => {
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<VersionDraft, CoreError> {
        match self.generator.generate(request).await {
            Ok(output) => Ok(output.into_draft(request)),
            Err(e) => {
                tracing::error!(model = %request.model, error = %e, "Content generation failed");
                Err(e.into())
            }
        }
    }
}
