//! Content item and version model, plus input validation helpers.
//!
//! A [`ContentItem`] exclusively owns an ordered list of [`Version`]s. The
//! list is append-only apart from explicit deletes, and sequence numbers are
//! identities: they are never reused, even after the highest-numbered
//! version is deleted.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{DbId, Timestamp, VersionSeq};

/* --------------------------------------------------------------------------
Constants
-------------------------------------------------------------------------- */

/// Maximum length of a content item title.
pub const MAX_TITLE_LENGTH: usize = 200;

/// Maximum length of a generation prompt.
pub const MAX_PROMPT_LENGTH: usize = 20_000;

/// Maximum length of a rejection reason.
pub const MAX_REASON_LENGTH: usize = 2_000;

/// Default sampling temperature when the caller does not supply one.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Default completion budget when the caller does not supply one.
pub const DEFAULT_MAX_TOKENS: u32 = 4_000;

/// Upper bound accepted for `max_tokens`.
pub const MAX_MAX_TOKENS: u32 = 32_000;

/// Minimum number of models in a comparison batch.
pub const MIN_COMPARISON_MODELS: usize = 2;

/// Maximum number of models in a comparison batch.
pub const MAX_COMPARISON_MODELS: usize = 5;

/* --------------------------------------------------------------------------
Enumerations
-------------------------------------------------------------------------- */

/// Kind of educational content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Course,
    ExerciseSet,
    Assessment,
}

impl ContentType {
    pub fn as_str(self) -> &'static str {
        match self {
            ContentType::Course => "course",
            ContentType::ExerciseSet => "exercise_set",
            ContentType::Assessment => "assessment",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "course" => Some(ContentType::Course),
            "exercise_set" => Some(ContentType::ExerciseSet),
            "assessment" => Some(ContentType::Assessment),
            _ => None,
        }
    }
}

/// Lifecycle status of a single version.
///
/// `Rejected` is terminal for ordinary flow and can only be left through
/// an explicit promote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionStatus {
    Draft,
    Comparing,
    Published,
    Rejected,
}

impl VersionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            VersionStatus::Draft => "draft",
            VersionStatus::Comparing => "comparing",
            VersionStatus::Published => "published",
            VersionStatus::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for VersionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/* --------------------------------------------------------------------------
Version
-------------------------------------------------------------------------- */

/// Sampling parameters passed to the generation backend.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplingParams {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

/// Who (which model, which prompt) produced a version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Authorship {
    pub model: String,
    pub prompt: String,
}

/// Bookkeeping returned by the generation backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationMetadata {
    pub tokens_used: u32,
    pub duration_ms: u64,
    pub model_id: String,
    pub sampling: SamplingParams,
}

/// One generated or edited draft of a content item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Version {
    pub seq: VersionSeq,
    pub status: VersionStatus,
    pub authorship: Authorship,
    pub body: String,
    pub generation: GenerationMetadata,
    pub created_at: Timestamp,
    pub published_at: Option<Timestamp>,
    pub rejected_at: Option<Timestamp>,
    pub rejection_reason: Option<String>,
}

impl Version {
    /// Short human label used in automatic rejection reasons.
    pub fn label(&self) -> String {
        format!("version {} ({})", self.seq, self.authorship.model)
    }
}

/// Everything needed to append a version except its sequence number and
/// status, which the lifecycle assigns.
#[derive(Debug, Clone, PartialEq)]
pub struct VersionDraft {
    pub authorship: Authorship,
    pub body: String,
    pub generation: GenerationMetadata,
}

/* --------------------------------------------------------------------------
ContentItem
-------------------------------------------------------------------------- */

/// Top-level educational content record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: DbId,
    pub content_type: ContentType,
    pub title: String,
    pub subject_id: DbId,
    pub versions: Vec<Version>,
    pub current_version_index: Option<usize>,
    pub external_document_id: Option<String>,
    /// Next sequence number to hand out. Never decreases.
    pub next_sequence: VersionSeq,
    /// Optimistic-concurrency token, bumped by every committed write.
    pub revision: i64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Caller-supplied fields for a new content item.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewContentItem {
    pub content_type: ContentType,
    pub title: String,
    pub subject_id: DbId,
}

impl ContentItem {
    /// Position of the version with sequence number `seq`.
    pub fn version_index(&self, seq: VersionSeq) -> Option<usize> {
        self.versions.iter().position(|v| v.seq == seq)
    }

    pub fn version(&self, seq: VersionSeq) -> Option<&Version> {
        self.versions.iter().find(|v| v.seq == seq)
    }

    pub fn current_version(&self) -> Option<&Version> {
        self.current_version_index.and_then(|i| self.versions.get(i))
    }

    /// Index of the published version, if any.
    pub fn published_index(&self) -> Option<usize> {
        self.versions
            .iter()
            .position(|v| v.status == VersionStatus::Published)
    }

    /// Number of versions in the given status.
    pub fn count_status(&self, status: VersionStatus) -> usize {
        self.versions.iter().filter(|v| v.status == status).count()
    }
}

/* --------------------------------------------------------------------------
Validation functions
-------------------------------------------------------------------------- */

/// Validate a content item title: non-blank and at most [`MAX_TITLE_LENGTH`].
pub fn validate_title(title: &str) -> Result<(), CoreError> {
    if title.trim().is_empty() {
        return Err(CoreError::Validation("Title must not be empty".to_string()));
    }
    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(CoreError::Validation(format!(
            "Title exceeds maximum length of {MAX_TITLE_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Validate a generation prompt.
pub fn validate_prompt(prompt: &str) -> Result<(), CoreError> {
    if prompt.trim().is_empty() {
        return Err(CoreError::Validation("Prompt must not be empty".to_string()));
    }
    if prompt.chars().count() > MAX_PROMPT_LENGTH {
        return Err(CoreError::Validation(format!(
            "Prompt exceeds maximum length of {MAX_PROMPT_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Validate a model identifier.
pub fn validate_model(model: &str) -> Result<(), CoreError> {
    if model.trim().is_empty() {
        return Err(CoreError::Validation("Model must not be empty".to_string()));
    }
    Ok(())
}

/// Validate sampling parameters: temperature in `[0, 2]`, `max_tokens` in
/// `[1, MAX_MAX_TOKENS]`.
pub fn validate_sampling(sampling: &SamplingParams) -> Result<(), CoreError> {
    if !(0.0..=2.0).contains(&sampling.temperature) {
        return Err(CoreError::Validation(format!(
            "Temperature {} is out of range. Must be between 0 and 2",
            sampling.temperature
        )));
    }
    if sampling.max_tokens == 0 || sampling.max_tokens > MAX_MAX_TOKENS {
        return Err(CoreError::Validation(format!(
            "max_tokens {} is out of range. Must be between 1 and {MAX_MAX_TOKENS}",
            sampling.max_tokens
        )));
    }
    Ok(())
}

/// Validate an optional rejection reason.
pub fn validate_reason(reason: Option<&str>) -> Result<(), CoreError> {
    if let Some(r) = reason {
        if r.chars().count() > MAX_REASON_LENGTH {
            return Err(CoreError::Validation(format!(
                "Reason exceeds maximum length of {MAX_REASON_LENGTH} characters"
            )));
        }
    }
    Ok(())
}

/// Validate the model list of a comparison batch: between
/// [`MIN_COMPARISON_MODELS`] and [`MAX_COMPARISON_MODELS`] distinct,
/// non-blank entries.
pub fn validate_comparison_models(models: &[String]) -> Result<(), CoreError> {
    if models.len() < MIN_COMPARISON_MODELS || models.len() > MAX_COMPARISON_MODELS {
        return Err(CoreError::Validation(format!(
            "A comparison needs between {MIN_COMPARISON_MODELS} and {MAX_COMPARISON_MODELS} models, got {}",
            models.len()
        )));
    }
    for (i, model) in models.iter().enumerate() {
        validate_model(model)?;
        if models[..i].contains(model) {
            return Err(CoreError::Validation(format!(
                "Model '{model}' appears more than once in the comparison"
            )));
        }
    }
    Ok(())
}

/* --------------------------------------------------------------------------
Tests
-------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_round_trips_through_str() {
        for ct in [
            ContentType::Course,
            ContentType::ExerciseSet,
            ContentType::Assessment,
        ] {
            assert_eq!(ContentType::parse(ct.as_str()), Some(ct));
        }
        assert_eq!(ContentType::parse("quiz"), None);
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&VersionStatus::Comparing).unwrap();
        assert_eq!(json, "\"comparing\"");
        let ct = serde_json::to_string(&ContentType::ExerciseSet).unwrap();
        assert_eq!(ct, "\"exercise_set\"");
    }

    #[test]
    fn blank_title_rejected() {
        assert!(validate_title("   ").is_err());
        assert!(validate_title("Intro to Fractions").is_ok());
    }

    #[test]
    fn overlong_title_rejected() {
        let long = "a".repeat(MAX_TITLE_LENGTH + 1);
        assert!(validate_title(&long).is_err());
    }

    #[test]
    fn sampling_bounds() {
        assert!(validate_sampling(&SamplingParams::default()).is_ok());
        assert!(validate_sampling(&SamplingParams {
            temperature: 2.5,
            max_tokens: 100
        })
        .is_err());
        assert!(validate_sampling(&SamplingParams {
            temperature: 0.2,
            max_tokens: 0
        })
        .is_err());
        assert!(validate_sampling(&SamplingParams {
            temperature: 0.2,
            max_tokens: MAX_MAX_TOKENS + 1
        })
        .is_err());
    }

    #[test]
    fn comparison_models_must_be_distinct() {
        let models = vec!["model-a".to_string(), "model-a".to_string()];
        let err = validate_comparison_models(&models).unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn comparison_needs_at_least_two_models() {
        assert!(validate_comparison_models(&["only".to_string()]).is_err());
        assert!(validate_comparison_models(&["a".to_string(), "b".to_string()]).is_ok());
    }

    #[test]
    fn long_reason_rejected() {
        let long = "r".repeat(MAX_REASON_LENGTH + 1);
        assert!(validate_reason(Some(&long)).is_err());
        assert!(validate_reason(None).is_ok());
    }
}
