//! Seam for the AI text-generation backend.
//!
//! The backend is opaque: it takes a prompt, a system context and sampling
//! parameters and returns text plus usage metadata. Implementations live
//! outside this crate (see the publisher crate's HTTP client).

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::content::{Authorship, GenerationMetadata, SamplingParams, VersionDraft};
use crate::error::CoreError;

/// Default timeout for a single generation call.
pub const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(50);

/// Input to one generation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub model: String,
    pub prompt: String,
    pub system_context: String,
    pub sampling: SamplingParams,
}

/// Output of one generation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationOutput {
    pub content: String,
    pub tokens_used: u32,
    pub duration_ms: u64,
    pub model_id: String,
}

impl GenerationOutput {
    /// Combine the backend output with the request that produced it into a
    /// version draft ready to be appended.
    pub fn into_draft(self, request: &GenerationRequest) -> VersionDraft {
        VersionDraft {
            authorship: Authorship {
                model: request.model.clone(),
                prompt: request.prompt.clone(),
            },
            body: self.content,
            generation: GenerationMetadata {
                tokens_used: self.tokens_used,
                duration_ms: self.duration_ms,
                model_id: self.model_id,
                sampling: request.sampling,
            },
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("Generation failed: {0}")]
    Failed(String),

    #[error("Generation timed out after {0:?}")]
    TimedOut(Duration),
}

impl From<GenerationError> for CoreError {
    fn from(err: GenerationError) -> Self {
        CoreError::ExternalService(err.to_string())
    }
}

/// An opaque text generator.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationOutput, GenerationError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_becomes_draft_with_request_authorship() {
        let request = GenerationRequest {
            model: "writer-large".into(),
            prompt: "Write a quiz on photosynthesis".into(),
            system_context: "You write for grade 7".into(),
            sampling: SamplingParams {
                temperature: 0.3,
                max_tokens: 900,
            },
        };
        let output = GenerationOutput {
            content: "Q1. ...".into(),
            tokens_used: 321,
            duration_ms: 4_200,
            model_id: "writer-large-2024-06".into(),
        };

        let draft = output.into_draft(&request);
        assert_eq!(draft.authorship.model, "writer-large");
        assert_eq!(draft.authorship.prompt, "Write a quiz on photosynthesis");
        assert_eq!(draft.body, "Q1. ...");
        assert_eq!(draft.generation.model_id, "writer-large-2024-06");
        assert_eq!(draft.generation.sampling.max_tokens, 900);
    }

    #[test]
    fn generation_errors_surface_as_external_service() {
        let err: CoreError = GenerationError::Failed("upstream 500".into()).into();
        assert_eq!(err.kind(), "EXTERNAL_SERVICE_ERROR");
    }
}
