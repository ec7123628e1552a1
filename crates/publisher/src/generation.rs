//! reqwest client for the AI text-generation backend.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use edupub_core::generation::{
    ContentGenerator, GenerationError, GenerationOutput, GenerationRequest,
};

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    content: String,
    tokens_used: u32,
    duration_ms: u64,
    model_id: String,
}

/// Calls `POST {api_url}/generate` with the request as JSON.
pub struct HttpContentGenerator {
    client: reqwest::Client,
    api_url: String,
    timeout: Duration,
}

impl HttpContentGenerator {
    pub fn new(api_url: impl Into<String>, timeout: Duration) -> Result<Self, GenerationError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GenerationError::Failed(e.to_string()))?;
        Ok(Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            timeout,
        })
    }

    fn map_request_error(&self, err: reqwest::Error) -> GenerationError {
        if err.is_timeout() {
            GenerationError::TimedOut(self.timeout)
        } else {
            GenerationError::Failed(err.to_string())
        }
    }
}

#[async_trait]
impl ContentGenerator for HttpContentGenerator {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationOutput, GenerationError> {
        let body = serde_json::json!({
            "model": request.model,
            "prompt": request.prompt,
            "system_context": request.system_context,
            "temperature": request.sampling.temperature,
            "max_tokens": request.sampling.max_tokens,
        });

        let response = self
            .client
            .post(format!("{}/generate", self.api_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(GenerationError::Failed(format!(
                "backend returned {}: {text}",
                status.as_u16()
            )));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| self.map_request_error(e))?;
        if parsed.content.trim().is_empty() {
            return Err(GenerationError::Failed(
                "backend returned empty content".to_string(),
            ));
        }

        tracing::debug!(
            model = %request.model,
            tokens_used = parsed.tokens_used,
            duration_ms = parsed.duration_ms,
            "Generation completed",
        );

        Ok(GenerationOutput {
            content: parsed.content,
            tokens_used: parsed.tokens_used,
            duration_ms: parsed.duration_ms,
            model_id: parsed.model_id,
        })
    }
}
