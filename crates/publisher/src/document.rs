//! Client for the external document-hosting service.
//!
//! The service hosts one remote document per published content item and
//! enforces a request quota, which is why every call made through
//! [`DocumentPublisher`] is routed through the dispatch queue by the
//! caller. This module only knows how to talk HTTP.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use edupub_core::content::{ContentItem, ContentType};
use edupub_core::error::CoreError;
use edupub_core::types::{DbId, VersionSeq};

/// Default timeout for a single call to the publishing service.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Payload sent when creating or updating a remote document. The service
/// keys documents by `content_id`, so sending the same item again updates
/// its document in place.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RemoteDocument {
    pub content_id: DbId,
    pub version_seq: VersionSeq,
    pub content_type: ContentType,
    pub title: String,
    pub body: String,
}

impl RemoteDocument {
    /// Build the payload for version `seq` of `item`.
    pub fn from_item(item: &ContentItem, seq: VersionSeq) -> Result<Self, CoreError> {
        let version = item.version(seq).ok_or(CoreError::NotFound {
            entity: "Version",
            id: i64::from(seq),
        })?;
        Ok(Self {
            content_id: item.id,
            version_seq: seq,
            content_type: item.content_type,
            title: item.title.clone(),
            body: version.body.clone(),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PublisherError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service returned a non-2xx status code.
    #[error("Publishing service error ({status}): {body}")]
    Api { status: u16, body: String },

    /// The service answered 2xx with a body we could not use.
    #[error("Malformed publishing service response: {0}")]
    Malformed(String),
}

impl From<PublisherError> for CoreError {
    fn from(err: PublisherError) -> Self {
        CoreError::ExternalService(err.to_string())
    }
}

/// Operations offered by the external publishing service.
#[async_trait]
pub trait DocumentPublisher: Send + Sync {
    /// Create the remote document for `document.content_id`, or update the
    /// existing one. Returns the remote document id.
    async fn create_or_update_document(
        &self,
        document: &RemoteDocument,
    ) -> Result<String, PublisherError>;

    /// Public URL at which a remote document can be read.
    async fn get_public_url(&self, document_id: &str) -> Result<String, PublisherError>;
}

/* --------------------------------------------------------------------------
HTTP implementation
-------------------------------------------------------------------------- */

#[derive(Debug, Deserialize)]
struct DocumentResponse {
    document_id: String,
}

#[derive(Debug, Deserialize)]
struct PublicUrlResponse {
    url: String,
}

/// reqwest-backed [`DocumentPublisher`].
pub struct HttpDocumentPublisher {
    client: reqwest::Client,
    api_url: String,
    api_token: String,
}

impl HttpDocumentPublisher {
    /// * `api_url` - Base URL, e.g. `http://localhost:8300`.
    /// * `api_token` - Bearer token; an empty token sends no header.
    pub fn new(
        api_url: impl Into<String>,
        api_token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, PublisherError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, api_url, api_token))
    }

    pub fn with_client(
        client: reqwest::Client,
        api_url: impl Into<String>,
        api_token: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            api_token: api_token.into(),
        }
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if self.api_token.is_empty() {
            request
        } else {
            request.bearer_auth(&self.api_token)
        }
    }

    // ---- private helpers ----

    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, PublisherError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(PublisherError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, PublisherError> {
        let response = Self::ensure_success(response).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| PublisherError::Malformed(e.to_string()))
    }
}

#[async_trait]
impl DocumentPublisher for HttpDocumentPublisher {
    async fn create_or_update_document(
        &self,
        document: &RemoteDocument,
    ) -> Result<String, PublisherError> {
        let response = self
            .authorized(self.client.post(format!("{}/documents", self.api_url)))
            .json(document)
            .send()
            .await?;

        let parsed: DocumentResponse = Self::parse_response(response).await?;
        if parsed.document_id.trim().is_empty() {
            return Err(PublisherError::Malformed(
                "empty document_id in response".to_string(),
            ));
        }
        Ok(parsed.document_id)
    }

    async fn get_public_url(&self, document_id: &str) -> Result<String, PublisherError> {
        let response = self
            .authorized(
                self.client
                    .get(format!("{}/documents/{}/url", self.api_url, document_id)),
            )
            .send()
            .await?;

        let parsed: PublicUrlResponse = Self::parse_response(response).await?;
        Ok(parsed.url)
    }
}
