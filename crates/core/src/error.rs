use crate::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("External service error: {0}")]
    ExternalService(String),

    /// The remote document was created but the local commit did not land.
    #[error(
        "Content item {content_id} is inconsistent: remote document {remote_document_id} exists but {detail}"
    )]
    Inconsistent {
        content_id: DbId,
        remote_document_id: String,
        detail: String,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Stable machine-readable error kind used in response envelopes and
    /// bulk error lists.
    pub fn kind(&self) -> &'static str {
        match self {
            CoreError::NotFound { .. } => "NOT_FOUND",
            CoreError::Validation(_) => "VALIDATION_ERROR",
            CoreError::PreconditionFailed(_) => "PRECONDITION_FAILED",
            CoreError::Conflict(_) => "CONFLICT",
            CoreError::Forbidden(_) => "FORBIDDEN",
            CoreError::ExternalService(_) | CoreError::Inconsistent { .. } => {
                "EXTERNAL_SERVICE_ERROR"
            }
            CoreError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_match_envelope_codes() {
        assert_eq!(
            CoreError::NotFound {
                entity: "ContentItem",
                id: 1
            }
            .kind(),
            "NOT_FOUND"
        );
        assert_eq!(CoreError::Validation("x".into()).kind(), "VALIDATION_ERROR");
        assert_eq!(
            CoreError::PreconditionFailed("x".into()).kind(),
            "PRECONDITION_FAILED"
        );
        assert_eq!(CoreError::Conflict("x".into()).kind(), "CONFLICT");
        assert_eq!(
            CoreError::ExternalService("x".into()).kind(),
            "EXTERNAL_SERVICE_ERROR"
        );
    }

    #[test]
    fn inconsistent_reports_remote_id() {
        let err = CoreError::Inconsistent {
            content_id: 7,
            remote_document_id: "doc-abc".into(),
            detail: "local commit failed".into(),
        };
        assert_eq!(err.kind(), "EXTERNAL_SERVICE_ERROR");
        let msg = err.to_string();
        assert!(msg.contains("doc-abc"));
        assert!(msg.contains("7"));
    }
}
