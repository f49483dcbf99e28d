//! Webhook error types.
//!
//! The status code decides whether the processor redelivers: 4xx means
//! the event is bad and will never succeed, 5xx asks for a retry.

use axum::http::StatusCode;
use thiserror::Error;

use crate::domain::foundation::DomainError;

/// Errors that occur while applying a processor event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WebhookError {
    /// Signature header missing or does not match the payload.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Signed timestamp is outside the tolerance window.
    #[error("Timestamp out of range")]
    TimestampOutOfRange,

    /// Payload is not a well-formed event.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Event mode does not match the configured processor mode.
    #[error("Livemode mismatch")]
    LivemodeMismatch,

    #[error("Missing metadata: {0}")]
    MissingMetadata(&'static str),

    #[error("Invalid metadata '{key}': {reason}")]
    InvalidMetadata { key: &'static str, reason: String },

    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// Nobody could be attributed for a payment yet. Retried so the
    /// record is never dropped.
    #[error("Could not resolve owner for {0}")]
    UnresolvedOwner(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl WebhookError {
    pub fn invalid_metadata(key: &'static str, reason: impl Into<String>) -> Self {
        WebhookError::InvalidMetadata {
            key,
            reason: reason.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        WebhookError::Storage(message.into())
    }

    /// Returns true if the processor should redeliver this event.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            WebhookError::Storage(_) | WebhookError::UnresolvedOwner(_)
        )
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            WebhookError::InvalidSignature | WebhookError::TimestampOutOfRange => {
                StatusCode::UNAUTHORIZED
            }

            WebhookError::ParseError(_)
            | WebhookError::LivemodeMismatch
            | WebhookError::MissingMetadata(_)
            | WebhookError::InvalidMetadata { .. }
            | WebhookError::MissingField(_) => StatusCode::BAD_REQUEST,

            WebhookError::UnresolvedOwner(_) | WebhookError::Storage(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<DomainError> for WebhookError {
    fn from(err: DomainError) -> Self {
        WebhookError::Storage(err.to_string())
    }
}
