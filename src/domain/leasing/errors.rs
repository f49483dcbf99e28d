//! Leasing error types.
//!
//! # HTTP Status Mapping
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | Validation | 400 |
//! | InvalidPlan | 400 |
//! | SubscriptionNotFound / ScooterNotFound | 404 |
//! | Forbidden | 403 |
//! | AlreadyCancelled / ScooterUnavailable / InvalidState | 409 |
//! | PaymentProcessor | 502 |
//! | Infrastructure | 500 |

use thiserror::Error;

use crate::domain::foundation::{
    DomainError, ErrorCode, ScooterId, SubscriptionId, ValidationError,
};

/// Errors surfaced by checkout, cancellation and dashboard queries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LeaseError {
    #[error("Validation failed for '{field}': {message}")]
    Validation { field: String, message: String },

    #[error("Unknown plan: {0}")]
    InvalidPlan(String),

    #[error("Subscription not found: {0}")]
    SubscriptionNotFound(SubscriptionId),

    #[error("Scooter not found: {0}")]
    ScooterNotFound(ScooterId),

    #[error("Not permitted: {0}")]
    Forbidden(String),

    #[error("Subscription {0} is already cancelled")]
    AlreadyCancelled(SubscriptionId),

    #[error("Scooter {0} is no longer available")]
    ScooterUnavailable(ScooterId),

    #[error("Cannot {attempted} subscription in {current} state")]
    InvalidState { current: String, attempted: String },

    /// The processor was unreachable or rejected the request.
    #[error("Payment processor error: {message}")]
    PaymentProcessor { message: String, retryable: bool },

    #[error("Error: {0}")]
    Infrastructure(String),
}

impl LeaseError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        LeaseError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn invalid_plan(plan_id: impl Into<String>) -> Self {
        LeaseError::InvalidPlan(plan_id.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        LeaseError::Forbidden(message.into())
    }

    pub fn already_cancelled(id: SubscriptionId) -> Self {
        LeaseError::AlreadyCancelled(id)
    }

    pub fn invalid_state(current: impl Into<String>, attempted: impl Into<String>) -> Self {
        LeaseError::InvalidState {
            current: current.into(),
            attempted: attempted.into(),
        }
    }

    pub fn payment_processor(message: impl Into<String>, retryable: bool) -> Self {
        LeaseError::PaymentProcessor {
            message: message.into(),
            retryable,
        }
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        LeaseError::Infrastructure(message.into())
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            LeaseError::Validation { .. } => ErrorCode::ValidationFailed,
            LeaseError::InvalidPlan(_) => ErrorCode::InvalidPlan,
            LeaseError::SubscriptionNotFound(_) => ErrorCode::SubscriptionNotFound,
            LeaseError::ScooterNotFound(_) => ErrorCode::ScooterNotFound,
            LeaseError::Forbidden(_) => ErrorCode::Forbidden,
            LeaseError::AlreadyCancelled(_) => ErrorCode::SubscriptionAlreadyCancelled,
            LeaseError::ScooterUnavailable(_) => ErrorCode::ScooterUnavailable,
            LeaseError::InvalidState { .. } => ErrorCode::InvalidStateTransition,
            LeaseError::PaymentProcessor { .. } => ErrorCode::PaymentProcessorError,
            LeaseError::Infrastructure(_) => ErrorCode::DatabaseError,
        }
    }

    /// True if the caller may retry the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        match self {
            LeaseError::PaymentProcessor { retryable, .. } => *retryable,
            LeaseError::Infrastructure(_) => true,
            _ => false,
        }
    }
}

impl From<ValidationError> for LeaseError {
    fn from(err: ValidationError) -> Self {
        LeaseError::Validation {
            field: err.field().to_string(),
            message: err.to_string(),
        }
    }
}

impl From<DomainError> for LeaseError {
    fn from(err: DomainError) -> Self {
        LeaseError::Infrastructure(err.to_string())
    }
}
