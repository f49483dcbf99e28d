//! Payment provider port for the external payment processor.
//!
//! Covers the three outbound calls the lease flow makes (customer,
//! checkout session, cancellation) and inbound webhook verification.
//!
//! # Design
//!
//! - **Processor agnostic**: callers see domain types, not Stripe JSON
//! - **Bounded**: implementations must time out rather than hang
//! - **Idempotent**: customer creation accepts an idempotency key

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::foundation::UserId;
use crate::domain::leasing::{BillingEvent, LineItem};

/// Port for payment processor integrations.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Create a billing customer for a local user.
    async fn create_customer(&self, request: CreateCustomerRequest)
        -> Result<Customer, PaymentError>;

    /// Create a hosted checkout session.
    ///
    /// Returns the URL the student is redirected to.
    async fn create_checkout_session(
        &self,
        request: CreateCheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError>;

    /// Cancel a subscription immediately.
    ///
    /// Returns a `NotFound` error when the processor no longer has it.
    async fn cancel_subscription(&self, subscription_id: &str) -> Result<(), PaymentError>;

    /// Verify a webhook signature and translate the event.
    async fn verify_webhook(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<BillingEvent, PaymentError>;
}

/// Request to create a customer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateCustomerRequest {
    /// Internal user ID (stored as metadata).
    pub user_id: UserId,
    pub email: Option<String>,
    pub name: Option<String>,
    /// Idempotency key for safe retries.
    pub idempotency_key: Option<String>,
}

/// Customer in the payment system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    /// Provider's customer ID.
    pub id: String,
    pub email: Option<String>,
}

/// Request to create a checkout session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateCheckoutRequest {
    /// Provider's customer ID.
    pub customer_id: String,
    /// Billable items in the order they should appear.
    pub line_items: Vec<LineItem>,
    pub success_url: String,
    pub cancel_url: String,
    /// Opaque key/value pairs echoed back on the completion event.
    pub metadata: BTreeMap<String, String>,
}

/// Checkout session for payment completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
    /// Provider's session ID.
    pub id: String,
    /// URL for customer to complete checkout.
    pub url: String,
    /// When the session expires (Unix timestamp).
    pub expires_at: Option<i64>,
}

/// Errors from payment provider operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentError {
    /// Error code for categorization.
    pub code: PaymentErrorCode,
    /// Human-readable message.
    pub message: String,
    /// Provider's error code (if available).
    pub provider_code: Option<String>,
    /// Whether the operation can be retried.
    pub retryable: bool,
}

impl PaymentError {
    /// Create a new payment error.
    pub fn new(code: PaymentErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider_code: None,
            retryable: code.is_retryable(),
        }
    }

    /// Create with provider code.
    pub fn with_provider_code(mut self, code: impl Into<String>) -> Self {
        self.provider_code = Some(code.into());
        self
    }

    /// Create a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::NetworkError, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::Timeout, message)
    }

    /// Create a not found error.
    pub fn not_found(resource: &str) -> Self {
        Self::new(PaymentErrorCode::NotFound, format!("{} not found", resource))
    }

    /// Signature header missing or not matching.
    pub fn invalid_webhook(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::InvalidWebhook, message)
    }

    /// Signed timestamp outside the tolerance window.
    pub fn webhook_expired(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::WebhookExpired, message)
    }

    /// Verified payload that is not a usable event.
    pub fn malformed_payload(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::MalformedPayload, message)
    }

    /// Create a provider-side error.
    pub fn provider(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::ProviderError, message)
    }

    /// True when the processor reports the resource no longer exists.
    pub fn is_resource_missing(&self) -> bool {
        self.code == PaymentErrorCode::NotFound
    }
}

impl std::fmt::Display for PaymentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for PaymentError {}

/// Payment error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentErrorCode {
    /// Network connectivity issue.
    NetworkError,

    /// Call exceeded the configured timeout.
    Timeout,

    /// API authentication failed.
    AuthenticationError,

    /// Request rejected as invalid.
    InvalidRequest,

    /// Resource not found.
    NotFound,

    /// Rate limit exceeded.
    RateLimitExceeded,

    /// Invalid webhook signature.
    InvalidWebhook,

    /// Webhook timestamp outside tolerance.
    WebhookExpired,

    /// Webhook payload could not be parsed.
    MalformedPayload,

    /// Test-mode event on a live endpoint or the reverse.
    LivemodeMismatch,

    /// Provider API error.
    ProviderError,
}

impl PaymentErrorCode {
    /// Check if this error type is typically retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PaymentErrorCode::NetworkError
                | PaymentErrorCode::Timeout
                | PaymentErrorCode::RateLimitExceeded
                | PaymentErrorCode::ProviderError
        )
    }
}

impl std::fmt::Display for PaymentErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentErrorCode::NetworkError => "network_error",
            PaymentErrorCode::Timeout => "timeout",
            PaymentErrorCode::AuthenticationError => "authentication_error",
            PaymentErrorCode::InvalidRequest => "invalid_request",
            PaymentErrorCode::NotFound => "not_found",
            PaymentErrorCode::RateLimitExceeded => "rate_limit_exceeded",
            PaymentErrorCode::InvalidWebhook => "invalid_webhook",
            PaymentErrorCode::WebhookExpired => "webhook_expired",
            PaymentErrorCode::MalformedPayload => "malformed_payload",
            PaymentErrorCode::LivemodeMismatch => "livemode_mismatch",
            PaymentErrorCode::ProviderError => "provider_error",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_provider_is_object_safe() {
        fn _accepts_dyn(_provider: &dyn PaymentProvider) {}
    }

    #[test]
    fn payment_error_retryable() {
        assert!(PaymentErrorCode::NetworkError.is_retryable());
        assert!(PaymentErrorCode::Timeout.is_retryable());
        assert!(PaymentErrorCode::RateLimitExceeded.is_retryable());

        assert!(!PaymentErrorCode::InvalidRequest.is_retryable());
        assert!(!PaymentErrorCode::NotFound.is_retryable());
        assert!(!PaymentErrorCode::InvalidWebhook.is_retryable());
    }

    #[test]
    fn payment_error_display() {
        let err = PaymentError::network("connection reset");
        assert_eq!(err.to_string(), "network_error: connection reset");
    }

    #[test]
    fn resource_missing_is_not_found_only() {
        let err = PaymentError::not_found("subscription").with_provider_code("resource_missing");
        assert!(err.is_resource_missing());
        assert_eq!(err.provider_code.as_deref(), Some("resource_missing"));
        assert!(!PaymentError::provider("boom").is_resource_missing());
    }
}
