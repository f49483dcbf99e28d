//! Stripe payment provider adapter.
//!
//! Implements the `PaymentProvider` port for Stripe, including:
//! - Customer creation with idempotency keys
//! - Subscription-mode checkout sessions
//! - Immediate subscription cancellation
//! - Webhook signature verification and event translation
//!
//! # Security
//!
//! - Webhook signatures use HMAC-SHA256 with constant-time comparison
//! - Signed timestamps must be within the tolerance window (default 5 minutes)
//! - Secrets are held in `secrecy::SecretString`

mod mock_payment_provider;
mod stripe_adapter;
mod webhook_types;
mod webhook_verifier;

pub use mock_payment_provider::{MethodCall, MockPaymentProvider};
pub use stripe_adapter::{StripeConfig, StripePaymentAdapter};
pub use webhook_types::{SignatureHeader, SignatureParseError, StripeWebhookEvent};
pub use webhook_verifier::{sign_payload, WebhookVerifier};
