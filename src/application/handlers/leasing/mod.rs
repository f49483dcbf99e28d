//! Leasing handlers.
//!
//! Command and query handlers for the checkout and reconciliation flow:
//!
//! ## Commands
//! - Starting a hosted checkout session
//! - Processing payment webhooks
//! - Cancelling a subscription on behalf of its owner
//!
//! ## Queries
//! - Plan catalog
//! - A user's subscriptions
//! - A user's payment transactions

mod cancel_subscription;
mod handle_payment_webhook;
mod list_plans;
mod list_subscriptions;
mod list_transactions;
mod start_checkout;

use crate::domain::leasing::LeaseError;
use crate::ports::PaymentError;

// Commands
pub use cancel_subscription::{
    CancelSubscriptionCommand, CancelSubscriptionHandler, CancelSubscriptionResult,
};
pub use handle_payment_webhook::{
    HandlePaymentWebhookCommand, HandlePaymentWebhookHandler, HandlePaymentWebhookResult,
};
pub use start_checkout::{
    CheckoutSettings, StartCheckoutCommand, StartCheckoutHandler, StartCheckoutResult,
};

// Queries
pub use list_plans::{CatalogView, ListPlansHandler};
pub use list_subscriptions::{ListSubscriptionsHandler, ListSubscriptionsQuery};
pub use list_transactions::{ListTransactionsHandler, ListTransactionsQuery};

/// Processor failures keep their retryability so the caller can decide.
fn processor_error(err: PaymentError) -> LeaseError {
    LeaseError::payment_processor(err.message, err.retryable)
}
