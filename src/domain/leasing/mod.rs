//! Leasing domain module.
//!
//! Plan pricing, lease requests and the subscription lifecycle, plus the
//! rules that reconcile processor events into local state.
//!
//! # Module Structure
//!
//! - `plan` - plan catalog and line-item composition
//! - `lease_request` - checkout input, delivery policy, metadata encoding
//! - `subscription` / `status` - lease record and its state machine
//! - `transaction` - append-only payment log
//! - `billing_event` - verified processor events
//! - `reconcile` - event-to-state decisions

mod billing_event;
mod errors;
mod inventory;
mod lease_request;
mod plan;
mod reconcile;
mod status;
mod subscription;
mod transaction;
mod webhook_errors;

pub use billing_event::{
    BillingEvent, BillingEventKind, CompletedCheckout, DeletedSubscription, PaidInvoice,
};
pub use errors::LeaseError;
pub use inventory::{CustomerProfile, Scooter};
pub use lease_request::{
    metadata_keys, DeliveryPolicy, DeliverySchedule, LeaseMetadata, LeaseRequest, Semester,
    MAX_METADATA_VALUE_CHARS,
};
pub use plan::{
    Billing, CatalogPrices, LineItem, LineItemKind, LockTier, Plan, PlanCatalog, PlanId,
    PriceBreakdown,
};
pub use reconcile::{
    invoice_owner, reconcile_checkout_completed, reconcile_invoice_paid,
    reconcile_subscription_deleted, CancellationOutcome, CheckoutOutcome,
};
pub use status::SubscriptionStatus;
pub use subscription::Subscription;
pub use transaction::{PaymentTransaction, TransactionStatus, TransactionType};
pub use webhook_errors::WebhookError;

#[cfg(test)]
pub(crate) use plan::test_catalog;
#[cfg(test)]
pub(crate) use subscription::test_subscription;
