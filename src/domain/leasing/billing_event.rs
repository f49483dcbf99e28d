//! Billing events as the reconciliation rules see them.
//!
//! The payment adapter verifies and translates raw processor payloads into
//! these types, keeping only the fields reconciliation needs.

use std::collections::HashMap;

use crate::domain::foundation::{Money, Timestamp};

/// A verified processor event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillingEvent {
    /// Processor event id, used as the delivery idempotency key.
    pub id: String,
    /// Raw processor event type, kept for logging.
    pub event_type: String,
    pub created: Timestamp,
    pub livemode: bool,
    pub kind: BillingEventKind,
}

/// What happened, for the event types this service acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingEventKind {
    CheckoutCompleted(CompletedCheckout),
    SubscriptionDeleted(DeletedSubscription),
    InvoicePaid(PaidInvoice),
    /// Any event type outside the handled set.
    Unhandled,
}

impl BillingEventKind {
    pub fn label(&self) -> &'static str {
        match self {
            BillingEventKind::CheckoutCompleted(_) => "checkout_completed",
            BillingEventKind::SubscriptionDeleted(_) => "subscription_deleted",
            BillingEventKind::InvoicePaid(_) => "invoice_paid",
            BillingEventKind::Unhandled => "unhandled",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedCheckout {
    pub session_id: String,
    pub external_subscription_id: Option<String>,
    pub external_customer_id: Option<String>,
    pub amount_total: Option<Money>,
    /// Opaque metadata attached when the session was created.
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletedSubscription {
    pub external_subscription_id: String,
    pub external_customer_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaidInvoice {
    pub invoice_id: String,
    pub external_subscription_id: Option<String>,
    pub external_customer_id: Option<String>,
    pub payment_intent_id: Option<String>,
    pub amount_paid: Money,
    pub period_start: Option<Timestamp>,
    /// Invoice metadata merged over the parent subscription's metadata.
    pub metadata: HashMap<String, String>,
}
