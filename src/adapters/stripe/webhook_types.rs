//! Stripe wire types.
//!
//! These mirror the parts of Stripe's JSON that the lease flow reads:
//! the signature header, the event envelope, and the checkout session,
//! subscription and invoice objects. Everything else in a payload is
//! ignored. `into_billing_event` is the only place Stripe field names are
//! translated to domain types.

use std::collections::HashMap;

use serde::Deserialize;

use crate::domain::foundation::{Money, Timestamp};
use crate::domain::leasing::{
    BillingEvent, BillingEventKind, CompletedCheckout, DeletedSubscription, PaidInvoice,
};
use crate::ports::PaymentError;

// ════════════════════════════════════════════════════════════════════════════════
// Signature Parsing
// ════════════════════════════════════════════════════════════════════════════════

/// Error parsing the Stripe-Signature header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureParseError {
    MissingHeader,
    MissingTimestamp,
    MissingV1Signature,
    InvalidTimestamp,
    /// A signature that is not valid hex.
    InvalidSignatureFormat,
}

impl std::fmt::Display for SignatureParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingHeader => write!(f, "Missing Stripe-Signature header"),
            Self::MissingTimestamp => write!(f, "Missing timestamp (t=) in signature"),
            Self::MissingV1Signature => write!(f, "Missing v1 signature in header"),
            Self::InvalidTimestamp => write!(f, "Invalid timestamp format"),
            Self::InvalidSignatureFormat => write!(f, "Invalid signature format (not valid hex)"),
        }
    }
}

impl std::error::Error for SignatureParseError {}

/// Parsed `Stripe-Signature` header: `t=timestamp,v1=signature[,v1=...]`.
///
/// Stripe sends several `v1` entries while a signing secret is being
/// rolled; any one of them may match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    /// Unix timestamp when Stripe signed the delivery.
    pub timestamp: i64,
    /// HMAC-SHA256 signatures, decoded from hex.
    pub v1_signatures: Vec<Vec<u8>>,
}

impl SignatureHeader {
    pub fn parse(header: &str) -> Result<Self, SignatureParseError> {
        let header = header.trim();
        if header.is_empty() {
            return Err(SignatureParseError::MissingHeader);
        }

        let mut timestamp: Option<i64> = None;
        let mut v1_signatures = Vec::new();

        for part in header.split(',') {
            let Some((key, value)) = part.split_once('=') else {
                continue;
            };
            match key.trim() {
                "t" => {
                    timestamp = Some(
                        value
                            .trim()
                            .parse()
                            .map_err(|_| SignatureParseError::InvalidTimestamp)?,
                    );
                }
                "v1" => {
                    let signature = hex_decode(value.trim())
                        .ok_or(SignatureParseError::InvalidSignatureFormat)?;
                    v1_signatures.push(signature);
                }
                // v0 and unknown schemes are not trusted
                _ => {}
            }
        }

        let timestamp = timestamp.ok_or(SignatureParseError::MissingTimestamp)?;
        if v1_signatures.is_empty() {
            return Err(SignatureParseError::MissingV1Signature);
        }

        Ok(Self {
            timestamp,
            v1_signatures,
        })
    }
}

fn hex_decode(hex: &str) -> Option<Vec<u8>> {
    if hex.is_empty() || hex.len() % 2 != 0 {
        return None;
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok())
        .collect()
}

pub fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

// ════════════════════════════════════════════════════════════════════════════════
// Event Envelope
// ════════════════════════════════════════════════════════════════════════════════

/// Stripe event as delivered to the webhook endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeWebhookEvent {
    /// Unique event identifier (evt_...).
    pub id: String,

    #[serde(rename = "type")]
    pub event_type: String,

    /// Unix timestamp when the event was created.
    pub created: i64,

    pub data: StripeEventData,

    #[serde(default)]
    pub livemode: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeEventData {
    /// The object affected by this event, decoded per event type.
    pub object: serde_json::Value,
}

// ════════════════════════════════════════════════════════════════════════════════
// Stripe Objects
// ════════════════════════════════════════════════════════════════════════════════

/// Checkout Session object, as returned on create and in webhooks.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeCheckoutSession {
    /// Session identifier (cs_...).
    pub id: String,
    pub customer: Option<String>,
    /// Subscription created by a subscription-mode checkout.
    pub subscription: Option<String>,
    /// Amount charged at checkout, in cents.
    pub amount_total: Option<i64>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    /// Hosted payment page; only present while the session is open.
    pub url: Option<String>,
    pub expires_at: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeCustomer {
    /// Customer identifier (cus_...).
    pub id: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeSubscription {
    /// Subscription identifier (sub_...).
    pub id: String,
    pub customer: Option<String>,
    pub status: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeInvoice {
    /// Invoice identifier (in_...).
    pub id: String,
    pub customer: Option<String>,
    /// Older API versions put the subscription at the top level.
    pub subscription: Option<String>,
    pub payment_intent: Option<String>,
    #[serde(default)]
    pub amount_paid: i64,
    pub period_start: Option<i64>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    /// Snapshot of the subscription's metadata (older API versions).
    pub subscription_details: Option<StripeSubscriptionDetails>,
    /// Newer API versions nest the subscription under `parent`.
    pub parent: Option<StripeInvoiceParent>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StripeSubscriptionDetails {
    pub subscription: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeInvoiceParent {
    pub subscription_details: Option<StripeSubscriptionDetails>,
}

impl StripeInvoice {
    fn subscription_details(&self) -> Option<&StripeSubscriptionDetails> {
        self.parent
            .as_ref()
            .and_then(|parent| parent.subscription_details.as_ref())
            .or(self.subscription_details.as_ref())
    }

    fn subscription_id(&self) -> Option<String> {
        self.subscription.clone().or_else(|| {
            self.subscription_details()
                .and_then(|details| details.subscription.clone())
        })
    }

    /// Invoice metadata laid over the subscription's, so invoice keys win.
    fn merged_metadata(&self) -> HashMap<String, String> {
        let mut merged = self
            .subscription_details()
            .map(|details| details.metadata.clone())
            .unwrap_or_default();
        merged.extend(self.metadata.clone());
        merged
    }
}

/// Error body returned by the Stripe API on non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeErrorBody {
    pub error: StripeApiError,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeApiError {
    pub code: Option<String>,
    pub message: Option<String>,
    #[serde(rename = "type")]
    pub error_type: Option<String>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Translation
// ════════════════════════════════════════════════════════════════════════════════

impl StripeWebhookEvent {
    /// Translate into the domain event.
    ///
    /// Only the handled event types decode their object; anything else
    /// becomes `Unhandled` without looking at the payload.
    pub fn into_billing_event(self) -> Result<BillingEvent, PaymentError> {
        let created = Timestamp::from_unix_secs(self.created)
            .ok_or_else(|| PaymentError::malformed_payload("event created time out of range"))?;

        let kind = match self.event_type.as_str() {
            "checkout.session.completed" => {
                let session: StripeCheckoutSession = decode_object(&self.data.object)?;
                BillingEventKind::CheckoutCompleted(CompletedCheckout {
                    session_id: session.id,
                    external_subscription_id: session.subscription,
                    external_customer_id: session.customer,
                    amount_total: session.amount_total.map(Money::from_cents),
                    metadata: session.metadata,
                })
            }
            "customer.subscription.deleted" => {
                let subscription: StripeSubscription = decode_object(&self.data.object)?;
                BillingEventKind::SubscriptionDeleted(DeletedSubscription {
                    external_subscription_id: subscription.id,
                    external_customer_id: subscription.customer,
                })
            }
            "invoice.payment_succeeded" | "invoice.paid" => {
                let invoice: StripeInvoice = decode_object(&self.data.object)?;
                BillingEventKind::InvoicePaid(PaidInvoice {
                    external_subscription_id: invoice.subscription_id(),
                    metadata: invoice.merged_metadata(),
                    period_start: invoice.period_start.and_then(Timestamp::from_unix_secs),
                    amount_paid: Money::from_cents(invoice.amount_paid),
                    external_customer_id: invoice.customer,
                    payment_intent_id: invoice.payment_intent,
                    invoice_id: invoice.id,
                })
            }
            _ => BillingEventKind::Unhandled,
        };

        Ok(BillingEvent {
            id: self.id,
            event_type: self.event_type,
            created,
            livemode: self.livemode,
            kind,
        })
    }
}

fn decode_object<T: serde::de::DeserializeOwned>(
    object: &serde_json::Value,
) -> Result<T, PaymentError> {
    T::deserialize(object)
        .map_err(|e| PaymentError::malformed_payload(format!("Invalid event object: {}", e)))
}
