//! HandlePaymentWebhookHandler - Command handler for processor event deliveries.
//!
//! The processor delivers at least once and in any order. Each event is
//! verified, checked against the event ledger, reconciled against the
//! stored state, and only then recorded as processed. A failure leaves no
//! ledger entry, so the redelivery runs again from the start.

use std::sync::Arc;

use crate::domain::foundation::{SubscriptionId, Timestamp, TransactionId, UserId};
use crate::domain::leasing::{
    invoice_owner, reconcile_checkout_completed, reconcile_invoice_paid,
    reconcile_subscription_deleted, BillingEvent, BillingEventKind, CancellationOutcome,
    CheckoutOutcome, CompletedCheckout, DeletedSubscription, PaidInvoice, PlanCatalog,
    SubscriptionStatus, WebhookError,
};
use crate::ports::{
    CustomerProfileRepository, PaymentError, PaymentErrorCode, PaymentProvider, SaveResult,
    SubscriptionRepository, TransactionRepository, WebhookEventRecord, WebhookEventRepository,
};

/// Command to handle a payment webhook.
#[derive(Debug, Clone)]
pub struct HandlePaymentWebhookCommand {
    /// Raw webhook payload, exactly as received.
    pub payload: Vec<u8>,
    /// `Stripe-Signature` header value.
    pub signature: String,
}

/// Result of webhook processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlePaymentWebhookResult {
    /// Event id already in the ledger; nothing re-ran.
    AlreadyProcessed,
    /// Checkout completed, lease created and scooter reserved.
    SubscriptionCreated {
        subscription_id: SubscriptionId,
        user_id: UserId,
    },
    /// A subscription already exists for the external id.
    DuplicateCheckout { external_subscription_id: String },
    SubscriptionCancelled { subscription_id: SubscriptionId },
    AlreadyCancelled { subscription_id: SubscriptionId },
    /// Deletion for a subscription this service never stored.
    NoMatchingSubscription { external_subscription_id: String },
    /// Deletion arrived for a lease that already ended administratively.
    Retained {
        subscription_id: SubscriptionId,
        status: SubscriptionStatus,
    },
    /// Invoice payment appended to the transaction log.
    PaymentRecorded {
        transaction_id: TransactionId,
        linked: bool,
    },
    /// The invoice was recorded by an earlier delivery.
    DuplicatePayment { invoice_id: String },
    /// Event type outside the handled set.
    Ignored,
}

impl HandlePaymentWebhookResult {
    /// Short outcome label for logs and the event ledger.
    pub fn outcome(&self) -> &'static str {
        match self {
            HandlePaymentWebhookResult::AlreadyProcessed => "already_processed",
            HandlePaymentWebhookResult::SubscriptionCreated { .. } => "created",
            HandlePaymentWebhookResult::DuplicateCheckout { .. } => "duplicate",
            HandlePaymentWebhookResult::SubscriptionCancelled { .. } => "cancelled",
            HandlePaymentWebhookResult::AlreadyCancelled { .. } => "already_cancelled",
            HandlePaymentWebhookResult::NoMatchingSubscription { .. } => "no_match",
            HandlePaymentWebhookResult::Retained { .. } => "retained",
            HandlePaymentWebhookResult::PaymentRecorded { .. } => "recorded",
            HandlePaymentWebhookResult::DuplicatePayment { .. } => "duplicate_payment",
            HandlePaymentWebhookResult::Ignored => "ignored",
        }
    }
}

/// Handler for processing payment provider webhooks.
///
/// The only writer of subscriptions and payment transactions, apart from
/// owner cancellation.
pub struct HandlePaymentWebhookHandler {
    payment_provider: Arc<dyn PaymentProvider>,
    subscriptions: Arc<dyn SubscriptionRepository>,
    transactions: Arc<dyn TransactionRepository>,
    profiles: Arc<dyn CustomerProfileRepository>,
    events: Arc<dyn WebhookEventRepository>,
    catalog: Arc<PlanCatalog>,
}

impl HandlePaymentWebhookHandler {
    pub fn new(
        payment_provider: Arc<dyn PaymentProvider>,
        subscriptions: Arc<dyn SubscriptionRepository>,
        transactions: Arc<dyn TransactionRepository>,
        profiles: Arc<dyn CustomerProfileRepository>,
        events: Arc<dyn WebhookEventRepository>,
        catalog: Arc<PlanCatalog>,
    ) -> Self {
        Self {
            payment_provider,
            subscriptions,
            transactions,
            profiles,
            events,
            catalog,
        }
    }

    pub async fn handle(
        &self,
        cmd: HandlePaymentWebhookCommand,
    ) -> Result<HandlePaymentWebhookResult, WebhookError> {
        // 1. Verify signature and decode; nothing is read or written before this
        let event = self
            .payment_provider
            .verify_webhook(&cmd.payload, &cmd.signature)
            .await
            .map_err(webhook_error)?;

        // 2. Skip events the ledger already holds
        if self.events.find_by_event_id(&event.id).await?.is_some() {
            tracing::info!(
                event_id = %event.id,
                event_type = %event.event_type,
                outcome = "already_processed",
                "Webhook event already processed"
            );
            return Ok(HandlePaymentWebhookResult::AlreadyProcessed);
        }

        // 3. Reconcile
        let now = Timestamp::now();
        let result = match &event.kind {
            BillingEventKind::CheckoutCompleted(checkout) => {
                self.handle_checkout_completed(checkout, now).await
            }
            BillingEventKind::SubscriptionDeleted(deleted) => {
                self.handle_subscription_deleted(deleted, now).await
            }
            BillingEventKind::InvoicePaid(invoice) => self.handle_invoice_paid(invoice, now).await,
            BillingEventKind::Unhandled => Ok(HandlePaymentWebhookResult::Ignored),
        };

        let result = match result {
            Ok(result) => result,
            Err(err) => {
                tracing::warn!(
                    event_id = %event.id,
                    event_type = %event.event_type,
                    external_subscription_id = external_subscription_id(&event).unwrap_or("-"),
                    error = %err,
                    retryable = err.is_retryable(),
                    "Webhook event failed"
                );
                return Err(err);
            }
        };

        // 4. Record only once the store reflects the event
        let record = match result {
            HandlePaymentWebhookResult::Ignored => {
                WebhookEventRecord::ignored(&event.id, &event.event_type)
            }
            ref applied => {
                WebhookEventRecord::applied(&event.id, &event.event_type, applied.outcome())
            }
        };
        self.events.save(record).await?;

        tracing::info!(
            event_id = %event.id,
            event_type = %event.event_type,
            external_subscription_id = external_subscription_id(&event).unwrap_or("-"),
            outcome = result.outcome(),
            "Webhook event processed"
        );

        Ok(result)
    }

    async fn handle_checkout_completed(
        &self,
        checkout: &CompletedCheckout,
        now: Timestamp,
    ) -> Result<HandlePaymentWebhookResult, WebhookError> {
        let external_id = checkout.subscription_ref()?;
        let existing = self.subscriptions.find_by_external_id(external_id).await?;

        let subscription =
            match reconcile_checkout_completed(existing.as_ref(), checkout, &self.catalog, now)? {
                CheckoutOutcome::Create(subscription) => subscription,
                CheckoutOutcome::Duplicate(_) => {
                    return Ok(HandlePaymentWebhookResult::DuplicateCheckout {
                        external_subscription_id: external_id.to_string(),
                    })
                }
            };

        // A concurrent delivery can still win the insert
        match self.subscriptions.create_with_reservation(&subscription).await? {
            SaveResult::Inserted => Ok(HandlePaymentWebhookResult::SubscriptionCreated {
                subscription_id: subscription.id,
                user_id: subscription.user_id.clone(),
            }),
            SaveResult::AlreadyExists => Ok(HandlePaymentWebhookResult::DuplicateCheckout {
                external_subscription_id: external_id.to_string(),
            }),
        }
    }

    async fn handle_subscription_deleted(
        &self,
        deleted: &DeletedSubscription,
        now: Timestamp,
    ) -> Result<HandlePaymentWebhookResult, WebhookError> {
        let existing = self
            .subscriptions
            .find_by_external_id(&deleted.external_subscription_id)
            .await?;

        Ok(match reconcile_subscription_deleted(existing, now) {
            CancellationOutcome::Cancel(subscription) => {
                if self.subscriptions.mark_cancelled(&subscription).await? {
                    HandlePaymentWebhookResult::SubscriptionCancelled {
                        subscription_id: subscription.id,
                    }
                } else {
                    // Owner cancellation landed in between
                    HandlePaymentWebhookResult::AlreadyCancelled {
                        subscription_id: subscription.id,
                    }
                }
            }
            CancellationOutcome::AlreadyCancelled(subscription_id) => {
                HandlePaymentWebhookResult::AlreadyCancelled { subscription_id }
            }
            CancellationOutcome::NoMatch => HandlePaymentWebhookResult::NoMatchingSubscription {
                external_subscription_id: deleted.external_subscription_id.clone(),
            },
            CancellationOutcome::Retained { id, status } => HandlePaymentWebhookResult::Retained {
                subscription_id: id,
                status,
            },
        })
    }

    async fn handle_invoice_paid(
        &self,
        invoice: &PaidInvoice,
        now: Timestamp,
    ) -> Result<HandlePaymentWebhookResult, WebhookError> {
        let linked = match invoice.external_subscription_id.as_deref() {
            Some(external_id) => self.subscriptions.find_by_external_id(external_id).await?,
            None => None,
        };

        let owner = match invoice_owner(invoice, linked.as_ref()) {
            Some(owner) => Some(owner),
            None => match invoice.external_customer_id.as_deref() {
                Some(customer_id) => {
                    self.profiles
                        .find_user_by_billing_customer(customer_id)
                        .await?
                }
                None => None,
            },
        }
        .ok_or_else(|| WebhookError::UnresolvedOwner(invoice.invoice_id.clone()))?;

        let transaction = reconcile_invoice_paid(invoice, owner, linked.as_ref(), now);

        match self.transactions.append(&transaction).await? {
            SaveResult::Inserted => Ok(HandlePaymentWebhookResult::PaymentRecorded {
                transaction_id: transaction.id,
                linked: transaction.subscription_id.is_some(),
            }),
            SaveResult::AlreadyExists => Ok(HandlePaymentWebhookResult::DuplicatePayment {
                invoice_id: invoice.invoice_id.clone(),
            }),
        }
    }
}

fn external_subscription_id(event: &BillingEvent) -> Option<&str> {
    match &event.kind {
        BillingEventKind::CheckoutCompleted(checkout) => {
            checkout.external_subscription_id.as_deref()
        }
        BillingEventKind::SubscriptionDeleted(deleted) => {
            Some(deleted.external_subscription_id.as_str())
        }
        BillingEventKind::InvoicePaid(invoice) => invoice.external_subscription_id.as_deref(),
        BillingEventKind::Unhandled => None,
    }
}

/// Maps verification failures onto the webhook taxonomy.
fn webhook_error(err: PaymentError) -> WebhookError {
    match err.code {
        PaymentErrorCode::InvalidWebhook => WebhookError::InvalidSignature,
        PaymentErrorCode::WebhookExpired => WebhookError::TimestampOutOfRange,
        PaymentErrorCode::MalformedPayload => WebhookError::ParseError(err.message),
        PaymentErrorCode::LivemodeMismatch => WebhookError::LivemodeMismatch,
        _ => WebhookError::storage(err.message),
    }
}
