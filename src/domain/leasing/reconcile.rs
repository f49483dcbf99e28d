//! Reconciliation rules for billing events.
//!
//! Each rule takes the currently persisted state plus the incoming event
//! and returns the change to apply. They do no I/O, so replaying the same
//! event, or events out of order, always yields the same decision.

use crate::domain::foundation::{SubscriptionId, Timestamp, TransactionId, UserId};

use super::lease_request::metadata_keys;
use super::{
    CompletedCheckout, LeaseMetadata, PaidInvoice, PaymentTransaction, PlanCatalog, Subscription,
    SubscriptionStatus, TransactionStatus, TransactionType, WebhookError,
};

/// Decision for a checkout-completed event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutOutcome {
    /// First delivery: persist this subscription and reserve its scooter.
    Create(Box<Subscription>),
    /// A subscription already exists for the external id.
    Duplicate(SubscriptionId),
}

/// Decision for a subscription-deleted event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancellationOutcome {
    /// Persist the cancelled subscription.
    Cancel(Box<Subscription>),
    AlreadyCancelled(SubscriptionId),
    /// No local subscription carries the external id.
    NoMatch,
    /// Administrative end state that a processor deletion does not override.
    Retained {
        id: SubscriptionId,
        status: SubscriptionStatus,
    },
}

impl CompletedCheckout {
    /// External subscription id the checkout created.
    pub fn subscription_ref(&self) -> Result<&str, WebhookError> {
        self.external_subscription_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or(WebhookError::MissingField("subscription"))
    }
}

pub fn reconcile_checkout_completed(
    existing: Option<&Subscription>,
    checkout: &CompletedCheckout,
    catalog: &PlanCatalog,
    now: Timestamp,
) -> Result<CheckoutOutcome, WebhookError> {
    if let Some(existing) = existing {
        return Ok(CheckoutOutcome::Duplicate(existing.id));
    }

    let external_subscription_id = checkout.subscription_ref()?.to_string();
    let lease = LeaseMetadata::parse(&checkout.metadata)?;
    let plan = catalog.plan(lease.plan_id).ok_or_else(|| {
        WebhookError::invalid_metadata(metadata_keys::PLAN_TYPE, lease.plan_id.as_str())
    })?;
    let (lease_start_date, lease_end_date) = lease.lease_window(now.date());

    Ok(CheckoutOutcome::Create(Box::new(Subscription {
        id: SubscriptionId::new(),
        user_id: lease.user_id,
        scooter_id: lease.scooter_id,
        plan_id: plan.id,
        external_subscription_id,
        external_customer_id: checkout.external_customer_id.clone(),
        status: SubscriptionStatus::Active,
        semester: lease.semester,
        monthly_price: catalog.monthly_price(plan, lease.include_insurance),
        security_deposit: catalog.security_deposit(),
        include_insurance: lease.include_insurance,
        lock_tier: lease.lock_tier,
        delivery_address: lease.delivery_address,
        contact_number: lease.contact_number,
        delivery_date: lease.delivery_schedule.map(|s| s.resolve(now.date())),
        delivery_time: lease.delivery_time,
        lease_start_date,
        lease_end_date,
        created_at: now,
        updated_at: now,
        cancelled_at: None,
    })))
}

pub fn reconcile_subscription_deleted(
    existing: Option<Subscription>,
    now: Timestamp,
) -> CancellationOutcome {
    let Some(mut subscription) = existing else {
        return CancellationOutcome::NoMatch;
    };
    if subscription.is_cancelled() {
        return CancellationOutcome::AlreadyCancelled(subscription.id);
    }
    match subscription.cancel(now) {
        Ok(()) => CancellationOutcome::Cancel(Box::new(subscription)),
        Err(_) => CancellationOutcome::Retained {
            id: subscription.id,
            status: subscription.status,
        },
    }
}

/// Who paid an invoice, from what the event and local state know.
///
/// Checks invoice metadata first, then the linked subscription. The
/// caller falls back to the billing customer mapping when this is `None`.
pub fn invoice_owner(invoice: &PaidInvoice, linked: Option<&Subscription>) -> Option<UserId> {
    invoice
        .metadata
        .get(metadata_keys::USER_ID)
        .and_then(|raw| UserId::new(raw.as_str()).ok())
        .or_else(|| linked.map(|sub| sub.user_id.clone()))
}

/// Builds the transaction for a paid invoice.
///
/// Never depends on the subscription existing: an invoice that races
/// ahead of its checkout keeps the external reference and is linked
/// when the subscription is created.
pub fn reconcile_invoice_paid(
    invoice: &PaidInvoice,
    owner: UserId,
    linked: Option<&Subscription>,
    now: Timestamp,
) -> PaymentTransaction {
    let description = match invoice.period_start {
        Some(start) => format!(
            "Monthly payment for period starting {}",
            start.date().format("%Y-%m-%d")
        ),
        None => "Monthly payment".to_string(),
    };

    PaymentTransaction {
        id: TransactionId::new(),
        user_id: owner,
        subscription_id: linked.map(|sub| sub.id),
        external_subscription_id: invoice.external_subscription_id.clone(),
        external_invoice_id: Some(invoice.invoice_id.clone()),
        external_payment_intent_id: invoice.payment_intent_id.clone(),
        amount: invoice.amount_paid,
        transaction_type: TransactionType::MonthlyPayment,
        status: TransactionStatus::Completed,
        description,
        created_at: now,
        updated_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{Money, ScooterId};
    use crate::domain::leasing::plan::test_catalog;
    use crate::domain::leasing::subscription::test_subscription;
    use crate::domain::leasing::{LockTier, PlanId};
    use chrono::NaiveDate;
    use std::collections::HashMap;

    fn checkout(scooter: Option<ScooterId>) -> CompletedCheckout {
        let mut metadata = HashMap::new();
        metadata.insert("user_id".to_string(), "user-1".to_string());
        metadata.insert("plan_type".to_string(), "premium".to_string());
        metadata.insert("semester".to_string(), "Fall Semester".to_string());
        metadata.insert("delivery_address".to_string(), "9 Elm St".to_string());
        metadata.insert("contact_number".to_string(), "555-0101".to_string());
        metadata.insert("delivery_date".to_string(), "2025-08-25".to_string());
        metadata.insert("delivery_time".to_string(), "afternoon".to_string());
        metadata.insert("include_insurance".to_string(), "true".to_string());
        metadata.insert("lock_type".to_string(), "ulock".to_string());
        if let Some(id) = scooter {
            metadata.insert("scooter_id".to_string(), id.to_string());
        }
        CompletedCheckout {
            session_id: "cs_1".to_string(),
            external_subscription_id: Some("sub_1".to_string()),
            external_customer_id: Some("cus_1".to_string()),
            amount_total: Some(Money::from_cents(9249)),
            metadata,
        }
    }

    fn invoice(metadata_user: Option<&str>) -> PaidInvoice {
        let mut metadata = HashMap::new();
        if let Some(user) = metadata_user {
            metadata.insert("user_id".to_string(), user.to_string());
        }
        PaidInvoice {
            invoice_id: "in_1".to_string(),
            external_subscription_id: Some("sub_1".to_string()),
            external_customer_id: Some("cus_1".to_string()),
            payment_intent_id: Some("pi_1".to_string()),
            amount_paid: Money::from_cents(6249),
            // 2025-09-01T00:00:00Z
            period_start: Timestamp::from_unix_secs(1756684800),
            metadata,
        }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Checkout completed
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn first_checkout_creates_active_subscription_from_metadata() {
        let scooter = ScooterId::new();
        let now = Timestamp::now();
        let outcome =
            reconcile_checkout_completed(None, &checkout(Some(scooter)), &test_catalog(), now)
                .unwrap();

        let CheckoutOutcome::Create(sub) = outcome else {
            panic!("expected Create");
        };
        assert_eq!(sub.user_id.as_str(), "user-1");
        assert_eq!(sub.scooter_id, Some(scooter));
        assert_eq!(sub.plan_id, PlanId::Premium);
        assert_eq!(sub.status, SubscriptionStatus::Active);
        assert_eq!(sub.external_subscription_id, "sub_1");
        assert_eq!(sub.external_customer_id.as_deref(), Some("cus_1"));
        assert_eq!(sub.monthly_price, Money::from_cents(6249));
        assert_eq!(sub.security_deposit, Money::from_cents(10_000));
        assert_eq!(sub.lock_tier, LockTier::ULock);
        assert_eq!(sub.delivery_date, NaiveDate::from_ymd_opt(2025, 8, 25));
        assert_eq!(sub.lease_end_date, NaiveDate::from_ymd_opt(2025, 12, 25).unwrap());
    }

    #[test]
    fn repeated_checkout_is_a_duplicate() {
        let existing = test_subscription("user-1", "sub_1");
        let outcome =
            reconcile_checkout_completed(Some(&existing), &checkout(None), &test_catalog(), Timestamp::now())
                .unwrap();
        assert_eq!(outcome, CheckoutOutcome::Duplicate(existing.id));
    }

    #[test]
    fn checkout_without_subscription_is_rejected() {
        let mut event = checkout(None);
        event.external_subscription_id = None;
        let err = reconcile_checkout_completed(None, &event, &test_catalog(), Timestamp::now())
            .unwrap_err();
        assert_eq!(err, WebhookError::MissingField("subscription"));
    }

    #[test]
    fn checkout_without_owner_is_rejected() {
        let mut event = checkout(None);
        event.metadata.remove("user_id");
        let err = reconcile_checkout_completed(None, &event, &test_catalog(), Timestamp::now())
            .unwrap_err();
        assert_eq!(err, WebhookError::MissingMetadata("user_id"));
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Subscription deleted
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn deletion_cancels_live_subscription() {
        let existing = test_subscription("user-1", "sub_1");
        let now = Timestamp::now();
        match reconcile_subscription_deleted(Some(existing), now) {
            CancellationOutcome::Cancel(sub) => {
                assert!(sub.is_cancelled());
                assert_eq!(sub.cancelled_at, Some(now));
            }
            other => panic!("expected Cancel, got {:?}", other),
        }
    }

    #[test]
    fn deletion_without_local_subscription_is_no_match() {
        assert_eq!(
            reconcile_subscription_deleted(None, Timestamp::now()),
            CancellationOutcome::NoMatch
        );
    }

    #[test]
    fn deletion_of_cancelled_subscription_is_idempotent() {
        let mut existing = test_subscription("user-1", "sub_1");
        existing.cancel(Timestamp::now()).unwrap();
        let id = existing.id;
        assert_eq!(
            reconcile_subscription_deleted(Some(existing), Timestamp::now()),
            CancellationOutcome::AlreadyCancelled(id)
        );
    }

    #[test]
    fn deletion_keeps_completed_subscription() {
        let mut existing = test_subscription("user-1", "sub_1");
        existing.status = SubscriptionStatus::Completed;
        let id = existing.id;
        assert_eq!(
            reconcile_subscription_deleted(Some(existing), Timestamp::now()),
            CancellationOutcome::Retained {
                id,
                status: SubscriptionStatus::Completed
            }
        );
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Invoice paid
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn invoice_before_checkout_keeps_external_reference() {
        let paid = invoice(Some("user-1"));
        let owner = invoice_owner(&paid, None).unwrap();
        let tx = reconcile_invoice_paid(&paid, owner, None, Timestamp::now());

        assert_eq!(tx.user_id.as_str(), "user-1");
        assert_eq!(tx.subscription_id, None);
        assert_eq!(tx.external_subscription_id.as_deref(), Some("sub_1"));
        assert_eq!(tx.external_invoice_id.as_deref(), Some("in_1"));
        assert_eq!(tx.amount, Money::from_cents(6249));
        assert_eq!(tx.transaction_type, TransactionType::MonthlyPayment);
        assert_eq!(tx.status, TransactionStatus::Completed);
        assert_eq!(tx.description, "Monthly payment for period starting 2025-09-01");
    }

    #[test]
    fn invoice_links_existing_subscription() {
        let linked = test_subscription("user-7", "sub_1");
        let paid = invoice(None);
        let owner = invoice_owner(&paid, Some(&linked)).unwrap();
        let tx = reconcile_invoice_paid(&paid, owner, Some(&linked), Timestamp::now());

        assert_eq!(tx.user_id.as_str(), "user-7");
        assert_eq!(tx.subscription_id, Some(linked.id));
    }

    #[test]
    fn invoice_owner_prefers_metadata() {
        let linked = test_subscription("user-7", "sub_1");
        let owner = invoice_owner(&invoice(Some("user-1")), Some(&linked)).unwrap();
        assert_eq!(owner.as_str(), "user-1");
        assert!(invoice_owner(&invoice(None), None).is_none());
    }
}
