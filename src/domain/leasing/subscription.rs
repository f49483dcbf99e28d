//! Subscription aggregate.
//!
//! A subscription is the local record of a lease. It is created from a
//! webhook-confirmed checkout and never deleted: cancellation is a status
//! transition so the history stays queryable.
//!
//! # Invariants
//!
//! - `external_subscription_id` is unique across all subscriptions
//! - `lease_start_date <= lease_end_date`
//! - `cancelled_at` is set iff `status == Cancelled`

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    Money, ScooterId, StateMachine, SubscriptionId, Timestamp, UserId,
};

use super::{LeaseError, LockTier, PlanId, Semester, SubscriptionStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub user_id: UserId,
    pub scooter_id: Option<ScooterId>,
    pub plan_id: PlanId,
    pub external_subscription_id: String,
    pub external_customer_id: Option<String>,
    pub status: SubscriptionStatus,
    pub semester: Semester,
    /// Recurring charge: plan plus insurance when selected.
    pub monthly_price: Money,
    pub security_deposit: Money,
    pub include_insurance: bool,
    pub lock_tier: LockTier,
    pub delivery_address: Option<String>,
    pub contact_number: Option<String>,
    pub delivery_date: Option<NaiveDate>,
    pub delivery_time: Option<String>,
    pub lease_start_date: NaiveDate,
    pub lease_end_date: NaiveDate,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub cancelled_at: Option<Timestamp>,
}

impl Subscription {
    pub fn is_owned_by(&self, user_id: &UserId) -> bool {
        &self.user_id == user_id
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == SubscriptionStatus::Cancelled
    }

    /// Moves the subscription to `cancelled`.
    ///
    /// # Errors
    ///
    /// - `AlreadyCancelled` if it is already cancelled
    /// - `InvalidState` from `completed` or `expired`
    pub fn cancel(&mut self, now: Timestamp) -> Result<(), LeaseError> {
        if self.is_cancelled() {
            return Err(LeaseError::already_cancelled(self.id));
        }
        self.status = self
            .status
            .transition_to(SubscriptionStatus::Cancelled)
            .map_err(|_| LeaseError::invalid_state(self.status.as_str(), "cancel"))?;
        self.cancelled_at = Some(now);
        self.updated_at = now;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn test_subscription(user_id: &str, external_id: &str) -> Subscription {
    let now = Timestamp::now();
    let start = now.date();
    Subscription {
        id: SubscriptionId::new(),
        user_id: UserId::new(user_id).unwrap(),
        scooter_id: Some(ScooterId::new()),
        plan_id: PlanId::Basic,
        external_subscription_id: external_id.to_string(),
        external_customer_id: Some("cus_test".to_string()),
        status: SubscriptionStatus::Active,
        semester: Semester::Fall,
        monthly_price: Money::from_cents(3750),
        security_deposit: Money::from_cents(10_000),
        include_insurance: false,
        lock_tier: LockTier::Cable,
        delivery_address: Some("12 College Ave".to_string()),
        contact_number: Some("555-0100".to_string()),
        delivery_date: Some(start),
        delivery_time: Some("morning".to_string()),
        lease_start_date: start,
        lease_end_date: start,
        created_at: now,
        updated_at: now,
        cancelled_at: None,
    }
}
