//! Scooters and the student profiles that lease them.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{ScooterId, UserId};

use super::PlanId;

/// A leasable scooter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scooter {
    pub id: ScooterId,
    pub title: String,
    pub plan_id: PlanId,
    pub is_available: bool,
}

/// The slice of a user's profile the checkout flow needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerProfile {
    pub user_id: UserId,
    pub email: Option<String>,
    pub full_name: Option<String>,
    /// Processor customer id, attached on first checkout.
    pub billing_customer_id: Option<String>,
}

impl CustomerProfile {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            email: None,
            full_name: None,
            billing_customer_id: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}
