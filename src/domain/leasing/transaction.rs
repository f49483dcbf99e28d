//! Payment transaction log entries.
//!
//! Transactions are appended by the webhook processor. After creation only
//! the status may be corrected, following [`TransactionStatus`] rules.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::{
    Money, StateMachine, SubscriptionId, Timestamp, TransactionId, UserId, ValidationError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Deposit,
    MonthlyPayment,
    Refund,
    Penalty,
    Bonus,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Deposit => "deposit",
            TransactionType::MonthlyPayment => "monthly_payment",
            TransactionType::Refund => "refund",
            TransactionType::Penalty => "penalty",
            TransactionType::Bonus => "bonus",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "deposit" => Some(TransactionType::Deposit),
            "monthly_payment" => Some(TransactionType::MonthlyPayment),
            "refund" => Some(TransactionType::Refund),
            "penalty" => Some(TransactionType::Penalty),
            "bonus" => Some(TransactionType::Bonus),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
    Refunded,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Processing => "processing",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Failed => "failed",
            TransactionStatus::Cancelled => "cancelled",
            TransactionStatus::Refunded => "refunded",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(TransactionStatus::Pending),
            "processing" => Some(TransactionStatus::Processing),
            "completed" => Some(TransactionStatus::Completed),
            "failed" => Some(TransactionStatus::Failed),
            "cancelled" => Some(TransactionStatus::Cancelled),
            "refunded" => Some(TransactionStatus::Refunded),
            _ => None,
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl StateMachine for TransactionStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        self.valid_transitions().contains(target)
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use TransactionStatus::*;
        match self {
            Pending => vec![Processing, Completed, Failed, Cancelled],
            Processing => vec![Completed, Failed],
            Completed => vec![Refunded],
            Failed | Cancelled | Refunded => vec![],
        }
    }
}

/// One money movement tied to a user and, eventually, a subscription.
///
/// `subscription_id` may be empty when the payment arrived before the
/// checkout that created the subscription; `external_subscription_id`
/// is what links the two later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentTransaction {
    pub id: TransactionId,
    pub user_id: UserId,
    pub subscription_id: Option<SubscriptionId>,
    pub external_subscription_id: Option<String>,
    pub external_invoice_id: Option<String>,
    pub external_payment_intent_id: Option<String>,
    pub amount: Money,
    pub transaction_type: TransactionType,
    pub status: TransactionStatus,
    pub description: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl PaymentTransaction {
    /// Corrects the status after creation.
    pub fn correct_status(
        &mut self,
        status: TransactionStatus,
        now: Timestamp,
    ) -> Result<(), ValidationError> {
        self.status = self.status.transition_to(status)?;
        self.updated_at = now;
        Ok(())
    }
}
