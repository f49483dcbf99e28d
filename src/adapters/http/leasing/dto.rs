//! HTTP DTOs (Data Transfer Objects) for leasing endpoints.
//!
//! These types define the JSON request/response structure for the leasing API.
//! Money crosses the boundary as integer cents.

use serde::{Deserialize, Serialize};

use crate::application::{CatalogView, StartCheckoutResult};
use crate::domain::foundation::ScooterId;
use crate::domain::leasing::{
    DeliverySchedule, LeaseError, LeaseRequest, LockTier, PaymentTransaction, Plan, PlanId,
    Semester, Subscription, SubscriptionStatus, TransactionStatus, TransactionType,
};

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Request to start checkout for a lease.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutRequest {
    #[serde(alias = "plan")]
    pub plan_id: String,
    /// `Fall Semester`, `Spring Semester` or `Whole Year`.
    pub semester: String,
    pub delivery_address: String,
    pub contact_number: String,
    /// `YYYY-MM-DD`, or `asap`/`today` where same-day delivery is offered.
    pub delivery_date: String,
    pub delivery_time: String,
    #[serde(default)]
    pub include_insurance: bool,
    #[serde(default, alias = "lock_tier")]
    pub lock_type: Option<String>,
    #[serde(default)]
    pub scooter_id: Option<String>,
    /// Used for the billing customer when the profile has no email.
    #[serde(default)]
    pub email: Option<String>,
}

impl CheckoutRequest {
    /// Parses the wire fields into a lease request.
    pub fn into_lease_request(self) -> Result<LeaseRequest, LeaseError> {
        let semester = Semester::parse(&self.semester).ok_or_else(|| {
            LeaseError::validation("semester", format!("unknown semester '{}'", self.semester))
        })?;

        let delivery_schedule = DeliverySchedule::parse(&self.delivery_date)?;

        let lock_tier = match self.lock_type.as_deref() {
            Some(raw) => LockTier::parse(raw).ok_or_else(|| {
                LeaseError::validation("lock_type", format!("unknown lock type '{}'", raw))
            })?,
            None => LockTier::None,
        };

        let scooter_id = self
            .scooter_id
            .as_deref()
            .filter(|raw| !raw.trim().is_empty())
            .map(|raw| raw.trim().parse::<ScooterId>())
            .transpose()
            .map_err(|_| LeaseError::validation("scooter_id", "must be a UUID"))?;

        Ok(LeaseRequest {
            plan_id: self.plan_id,
            semester,
            delivery_address: self.delivery_address,
            contact_number: self.contact_number,
            delivery_schedule,
            delivery_time: self.delivery_time,
            include_insurance: self.include_insurance,
            lock_tier,
            scooter_id,
        })
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Response for a started checkout.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutResponse {
    pub session_id: String,
    /// Hosted checkout page to redirect to.
    pub url: String,
    pub monthly_total_cents: i64,
    pub due_today_cents: i64,
}

impl From<StartCheckoutResult> for CheckoutResponse {
    fn from(result: StartCheckoutResult) -> Self {
        Self {
            session_id: result.session_id,
            url: result.url,
            monthly_total_cents: result.breakdown.monthly_total.cents(),
            due_today_cents: result.breakdown.due_today.cents(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanResponse {
    pub id: PlanId,
    pub name: String,
    pub scooter_model: String,
    pub monthly_price_cents: i64,
    pub range_miles: u32,
    pub top_speed_mph: u32,
}

impl From<Plan> for PlanResponse {
    fn from(plan: Plan) -> Self {
        Self {
            id: plan.id,
            name: plan.name.to_string(),
            scooter_model: plan.scooter_model.to_string(),
            monthly_price_cents: plan.monthly_price.cents(),
            range_miles: plan.range_miles,
            top_speed_mph: plan.top_speed_mph,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LockOptionResponse {
    pub tier: LockTier,
    pub price_cents: i64,
}

/// Storefront catalog.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogResponse {
    pub plans: Vec<PlanResponse>,
    pub insurance_monthly_cents: i64,
    pub locks: Vec<LockOptionResponse>,
    pub security_deposit_cents: i64,
}

impl From<CatalogView> for CatalogResponse {
    fn from(view: CatalogView) -> Self {
        Self {
            plans: view.plans.into_iter().map(PlanResponse::from).collect(),
            insurance_monthly_cents: view.insurance_monthly.cents(),
            locks: view
                .locks
                .into_iter()
                .map(|(tier, price)| LockOptionResponse {
                    tier,
                    price_cents: price.cents(),
                })
                .collect(),
            security_deposit_cents: view.security_deposit.cents(),
        }
    }
}

/// A lease as shown on the dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionResponse {
    pub id: String,
    pub plan_id: PlanId,
    pub scooter_id: Option<String>,
    pub status: SubscriptionStatus,
    pub semester: Semester,
    pub monthly_price_cents: i64,
    pub security_deposit_cents: i64,
    pub include_insurance: bool,
    pub lock_type: LockTier,
    pub delivery_address: Option<String>,
    pub contact_number: Option<String>,
    /// `YYYY-MM-DD`.
    pub delivery_date: Option<String>,
    pub delivery_time: Option<String>,
    pub lease_start_date: String,
    pub lease_end_date: String,
    /// ISO 8601.
    pub created_at: String,
    pub cancelled_at: Option<String>,
}

impl From<Subscription> for SubscriptionResponse {
    fn from(sub: Subscription) -> Self {
        Self {
            id: sub.id.to_string(),
            plan_id: sub.plan_id,
            scooter_id: sub.scooter_id.map(|id| id.to_string()),
            status: sub.status,
            semester: sub.semester,
            monthly_price_cents: sub.monthly_price.cents(),
            security_deposit_cents: sub.security_deposit.cents(),
            include_insurance: sub.include_insurance,
            lock_type: sub.lock_tier,
            delivery_address: sub.delivery_address,
            contact_number: sub.contact_number,
            delivery_date: sub.delivery_date.map(|d| d.format("%Y-%m-%d").to_string()),
            delivery_time: sub.delivery_time,
            lease_start_date: sub.lease_start_date.format("%Y-%m-%d").to_string(),
            lease_end_date: sub.lease_end_date.format("%Y-%m-%d").to_string(),
            created_at: sub.created_at.as_datetime().to_rfc3339(),
            cancelled_at: sub.cancelled_at.map(|t| t.as_datetime().to_rfc3339()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TransactionResponse {
    pub id: String,
    pub subscription_id: Option<String>,
    pub amount_cents: i64,
    pub transaction_type: TransactionType,
    pub status: TransactionStatus,
    pub description: String,
    pub created_at: String,
}

impl From<PaymentTransaction> for TransactionResponse {
    fn from(tx: PaymentTransaction) -> Self {
        Self {
            id: tx.id.to_string(),
            subscription_id: tx.subscription_id.map(|id| id.to_string()),
            amount_cents: tx.amount.cents(),
            transaction_type: tx.transaction_type,
            status: tx.status,
            description: tx.description,
            created_at: tx.created_at.as_datetime().to_rfc3339(),
        }
    }
}

/// Acknowledgement returned to the processor.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookAck {
    pub received: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Error body for every failed request.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Stable code for programmatic handling.
    pub code: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::Timestamp;
    use crate::domain::leasing::{test_catalog, test_subscription};
    use crate::application::ListPlansHandler;
    use std::sync::Arc;

    fn checkout_json(extra: &str) -> String {
        format!(
            r#"{{
                "plan_id": "premium",
                "semester": "Spring Semester",
                "delivery_address": "4 Quad Rd",
                "contact_number": "555-0199",
                "delivery_date": "2030-01-20",
                "delivery_time": "afternoon"{}
            }}"#,
            extra
        )
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Request DTO Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn checkout_request_defaults_add_ons() {
        let request: CheckoutRequest = serde_json::from_str(&checkout_json("")).unwrap();
        let lease = request.into_lease_request().unwrap();

        assert_eq!(lease.plan_id, "premium");
        assert_eq!(lease.semester, Semester::Spring);
        assert!(!lease.include_insurance);
        assert_eq!(lease.lock_tier, LockTier::None);
        assert!(lease.scooter_id.is_none());
    }

    #[test]
    fn checkout_request_parses_add_ons_and_scooter() {
        let scooter = ScooterId::new();
        let extra = format!(
            r#", "include_insurance": true, "lock_type": "ulock", "scooter_id": "{}""#,
            scooter
        );
        let request: CheckoutRequest = serde_json::from_str(&checkout_json(&extra)).unwrap();
        let lease = request.into_lease_request().unwrap();

        assert!(lease.include_insurance);
        assert_eq!(lease.lock_tier, LockTier::ULock);
        assert_eq!(lease.scooter_id, Some(scooter));
    }

    #[test]
    fn unknown_semester_is_a_validation_error() {
        let mut request: CheckoutRequest = serde_json::from_str(&checkout_json("")).unwrap();
        request.semester = "Summer".to_string();

        let err = request.into_lease_request().unwrap_err();
        assert!(matches!(err, LeaseError::Validation { ref field, .. } if field == "semester"));
    }

    #[test]
    fn malformed_scooter_id_is_a_validation_error() {
        let request: CheckoutRequest =
            serde_json::from_str(&checkout_json(r#", "scooter_id": "not-a-uuid""#)).unwrap();

        let err = request.into_lease_request().unwrap_err();
        assert!(matches!(err, LeaseError::Validation { ref field, .. } if field == "scooter_id"));
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Response DTO Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn subscription_response_uses_wire_names() {
        let mut sub = test_subscription("user-1", "sub_1");
        sub.status = SubscriptionStatus::Cancelled;
        sub.cancelled_at = Some(Timestamp::now());

        let json = serde_json::to_value(SubscriptionResponse::from(sub)).unwrap();

        assert_eq!(json["status"], "cancelled");
        assert_eq!(json["semester"], "Fall Semester");
        assert_eq!(json["plan_id"], "basic");
        assert_eq!(json["lock_type"], "cable");
        assert_eq!(json["monthly_price_cents"], 3750);
        assert!(json["cancelled_at"].is_string());
    }

    #[test]
    fn catalog_response_carries_cents() {
        let view = ListPlansHandler::new(Arc::new(test_catalog())).handle();

        let json = serde_json::to_value(CatalogResponse::from(view)).unwrap();

        assert_eq!(json["plans"][1]["id"], "premium");
        assert_eq!(json["plans"][1]["monthly_price_cents"], 5250);
        assert_eq!(json["insurance_monthly_cents"], 999);
        assert_eq!(json["locks"][0]["tier"], "cable");
        assert_eq!(json["security_deposit_cents"], 10_000);
    }

    #[test]
    fn error_response_serializes_code_and_message() {
        let json = serde_json::to_value(ErrorResponse::new("INVALID_PLAN", "Unknown plan: gold"))
            .unwrap();
        assert_eq!(json, serde_json::json!({"code": "INVALID_PLAN", "message": "Unknown plan: gold"}));
    }
}
