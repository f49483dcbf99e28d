//! Leasing configuration: storefront URLs, catalog prices and policy knobs.

use serde::Deserialize;

use super::error::ValidationError;
use crate::domain::foundation::Money;
use crate::domain::leasing::{CatalogPrices, DeliveryPolicy, PlanCatalog};

/// Leasing configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LeasingConfig {
    /// Public storefront URL used to build checkout redirect URLs
    pub app_url: String,

    /// Days between checkout and the earliest delivery date.
    /// Zero enables same-day and ASAP delivery.
    #[serde(default = "default_min_delivery_lead_days")]
    pub min_delivery_lead_days: u32,

    /// Refundable deposit recorded on every new lease, in cents
    #[serde(default = "default_security_deposit_cents")]
    pub security_deposit_cents: i64,

    /// Processor price ids
    pub basic_price_id: String,
    pub premium_price_id: String,
    pub insurance_price_id: String,
    pub cable_lock_price_id: String,
    pub ulock_price_id: String,
}

impl LeasingConfig {
    /// Where the processor sends the student after paying.
    pub fn success_url(&self) -> String {
        format!(
            "{}/checkout/success?session_id={{CHECKOUT_SESSION_ID}}",
            self.base_url()
        )
    }

    /// Where the processor sends the student after abandoning checkout.
    pub fn cancel_url(&self) -> String {
        format!("{}/scooters", self.base_url())
    }

    pub fn delivery_policy(&self) -> DeliveryPolicy {
        DeliveryPolicy::new(self.min_delivery_lead_days)
    }

    /// Build the plan catalog from the configured price ids.
    pub fn catalog(&self) -> PlanCatalog {
        PlanCatalog::new(
            CatalogPrices {
                basic: self.basic_price_id.clone(),
                premium: self.premium_price_id.clone(),
                insurance: self.insurance_price_id.clone(),
                cable_lock: self.cable_lock_price_id.clone(),
                ulock: self.ulock_price_id.clone(),
            },
            Money::from_cents(self.security_deposit_cents),
        )
    }

    fn base_url(&self) -> &str {
        self.app_url.trim_end_matches('/')
    }

    /// Validate leasing configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.app_url.is_empty() {
            return Err(ValidationError::MissingRequired("LEASING__APP_URL"));
        }
        if !self.app_url.starts_with("http://") && !self.app_url.starts_with("https://") {
            return Err(ValidationError::InvalidAppUrl(self.app_url.clone()));
        }
        if self.security_deposit_cents < 0 {
            return Err(ValidationError::NegativeDeposit);
        }

        let price_ids = [
            ("LEASING__BASIC_PRICE_ID", &self.basic_price_id),
            ("LEASING__PREMIUM_PRICE_ID", &self.premium_price_id),
            ("LEASING__INSURANCE_PRICE_ID", &self.insurance_price_id),
            ("LEASING__CABLE_LOCK_PRICE_ID", &self.cable_lock_price_id),
            ("LEASING__ULOCK_PRICE_ID", &self.ulock_price_id),
        ];
        for (name, value) in price_ids {
            if value.trim().is_empty() {
                return Err(ValidationError::MissingRequired(name));
            }
        }
        Ok(())
    }
}

fn default_min_delivery_lead_days() -> u32 {
    3
}

fn default_security_deposit_cents() -> i64 {
    10_000
}
