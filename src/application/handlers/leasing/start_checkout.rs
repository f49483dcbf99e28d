//! StartCheckoutHandler - Command handler for opening a hosted checkout session.

use std::sync::Arc;

use crate::domain::foundation::{Timestamp, UserId};
use crate::domain::leasing::{
    CustomerProfile, DeliveryPolicy, LeaseError, LeaseRequest, Plan, PlanCatalog, PriceBreakdown,
};
use crate::ports::{
    CreateCheckoutRequest, CreateCustomerRequest, CustomerProfileRepository, PaymentProvider,
    ScooterInventory,
};

use super::processor_error;

/// Command to start checkout for a lease.
#[derive(Debug, Clone)]
pub struct StartCheckoutCommand {
    pub user_id: UserId,
    /// Email to use if the user has none on their profile.
    pub email: Option<String>,
    pub request: LeaseRequest,
}

/// Result of starting checkout.
#[derive(Debug, Clone)]
pub struct StartCheckoutResult {
    pub session_id: String,
    /// Hosted checkout page to redirect the user to.
    pub url: String,
    pub customer_id: String,
    pub breakdown: PriceBreakdown,
}

/// Redirect targets and delivery rules for checkout.
#[derive(Debug, Clone)]
pub struct CheckoutSettings {
    pub success_url: String,
    pub cancel_url: String,
    pub delivery_policy: DeliveryPolicy,
}

/// Handler for starting checkout.
///
/// Never writes subscriptions or transactions: a lease only exists once
/// the processor confirms the checkout through a webhook.
pub struct StartCheckoutHandler {
    payment_provider: Arc<dyn PaymentProvider>,
    profiles: Arc<dyn CustomerProfileRepository>,
    inventory: Arc<dyn ScooterInventory>,
    catalog: Arc<PlanCatalog>,
    settings: CheckoutSettings,
}

impl StartCheckoutHandler {
    pub fn new(
        payment_provider: Arc<dyn PaymentProvider>,
        profiles: Arc<dyn CustomerProfileRepository>,
        inventory: Arc<dyn ScooterInventory>,
        catalog: Arc<PlanCatalog>,
        settings: CheckoutSettings,
    ) -> Self {
        Self {
            payment_provider,
            profiles,
            inventory,
            catalog,
            settings,
        }
    }

    pub async fn handle(&self, cmd: StartCheckoutCommand) -> Result<StartCheckoutResult, LeaseError> {
        // 1. Validate input before any side effect
        let plan = self.catalog.resolve_plan(&cmd.request.plan_id)?;
        cmd.request
            .validate(&self.settings.delivery_policy, Timestamp::now().date())?;
        self.check_scooter(&cmd.request, plan).await?;

        // 2. Resolve or create the billing customer
        let customer_id = self
            .resolve_billing_customer(&cmd.user_id, cmd.email.as_deref())
            .await?;

        // 3. Compose line items and open the session
        let line_items = self.catalog.compose_line_items(
            plan,
            cmd.request.include_insurance,
            cmd.request.lock_tier,
        );
        let breakdown = PriceBreakdown::from_items(&line_items);

        let session = self
            .payment_provider
            .create_checkout_session(CreateCheckoutRequest {
                customer_id: customer_id.clone(),
                line_items,
                success_url: self.settings.success_url.clone(),
                cancel_url: self.settings.cancel_url.clone(),
                metadata: cmd.request.to_metadata(&cmd.user_id, plan.id),
            })
            .await
            .map_err(processor_error)?;

        tracing::info!(
            user_id = %cmd.user_id,
            plan = %plan.id,
            session_id = %session.id,
            due_today_cents = breakdown.due_today.cents(),
            "Checkout session created"
        );

        Ok(StartCheckoutResult {
            session_id: session.id,
            url: session.url,
            customer_id,
            breakdown,
        })
    }

    async fn check_scooter(&self, request: &LeaseRequest, plan: &Plan) -> Result<(), LeaseError> {
        let Some(scooter_id) = request.scooter_id else {
            return Ok(());
        };

        let scooter = self
            .inventory
            .find_scooter(&scooter_id)
            .await?
            .ok_or(LeaseError::ScooterNotFound(scooter_id))?;

        if !scooter.is_available {
            return Err(LeaseError::ScooterUnavailable(scooter_id));
        }
        if scooter.plan_id != plan.id {
            return Err(LeaseError::validation(
                "scooter_id",
                format!("scooter is offered on the {} plan", scooter.plan_id),
            ));
        }
        Ok(())
    }

    /// Reuses the profile's processor customer, creating one only if the
    /// profile has none. The stored reference wins over the one just
    /// created when another checkout attached first.
    async fn resolve_billing_customer(
        &self,
        user_id: &UserId,
        fallback_email: Option<&str>,
    ) -> Result<String, LeaseError> {
        let profile = self
            .profiles
            .find_by_user(user_id)
            .await?
            .unwrap_or_else(|| CustomerProfile::new(user_id.clone()));

        if let Some(existing) = profile.billing_customer_id {
            return Ok(existing);
        }

        let customer = self
            .payment_provider
            .create_customer(CreateCustomerRequest {
                user_id: user_id.clone(),
                email: profile.email.or_else(|| fallback_email.map(str::to_string)),
                name: profile.full_name,
                idempotency_key: Some(format!("customer-{}", user_id)),
            })
            .await
            .map_err(processor_error)?;

        let attached = self
            .profiles
            .attach_billing_customer(user_id, &customer.id)
            .await?;

        if attached != customer.id {
            tracing::warn!(
                user_id = %user_id,
                created = %customer.id,
                kept = %attached,
                "Concurrent checkout attached a billing customer first"
            );
        }
        Ok(attached)
    }
}
