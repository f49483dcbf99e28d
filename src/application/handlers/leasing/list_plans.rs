//! ListPlansHandler - Query handler for the storefront catalog.

use std::sync::Arc;

use crate::domain::foundation::Money;
use crate::domain::leasing::{LockTier, Plan, PlanCatalog};

/// Catalog as shown on the storefront.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogView {
    pub plans: Vec<Plan>,
    pub insurance_monthly: Money,
    /// Purchasable lock tiers with their one-time price.
    pub locks: Vec<(LockTier, Money)>,
    pub security_deposit: Money,
}

pub struct ListPlansHandler {
    catalog: Arc<PlanCatalog>,
}

impl ListPlansHandler {
    pub fn new(catalog: Arc<PlanCatalog>) -> Self {
        Self { catalog }
    }

    pub fn handle(&self) -> CatalogView {
        CatalogView {
            plans: self.catalog.plans().to_vec(),
            insurance_monthly: self.catalog.insurance_monthly(),
            locks: [LockTier::Cable, LockTier::ULock]
                .into_iter()
                .map(|tier| (tier, self.catalog.lock_price(tier)))
                .collect(),
            security_deposit: self.catalog.security_deposit(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::leasing::{test_catalog, PlanId};

    #[test]
    fn lists_plans_in_display_order_with_add_ons() {
        let view = ListPlansHandler::new(Arc::new(test_catalog())).handle();

        let ids: Vec<_> = view.plans.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![PlanId::Basic, PlanId::Premium]);
        assert_eq!(view.plans[0].monthly_price, Money::from_cents(3750));
        assert_eq!(view.insurance_monthly, Money::from_cents(999));
        assert_eq!(
            view.locks,
            vec![
                (LockTier::Cable, Money::from_cents(2000)),
                (LockTier::ULock, Money::from_cents(3000)),
            ]
        );
    }
}
