//! Plan catalog.
//!
//! Static pricing for lease plans and add-ons. The catalog is built once
//! at startup from configured processor price references and injected
//! wherever prices are needed.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::Money;

use super::LeaseError;

const BASIC_MONTHLY: Money = Money::from_cents(3750);
const PREMIUM_MONTHLY: Money = Money::from_cents(5250);
const INSURANCE_MONTHLY: Money = Money::from_cents(999);
const CABLE_LOCK_ONE_TIME: Money = Money::from_cents(2000);
const ULOCK_ONE_TIME: Money = Money::from_cents(3000);

/// Lease plan identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanId {
    Basic,
    Premium,
}

impl PlanId {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanId::Basic => "basic",
            PlanId::Premium => "premium",
        }
    }
}

impl fmt::Display for PlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlanId {
    type Err = LeaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basic" => Ok(PlanId::Basic),
            "premium" => Ok(PlanId::Premium),
            _ => Err(LeaseError::invalid_plan(s)),
        }
    }
}

/// Anti-theft lock bundled with a lease.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LockTier {
    #[default]
    None,
    Cable,
    #[serde(rename = "ulock")]
    ULock,
}

impl LockTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            LockTier::None => "none",
            LockTier::Cable => "cable",
            LockTier::ULock => "ulock",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "none" | "" => Some(LockTier::None),
            "cable" => Some(LockTier::Cable),
            "ulock" | "u-lock" => Some(LockTier::ULock),
            _ => None,
        }
    }
}

/// A lease plan as offered on the storefront.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Plan {
    pub id: PlanId,
    pub name: &'static str,
    pub scooter_model: &'static str,
    pub monthly_price: Money,
    /// Processor price reference for the recurring charge.
    pub price_ref: String,
    pub range_miles: u32,
    pub top_speed_mph: u32,
}

/// How often a line item is charged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Billing {
    Monthly,
    OneTime,
}

/// What a line item pays for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "tier", rename_all = "snake_case")]
pub enum LineItemKind {
    BasePlan,
    Insurance,
    Lock(LockTier),
}

/// A single billable entry handed to the processor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineItem {
    pub kind: LineItemKind,
    pub description: String,
    pub price_ref: String,
    pub amount: Money,
    pub billing: Billing,
    pub quantity: u32,
}

/// Totals for a composed selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PriceBreakdown {
    pub monthly_total: Money,
    pub one_time_total: Money,
    pub due_today: Money,
}

impl PriceBreakdown {
    pub fn from_items(items: &[LineItem]) -> Self {
        let total_for = |billing: Billing| -> Money {
            items
                .iter()
                .filter(|item| item.billing == billing)
                .map(|item| Money::from_cents(item.amount.cents() * i64::from(item.quantity)))
                .sum()
        };
        let monthly_total = total_for(Billing::Monthly);
        let one_time_total = total_for(Billing::OneTime);
        Self {
            monthly_total,
            one_time_total,
            due_today: monthly_total + one_time_total,
        }
    }
}

/// Processor price references, one per billable product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogPrices {
    pub basic: String,
    pub premium: String,
    pub insurance: String,
    pub cable_lock: String,
    pub ulock: String,
}

/// Immutable plan and add-on price table.
#[derive(Debug, Clone)]
pub struct PlanCatalog {
    plans: Vec<Plan>,
    insurance_ref: String,
    cable_lock_ref: String,
    ulock_ref: String,
    security_deposit: Money,
}

impl PlanCatalog {
    pub fn new(prices: CatalogPrices, security_deposit: Money) -> Self {
        let plans = vec![
            Plan {
                id: PlanId::Basic,
                name: "Basic Plan",
                scooter_model: "Segway Ninebot E22",
                monthly_price: BASIC_MONTHLY,
                price_ref: prices.basic,
                range_miles: 11,
                top_speed_mph: 12,
            },
            Plan {
                id: PlanId::Premium,
                name: "Premium Plan",
                scooter_model: "Segway Ninebot ES2",
                monthly_price: PREMIUM_MONTHLY,
                price_ref: prices.premium,
                range_miles: 19,
                top_speed_mph: 15,
            },
        ];
        Self {
            plans,
            insurance_ref: prices.insurance,
            cable_lock_ref: prices.cable_lock,
            ulock_ref: prices.ulock,
            security_deposit,
        }
    }

    /// All plans in display order.
    pub fn plans(&self) -> &[Plan] {
        &self.plans
    }

    /// Refundable deposit recorded on every new lease.
    pub fn security_deposit(&self) -> Money {
        self.security_deposit
    }

    pub fn insurance_monthly(&self) -> Money {
        INSURANCE_MONTHLY
    }

    pub fn lock_price(&self, tier: LockTier) -> Money {
        match tier {
            LockTier::None => Money::ZERO,
            LockTier::Cable => CABLE_LOCK_ONE_TIME,
            LockTier::ULock => ULOCK_ONE_TIME,
        }
    }

    /// Looks up a plan by its wire identifier.
    ///
    /// # Errors
    ///
    /// `LeaseError::InvalidPlan` when the identifier is not in the catalog.
    pub fn resolve_plan(&self, plan_id: &str) -> Result<&Plan, LeaseError> {
        let id: PlanId = plan_id.parse()?;
        self.plan(id)
            .ok_or_else(|| LeaseError::invalid_plan(plan_id))
    }

    pub fn plan(&self, id: PlanId) -> Option<&Plan> {
        self.plans.iter().find(|plan| plan.id == id)
    }

    /// Builds the ordered line items for a selection.
    ///
    /// Order is always base plan, then insurance when selected, then the
    /// lock when a tier other than `none` is chosen.
    pub fn compose_line_items(
        &self,
        plan: &Plan,
        insurance_selected: bool,
        lock_tier: LockTier,
    ) -> Vec<LineItem> {
        let mut items = Vec::with_capacity(3);

        items.push(LineItem {
            kind: LineItemKind::BasePlan,
            description: format!("{} ({})", plan.name, plan.scooter_model),
            price_ref: plan.price_ref.clone(),
            amount: plan.monthly_price,
            billing: Billing::Monthly,
            quantity: 1,
        });

        if insurance_selected {
            items.push(LineItem {
                kind: LineItemKind::Insurance,
                description: "Theft and damage insurance".to_string(),
                price_ref: self.insurance_ref.clone(),
                amount: INSURANCE_MONTHLY,
                billing: Billing::Monthly,
                quantity: 1,
            });
        }

        let lock_ref = match lock_tier {
            LockTier::None => None,
            LockTier::Cable => Some(("Cable lock", &self.cable_lock_ref)),
            LockTier::ULock => Some(("U-lock", &self.ulock_ref)),
        };
        if let Some((description, price_ref)) = lock_ref {
            items.push(LineItem {
                kind: LineItemKind::Lock(lock_tier),
                description: description.to_string(),
                price_ref: price_ref.clone(),
                amount: self.lock_price(lock_tier),
                billing: Billing::OneTime,
                quantity: 1,
            });
        }

        items
    }

    /// Recurring amount for a plan with or without insurance.
    pub fn monthly_price(&self, plan: &Plan, insurance_selected: bool) -> Money {
        if insurance_selected {
            plan.monthly_price + INSURANCE_MONTHLY
        } else {
            plan.monthly_price
        }
    }
}

#[cfg(test)]
pub(crate) fn test_catalog() -> PlanCatalog {
    PlanCatalog::new(
        CatalogPrices {
            basic: "price_basic".to_string(),
            premium: "price_premium".to_string(),
            insurance: "price_insurance".to_string(),
            cable_lock: "price_cable".to_string(),
            ulock: "price_ulock".to_string(),
        },
        Money::from_cents(10_000),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    // ════════════════════════════════════════════════════════════════════════════
    // resolve_plan
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn resolves_known_plans() {
        let catalog = test_catalog();
        let basic = catalog.resolve_plan("basic").unwrap();
        assert_eq!(basic.id, PlanId::Basic);
        assert_eq!(basic.monthly_price, Money::from_cents(3750));
        assert_eq!(basic.price_ref, "price_basic");

        let premium = catalog.resolve_plan("Premium").unwrap();
        assert_eq!(premium.monthly_price, Money::from_cents(5250));
        assert_eq!(premium.range_miles, 19);
    }

    #[test]
    fn rejects_unknown_plan() {
        let catalog = test_catalog();
        let err = catalog.resolve_plan("deluxe").unwrap_err();
        assert!(matches!(err, LeaseError::InvalidPlan(ref id) if id == "deluxe"));
    }

    // ════════════════════════════════════════════════════════════════════════════
    // compose_line_items
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn basic_with_cable_lock_and_no_insurance() {
        let catalog = test_catalog();
        let plan = catalog.resolve_plan("basic").unwrap();
        let items = catalog.compose_line_items(plan, false, LockTier::Cable);

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].kind, LineItemKind::BasePlan);
        assert_eq!(items[0].amount, Money::from_cents(3750));
        assert_eq!(items[0].billing, Billing::Monthly);
        assert_eq!(items[1].kind, LineItemKind::Lock(LockTier::Cable));
        assert_eq!(items[1].amount, Money::from_cents(2000));
        assert_eq!(items[1].billing, Billing::OneTime);

        let totals = PriceBreakdown::from_items(&items);
        assert_eq!(totals.monthly_total.to_decimal_string(), "37.50");
        assert_eq!(totals.due_today.to_decimal_string(), "57.50");
    }

    #[test]
    fn premium_with_insurance_and_no_lock() {
        let catalog = test_catalog();
        let plan = catalog.resolve_plan("premium").unwrap();
        let items = catalog.compose_line_items(plan, true, LockTier::None);

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].kind, LineItemKind::BasePlan);
        assert_eq!(items[1].kind, LineItemKind::Insurance);
        assert_eq!(items[1].price_ref, "price_insurance");

        let totals = PriceBreakdown::from_items(&items);
        assert_eq!(totals.monthly_total.to_decimal_string(), "62.49");
        assert_eq!(totals.one_time_total, Money::ZERO);
        assert_eq!(totals.due_today.to_decimal_string(), "62.49");
    }

    #[test]
    fn ulock_uses_its_own_price_reference() {
        let catalog = test_catalog();
        let plan = catalog.resolve_plan("basic").unwrap();
        let items = catalog.compose_line_items(plan, true, LockTier::ULock);

        assert_eq!(items.len(), 3);
        assert_eq!(items[2].price_ref, "price_ulock");
        assert_eq!(PriceBreakdown::from_items(&items).due_today, Money::from_cents(3750 + 999 + 3000));
    }

    #[test]
    fn monthly_price_includes_insurance_only_when_selected() {
        let catalog = test_catalog();
        let plan = catalog.plan(PlanId::Premium).unwrap();
        assert_eq!(catalog.monthly_price(plan, false), Money::from_cents(5250));
        assert_eq!(catalog.monthly_price(plan, true), Money::from_cents(6249));
    }

    #[test]
    fn lock_tier_parses_wire_values() {
        assert_eq!(LockTier::parse("none"), Some(LockTier::None));
        assert_eq!(LockTier::parse("Cable"), Some(LockTier::Cable));
        assert_eq!(LockTier::parse("ulock"), Some(LockTier::ULock));
        assert_eq!(LockTier::parse("chain"), None);
    }

    #[test]
    fn plan_id_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&PlanId::Premium).unwrap(), "\"premium\"");
        assert_eq!(serde_json::to_string(&LockTier::ULock).unwrap(), "\"ulock\"");
    }

    fn lock_tier_strategy() -> impl Strategy<Value = LockTier> {
        prop_oneof![Just(LockTier::None), Just(LockTier::Cable), Just(LockTier::ULock)]
    }

    fn plan_id_strategy() -> impl Strategy<Value = PlanId> {
        prop_oneof![Just(PlanId::Basic), Just(PlanId::Premium)]
    }

    proptest! {
        #[test]
        fn line_items_follow_base_insurance_lock_order(
            plan_id in plan_id_strategy(),
            insurance in any::<bool>(),
            lock in lock_tier_strategy(),
        ) {
            let catalog = test_catalog();
            let plan = catalog.plan(plan_id).unwrap();
            let items = catalog.compose_line_items(plan, insurance, lock);

            let mut expected = vec![LineItemKind::BasePlan];
            if insurance {
                expected.push(LineItemKind::Insurance);
            }
            if lock != LockTier::None {
                expected.push(LineItemKind::Lock(lock));
            }

            let kinds: Vec<_> = items.iter().map(|item| item.kind).collect();
            prop_assert_eq!(kinds, expected);
            prop_assert_eq!(items, catalog.compose_line_items(plan, insurance, lock));
        }
    }
}
