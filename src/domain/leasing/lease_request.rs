//! Lease request and its checkout metadata encoding.
//!
//! A lease request is transient: it is validated at checkout, flattened
//! into the processor session's metadata, and read back from the
//! checkout-completed event to materialize the subscription.

use chrono::{Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::domain::foundation::{ScooterId, UserId, ValidationError};

use super::{LockTier, PlanId, WebhookError};

/// Longest value the processor accepts for one metadata entry.
pub const MAX_METADATA_VALUE_CHARS: usize = 500;

/// Metadata keys carried on the checkout session.
pub mod metadata_keys {
    pub const USER_ID: &str = "user_id";
    pub const PLAN_TYPE: &str = "plan_type";
    pub const SEMESTER: &str = "semester";
    pub const DELIVERY_ADDRESS: &str = "delivery_address";
    pub const CONTACT_NUMBER: &str = "contact_number";
    pub const DELIVERY_DATE: &str = "delivery_date";
    pub const DELIVERY_TIME: &str = "delivery_time";
    pub const INCLUDE_INSURANCE: &str = "include_insurance";
    pub const LOCK_TYPE: &str = "lock_type";
    pub const SCOOTER_ID: &str = "scooter_id";
}

/// Academic term a lease covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Semester {
    #[serde(rename = "Fall Semester")]
    Fall,
    #[serde(rename = "Spring Semester")]
    Spring,
    #[serde(rename = "Whole Year")]
    WholeYear,
}

impl Semester {
    pub fn as_str(&self) -> &'static str {
        match self {
            Semester::Fall => "Fall Semester",
            Semester::Spring => "Spring Semester",
            Semester::WholeYear => "Whole Year",
        }
    }

    /// Accepts the display names as well as the short forms.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "fall semester" | "fall" => Some(Semester::Fall),
            "spring semester" | "spring" => Some(Semester::Spring),
            "whole year" | "wholeyear" | "whole_year" => Some(Semester::WholeYear),
            _ => None,
        }
    }

    /// Length of the lease in calendar months.
    pub fn term_months(&self) -> u32 {
        match self {
            Semester::Fall | Semester::Spring => 4,
            Semester::WholeYear => 8,
        }
    }
}

impl fmt::Display for Semester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// When the student wants the scooter dropped off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliverySchedule {
    Asap,
    Today,
    On(NaiveDate),
}

impl DeliverySchedule {
    /// Parses `asap`, `today` or an ISO date (`YYYY-MM-DD`).
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        let value = value.trim();
        match value.to_ascii_lowercase().as_str() {
            "" => Err(ValidationError::empty_field("delivery_date")),
            "asap" => Ok(DeliverySchedule::Asap),
            "today" => Ok(DeliverySchedule::Today),
            _ => NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .map(DeliverySchedule::On)
                .map_err(|_| ValidationError::invalid_format("delivery_date", "expected YYYY-MM-DD")),
        }
    }

    /// Concrete delivery day, using `today` for the same-day options.
    pub fn resolve(&self, today: NaiveDate) -> NaiveDate {
        match self {
            DeliverySchedule::Asap | DeliverySchedule::Today => today,
            DeliverySchedule::On(date) => *date,
        }
    }
}

impl fmt::Display for DeliverySchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliverySchedule::Asap => f.write_str("asap"),
            DeliverySchedule::Today => f.write_str("today"),
            DeliverySchedule::On(date) => write!(f, "{}", date.format("%Y-%m-%d")),
        }
    }
}

/// Minimum notice required before a delivery.
///
/// A lead time of zero is the same-day surface: `asap` and `today` are
/// accepted and dated deliveries only need to be in the future.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryPolicy {
    pub min_lead_days: u32,
}

impl DeliveryPolicy {
    pub fn new(min_lead_days: u32) -> Self {
        Self { min_lead_days }
    }

    pub fn allows_same_day(&self) -> bool {
        self.min_lead_days == 0
    }

    /// Earliest date a dated delivery may be booked for.
    pub fn earliest_date(&self, today: NaiveDate) -> NaiveDate {
        today
            .checked_add_days(Days::new(u64::from(self.min_lead_days)))
            .unwrap_or(NaiveDate::MAX)
    }

    pub fn check(&self, schedule: DeliverySchedule, today: NaiveDate) -> Result<(), ValidationError> {
        match schedule {
            DeliverySchedule::Asap | DeliverySchedule::Today if self.allows_same_day() => Ok(()),
            DeliverySchedule::Asap | DeliverySchedule::Today => Err(ValidationError::invalid_format(
                "delivery_date",
                format!("deliveries need at least {} days notice", self.min_lead_days),
            )),
            DeliverySchedule::On(date) => {
                let earliest = self.earliest_date(today);
                if date < earliest {
                    Err(ValidationError::invalid_format(
                        "delivery_date",
                        format!("earliest available delivery date is {}", earliest),
                    ))
                } else {
                    Ok(())
                }
            }
        }
    }
}

/// A student's lease selection, as submitted at checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaseRequest {
    /// Raw plan identifier; resolved against the catalog at checkout.
    pub plan_id: String,
    pub semester: Semester,
    pub delivery_address: String,
    pub contact_number: String,
    pub delivery_schedule: DeliverySchedule,
    pub delivery_time: String,
    pub include_insurance: bool,
    pub lock_tier: LockTier,
    pub scooter_id: Option<ScooterId>,
}

impl LeaseRequest {
    /// Validates the delivery details against the policy.
    ///
    /// The plan id is not checked here; the catalog owns that.
    pub fn validate(&self, policy: &DeliveryPolicy, today: NaiveDate) -> Result<(), ValidationError> {
        check_metadata_text("delivery_address", &self.delivery_address)?;
        check_metadata_text("contact_number", &self.contact_number)?;
        check_metadata_text("delivery_time", &self.delivery_time)?;
        policy.check(self.delivery_schedule, today)
    }

    /// Flattens the request into checkout metadata for the given owner.
    pub fn to_metadata(&self, user_id: &UserId, plan_id: PlanId) -> BTreeMap<String, String> {
        use metadata_keys::*;

        let mut metadata = BTreeMap::new();
        metadata.insert(USER_ID.to_string(), user_id.to_string());
        metadata.insert(PLAN_TYPE.to_string(), plan_id.to_string());
        metadata.insert(SEMESTER.to_string(), self.semester.to_string());
        metadata.insert(DELIVERY_ADDRESS.to_string(), self.delivery_address.trim().to_string());
        metadata.insert(CONTACT_NUMBER.to_string(), self.contact_number.trim().to_string());
        metadata.insert(DELIVERY_DATE.to_string(), self.delivery_schedule.to_string());
        metadata.insert(DELIVERY_TIME.to_string(), self.delivery_time.trim().to_string());
        metadata.insert(INCLUDE_INSURANCE.to_string(), self.include_insurance.to_string());
        metadata.insert(LOCK_TYPE.to_string(), self.lock_tier.as_str().to_string());
        if let Some(scooter_id) = self.scooter_id {
            metadata.insert(SCOOTER_ID.to_string(), scooter_id.to_string());
        }
        metadata
    }
}

/// Free text travels as checkout metadata, so it must fit in one value.
fn check_metadata_text(field: &str, value: &str) -> Result<(), ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::empty_field(field));
    }
    let chars = trimmed.chars().count();
    if chars > MAX_METADATA_VALUE_CHARS {
        return Err(ValidationError::out_of_range(
            field,
            1,
            MAX_METADATA_VALUE_CHARS as i64,
            chars as i64,
        ));
    }
    Ok(())
}

/// Lease details recovered from a completed checkout's metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaseMetadata {
    pub user_id: UserId,
    pub plan_id: PlanId,
    pub semester: Semester,
    pub delivery_address: Option<String>,
    pub contact_number: Option<String>,
    pub delivery_schedule: Option<DeliverySchedule>,
    pub delivery_time: Option<String>,
    pub include_insurance: bool,
    pub lock_tier: LockTier,
    pub scooter_id: Option<ScooterId>,
}

impl LeaseMetadata {
    /// Parses checkout metadata written by [`LeaseRequest::to_metadata`].
    ///
    /// Owner, plan and semester are required. Delivery fields are kept
    /// when present so a partially filled session still materializes.
    pub fn parse(metadata: &HashMap<String, String>) -> Result<Self, WebhookError> {
        use metadata_keys::*;

        let get = |key: &str| {
            metadata
                .get(key)
                .map(|value| value.trim())
                .filter(|value| !value.is_empty())
        };

        let user_id = get(USER_ID)
            .ok_or(WebhookError::MissingMetadata(USER_ID))
            .and_then(|raw| UserId::new(raw).map_err(|e| WebhookError::invalid_metadata(USER_ID, e.to_string())))?;

        let plan_id = get(PLAN_TYPE)
            .ok_or(WebhookError::MissingMetadata(PLAN_TYPE))?
            .parse::<PlanId>()
            .map_err(|e| WebhookError::invalid_metadata(PLAN_TYPE, e.to_string()))?;

        let semester_raw = get(SEMESTER).ok_or(WebhookError::MissingMetadata(SEMESTER))?;
        let semester = Semester::parse(semester_raw)
            .ok_or_else(|| WebhookError::invalid_metadata(SEMESTER, semester_raw))?;

        let delivery_schedule = get(DELIVERY_DATE)
            .map(DeliverySchedule::parse)
            .transpose()
            .map_err(|e| WebhookError::invalid_metadata(DELIVERY_DATE, e.to_string()))?;

        let lock_tier = match get(LOCK_TYPE) {
            Some(raw) => LockTier::parse(raw)
                .ok_or_else(|| WebhookError::invalid_metadata(LOCK_TYPE, raw))?,
            None => LockTier::None,
        };

        let scooter_id = get(SCOOTER_ID)
            .map(|raw| raw.parse::<ScooterId>())
            .transpose()
            .map_err(|e| WebhookError::invalid_metadata(SCOOTER_ID, e.to_string()))?;

        Ok(Self {
            user_id,
            plan_id,
            semester,
            delivery_address: get(DELIVERY_ADDRESS).map(str::to_string),
            contact_number: get(CONTACT_NUMBER).map(str::to_string),
            delivery_schedule,
            delivery_time: get(DELIVERY_TIME).map(str::to_string),
            include_insurance: get(INCLUDE_INSURANCE).map_or(false, |v| v.eq_ignore_ascii_case("true")),
            lock_tier,
            scooter_id,
        })
    }

    /// Lease window: from delivery (or the confirmation day) for the
    /// semester's term.
    pub fn lease_window(&self, confirmed_on: NaiveDate) -> (NaiveDate, NaiveDate) {
        let start = self
            .delivery_schedule
            .map_or(confirmed_on, |schedule| schedule.resolve(confirmed_on));
        let end = start
            .checked_add_months(Months::new(self.semester.term_months()))
            .unwrap_or(NaiveDate::MAX);
        (start, end)
    }
}
