//! Subscription status state machine.

use crate::domain::foundation::StateMachine;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a lease subscription.
///
/// Webhooks drive `active` and `cancelled`. `paused`, `completed` and
/// `expired` are administrative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Pending,
    Active,
    Paused,
    Completed,
    Cancelled,
    Expired,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Pending => "pending",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Paused => "paused",
            SubscriptionStatus::Completed => "completed",
            SubscriptionStatus::Cancelled => "cancelled",
            SubscriptionStatus::Expired => "expired",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(SubscriptionStatus::Pending),
            "active" => Some(SubscriptionStatus::Active),
            "paused" => Some(SubscriptionStatus::Paused),
            "completed" => Some(SubscriptionStatus::Completed),
            // the processor spells it with one "l"
            "cancelled" | "canceled" => Some(SubscriptionStatus::Cancelled),
            "expired" => Some(SubscriptionStatus::Expired),
            _ => None,
        }
    }

    /// True while the scooter is (or is about to be) in the student's hands.
    pub fn is_live(&self) -> bool {
        matches!(
            self,
            SubscriptionStatus::Pending | SubscriptionStatus::Active | SubscriptionStatus::Paused
        )
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl StateMachine for SubscriptionStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use SubscriptionStatus::*;
        matches!(
            (self, target),
            (Pending, Active)
                | (Pending, Cancelled)
                | (Active, Paused)
                | (Active, Completed)
                | (Active, Cancelled)
                | (Active, Expired)
                | (Paused, Active)
                | (Paused, Cancelled)
                | (Paused, Expired)
                | (Completed, Expired)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use SubscriptionStatus::*;
        match self {
            Pending => vec![Active, Cancelled],
            Active => vec![Paused, Completed, Cancelled, Expired],
            Paused => vec![Active, Cancelled, Expired],
            Completed => vec![Expired],
            Cancelled | Expired => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [SubscriptionStatus; 6] = [
        SubscriptionStatus::Pending,
        SubscriptionStatus::Active,
        SubscriptionStatus::Paused,
        SubscriptionStatus::Completed,
        SubscriptionStatus::Cancelled,
        SubscriptionStatus::Expired,
    ];

    #[test]
    fn live_states_can_be_cancelled() {
        for status in [SubscriptionStatus::Pending, SubscriptionStatus::Active, SubscriptionStatus::Paused] {
            assert!(status.is_live());
            assert_eq!(
                status.transition_to(SubscriptionStatus::Cancelled),
                Ok(SubscriptionStatus::Cancelled)
            );
        }
    }

    #[test]
    fn cancelled_is_terminal() {
        assert!(SubscriptionStatus::Cancelled.is_terminal());
        assert!(SubscriptionStatus::Cancelled
            .transition_to(SubscriptionStatus::Active)
            .is_err());
    }

    #[test]
    fn completed_cannot_be_cancelled() {
        assert!(!SubscriptionStatus::Completed.can_transition_to(&SubscriptionStatus::Cancelled));
    }

    #[test]
    fn can_transition_to_is_consistent_with_valid_transitions() {
        for from in ALL {
            for to in ALL {
                assert_eq!(
                    from.can_transition_to(&to),
                    from.valid_transitions().contains(&to),
                    "{:?} -> {:?}",
                    from,
                    to
                );
            }
        }
    }

    #[test]
    fn parses_both_spellings_of_cancelled() {
        assert_eq!(SubscriptionStatus::parse("canceled"), Some(SubscriptionStatus::Cancelled));
        assert_eq!(SubscriptionStatus::parse("cancelled"), Some(SubscriptionStatus::Cancelled));
        for status in ALL {
            assert_eq!(SubscriptionStatus::parse(status.as_str()), Some(status));
        }
    }
}
