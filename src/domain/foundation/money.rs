//! Money value object.
//!
//! Amounts are whole cents in USD, matching the processor's smallest
//! currency unit, so totals never accumulate floating-point error.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::Add;

/// An amount of US dollars held as integer cents.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    /// Creates an amount from cents.
    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Returns the amount in cents.
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Formats the amount as a plain decimal, e.g. `57.50`.
    pub fn to_decimal_string(&self) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        format!("{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 < 0 {
            write!(f, "-${}", Money(-self.0).to_decimal_string())
        } else {
            write!(f, "${}", self.to_decimal_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn money_formats_with_two_decimals() {
        assert_eq!(Money::from_cents(3750).to_string(), "$37.50");
        assert_eq!(Money::from_cents(999).to_string(), "$9.99");
        assert_eq!(Money::from_cents(5).to_decimal_string(), "0.05");
    }

    #[test]
    fn money_formats_negative_amounts() {
        assert_eq!(Money::from_cents(-2000).to_string(), "-$20.00");
        assert_eq!(Money::from_cents(-2000).to_decimal_string(), "-20.00");
    }

    #[test]
    fn money_sums_exactly() {
        let total: Money = [5250, 999].into_iter().map(Money::from_cents).sum();
        assert_eq!(total, Money::from_cents(6249));
        assert_eq!(total.to_decimal_string(), "62.49");
    }

    #[test]
    fn money_serializes_as_cents() {
        let json = serde_json::to_string(&Money::from_cents(2000)).unwrap();
        assert_eq!(json, "2000");
    }
}
