//! Cancellation refund policy engine.
//!
//! A fixed tiered schedule mapping time-to-event to a refund percentage.
//! Pure: the caller supplies "now" (through the hours-until-start argument),
//! so estimates and realized refunds can legitimately differ when computed at
//! different instants.

use crate::types::Money;
use serde::{Deserialize, Serialize};

/// Outcome of applying the refund schedule to a booking amount.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundBreakdown {
    /// The amount the schedule was applied to
    pub original_amount: Money,
    /// Amount returned to the customer
    pub refund_amount: Money,
    /// Retained cancellation fee: `original_amount - refund_amount`
    pub cancellation_fee: Money,
    /// Refund percentage applied (75, 50, or 25)
    pub refund_percentage: u8,
    /// Human-readable description of the tier applied
    pub policy: String,
}

/// Applies the tiered cancellation schedule.
///
/// | hours until start | refund |
/// |---|---|
/// | more than 48 | 75% |
/// | 24 to 48 | 50% |
/// | less than 24 | 25% |
///
/// Boundaries are strict: exactly 48.0 hours falls in the 50% tier and
/// exactly 24.0 hours in the 25% tier.
#[must_use]
pub fn calculate_refund(original_amount: Money, hours_until_start: f64) -> RefundBreakdown {
    let (percentage, policy) = if hours_until_start > 48.0 {
        (75, "Cancelled more than 48 hours before booking - 75% refund")
    } else if hours_until_start > 24.0 {
        (50, "Cancelled 24-48 hours before booking - 50% refund")
    } else {
        (25, "Cancelled less than 24 hours before booking - 25% refund")
    };

    let refund_amount = original_amount.percent(percentage);
    RefundBreakdown {
        original_amount,
        refund_amount,
        cancellation_fee: original_amount - refund_amount,
        refund_percentage: percentage,
        policy: policy.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_percentages_match_the_schedule() {
        let b = calculate_refund(Money::from_dollars(100), 49.0);
        assert_eq!(b.refund_amount, Money::from_dollars(75));
        assert_eq!(b.cancellation_fee, Money::from_dollars(25));
        assert!(b.policy.contains("75%"));

        let b = calculate_refund(Money::from_dollars(100), 30.0);
        assert_eq!(b.refund_amount, Money::from_dollars(50));
        assert_eq!(b.cancellation_fee, Money::from_dollars(50));
        assert!(b.policy.contains("50%"));

        let b = calculate_refund(Money::from_dollars(100), 10.0);
        assert_eq!(b.refund_amount, Money::from_dollars(25));
        assert_eq!(b.cancellation_fee, Money::from_dollars(75));
        assert!(b.policy.contains("25%"));
    }

    #[test]
    fn boundaries_fall_into_the_lower_tier() {
        assert_eq!(
            calculate_refund(Money::from_dollars(100), 48.0).refund_percentage,
            50
        );
        assert_eq!(
            calculate_refund(Money::from_dollars(100), 24.0).refund_percentage,
            25
        );
    }

    #[test]
    fn fee_plus_refund_equals_original() {
        let original = Money::from_cents(99_99);
        for hours in [100.0, 36.0, 1.0, -5.0] {
            let b = calculate_refund(original, hours);
            assert_eq!(b.refund_amount + b.cancellation_fee, original);
        }
    }
}
