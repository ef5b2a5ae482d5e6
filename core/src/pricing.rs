//! Pricing engine.
//!
//! Pure, deterministic cost computation: room rate times billable hours plus
//! add-on line subtotals. No I/O; callers resolve the add-on catalog rows
//! before pricing.

use crate::error::{BookingError, Result};
use crate::schedule::Interval;
use crate::types::{Addon, BookingLine, Money, Room};
use serde::{Deserialize, Serialize};

/// How a booking's duration is converted to a billable room cost.
///
/// The deployment default bills whole hours rounded up with a one-hour
/// minimum. `Exact` bills fractional hours to the cent and exists as the
/// documented alternative policy; one rule must be applied consistently.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum HourRounding {
    /// Round up to the next whole hour, minimum one hour
    #[default]
    CeilToHour,
    /// Bill exact fractional hours, floored to the cent
    Exact,
}

/// Pricing policy knobs
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingPolicy {
    /// Duration-to-cost rounding rule
    pub rounding: HourRounding,
}

/// A priced booking: the room cost, the per-line subtotals, and their sum.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    /// `rate_per_hour * billable_hours`
    pub room_cost: Money,
    /// One line per requested add-on, quantity clamped to at least 1
    pub lines: Vec<BookingLine>,
    /// Room cost plus the sum of line subtotals
    pub total: Money,
}

/// Room cost for an interval under the given rounding rule.
#[must_use]
pub fn room_cost(room: &Room, interval: &Interval, policy: PricingPolicy) -> Money {
    let seconds = interval.duration().num_seconds();
    match policy.rounding {
        HourRounding::CeilToHour => {
            let hours = ((seconds + 3599) / 3600).max(1);
            Money::from_cents(room.rate_per_hour.cents() * hours)
        }
        HourRounding::Exact => {
            Money::from_cents(room.rate_per_hour.cents() * seconds / 3600)
        }
    }
}

/// Prices a booking from resolved add-on rows.
///
/// Each element of `lines` pairs a catalog add-on with the requested
/// quantity. Quantities below 1 are priced as 1.
///
/// # Errors
///
/// Returns [`BookingError::InvalidLineItem`] if an add-on belongs to a
/// different venue than the room.
pub fn price(
    room: &Room,
    interval: &Interval,
    lines: &[(Addon, u32)],
    policy: PricingPolicy,
) -> Result<Quote> {
    let room_cost = room_cost(room, interval, policy);

    let mut priced = Vec::with_capacity(lines.len());
    for (addon, quantity) in lines {
        if addon.venue_id != room.venue_id {
            return Err(BookingError::InvalidLineItem(format!(
                "addon {} belongs to a different venue than room {}",
                addon.id, room.id
            )));
        }
        let quantity = (*quantity).max(1);
        priced.push(BookingLine {
            addon_id: addon.id,
            quantity,
            subtotal: addon.price.multiply(quantity),
        });
    }

    let total = room_cost + priced.iter().map(|l| l.subtotal).sum();
    Ok(Quote { room_cost, lines: priced, total })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{AddonId, RoomId, VenueId};
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;

    fn room(rate_dollars: i64) -> Room {
        Room {
            id: RoomId::new(),
            venue_id: VenueId::new(),
            name: "Boardroom".to_string(),
            capacity: 12,
            rate_per_hour: Money::from_dollars(rate_dollars),
        }
    }

    fn addon(venue_id: VenueId, price_dollars: i64) -> Addon {
        Addon {
            id: AddonId::new(),
            venue_id,
            name: "Projector".to_string(),
            price: Money::from_dollars(price_dollars),
        }
    }

    fn hours(h: u32, len_minutes: i64) -> Interval {
        let start = Utc.with_ymd_and_hms(2025, 6, 1, h, 0, 0).unwrap();
        Interval::new(start, start + chrono::Duration::minutes(len_minutes)).unwrap()
    }

    #[test]
    fn two_hour_booking_costs_twice_the_rate() {
        let room = room(50);
        let quote = price(&room, &hours(10, 120), &[], PricingPolicy::default()).unwrap();
        assert_eq!(quote.room_cost, Money::from_dollars(100));
        assert_eq!(quote.total, Money::from_dollars(100));
    }

    #[test]
    fn partial_hours_round_up() {
        let room = room(50);
        let quote = price(&room, &hours(10, 90), &[], PricingPolicy::default()).unwrap();
        assert_eq!(quote.room_cost, Money::from_dollars(100));
    }

    #[test]
    fn sub_hour_booking_bills_minimum_one_hour() {
        let room = room(50);
        let quote = price(&room, &hours(10, 20), &[], PricingPolicy::default()).unwrap();
        assert_eq!(quote.room_cost, Money::from_dollars(50));
    }

    #[test]
    fn exact_rounding_bills_fractional_hours() {
        let room = room(50);
        let policy = PricingPolicy { rounding: HourRounding::Exact };
        let quote = price(&room, &hours(10, 90), &[], policy).unwrap();
        assert_eq!(quote.room_cost, Money::from_dollars(75));
    }

    #[test]
    fn line_subtotals_multiply_unit_price() {
        let room = room(50);
        let a = addon(room.venue_id, 10);
        let quote = price(
            &room,
            &hours(10, 60),
            &[(a.clone(), 3), (a, 0)],
            PricingPolicy::default(),
        )
        .unwrap();
        assert_eq!(quote.lines[0].subtotal, Money::from_dollars(30));
        // Quantity below 1 is priced as 1.
        assert_eq!(quote.lines[1].quantity, 1);
        assert_eq!(quote.lines[1].subtotal, Money::from_dollars(10));
        assert_eq!(quote.total, Money::from_dollars(90));
    }

    #[test]
    fn cross_venue_addon_is_rejected() {
        let room = room(50);
        let foreign = addon(VenueId::new(), 10);
        let err = price(&room, &hours(10, 60), &[(foreign, 1)], PricingPolicy::default())
            .unwrap_err();
        assert!(matches!(err, BookingError::InvalidLineItem(_)));
    }

    proptest! {
        /// Pure function: identical inputs yield identical output, and the
        /// total always equals room cost plus the sum of line subtotals.
        #[test]
        fn total_is_room_cost_plus_subtotals(
            rate in 1i64..500,
            minutes in 1i64..600,
            quantities in proptest::collection::vec(0u32..5, 0..4),
            addon_price in 1i64..100,
        ) {
            let room = room(rate);
            let interval = hours(0, minutes);
            let lines: Vec<(Addon, u32)> = quantities
                .iter()
                .map(|&q| (addon(room.venue_id, addon_price), q))
                .collect();

            let first = price(&room, &interval, &lines, PricingPolicy::default()).unwrap();
            let second = price(&room, &interval, &lines, PricingPolicy::default()).unwrap();
            prop_assert_eq!(&first, &second);

            let subtotal_sum: Money = first.lines.iter().map(|l| l.subtotal).sum();
            prop_assert_eq!(first.total, first.room_cost + subtotal_sum);
        }
    }
}
