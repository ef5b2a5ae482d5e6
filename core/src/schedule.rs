//! Conflict and availability engine.
//!
//! Pure interval arithmetic over a room's existing bookings: conflict
//! detection for a proposed interval, the day's occupied slots, and the free
//! complement within operating hours. No I/O here; callers fetch the booking
//! set from the store and the store re-runs the conflict predicate inside its
//! commit transaction (the authoritative check, see [`crate::store`]).
//!
//! All intervals are half-open `[start, end)`: touching endpoints never
//! conflict.

use crate::error::{BookingError, Result};
use crate::types::{Booking, BookingId, BookingStatus};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A half-open time range `[start, end)` describing a room occupation.
///
/// The constructor enforces `start < end`; a zero-width interval is invalid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Interval {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl Interval {
    /// Creates an interval, validating `start < end`.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::InvalidInterval`] if `end <= start`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if end <= start {
            return Err(BookingError::InvalidInterval(format!(
                "end ({end}) must be after start ({start})"
            )));
        }
        Ok(Self { start, end })
    }

    // Internal constructor for ranges already known to be non-empty.
    pub(crate) const fn raw(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Start of the interval (inclusive)
    #[must_use]
    pub const fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// End of the interval (exclusive)
    #[must_use]
    pub const fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Length of the interval
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Two half-open intervals conflict iff `s1 < e2 && s2 < e1`.
    /// Touching endpoints do not overlap.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// The intersection with `window`, or `None` when it is empty.
    /// A booking spanning a day boundary is clipped, not dropped.
    #[must_use]
    pub fn clip(&self, window: &Self) -> Option<Self> {
        let start = self.start.max(window.start);
        let end = self.end.min(window.end);
        (start < end).then_some(Self { start, end })
    }

    /// The calendar day's full `[00:00, 24:00)` window in UTC
    #[must_use]
    pub fn day_window(date: NaiveDate) -> Self {
        let start = date.and_time(NaiveTime::MIN).and_utc();
        Self { start, end: start + Duration::days(1) }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// Daily operating hours of a venue, as whole hours `[open, close)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatingHours {
    open: u32,
    close: u32,
}

impl OperatingHours {
    /// Creates operating hours, validating `open < close <= 24`.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::InvalidInterval`] when the hours are not a
    /// non-empty window within one day.
    pub fn new(open: u32, close: u32) -> Result<Self> {
        if open >= close || close > 24 {
            return Err(BookingError::InvalidInterval(format!(
                "operating hours {open}..{close} must satisfy open < close <= 24"
            )));
        }
        Ok(Self { open, close })
    }

    /// Opening hour (0-23)
    #[must_use]
    pub const fn open(&self) -> u32 {
        self.open
    }

    /// Closing hour (1-24)
    #[must_use]
    pub const fn close(&self) -> u32 {
        self.close
    }

    /// The operating window on a given date
    #[must_use]
    pub fn window_on(&self, date: NaiveDate) -> Interval {
        let midnight = date.and_time(NaiveTime::MIN).and_utc();
        Interval::raw(
            midnight + Duration::hours(i64::from(self.open)),
            midnight + Duration::hours(i64::from(self.close)),
        )
    }
}

impl Default for OperatingHours {
    /// 8:00 to 22:00, the deployment default
    fn default() -> Self {
        Self { open: 8, close: 22 }
    }
}

/// One occupied slot on a room's calendar day, clipped to that day and
/// tagged with the occupying booking's state.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct UnavailableSlot {
    /// The occupied range within the day
    pub interval: Interval,
    /// State of the occupying booking (never `Cancelled`)
    pub status: BookingStatus,
    /// The occupying booking
    pub booking_id: BookingId,
}

/// Whether `interval` overlaps any non-cancelled booking in `bookings`,
/// ignoring `exclude` (a reschedule checks against all *other* bookings on
/// the target room).
#[must_use]
pub fn has_conflict(
    bookings: &[Booking],
    interval: &Interval,
    exclude: Option<BookingId>,
) -> bool {
    bookings
        .iter()
        .filter(|b| b.occupies_room())
        .filter(|b| Some(b.id) != exclude)
        .any(|b| b.interval.overlaps(interval))
}

/// The occupied slots of a room on one calendar day, sorted by start time.
///
/// Each non-cancelled booking overlapping the day contributes the
/// intersection of its interval with the day's `[00:00, 24:00)` window.
#[must_use]
pub fn unavailable_slots(bookings: &[Booking], date: NaiveDate) -> Vec<UnavailableSlot> {
    let window = Interval::day_window(date);
    let mut slots: Vec<UnavailableSlot> = bookings
        .iter()
        .filter(|b| b.occupies_room())
        .filter_map(|b| {
            b.interval.clip(&window).map(|interval| UnavailableSlot {
                interval,
                status: b.status,
                booking_id: b.id,
            })
        })
        .collect();
    slots.sort_by_key(|s| s.interval.start());
    slots
}

/// The free sub-intervals of an operating window, given the day's occupied
/// slots: the complement of `unavailable` within `window`.
///
/// Occupied slots are clamped to the window; zero-width gaps between
/// adjacent bookings are not emitted. If nothing is occupied the whole
/// window is one slot.
#[must_use]
pub fn available_slots(unavailable: &[UnavailableSlot], window: &Interval) -> Vec<Interval> {
    let mut occupied: Vec<Interval> = unavailable
        .iter()
        .filter_map(|s| s.interval.clip(window))
        .collect();
    occupied.sort_by_key(Interval::start);

    let mut gaps = Vec::new();
    let mut cursor = window.start();
    for slot in &occupied {
        if cursor < slot.start() {
            gaps.push(Interval::raw(cursor, slot.start()));
        }
        cursor = cursor.max(slot.end());
    }
    if cursor < window.end() {
        gaps.push(Interval::raw(cursor, window.end()));
    }
    gaps
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{Money, RoomId};
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        // Built from midnight so hour 24 (end-of-day) is representable,
        // matching `OperatingHours::window_on`.
        Utc.with_ymd_and_hms(2025, 6, day, 0, 0, 0).unwrap() + Duration::hours(i64::from(hour))
    }

    fn booking(start: DateTime<Utc>, end: DateTime<Utc>, status: BookingStatus) -> Booking {
        Booking {
            id: BookingId::new(),
            room_id: RoomId::new(),
            interval: Interval::new(start, end).unwrap(),
            status,
            total_cost: Money::ZERO,
            rescheduled: false,
            original_interval: None,
            created_at: start,
            updated_at: start,
        }
    }

    #[test]
    fn interval_rejects_empty_and_inverted() {
        assert!(Interval::new(at(1, 10), at(1, 10)).is_err());
        assert!(Interval::new(at(1, 12), at(1, 10)).is_err());
    }

    #[test]
    fn overlap_is_strict_on_endpoints() {
        let a = Interval::new(at(1, 10), at(1, 12)).unwrap();
        let b = Interval::new(at(1, 12), at(1, 14)).unwrap();
        let c = Interval::new(at(1, 11), at(1, 13)).unwrap();
        assert!(!a.overlaps(&b), "touching endpoints must not conflict");
        assert!(!b.overlaps(&a));
        assert!(a.overlaps(&c));
        assert!(c.overlaps(&a));
    }

    #[test]
    fn cancelled_bookings_never_conflict() {
        let existing = vec![booking(at(1, 10), at(1, 12), BookingStatus::Cancelled)];
        let wanted = Interval::new(at(1, 10), at(1, 12)).unwrap();
        assert!(!has_conflict(&existing, &wanted, None));
    }

    #[test]
    fn exclusion_skips_the_booking_itself() {
        let existing = vec![booking(at(1, 10), at(1, 12), BookingStatus::Confirmed)];
        let id = existing[0].id;
        let wanted = Interval::new(at(1, 11), at(1, 13)).unwrap();
        assert!(has_conflict(&existing, &wanted, None));
        assert!(!has_conflict(&existing, &wanted, Some(id)));
    }

    #[test]
    fn midnight_spanning_booking_is_clipped_not_dropped() {
        let b = booking(at(1, 22), at(2, 2), BookingStatus::Confirmed);
        let day1 = unavailable_slots(std::slice::from_ref(&b), b.interval.start().date_naive());
        assert_eq!(day1.len(), 1);
        assert_eq!(day1[0].interval.start(), at(1, 22));
        assert_eq!(day1[0].interval.end(), at(2, 0));

        let day2 = unavailable_slots(std::slice::from_ref(&b), at(2, 0).date_naive());
        assert_eq!(day2.len(), 1);
        assert_eq!(day2[0].interval.start(), at(2, 0));
        assert_eq!(day2[0].interval.end(), at(2, 2));
    }

    #[test]
    fn unavailable_slots_sorted_and_tagged() {
        let bookings = vec![
            booking(at(1, 14), at(1, 16), BookingStatus::Pending),
            booking(at(1, 9), at(1, 11), BookingStatus::Confirmed),
            booking(at(1, 12), at(1, 13), BookingStatus::Cancelled),
        ];
        let slots = unavailable_slots(&bookings, at(1, 0).date_naive());
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[0].interval.start(), at(1, 9));
        assert_eq!(slots[0].status, BookingStatus::Confirmed);
        assert_eq!(slots[1].status, BookingStatus::Pending);
    }

    #[test]
    fn empty_day_yields_whole_operating_window() {
        let hours = OperatingHours::new(8, 22).unwrap();
        let window = hours.window_on(at(1, 0).date_naive());
        let free = available_slots(&[], &window);
        assert_eq!(free, vec![window]);
    }

    #[test]
    fn gaps_before_between_and_after() {
        let hours = OperatingHours::new(8, 22).unwrap();
        let date = at(1, 0).date_naive();
        let bookings = vec![
            booking(at(1, 10), at(1, 12), BookingStatus::Confirmed),
            booking(at(1, 15), at(1, 18), BookingStatus::Confirmed),
        ];
        let free = available_slots(&unavailable_slots(&bookings, date), &hours.window_on(date));
        assert_eq!(
            free,
            vec![
                Interval::new(at(1, 8), at(1, 10)).unwrap(),
                Interval::new(at(1, 12), at(1, 15)).unwrap(),
                Interval::new(at(1, 18), at(1, 22)).unwrap(),
            ]
        );
    }

    #[test]
    fn zero_width_gaps_are_skipped() {
        let hours = OperatingHours::new(8, 22).unwrap();
        let date = at(1, 0).date_naive();
        let bookings = vec![
            booking(at(1, 8), at(1, 12), BookingStatus::Confirmed),
            booking(at(1, 12), at(1, 16), BookingStatus::Confirmed),
        ];
        let free = available_slots(&unavailable_slots(&bookings, date), &hours.window_on(date));
        assert_eq!(free, vec![Interval::new(at(1, 16), at(1, 22)).unwrap()]);
    }

    #[test]
    fn bookings_outside_operating_hours_do_not_create_gaps() {
        let hours = OperatingHours::new(8, 22).unwrap();
        let date = at(1, 0).date_naive();
        // Occupies 6:00-9:00; only the 8:00-9:00 part is inside the window.
        let bookings = vec![booking(at(1, 6), at(1, 9), BookingStatus::Confirmed)];
        let free = available_slots(&unavailable_slots(&bookings, date), &hours.window_on(date));
        assert_eq!(free, vec![Interval::new(at(1, 9), at(1, 22)).unwrap()]);
    }

    proptest! {
        /// Free and occupied slots exactly tile the operating window: no
        /// gaps, no overlaps, for any non-overlapping reservation set.
        #[test]
        fn availability_tiles_the_operating_window(
            raw_hours in proptest::collection::vec((8u32..22, 1u32..4), 0..6),
        ) {
            let date = at(1, 0).date_naive();
            let hours = OperatingHours::new(8, 22).unwrap();
            let window = hours.window_on(date);

            // Build non-overlapping bookings by sorting and dropping collisions.
            let mut claims: Vec<(u32, u32)> = Vec::new();
            let mut sorted = raw_hours;
            sorted.sort_unstable();
            for (start, len) in sorted {
                let end = (start + len).min(24);
                if claims.last().is_none_or(|&(_, prev_end)| prev_end <= start) && start < end {
                    claims.push((start, end));
                }
            }
            let bookings: Vec<Booking> = claims
                .iter()
                .map(|&(s, e)| booking(at(1, s), at(1, e), BookingStatus::Confirmed))
                .collect();

            let occupied = unavailable_slots(&bookings, date);
            let free = available_slots(&occupied, &window);

            // Walk the union in start order and check it tiles the window.
            let mut pieces: Vec<Interval> = occupied
                .iter()
                .filter_map(|s| s.interval.clip(&window))
                .chain(free.iter().copied())
                .collect();
            pieces.sort_by_key(Interval::start);

            let mut cursor = window.start();
            for piece in &pieces {
                prop_assert_eq!(piece.start(), cursor, "gap or overlap at {}", cursor);
                cursor = piece.end();
            }
            prop_assert_eq!(cursor, window.end());
        }
    }
}
