//! Domain types for the room-booking core.
//!
//! Value objects only: identifiers, money, catalog entities, bookings and
//! their line items, and the reschedule audit record. All mutation goes
//! through the lifecycle service in [`crate::booking`]; these types carry no
//! behavior beyond construction and arithmetic.

use crate::schedule::Interval;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for a venue
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VenueId(Uuid);

impl VenueId {
    /// Creates a new random `VenueId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `VenueId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for VenueId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for VenueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a room
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoomId(Uuid);

impl RoomId {
    /// Creates a new random `RoomId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `RoomId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RoomId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for an add-on
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AddonId(Uuid);

impl AddonId {
    /// Creates a new random `AddonId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an `AddonId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for AddonId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AddonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a booking
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BookingId(Uuid);

impl BookingId {
    /// Creates a new random `BookingId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `BookingId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for BookingId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BookingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a user (customer, moderator, or admin)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(Uuid);

impl UserId {
    /// Creates a new random `UserId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `UserId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a ledger entry
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LedgerEntryId(Uuid);

impl LedgerEntryId {
    /// Creates a new random `LedgerEntryId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `LedgerEntryId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for LedgerEntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LedgerEntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a reschedule-history entry
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HistoryEntryId(Uuid);

impl HistoryEntryId {
    /// Creates a new random `HistoryEntryId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `HistoryEntryId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for HistoryEntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for HistoryEntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Money value object (signed cents; ledger amounts can be debits)
// ============================================================================

/// Money in whole cents. Signed because ledger movements include debits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Money(i64);

impl Money {
    /// Zero cents
    pub const ZERO: Self = Self(0);

    /// Creates a `Money` value from cents
    #[must_use]
    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Creates a `Money` value from whole dollars
    ///
    /// # Panics
    ///
    /// Panics if the conversion would overflow. Use `checked_from_dollars`
    /// for non-panicking conversion.
    #[must_use]
    #[allow(clippy::panic)]
    pub const fn from_dollars(dollars: i64) -> Self {
        match dollars.checked_mul(100) {
            Some(cents) => Self(cents),
            None => panic!("Money::from_dollars overflow"),
        }
    }

    /// Creates a `Money` value from whole dollars with overflow checking
    #[must_use]
    pub const fn checked_from_dollars(dollars: i64) -> Option<Self> {
        match dollars.checked_mul(100) {
            Some(cents) => Some(Self(cents)),
            None => None,
        }
    }

    /// Returns the amount in cents
    #[must_use]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Whether the amount is exactly zero
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Whether the amount is strictly positive
    #[must_use]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Whether the amount is strictly negative
    #[must_use]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Absolute value
    #[must_use]
    pub const fn abs(&self) -> Self {
        Self(self.0.abs())
    }

    /// Multiply by a whole quantity
    ///
    /// # Panics
    ///
    /// Panics if the multiplication would overflow. Use `checked_multiply`
    /// for non-panicking math.
    #[must_use]
    #[allow(clippy::panic)]
    pub const fn multiply(&self, quantity: u32) -> Self {
        match self.0.checked_mul(quantity as i64) {
            Some(cents) => Self(cents),
            None => panic!("Money::multiply overflow"),
        }
    }

    /// Multiply by a whole quantity with overflow checking
    #[must_use]
    pub const fn checked_multiply(&self, quantity: u32) -> Option<Self> {
        match self.0.checked_mul(quantity as i64) {
            Some(cents) => Some(Self(cents)),
            None => None,
        }
    }

    /// Integer percentage of the amount, floored to the cent
    ///
    /// # Panics
    ///
    /// Panics if the intermediate product would overflow. Use
    /// `checked_percent` for non-panicking math.
    #[must_use]
    #[allow(clippy::panic)]
    pub const fn percent(&self, pct: u8) -> Self {
        match self.0.checked_mul(pct as i64) {
            Some(product) => Self(product / 100),
            None => panic!("Money::percent overflow"),
        }
    }

    /// Integer percentage of the amount with overflow checking
    #[must_use]
    pub const fn checked_percent(&self, pct: u8) -> Option<Self> {
        match self.0.checked_mul(pct as i64) {
            Some(product) => Some(Self(product / 100)),
            None => None,
        }
    }

    /// The smaller of two amounts
    #[must_use]
    pub const fn min(self, other: Self) -> Self {
        if self.0 <= other.0 { self } else { other }
    }
}

impl std::ops::Add for Money {
    type Output = Self;

    #[allow(clippy::panic)]
    fn add(self, rhs: Self) -> Self {
        match self.0.checked_add(rhs.0) {
            Some(cents) => Self(cents),
            None => panic!("Money addition overflow"),
        }
    }
}

impl std::ops::Sub for Money {
    type Output = Self;

    #[allow(clippy::panic)]
    fn sub(self, rhs: Self) -> Self {
        match self.0.checked_sub(rhs.0) {
            Some(cents) => Self(cents),
            None => panic!("Money subtraction overflow"),
        }
    }
}

impl std::ops::Neg for Money {
    type Output = Self;

    #[allow(clippy::panic)]
    fn neg(self) -> Self {
        match self.0.checked_neg() {
            Some(cents) => Self(cents),
            None => panic!("Money negation overflow"),
        }
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |acc, m| acc + m)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let cents = self.0.abs();
        write!(f, "{sign}${}.{:02}", cents / 100, cents % 100)
    }
}

// ============================================================================
// Callers and roles
// ============================================================================

/// Role attached to an authenticated caller by the identity collaborator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular customer; may act only on bookings they are linked to
    Customer,
    /// Venue-scoped staff; may act on any booking in their venue
    Moderator,
    /// Unrestricted
    Admin,
}

/// An authenticated caller. The core never issues identities; it only
/// consumes the role and, for moderators, the venue scope.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    /// The calling user
    pub user_id: UserId,
    /// The caller's role
    pub role: Role,
    /// Venue a moderator is assigned to; `None` for other roles
    pub venue_scope: Option<VenueId>,
}

impl Caller {
    /// A customer caller
    #[must_use]
    pub const fn customer(user_id: UserId) -> Self {
        Self { user_id, role: Role::Customer, venue_scope: None }
    }

    /// A moderator scoped to one venue
    #[must_use]
    pub const fn moderator(user_id: UserId, venue: VenueId) -> Self {
        Self { user_id, role: Role::Moderator, venue_scope: Some(venue) }
    }

    /// An admin caller
    #[must_use]
    pub const fn admin(user_id: UserId) -> Self {
        Self { user_id, role: Role::Admin, venue_scope: None }
    }
}

// ============================================================================
// Catalog entities (read-only collaborators for this core)
// ============================================================================

/// A bookable room. Immutable for the purposes of the core: rate changes are
/// out-of-scope events.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    /// Room identity
    pub id: RoomId,
    /// Owning venue
    pub venue_id: VenueId,
    /// Display name
    pub name: String,
    /// Seated capacity
    pub capacity: u32,
    /// Hourly rate
    pub rate_per_hour: Money,
}

/// An add-on offered by a venue (projector, catering, ...).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Addon {
    /// Add-on identity
    pub id: AddonId,
    /// Owning venue; must match the booked room's venue
    pub venue_id: VenueId,
    /// Display name
    pub name: String,
    /// Unit price
    pub price: Money,
}

// ============================================================================
// Bookings
// ============================================================================

/// Lifecycle state of a booking. `Cancelled` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    /// Created but not yet confirmed
    Pending,
    /// Active reservation; occupies its interval
    Confirmed,
    /// Terminal
    Cancelled,
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

/// A reservation of one room for one half-open interval.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    /// Booking identity
    pub id: BookingId,
    /// The booked room
    pub room_id: RoomId,
    /// Occupied interval `[start, end)`
    pub interval: Interval,
    /// Lifecycle state
    pub status: BookingStatus,
    /// Total cost: room cost plus line-item subtotals
    pub total_cost: Money,
    /// Whether the single permitted reschedule has been used
    pub rescheduled: bool,
    /// Snapshot of the pre-reschedule interval, if rescheduled
    pub original_interval: Option<Interval>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// Whether this booking blocks other reservations on its room
    #[must_use]
    pub fn occupies_room(&self) -> bool {
        self.status != BookingStatus::Cancelled
    }
}

/// An add-on attached to a booking. Subtotals are derived, never entered
/// directly; they are recomputed whenever the booking's room or interval
/// changes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingLine {
    /// The purchased add-on
    pub addon_id: AddonId,
    /// Quantity, at least 1
    pub quantity: u32,
    /// `addon.price * quantity`
    pub subtotal: Money,
}

/// A requested add-on line before pricing
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddonSelection {
    /// The requested add-on
    pub addon_id: AddonId,
    /// Requested quantity; values below 1 are priced as 1
    pub quantity: u32,
}

/// Contact details captured per booking participant
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerDetails {
    /// Linked user account, if any
    pub user_id: Option<UserId>,
    /// First name
    pub first_name: String,
    /// Last name
    pub last_name: String,
    /// Postal address
    pub address: String,
    /// Phone number
    pub phone: String,
}

/// A booking with its attached lines and customers, as read from the store
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BookingRecord {
    /// The booking itself
    pub booking: Booking,
    /// Attached add-on lines
    pub lines: Vec<BookingLine>,
    /// Participants
    pub customers: Vec<CustomerDetails>,
}

impl BookingRecord {
    /// The booking's owning customer: the first participant linked to a user
    /// account. Settlements credit and debit this user's wallet.
    #[must_use]
    pub fn owner(&self) -> Option<UserId> {
        self.customers.iter().find_map(|c| c.user_id)
    }

    /// Whether the given user is a participant of this booking
    #[must_use]
    pub fn is_participant(&self, user: UserId) -> bool {
        self.customers.iter().any(|c| c.user_id == Some(user))
    }
}

// ============================================================================
// Reschedule audit trail
// ============================================================================

/// Immutable audit row for one reschedule event. Created once per reschedule,
/// never mutated or deleted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RescheduleEntry {
    /// Entry identity
    pub id: HistoryEntryId,
    /// The rescheduled booking
    pub booking_id: BookingId,
    /// Room before the reschedule
    pub original_room_id: RoomId,
    /// Interval before the reschedule
    pub original_interval: Interval,
    /// Cost before the reschedule
    pub original_total_cost: Money,
    /// Room after the reschedule
    pub new_room_id: RoomId,
    /// Interval after the reschedule
    pub new_interval: Interval,
    /// Cost after the reschedule
    pub new_total_cost: Money,
    /// `new_total_cost - original_total_cost`; negative means a refund
    pub price_difference: Money,
    /// Amount credited to the owner's wallet (realized at commit)
    pub refund_amount: Money,
    /// Amount still due after the wallet debit (realized at commit)
    pub additional_amount: Money,
    /// Free-text reason supplied by the caller
    pub reason: Option<String>,
    /// When the reschedule committed
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn money_display_formats_cents() {
        assert_eq!(Money::from_cents(12_34).to_string(), "$12.34");
        assert_eq!(Money::from_cents(5).to_string(), "$0.05");
        assert_eq!(Money::from_cents(-7_50).to_string(), "-$7.50");
    }

    #[test]
    fn money_percent_floors_to_cent() {
        assert_eq!(Money::from_cents(100_00).percent(75), Money::from_cents(75_00));
        assert_eq!(Money::from_cents(99).percent(50), Money::from_cents(49));
    }

    #[test]
    fn money_arithmetic() {
        let a = Money::from_dollars(10);
        let b = Money::from_dollars(4);
        assert_eq!(a - b, Money::from_dollars(6));
        assert_eq!(b - a, Money::from_dollars(-6));
        assert_eq!((b - a).abs(), Money::from_dollars(6));
        assert_eq!(a.min(b), b);
        assert_eq!(Money::from_cents(250).multiply(3), Money::from_cents(750));
    }

    #[test]
    fn money_checked_arithmetic_reports_overflow() {
        let huge = Money::from_cents(i64::MAX);
        assert_eq!(huge.checked_multiply(2), None);
        assert_eq!(huge.checked_percent(50), None);
        assert_eq!(
            Money::from_cents(1000).checked_multiply(4),
            Some(Money::from_cents(4000))
        );
        assert_eq!(
            Money::from_cents(1000).checked_percent(25),
            Some(Money::from_cents(250))
        );
    }

    #[test]
    #[should_panic(expected = "Money::multiply overflow")]
    fn money_multiply_panics_on_overflow() {
        let _ = Money::from_cents(i64::MAX).multiply(2);
    }

    #[test]
    #[should_panic(expected = "Money addition overflow")]
    fn money_addition_panics_on_overflow() {
        let _ = Money::from_cents(i64::MAX) + Money::from_cents(1);
    }

    #[test]
    fn caller_constructors_set_scope() {
        let venue = VenueId::new();
        let m = Caller::moderator(UserId::new(), venue);
        assert_eq!(m.role, Role::Moderator);
        assert_eq!(m.venue_scope, Some(venue));
        assert_eq!(Caller::admin(UserId::new()).venue_scope, None);
    }
}
