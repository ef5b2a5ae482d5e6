//! Store boundary: the persistence collaborator of the lifecycle manager.
//!
//! The store receives entire consistent snapshots as [`Write`] value objects
//! and commits each one atomically. It is also the serialization point of
//! the system: implementations must serialize check-and-insert per room and
//! settlement per account (see the crate docs for the concurrency contract).
//!
//! Implementations: `PostgresBookingStore` (roomhire-postgres) for
//! production, `MemoryStore` (roomhire-testing) for fast deterministic
//! tests.

use crate::error::Result;
use crate::schedule::Interval;
use crate::types::{
    Addon, AddonId, Booking, BookingId, BookingLine, BookingRecord, CustomerDetails, Money, Room,
    RoomId, UserId,
};
use crate::types::RescheduleEntry;
use crate::wallet::{LedgerEntry, Settlement, SettlementOutcome, Wallet};
use async_trait::async_trait;

/// An atomic write-set: everything one lifecycle transition persists.
///
/// A failure partway through any variant must leave no partial state: no
/// confirmed booking without its cost record, no history entry without its
/// matching ledger movement.
#[derive(Clone, Debug)]
pub enum Write {
    /// First persistence of a booking with its lines and customers
    Create {
        /// The new booking (already priced, status set by the service)
        booking: Booking,
        /// Priced add-on lines
        lines: Vec<BookingLine>,
        /// Participants
        customers: Vec<CustomerDetails>,
    },
    /// In-place update of a rescheduled booking plus its audit row and
    /// settlement
    Reschedule {
        /// The booking with its new room/interval/cost and flag set
        booking: Booking,
        /// Recomputed add-on lines
        lines: Vec<BookingLine>,
        /// Audit row; `refund_amount`/`additional_amount` are finalized by
        /// the store from the settlement outcome at commit time
        history: RescheduleEntry,
        /// Ledger movement for the price delta
        settlement: Settlement,
        /// Account the settlement applies to
        settle_for: UserId,
    },
    /// Terminal cancellation plus its refund
    Cancel {
        /// The booking with status set to cancelled
        booking: Booking,
        /// Refund movement, or `Settlement::None`
        settlement: Settlement,
        /// Account the settlement applies to
        settle_for: UserId,
    },
}

impl Write {
    /// The booking this write-set commits
    #[must_use]
    pub const fn booking(&self) -> &Booking {
        match self {
            Self::Create { booking, .. }
            | Self::Reschedule { booking, .. }
            | Self::Cancel { booking, .. } => booking,
        }
    }
}

/// What a committed write-set produced.
#[derive(Clone, Debug)]
pub struct Persisted {
    /// The booking as committed
    pub booking: Booking,
    /// Realized settlement (empty for creates)
    pub settlement: SettlementOutcome,
    /// Wallet state after settlement, when one was touched
    pub wallet: Option<Wallet>,
}

/// Transactional persistence for bookings, audit history, and the wallet
/// ledger.
///
/// # Concurrency contract
///
/// - `persist` of `Create`/`Reschedule` re-runs the conflict predicate and
///   commits under a per-room critical section, so two writers on the same
///   room cannot both observe "no conflict".
/// - Settlements are applied under a per-account critical section; the
///   charge clamp reads the balance it mutates.
///
/// Lookups return `NotFound` as a result value; the lifecycle manager
/// branches on it rather than catching anything.
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Looks up a room.
    ///
    /// # Errors
    ///
    /// `NotFound` if the room does not exist; `Persistence` on store failure.
    async fn room(&self, id: RoomId) -> Result<Room>;

    /// Looks up an add-on.
    ///
    /// # Errors
    ///
    /// `NotFound` if the add-on does not exist; `Persistence` on store
    /// failure.
    async fn addon(&self, id: AddonId) -> Result<Addon>;

    /// Loads a booking with its lines and customers.
    ///
    /// # Errors
    ///
    /// `NotFound` if the booking does not exist; `Persistence` on store
    /// failure.
    async fn booking(&self, id: BookingId) -> Result<BookingRecord>;

    /// All bookings on a room whose interval overlaps `window`, any status.
    ///
    /// # Errors
    ///
    /// `Persistence` on store failure.
    async fn bookings_for_room(&self, room: RoomId, window: &Interval) -> Result<Vec<Booking>>;

    /// All bookings a user participates in, newest first.
    ///
    /// # Errors
    ///
    /// `Persistence` on store failure.
    async fn bookings_for_user(&self, user: UserId) -> Result<Vec<Booking>>;

    /// Reschedule audit rows for a booking, newest first.
    ///
    /// # Errors
    ///
    /// `Persistence` on store failure.
    async fn reschedule_history(&self, booking: BookingId) -> Result<Vec<RescheduleEntry>>;

    /// The user's wallet, created empty on first access.
    ///
    /// # Errors
    ///
    /// `Persistence` on store failure.
    async fn wallet(&self, user: UserId) -> Result<Wallet>;

    /// A page of the user's ledger, newest first.
    ///
    /// # Errors
    ///
    /// `Persistence` on store failure.
    async fn ledger_entries(&self, user: UserId, offset: u32, limit: u32)
        -> Result<Vec<LedgerEntry>>;

    /// Appends a manual adjustment and updates the balance atomically.
    ///
    /// # Errors
    ///
    /// `InvalidAmount` when `amount` is not positive; `Persistence` on store
    /// failure.
    async fn append_adjustment(
        &self,
        user: UserId,
        amount: Money,
        description: Option<String>,
        reference: Option<String>,
    ) -> Result<(Wallet, LedgerEntry)>;

    /// Commits a write-set atomically.
    ///
    /// # Errors
    ///
    /// `SlotUnavailable` when the authoritative conflict re-check fails for
    /// a create or reschedule; `Persistence` when the transaction fails (the
    /// whole write-set is rolled back).
    async fn persist(&self, write: Write) -> Result<Persisted>;
}
