//! # Roomhire Testing
//!
//! Test doubles for the booking core:
//! - [`mocks::FixedClock`]: deterministic time
//! - [`mocks::RecordingNotifier`]: captures post-commit notifications
//! - [`memory::MemoryStore`]: full in-memory [`BookingStore`] honoring the
//!   same commit semantics as the postgres store
//! - [`builders`]: terse constructors for rooms, add-ons, and customers
//!
//! ## Example
//!
//! ```ignore
//! use roomhire_testing::{builders, mocks, memory::MemoryStore};
//!
//! #[tokio::test]
//! async fn books_a_room() {
//!     let clock = Arc::new(mocks::test_clock());
//!     let store = Arc::new(MemoryStore::new(clock.clone()));
//!     let room = builders::room(VenueId::new(), "Studio A", 50);
//!     store.insert_room(room.clone()).await;
//!     // drive a BookingService against the store...
//! }
//! ```

pub mod mocks {
    //! Deterministic collaborators.

    use chrono::{DateTime, Utc};
    use roomhire_core::environment::{Clock, NotificationEvent, Notifier, NotifyError};
    use roomhire_core::types::BookingId;
    use std::sync::Mutex;

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }

    /// Notifier that records every delivered event for later assertion.
    #[derive(Debug, Default)]
    pub struct RecordingNotifier {
        events: Mutex<Vec<(NotificationEvent, BookingId)>>,
    }

    impl RecordingNotifier {
        /// Fresh recorder with no events
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Snapshot of everything delivered so far, in order
        ///
        /// # Panics
        ///
        /// Panics if the internal lock is poisoned.
        #[must_use]
        #[allow(clippy::unwrap_used)]
        pub fn events(&self) -> Vec<(NotificationEvent, BookingId)> {
            self.events.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl Notifier for RecordingNotifier {
        #[allow(clippy::unwrap_used)]
        async fn notify(
            &self,
            event: NotificationEvent,
            booking: BookingId,
        ) -> Result<(), NotifyError> {
            self.events.lock().unwrap().push((event, booking));
            Ok(())
        }
    }
}

pub mod builders {
    //! Terse constructors for seed data.

    use roomhire_core::types::{
        Addon, AddonId, CustomerDetails, Money, Room, RoomId, UserId, VenueId,
    };

    /// A room in `venue` billed at `rate_dollars` per hour
    #[must_use]
    pub fn room(venue: VenueId, name: &str, rate_dollars: i64) -> Room {
        Room {
            id: RoomId::new(),
            venue_id: venue,
            name: name.to_string(),
            capacity: 8,
            rate_per_hour: Money::from_dollars(rate_dollars),
        }
    }

    /// An add-on in `venue` priced at `price_dollars` per unit
    #[must_use]
    pub fn addon(venue: VenueId, name: &str, price_dollars: i64) -> Addon {
        Addon {
            id: AddonId::new(),
            venue_id: venue,
            name: name.to_string(),
            price: Money::from_dollars(price_dollars),
        }
    }

    /// Customer details linked to `user`
    #[must_use]
    pub fn customer(user: UserId) -> CustomerDetails {
        CustomerDetails {
            user_id: Some(user),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            address: "1 Analytical Way".to_string(),
            phone: "555-0100".to_string(),
        }
    }
}

pub mod memory {
    //! In-memory [`BookingStore`].
    //!
    //! Every method takes one async mutex over the whole state, which makes
    //! the store trivially serialized: the conflict re-check and the wallet
    //! clamp run under the same critical section the postgres store
    //! provides with row locks.

    use async_trait::async_trait;
    use chrono::Utc;
    use roomhire_core::environment::Clock;
    use roomhire_core::error::{BookingError, Result};
    use roomhire_core::schedule::{self, Interval};
    use roomhire_core::store::{BookingStore, Persisted, Write};
    use roomhire_core::types::{
        Addon, AddonId, Booking, BookingId, BookingLine, BookingRecord, CustomerDetails, Money,
        RescheduleEntry, Room, RoomId, UserId,
    };
    use roomhire_core::wallet::{self, LedgerEntry, SettlementOutcome, Wallet};
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct Inner {
        rooms: HashMap<RoomId, Room>,
        addons: HashMap<AddonId, Addon>,
        bookings: HashMap<BookingId, (Booking, Vec<BookingLine>, Vec<CustomerDetails>)>,
        history: Vec<RescheduleEntry>,
        wallets: HashMap<UserId, Wallet>,
        ledger: Vec<LedgerEntry>,
    }

    impl Inner {
        fn wallet_mut(&mut self, user: UserId, now: chrono::DateTime<Utc>) -> &mut Wallet {
            self.wallets.entry(user).or_insert_with(|| Wallet::new(user, now))
        }

        fn overlapping(&self, room: RoomId, window: &Interval) -> Vec<Booking> {
            self.bookings
                .values()
                .filter(|(b, _, _)| b.room_id == room && b.interval.overlaps(window))
                .map(|(b, _, _)| b.clone())
                .collect()
        }
    }

    /// In-memory booking store for tests.
    pub struct MemoryStore {
        inner: Mutex<Inner>,
        clock: Arc<dyn Clock>,
        fail_next_persist: AtomicBool,
    }

    impl MemoryStore {
        /// Empty store stamping writes with `clock`
        #[must_use]
        pub fn new(clock: Arc<dyn Clock>) -> Self {
            Self {
                inner: Mutex::new(Inner::default()),
                clock,
                fail_next_persist: AtomicBool::new(false),
            }
        }

        /// Seeds a room
        pub async fn insert_room(&self, room: Room) {
            self.inner.lock().await.rooms.insert(room.id, room);
        }

        /// Seeds an add-on
        pub async fn insert_addon(&self, addon: Addon) {
            self.inner.lock().await.addons.insert(addon.id, addon);
        }

        /// Makes the next `persist` fail before touching any state, for
        /// atomicity tests
        pub fn fail_next_persist(&self) {
            self.fail_next_persist.store(true, Ordering::SeqCst);
        }

        /// All ledger entries of a user, oldest first
        pub async fn raw_ledger(&self, user: UserId) -> Vec<LedgerEntry> {
            self.inner
                .lock()
                .await
                .ledger
                .iter()
                .filter(|e| e.user_id == user)
                .cloned()
                .collect()
        }

        /// Credits a wallet directly, bypassing validation
        pub async fn seed_balance(&self, user: UserId, amount: Money) {
            let now = self.clock.now();
            let mut inner = self.inner.lock().await;
            inner.wallet_mut(user, now).balance = amount;
        }
    }

    #[async_trait]
    impl BookingStore for MemoryStore {
        async fn room(&self, id: RoomId) -> Result<Room> {
            self.inner
                .lock()
                .await
                .rooms
                .get(&id)
                .cloned()
                .ok_or_else(|| BookingError::not_found("room", id))
        }

        async fn addon(&self, id: AddonId) -> Result<Addon> {
            self.inner
                .lock()
                .await
                .addons
                .get(&id)
                .cloned()
                .ok_or_else(|| BookingError::not_found("addon", id))
        }

        async fn booking(&self, id: BookingId) -> Result<BookingRecord> {
            self.inner
                .lock()
                .await
                .bookings
                .get(&id)
                .map(|(booking, lines, customers)| BookingRecord {
                    booking: booking.clone(),
                    lines: lines.clone(),
                    customers: customers.clone(),
                })
                .ok_or_else(|| BookingError::not_found("booking", id))
        }

        async fn bookings_for_room(
            &self,
            room: RoomId,
            window: &Interval,
        ) -> Result<Vec<Booking>> {
            Ok(self.inner.lock().await.overlapping(room, window))
        }

        async fn bookings_for_user(&self, user: UserId) -> Result<Vec<Booking>> {
            let inner = self.inner.lock().await;
            let mut bookings: Vec<Booking> = inner
                .bookings
                .values()
                .filter(|(_, _, customers)| customers.iter().any(|c| c.user_id == Some(user)))
                .map(|(b, _, _)| b.clone())
                .collect();
            bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(bookings)
        }

        async fn reschedule_history(&self, booking: BookingId) -> Result<Vec<RescheduleEntry>> {
            let inner = self.inner.lock().await;
            Ok(inner
                .history
                .iter()
                .filter(|h| h.booking_id == booking)
                .rev()
                .cloned()
                .collect())
        }

        async fn wallet(&self, user: UserId) -> Result<Wallet> {
            let now = self.clock.now();
            Ok(*self.inner.lock().await.wallet_mut(user, now))
        }

        async fn ledger_entries(
            &self,
            user: UserId,
            offset: u32,
            limit: u32,
        ) -> Result<Vec<LedgerEntry>> {
            let inner = self.inner.lock().await;
            Ok(inner
                .ledger
                .iter()
                .filter(|e| e.user_id == user)
                .rev()
                .skip(offset as usize)
                .take(limit as usize)
                .cloned()
                .collect())
        }

        async fn append_adjustment(
            &self,
            user: UserId,
            amount: Money,
            description: Option<String>,
            reference: Option<String>,
        ) -> Result<(Wallet, LedgerEntry)> {
            let now = self.clock.now();
            let mut inner = self.inner.lock().await;
            let wallet = inner.wallet_mut(user, now);
            let entry = wallet::adjustment_entry(wallet, amount, description, reference, now)?;
            let wallet = *wallet;
            inner.ledger.push(entry.clone());
            Ok((wallet, entry))
        }

        async fn persist(&self, write: Write) -> Result<Persisted> {
            if self.fail_next_persist.swap(false, Ordering::SeqCst) {
                return Err(BookingError::Persistence("injected persist failure".to_string()));
            }
            let now = self.clock.now();
            let mut inner = self.inner.lock().await;
            match write {
                Write::Create { booking, lines, customers } => {
                    let existing = inner.overlapping(booking.room_id, &booking.interval);
                    if schedule::has_conflict(&existing, &booking.interval, None) {
                        return Err(BookingError::SlotUnavailable);
                    }
                    inner
                        .bookings
                        .insert(booking.id, (booking.clone(), lines, customers));
                    Ok(Persisted { booking, settlement: SettlementOutcome::default(), wallet: None })
                }
                Write::Reschedule { booking, lines, mut history, settlement, settle_for } => {
                    let existing = inner.overlapping(booking.room_id, &booking.interval);
                    if schedule::has_conflict(&existing, &booking.interval, Some(booking.id)) {
                        return Err(BookingError::SlotUnavailable);
                    }
                    let customers = inner
                        .bookings
                        .get(&booking.id)
                        .map(|(_, _, c)| c.clone())
                        .ok_or_else(|| BookingError::not_found("booking", booking.id))?;
                    let wallet = inner.wallet_mut(settle_for, now);
                    let outcome = settlement.apply(wallet, Some(booking.id), now);
                    let wallet = *wallet;
                    history.refund_amount = outcome.refunded;
                    history.additional_amount = outcome.additional_due;
                    inner.ledger.extend(outcome.entries.iter().cloned());
                    inner.history.push(history);
                    inner
                        .bookings
                        .insert(booking.id, (booking.clone(), lines, customers));
                    Ok(Persisted { booking, settlement: outcome, wallet: Some(wallet) })
                }
                Write::Cancel { booking, settlement, settle_for } => {
                    if !inner.bookings.contains_key(&booking.id) {
                        return Err(BookingError::not_found("booking", booking.id));
                    }
                    let wallet = inner.wallet_mut(settle_for, now);
                    let outcome = settlement.apply(wallet, Some(booking.id), now);
                    let wallet = *wallet;
                    inner.ledger.extend(outcome.entries.iter().cloned());
                    if let Some(slot) = inner.bookings.get_mut(&booking.id) {
                        slot.0 = booking.clone();
                    }
                    Ok(Persisted { booking, settlement: outcome, wallet: Some(wallet) })
                }
            }
        }
    }
}

/// Installs a compact tracing subscriber for test output. Safe to call from
/// every test; only the first call wins.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_test_writer()
        .try_init();
}

pub use builders::{addon, customer, room};
pub use memory::MemoryStore;
pub use mocks::{FixedClock, RecordingNotifier, test_clock};

#[cfg(test)]
mod tests {
    use super::*;
    use roomhire_core::environment::Clock;

    #[test]
    fn fixed_clock_is_fixed() {
        let clock = test_clock();
        assert_eq!(clock.now(), clock.now());
    }
}
