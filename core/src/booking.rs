//! Booking lifecycle manager.
//!
//! Orchestrates the pure engines and the store: creates, reschedules, and
//! cancels reservations, owns the booking state machine, writes the
//! reschedule audit trail, and settles price deltas through the wallet
//! ledger. This is the only mutator of a booking's state and interval.
//!
//! Transaction shape: validation and pricing happen up front against a
//! snapshot; the store's `persist` call is the single atomic commit point
//! and re-runs the conflict check under its per-room critical section.
//! Notifications run strictly after commit and are best-effort.

use crate::config::BookingPolicy;
use crate::environment::{Clock, NotificationEvent, Notifier};
use crate::error::{BookingError, Result};
use crate::pricing::{self, Quote};
use crate::refund::{self, RefundBreakdown};
use crate::schedule::{self, Interval, OperatingHours, UnavailableSlot};
use crate::store::{BookingStore, Write};
use crate::types::{
    Addon, AddonSelection, Booking, BookingId, BookingRecord, BookingStatus, Caller,
    CustomerDetails, HistoryEntryId, Money, RescheduleEntry, Role, Room, RoomId, UserId,
};
use crate::wallet::{LedgerEntry, Settlement, Wallet};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A booking request as it enters the lifecycle manager.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBooking {
    /// Room to book
    pub room_id: RoomId,
    /// Requested interval
    pub interval: Interval,
    /// Requested add-ons
    pub addons: Vec<AddonSelection>,
    /// Participants
    pub customers: Vec<CustomerDetails>,
}

/// A reschedule request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RescheduleRequest {
    /// The new interval
    pub new_interval: Interval,
    /// Optional room change; must stay within the venue
    pub new_room_id: Option<RoomId>,
    /// Free-text reason recorded in the audit trail
    pub reason: Option<String>,
}

/// Result of a committed reschedule.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RescheduleOutcome {
    /// The booking after the reschedule
    pub booking: Booking,
    /// `new_cost - original_cost`; negative means money came back
    pub price_difference: Money,
    /// Amount credited to the owner's wallet
    pub refund_amount: Money,
    /// Amount debited from the owner's wallet
    pub charged_from_wallet: Money,
    /// Uncovered remainder; informational, never blocks the reschedule
    pub additional_due: Money,
}

/// Result of a committed cancellation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CancellationOutcome {
    /// The booking, now cancelled
    pub booking: Booking,
    /// The realized policy application
    pub refund: RefundBreakdown,
    /// Hours between cancellation and the booked start
    pub hours_until_start: f64,
    /// Wallet state after the credit, when a refund was paid
    pub wallet: Option<Wallet>,
}

/// Per-line cost decomposition of a booking.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    /// Room rate times billable hours, under the current policy
    pub room_cost: Money,
    /// Sum of line subtotals
    pub addons_cost: Money,
    /// The booking's committed total
    pub total_cost: Money,
}

/// Aggregated booking snapshot: the record, its audit trail, and a cost
/// breakdown. Feeds invoice rendering and support tooling.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BookingDetail {
    /// Booking with lines and customers
    pub record: BookingRecord,
    /// Reschedule audit rows, newest first
    pub history: Vec<RescheduleEntry>,
    /// Cost decomposition
    pub cost: CostBreakdown,
}

/// The booking lifecycle service.
///
/// Holds the store, clock, and notifier collaborators behind trait objects;
/// all business rules live here and in the pure engines it calls.
#[derive(Clone)]
pub struct BookingService {
    store: Arc<dyn BookingStore>,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
    policy: BookingPolicy,
}

impl BookingService {
    /// Creates a new `BookingService`
    #[must_use]
    pub fn new(
        store: Arc<dyn BookingStore>,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn Notifier>,
        policy: BookingPolicy,
    ) -> Self {
        Self { store, clock, notifier, policy }
    }

    // ========================================================================
    // Lifecycle operations
    // ========================================================================

    /// Creates and confirms a booking.
    ///
    /// # Errors
    ///
    /// - `InvalidInterval` when the start is not strictly in the future
    /// - `NotFound` for an unknown room
    /// - `SlotUnavailable` when the interval conflicts
    /// - `InvalidLineItem` for unknown or cross-venue add-ons
    /// - `Persistence` when the commit fails
    #[tracing::instrument(skip(self, request), fields(room = %request.room_id, caller = %caller.user_id))]
    pub async fn create_booking(
        &self,
        caller: &Caller,
        request: NewBooking,
    ) -> Result<BookingRecord> {
        let now = self.clock.now();
        ensure_future_start(&request.interval, now)?;

        let room = self.store.room(request.room_id).await?;

        let existing = self.store.bookings_for_room(room.id, &request.interval).await?;
        if schedule::has_conflict(&existing, &request.interval, None) {
            return Err(BookingError::SlotUnavailable);
        }

        let quote = self.quote_for(&room, &request.interval, &request.addons).await?;

        let booking = Booking {
            id: BookingId::new(),
            room_id: room.id,
            interval: request.interval,
            status: BookingStatus::Confirmed,
            total_cost: quote.total,
            rescheduled: false,
            original_interval: None,
            created_at: now,
            updated_at: now,
        };

        let persisted = self
            .store
            .persist(Write::Create {
                booking,
                lines: quote.lines.clone(),
                customers: request.customers.clone(),
            })
            .await?;

        tracing::info!(booking = %persisted.booking.id, total = %persisted.booking.total_cost, "booking created");
        self.notify(NotificationEvent::BookingConfirmed, persisted.booking.id).await;

        Ok(BookingRecord {
            booking: persisted.booking,
            lines: quote.lines,
            customers: request.customers,
        })
    }

    /// Reschedules a booking to a new interval and optionally a new room in
    /// the same venue, settling the price delta through the owner's wallet.
    ///
    /// At most one reschedule is permitted per booking. A price increase is
    /// debited as far as the wallet balance covers; the remainder is
    /// reported as `additional_due` and never blocks the reschedule.
    ///
    /// # Errors
    ///
    /// - `NotFound` / `AlreadyCancelled` / `AlreadyRescheduled` for state
    ///   violations
    /// - `Forbidden` unless the caller owns the booking, moderates the
    ///   venue, or is an admin
    /// - `CrossVenueRoomChange` for a room in another venue
    /// - `InvalidInterval`, `SlotUnavailable`, `InvalidLineItem`,
    ///   `Persistence` as for creation
    #[tracing::instrument(skip(self, request), fields(booking = %booking_id))]
    pub async fn reschedule_booking(
        &self,
        caller: &Caller,
        booking_id: BookingId,
        request: RescheduleRequest,
    ) -> Result<RescheduleOutcome> {
        let record = self.store.booking(booking_id).await?;
        let booking = &record.booking;

        if booking.status == BookingStatus::Cancelled {
            return Err(BookingError::AlreadyCancelled(booking_id));
        }
        if booking.rescheduled {
            return Err(BookingError::AlreadyRescheduled(booking_id));
        }

        let current_room = self.store.room(booking.room_id).await?;
        authorize(caller, &record, current_room.venue_id, "reschedule")?;

        let now = self.clock.now();
        ensure_future_start(&request.new_interval, now)?;

        let target_room = match request.new_room_id {
            Some(new_room_id) if new_room_id != booking.room_id => {
                let new_room = self.store.room(new_room_id).await?;
                if new_room.venue_id != current_room.venue_id {
                    return Err(BookingError::CrossVenueRoomChange);
                }
                new_room
            }
            _ => current_room.clone(),
        };

        let existing =
            self.store.bookings_for_room(target_room.id, &request.new_interval).await?;
        if schedule::has_conflict(&existing, &request.new_interval, Some(booking_id)) {
            return Err(BookingError::SlotUnavailable);
        }

        // Line subtotals are always recomputed from the catalog; they are
        // duration-independent so this is idempotent.
        let selections: Vec<AddonSelection> = record
            .lines
            .iter()
            .map(|l| AddonSelection { addon_id: l.addon_id, quantity: l.quantity })
            .collect();
        let quote = self.quote_for(&target_room, &request.new_interval, &selections).await?;

        let price_difference = quote.total - booking.total_cost;
        let settlement = Settlement::for_price_delta(
            price_difference,
            format!(
                "Reschedule: room {} -> room {}, {} -> {}",
                current_room.name,
                target_room.name,
                booking.interval.start().format("%Y-%m-%d %H:%M"),
                request.new_interval.start().format("%Y-%m-%d %H:%M"),
            ),
        );
        let settle_for = record.owner().unwrap_or(caller.user_id);

        let updated = Booking {
            room_id: target_room.id,
            interval: request.new_interval,
            total_cost: quote.total,
            rescheduled: true,
            original_interval: Some(booking.interval),
            updated_at: now,
            ..booking.clone()
        };

        let history = RescheduleEntry {
            id: HistoryEntryId::new(),
            booking_id,
            original_room_id: booking.room_id,
            original_interval: booking.interval,
            original_total_cost: booking.total_cost,
            new_room_id: target_room.id,
            new_interval: request.new_interval,
            new_total_cost: quote.total,
            price_difference,
            // Realized amounts are finalized by the store at commit time.
            refund_amount: Money::ZERO,
            additional_amount: Money::ZERO,
            reason: request.reason,
            created_at: now,
        };

        let persisted = self
            .store
            .persist(Write::Reschedule {
                booking: updated,
                lines: quote.lines,
                history,
                settlement,
                settle_for,
            })
            .await?;

        tracing::info!(
            booking = %booking_id,
            delta = %price_difference,
            refunded = %persisted.settlement.refunded,
            additional_due = %persisted.settlement.additional_due,
            "booking rescheduled"
        );
        self.notify(NotificationEvent::BookingRescheduled, booking_id).await;

        Ok(RescheduleOutcome {
            booking: persisted.booking,
            price_difference,
            refund_amount: persisted.settlement.refunded,
            charged_from_wallet: persisted.settlement.charged,
            additional_due: persisted.settlement.additional_due,
        })
    }

    /// Cancels a booking, crediting the tiered refund to the owner's wallet.
    ///
    /// # Errors
    ///
    /// - `NotFound` for an unknown booking
    /// - `AlreadyCancelled` when the booking is already terminal
    /// - `Forbidden` per the same role rule as reschedule
    /// - `Persistence` when the commit fails
    #[tracing::instrument(skip(self, reason), fields(booking = %booking_id))]
    #[allow(clippy::cast_precision_loss)]
    pub async fn cancel_booking(
        &self,
        caller: &Caller,
        booking_id: BookingId,
        reason: Option<String>,
    ) -> Result<CancellationOutcome> {
        let record = self.store.booking(booking_id).await?;
        let booking = &record.booking;

        if booking.status == BookingStatus::Cancelled {
            return Err(BookingError::AlreadyCancelled(booking_id));
        }

        let room = self.store.room(booking.room_id).await?;
        authorize(caller, &record, room.venue_id, "cancel")?;

        let now = self.clock.now();
        let hours_until_start =
            (booking.interval.start() - now).num_seconds() as f64 / 3600.0;
        let breakdown = refund::calculate_refund(booking.total_cost, hours_until_start);

        let settlement = if breakdown.refund_amount.is_positive() {
            Settlement::Refund {
                amount: breakdown.refund_amount,
                description: format!(
                    "Booking cancellation refund: {}. Reason: {}",
                    breakdown.policy,
                    reason.as_deref().unwrap_or("Not specified"),
                ),
            }
        } else {
            Settlement::None
        };
        let settle_for = record.owner().unwrap_or(caller.user_id);

        let cancelled = Booking {
            status: BookingStatus::Cancelled,
            updated_at: now,
            ..booking.clone()
        };

        let persisted = self
            .store
            .persist(Write::Cancel { booking: cancelled, settlement, settle_for })
            .await?;

        tracing::info!(
            booking = %booking_id,
            refunded = %persisted.settlement.refunded,
            "booking cancelled"
        );
        self.notify(NotificationEvent::BookingCancelled, booking_id).await;

        Ok(CancellationOutcome {
            booking: persisted.booking,
            refund: breakdown,
            hours_until_start,
            wallet: persisted.wallet,
        })
    }

    // ========================================================================
    // Availability queries
    // ========================================================================

    /// The occupied slots of a room on one day, clipped to the day and
    /// sorted by start.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown room; `Persistence` on store failure.
    pub async fn unavailable_slots(
        &self,
        room_id: RoomId,
        date: NaiveDate,
    ) -> Result<Vec<UnavailableSlot>> {
        self.store.room(room_id).await?;
        let window = Interval::day_window(date);
        let bookings = self.store.bookings_for_room(room_id, &window).await?;
        Ok(schedule::unavailable_slots(&bookings, date))
    }

    /// The free slots of a room within operating hours on one day.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown room; `Persistence` on store failure.
    pub async fn available_slots(
        &self,
        room_id: RoomId,
        date: NaiveDate,
        hours: Option<OperatingHours>,
    ) -> Result<Vec<Interval>> {
        let occupied = self.unavailable_slots(room_id, date).await?;
        let window = hours.unwrap_or(self.policy.operating_hours).window_on(date);
        Ok(schedule::available_slots(&occupied, &window))
    }

    /// Per-day occupied slots over an inclusive date range.
    ///
    /// # Errors
    ///
    /// `InvalidInterval` when `end < start`; otherwise as
    /// [`Self::unavailable_slots`].
    pub async fn availability_for_period(
        &self,
        room_id: RoomId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<(NaiveDate, Vec<UnavailableSlot>)>> {
        if end < start {
            return Err(BookingError::InvalidInterval(format!(
                "period end {end} before start {start}"
            )));
        }
        let mut days = Vec::new();
        let mut current = start;
        while current <= end {
            days.push((current, self.unavailable_slots(room_id, current).await?));
            let Some(next) = current.succ_opt() else { break };
            current = next;
        }
        Ok(days)
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Bookings the calling user participates in, newest first.
    ///
    /// # Errors
    ///
    /// `Persistence` on store failure.
    pub async fn my_bookings(&self, caller: &Caller) -> Result<Vec<Booking>> {
        self.store.bookings_for_user(caller.user_id).await
    }

    /// The reschedule audit trail of a booking, newest first. Role-guarded
    /// like the mutating operations.
    ///
    /// # Errors
    ///
    /// `NotFound`, `Forbidden`, or `Persistence`.
    pub async fn reschedule_history(
        &self,
        caller: &Caller,
        booking_id: BookingId,
    ) -> Result<Vec<RescheduleEntry>> {
        let record = self.store.booking(booking_id).await?;
        let room = self.store.room(record.booking.room_id).await?;
        authorize(caller, &record, room.venue_id, "view history of")?;
        self.store.reschedule_history(booking_id).await
    }

    /// Aggregated snapshot of one booking: record, audit trail, and cost
    /// breakdown under the current pricing policy.
    ///
    /// # Errors
    ///
    /// `NotFound`, `Forbidden`, or `Persistence`.
    pub async fn booking_detail(
        &self,
        caller: &Caller,
        booking_id: BookingId,
    ) -> Result<BookingDetail> {
        let record = self.store.booking(booking_id).await?;
        let room = self.store.room(record.booking.room_id).await?;
        authorize(caller, &record, room.venue_id, "view")?;

        let history = self.store.reschedule_history(booking_id).await?;
        let room_cost = pricing::room_cost(&room, &record.booking.interval, self.policy.pricing);
        let addons_cost: Money = record.lines.iter().map(|l| l.subtotal).sum();
        let total_cost = record.booking.total_cost;

        Ok(BookingDetail {
            record,
            history,
            cost: CostBreakdown { room_cost, addons_cost, total_cost },
        })
    }

    // ========================================================================
    // Wallet surface
    // ========================================================================

    /// The user's wallet, created empty on first access.
    ///
    /// # Errors
    ///
    /// `Persistence` on store failure.
    pub async fn wallet_balance(&self, user: UserId) -> Result<Wallet> {
        self.store.wallet(user).await
    }

    /// A page of the user's ledger, newest first.
    ///
    /// # Errors
    ///
    /// `Persistence` on store failure.
    pub async fn ledger_entries(
        &self,
        user: UserId,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<LedgerEntry>> {
        self.store.ledger_entries(user, offset, limit).await
    }

    /// Adds funds to a wallet as a manual adjustment.
    ///
    /// # Errors
    ///
    /// `InvalidAmount` when `amount` is not positive; `Persistence` on
    /// store failure.
    #[tracing::instrument(skip(self, description, reference), fields(user = %user))]
    pub async fn deposit_funds(
        &self,
        user: UserId,
        amount: Money,
        description: Option<String>,
        reference: Option<String>,
    ) -> Result<(Wallet, LedgerEntry)> {
        self.store.append_adjustment(user, amount, description, reference).await
    }

    // ========================================================================
    // Internals
    // ========================================================================

    /// Resolves the requested add-ons and prices the booking. Repeated
    /// selections of one add-on are merged into a single line; an unknown
    /// add-on id is an `InvalidLineItem`, not a `NotFound`.
    async fn quote_for(
        &self,
        room: &Room,
        interval: &Interval,
        selections: &[AddonSelection],
    ) -> Result<Quote> {
        let mut merged: Vec<AddonSelection> = Vec::with_capacity(selections.len());
        for selection in selections {
            match merged.iter_mut().find(|s| s.addon_id == selection.addon_id) {
                Some(existing) => {
                    existing.quantity = existing.quantity.saturating_add(selection.quantity);
                }
                None => merged.push(*selection),
            }
        }

        let mut lines: Vec<(Addon, u32)> = Vec::with_capacity(merged.len());
        for selection in &merged {
            let addon = self.store.addon(selection.addon_id).await.map_err(|err| match err {
                BookingError::NotFound { .. } => BookingError::InvalidLineItem(format!(
                    "addon {} not found",
                    selection.addon_id
                )),
                other => other,
            })?;
            lines.push((addon, selection.quantity));
        }
        pricing::price(room, interval, &lines, self.policy.pricing)
    }

    /// Post-commit notification; failures are logged and dropped.
    async fn notify(&self, event: NotificationEvent, booking: BookingId) {
        if let Err(err) = self.notifier.notify(event, booking).await {
            tracing::warn!(?event, %booking, %err, "notification failed");
        }
    }
}

/// The shared role rule: admins always, moderators within their venue,
/// customers only on bookings they participate in.
fn authorize(
    caller: &Caller,
    record: &BookingRecord,
    venue: crate::types::VenueId,
    action: &str,
) -> Result<()> {
    let allowed = match caller.role {
        Role::Admin => true,
        Role::Moderator => caller.venue_scope == Some(venue),
        Role::Customer => record.is_participant(caller.user_id),
    };
    if allowed {
        Ok(())
    } else {
        Err(BookingError::Forbidden(format!(
            "not allowed to {action} booking {}",
            record.booking.id
        )))
    }
}

/// The booked start must be strictly in the future.
fn ensure_future_start(interval: &Interval, now: DateTime<Utc>) -> Result<()> {
    if interval.start() <= now {
        return Err(BookingError::InvalidInterval(format!(
            "start time {} must be in the future",
            interval.start()
        )));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::VenueId;
    use chrono::TimeZone;

    fn record_with_customer(user: Option<UserId>) -> BookingRecord {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap();
        let interval =
            Interval::new(now + chrono::Duration::hours(1), now + chrono::Duration::hours(3))
                .unwrap();
        BookingRecord {
            booking: Booking {
                id: BookingId::new(),
                room_id: RoomId::new(),
                interval,
                status: BookingStatus::Confirmed,
                total_cost: Money::from_dollars(100),
                rescheduled: false,
                original_interval: None,
                created_at: now,
                updated_at: now,
            },
            lines: Vec::new(),
            customers: vec![CustomerDetails {
                user_id: user,
                first_name: "Ada".to_string(),
                last_name: "Lovelace".to_string(),
                address: "1 Analytical Way".to_string(),
                phone: "555-0100".to_string(),
            }],
        }
    }

    #[test]
    fn admin_always_authorized() {
        let record = record_with_customer(None);
        assert!(authorize(&Caller::admin(UserId::new()), &record, VenueId::new(), "x").is_ok());
    }

    #[test]
    fn moderator_authorized_only_in_scope() {
        let record = record_with_customer(None);
        let venue = VenueId::new();
        let scoped = Caller::moderator(UserId::new(), venue);
        assert!(authorize(&scoped, &record, venue, "x").is_ok());
        assert!(authorize(&scoped, &record, VenueId::new(), "x").is_err());
    }

    #[test]
    fn customer_must_be_linked() {
        let user = UserId::new();
        let linked = record_with_customer(Some(user));
        let unlinked = record_with_customer(Some(UserId::new()));
        assert!(authorize(&Caller::customer(user), &linked, VenueId::new(), "x").is_ok());
        assert!(matches!(
            authorize(&Caller::customer(user), &unlinked, VenueId::new(), "x"),
            Err(BookingError::Forbidden(_))
        ));
    }

    #[test]
    fn future_start_is_strict() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap();
        let at_now = Interval::new(now, now + chrono::Duration::hours(1)).unwrap();
        let later = Interval::new(
            now + chrono::Duration::minutes(1),
            now + chrono::Duration::hours(1),
        )
        .unwrap();
        assert!(ensure_future_start(&at_now, now).is_err());
        assert!(ensure_future_start(&later, now).is_ok());
    }
}
