//! PostgreSQL-backed [`BookingStore`].
//!
//! Concurrency protocol: every write-set commits in one transaction that
//! first takes a per-room advisory lock, re-runs the conflict predicate,
//! then settles the wallet under a `FOR UPDATE` row lock. A `btree_gist`
//! exclusion constraint on `(room_id, tstzrange)` backstops the protocol so
//! overlapping live bookings cannot be committed by any code path.
//!
//! Queries are runtime-bound (`sqlx::query` with `.bind`) so the crate
//! builds without a `DATABASE_URL`.

pub mod config;

pub use config::{ConfigError, PostgresConfig};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use roomhire_core::environment::{Clock, SystemClock};
use roomhire_core::error::{BookingError, Result};
use roomhire_core::schedule::Interval;
use roomhire_core::store::{BookingStore, Persisted, Write};
use roomhire_core::types::{
    Addon, AddonId, Booking, BookingId, BookingLine, BookingRecord, BookingStatus,
    CustomerDetails, HistoryEntryId, LedgerEntryId, Money, RescheduleEntry, Room, RoomId, UserId,
    VenueId,
};
use roomhire_core::wallet::{
    self, EntryKind, EntryStatus, LedgerEntry, SettlementOutcome, Wallet,
};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use std::sync::Arc;
use uuid::Uuid;

/// The production booking store.
pub struct PostgresBookingStore {
    pool: PgPool,
    clock: Arc<dyn Clock>,
}

impl PostgresBookingStore {
    /// Wraps an existing pool, stamping ledger writes with the system clock
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool, clock: Arc::new(SystemClock) }
    }

    /// Wraps an existing pool with an injected clock
    #[must_use]
    pub fn with_clock(pool: PgPool, clock: Arc<dyn Clock>) -> Self {
        Self { pool, clock }
    }

    /// Runs the embedded migrations.
    ///
    /// # Errors
    ///
    /// `Persistence` when a migration fails.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| BookingError::Persistence(e.to_string()))
    }

    /// Seeds a room; used by provisioning and integration tests.
    ///
    /// # Errors
    ///
    /// `Persistence` on insert failure.
    pub async fn insert_room(&self, room: &Room) -> Result<()> {
        sqlx::query(
            "INSERT INTO rooms (id, venue_id, name, capacity, rate_per_hour)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(room.id.as_uuid())
        .bind(room.venue_id.as_uuid())
        .bind(&room.name)
        .bind(int_from_u32(room.capacity)?)
        .bind(room.rate_per_hour.cents())
        .execute(&self.pool)
        .await
        .map_err(pg_err)?;
        Ok(())
    }

    /// Seeds an add-on; used by provisioning and integration tests.
    ///
    /// # Errors
    ///
    /// `Persistence` on insert failure.
    pub async fn insert_addon(&self, addon: &Addon) -> Result<()> {
        sqlx::query(
            "INSERT INTO addons (id, venue_id, name, price) VALUES ($1, $2, $3, $4)",
        )
        .bind(addon.id.as_uuid())
        .bind(addon.venue_id.as_uuid())
        .bind(&addon.name)
        .bind(addon.price.cents())
        .execute(&self.pool)
        .await
        .map_err(pg_err)?;
        Ok(())
    }

    async fn lines_for(&self, booking: BookingId) -> Result<Vec<BookingLine>> {
        let rows = sqlx::query(
            "SELECT addon_id, quantity, subtotal FROM booking_lines WHERE booking_id = $1",
        )
        .bind(booking.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(pg_err)?;
        rows.iter().map(line_from_row).collect()
    }

    async fn customers_for(&self, booking: BookingId) -> Result<Vec<CustomerDetails>> {
        let rows = sqlx::query(
            "SELECT user_id, first_name, last_name, address, phone
             FROM booking_customers WHERE booking_id = $1 ORDER BY position",
        )
        .bind(booking.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(pg_err)?;
        rows.iter().map(customer_from_row).collect()
    }
}

#[async_trait]
impl BookingStore for PostgresBookingStore {
    async fn room(&self, id: RoomId) -> Result<Room> {
        let row = sqlx::query(
            "SELECT id, venue_id, name, capacity, rate_per_hour FROM rooms WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(pg_err)?
        .ok_or_else(|| BookingError::not_found("room", id))?;
        room_from_row(&row)
    }

    async fn addon(&self, id: AddonId) -> Result<Addon> {
        let row = sqlx::query("SELECT id, venue_id, name, price FROM addons WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(pg_err)?
            .ok_or_else(|| BookingError::not_found("addon", id))?;
        addon_from_row(&row)
    }

    async fn booking(&self, id: BookingId) -> Result<BookingRecord> {
        let row = sqlx::query(
            "SELECT id, room_id, start_time, end_time, status, total_cost, rescheduled,
                    original_start, original_end, created_at, updated_at
             FROM bookings WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(pg_err)?
        .ok_or_else(|| BookingError::not_found("booking", id))?;

        Ok(BookingRecord {
            booking: booking_from_row(&row)?,
            lines: self.lines_for(id).await?,
            customers: self.customers_for(id).await?,
        })
    }

    async fn bookings_for_room(&self, room: RoomId, window: &Interval) -> Result<Vec<Booking>> {
        let rows = sqlx::query(
            "SELECT id, room_id, start_time, end_time, status, total_cost, rescheduled,
                    original_start, original_end, created_at, updated_at
             FROM bookings
             WHERE room_id = $1 AND start_time < $3 AND end_time > $2",
        )
        .bind(room.as_uuid())
        .bind(window.start())
        .bind(window.end())
        .fetch_all(&self.pool)
        .await
        .map_err(pg_err)?;
        rows.iter().map(booking_from_row).collect()
    }

    async fn bookings_for_user(&self, user: UserId) -> Result<Vec<Booking>> {
        let rows = sqlx::query(
            "SELECT DISTINCT b.id, b.room_id, b.start_time, b.end_time, b.status,
                    b.total_cost, b.rescheduled, b.original_start, b.original_end,
                    b.created_at, b.updated_at
             FROM bookings b
             JOIN booking_customers c ON c.booking_id = b.id
             WHERE c.user_id = $1
             ORDER BY b.created_at DESC",
        )
        .bind(user.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(pg_err)?;
        rows.iter().map(booking_from_row).collect()
    }

    async fn reschedule_history(&self, booking: BookingId) -> Result<Vec<RescheduleEntry>> {
        let rows = sqlx::query(
            "SELECT id, booking_id, original_room_id, original_start, original_end,
                    original_total_cost, new_room_id, new_start, new_end, new_total_cost,
                    price_difference, refund_amount, additional_amount, reason, created_at
             FROM booking_reschedule_history
             WHERE booking_id = $1
             ORDER BY created_at DESC",
        )
        .bind(booking.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(pg_err)?;
        rows.iter().map(history_from_row).collect()
    }

    async fn wallet(&self, user: UserId) -> Result<Wallet> {
        let now = self.clock.now();
        sqlx::query(
            "INSERT INTO wallets (user_id, balance, created_at, updated_at)
             VALUES ($1, 0, $2, $2) ON CONFLICT (user_id) DO NOTHING",
        )
        .bind(user.as_uuid())
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(pg_err)?;

        let row = sqlx::query(
            "SELECT user_id, balance, created_at, updated_at FROM wallets WHERE user_id = $1",
        )
        .bind(user.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(pg_err)?;
        wallet_from_row(&row)
    }

    async fn ledger_entries(
        &self,
        user: UserId,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<LedgerEntry>> {
        let rows = sqlx::query(
            "SELECT id, user_id, booking_id, amount, kind, status, description, reference,
                    created_at
             FROM wallet_ledger
             WHERE user_id = $1
             ORDER BY created_at DESC
             OFFSET $2 LIMIT $3",
        )
        .bind(user.as_uuid())
        .bind(i64::from(offset))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(pg_err)?;
        rows.iter().map(entry_from_row).collect()
    }

    #[tracing::instrument(skip(self, description, reference), fields(user = %user))]
    async fn append_adjustment(
        &self,
        user: UserId,
        amount: Money,
        description: Option<String>,
        reference: Option<String>,
    ) -> Result<(Wallet, LedgerEntry)> {
        let now = self.clock.now();
        let mut tx = self.pool.begin().await.map_err(pg_err)?;

        let mut wallet = lock_wallet(&mut tx, user, now).await?;
        let entry = wallet::adjustment_entry(&mut wallet, amount, description, reference, now)?;
        insert_entry(&mut tx, &entry).await?;
        flush_wallet(&mut tx, &wallet).await?;

        tx.commit().await.map_err(pg_err)?;
        Ok((wallet, entry))
    }

    #[tracing::instrument(skip(self, write), fields(booking = %write.booking().id))]
    async fn persist(&self, write: Write) -> Result<Persisted> {
        let now = self.clock.now();
        let mut tx = self.pool.begin().await.map_err(pg_err)?;

        let result = match write {
            Write::Create { booking, lines, customers } => {
                lock_room(&mut tx, booking.room_id).await?;
                ensure_free(&mut tx, &booking).await?;
                insert_booking(&mut tx, &booking).await?;
                replace_lines(&mut tx, booking.id, &lines).await?;
                insert_customers(&mut tx, booking.id, &customers).await?;
                Persisted { booking, settlement: SettlementOutcome::default(), wallet: None }
            }
            Write::Reschedule { booking, lines, mut history, settlement, settle_for } => {
                lock_room(&mut tx, booking.room_id).await?;
                ensure_free(&mut tx, &booking).await?;

                let mut wallet = lock_wallet(&mut tx, settle_for, now).await?;
                let outcome = settlement.apply(&mut wallet, Some(booking.id), now);
                for entry in &outcome.entries {
                    insert_entry(&mut tx, entry).await?;
                }
                flush_wallet(&mut tx, &wallet).await?;

                history.refund_amount = outcome.refunded;
                history.additional_amount = outcome.additional_due;
                update_booking(&mut tx, &booking).await?;
                replace_lines(&mut tx, booking.id, &lines).await?;
                insert_history(&mut tx, &history).await?;

                Persisted { booking, settlement: outcome, wallet: Some(wallet) }
            }
            Write::Cancel { booking, settlement, settle_for } => {
                let mut wallet = lock_wallet(&mut tx, settle_for, now).await?;
                let outcome = settlement.apply(&mut wallet, Some(booking.id), now);
                for entry in &outcome.entries {
                    insert_entry(&mut tx, entry).await?;
                }
                flush_wallet(&mut tx, &wallet).await?;
                update_booking(&mut tx, &booking).await?;

                Persisted { booking, settlement: outcome, wallet: Some(wallet) }
            }
        };

        tx.commit().await.map_err(pg_err)?;
        Ok(result)
    }
}

// ============================================================================
// Transaction helpers
// ============================================================================

/// Serializes writers on one room for the rest of the transaction.
async fn lock_room(tx: &mut Transaction<'_, Postgres>, room: RoomId) -> Result<()> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 42))")
        .bind(room.as_uuid().to_string())
        .execute(&mut **tx)
        .await
        .map_err(pg_err)?;
    Ok(())
}

/// Authoritative conflict re-check, run while holding the room lock.
async fn ensure_free(tx: &mut Transaction<'_, Postgres>, booking: &Booking) -> Result<()> {
    let conflict: bool = sqlx::query_scalar(
        "SELECT EXISTS (
             SELECT 1 FROM bookings
             WHERE room_id = $1
               AND status <> 'cancelled'
               AND start_time < $3 AND end_time > $2
               AND id <> $4
         )",
    )
    .bind(booking.room_id.as_uuid())
    .bind(booking.interval.start())
    .bind(booking.interval.end())
    .bind(booking.id.as_uuid())
    .fetch_one(&mut **tx)
    .await
    .map_err(pg_err)?;

    if conflict {
        return Err(BookingError::SlotUnavailable);
    }
    Ok(())
}

/// Get-or-create plus `FOR UPDATE`: the returned snapshot is stable until
/// commit, so the charge clamp is race-free.
async fn lock_wallet(
    tx: &mut Transaction<'_, Postgres>,
    user: UserId,
    now: DateTime<Utc>,
) -> Result<Wallet> {
    sqlx::query(
        "INSERT INTO wallets (user_id, balance, created_at, updated_at)
         VALUES ($1, 0, $2, $2) ON CONFLICT (user_id) DO NOTHING",
    )
    .bind(user.as_uuid())
    .bind(now)
    .execute(&mut **tx)
    .await
    .map_err(pg_err)?;

    let row = sqlx::query(
        "SELECT user_id, balance, created_at, updated_at
         FROM wallets WHERE user_id = $1 FOR UPDATE",
    )
    .bind(user.as_uuid())
    .fetch_one(&mut **tx)
    .await
    .map_err(pg_err)?;
    wallet_from_row(&row)
}

async fn flush_wallet(tx: &mut Transaction<'_, Postgres>, wallet: &Wallet) -> Result<()> {
    sqlx::query("UPDATE wallets SET balance = $2, updated_at = $3 WHERE user_id = $1")
        .bind(wallet.user_id.as_uuid())
        .bind(wallet.balance.cents())
        .bind(wallet.updated_at)
        .execute(&mut **tx)
        .await
        .map_err(pg_err)?;
    Ok(())
}

async fn insert_entry(tx: &mut Transaction<'_, Postgres>, entry: &LedgerEntry) -> Result<()> {
    sqlx::query(
        "INSERT INTO wallet_ledger
             (id, user_id, booking_id, amount, kind, status, description, reference, created_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
    )
    .bind(entry.id.as_uuid())
    .bind(entry.user_id.as_uuid())
    .bind(entry.booking_id.map(|b| *b.as_uuid()))
    .bind(entry.amount.cents())
    .bind(kind_str(entry.kind))
    .bind(status_str(entry.status))
    .bind(entry.description.as_deref())
    .bind(entry.reference.as_deref())
    .bind(entry.created_at)
    .execute(&mut **tx)
    .await
    .map_err(pg_err)?;
    Ok(())
}

async fn insert_booking(tx: &mut Transaction<'_, Postgres>, booking: &Booking) -> Result<()> {
    sqlx::query(
        "INSERT INTO bookings
             (id, room_id, start_time, end_time, status, total_cost, rescheduled,
              original_start, original_end, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
    )
    .bind(booking.id.as_uuid())
    .bind(booking.room_id.as_uuid())
    .bind(booking.interval.start())
    .bind(booking.interval.end())
    .bind(booking.status.to_string())
    .bind(booking.total_cost.cents())
    .bind(booking.rescheduled)
    .bind(booking.original_interval.map(|i| i.start()))
    .bind(booking.original_interval.map(|i| i.end()))
    .bind(booking.created_at)
    .bind(booking.updated_at)
    .execute(&mut **tx)
    .await
    .map_err(pg_err)?;
    Ok(())
}

async fn update_booking(tx: &mut Transaction<'_, Postgres>, booking: &Booking) -> Result<()> {
    let updated = sqlx::query(
        "UPDATE bookings
         SET room_id = $2, start_time = $3, end_time = $4, status = $5, total_cost = $6,
             rescheduled = $7, original_start = $8, original_end = $9, updated_at = $10
         WHERE id = $1",
    )
    .bind(booking.id.as_uuid())
    .bind(booking.room_id.as_uuid())
    .bind(booking.interval.start())
    .bind(booking.interval.end())
    .bind(booking.status.to_string())
    .bind(booking.total_cost.cents())
    .bind(booking.rescheduled)
    .bind(booking.original_interval.map(|i| i.start()))
    .bind(booking.original_interval.map(|i| i.end()))
    .bind(booking.updated_at)
    .execute(&mut **tx)
    .await
    .map_err(pg_err)?;

    if updated.rows_affected() == 0 {
        return Err(BookingError::not_found("booking", booking.id));
    }
    Ok(())
}

async fn replace_lines(
    tx: &mut Transaction<'_, Postgres>,
    booking: BookingId,
    lines: &[BookingLine],
) -> Result<()> {
    sqlx::query("DELETE FROM booking_lines WHERE booking_id = $1")
        .bind(booking.as_uuid())
        .execute(&mut **tx)
        .await
        .map_err(pg_err)?;
    for line in lines {
        sqlx::query(
            "INSERT INTO booking_lines (booking_id, addon_id, quantity, subtotal)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(booking.as_uuid())
        .bind(line.addon_id.as_uuid())
        .bind(int_from_u32(line.quantity)?)
        .bind(line.subtotal.cents())
        .execute(&mut **tx)
        .await
        .map_err(pg_err)?;
    }
    Ok(())
}

async fn insert_customers(
    tx: &mut Transaction<'_, Postgres>,
    booking: BookingId,
    customers: &[CustomerDetails],
) -> Result<()> {
    for (position, customer) in customers.iter().enumerate() {
        sqlx::query(
            "INSERT INTO booking_customers
                 (booking_id, position, user_id, first_name, last_name, address, phone)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(booking.as_uuid())
        .bind(
            i32::try_from(position)
                .map_err(|_| BookingError::Persistence("too many customers".to_string()))?,
        )
        .bind(customer.user_id.map(|u| *u.as_uuid()))
        .bind(&customer.first_name)
        .bind(&customer.last_name)
        .bind(&customer.address)
        .bind(&customer.phone)
        .execute(&mut **tx)
        .await
        .map_err(pg_err)?;
    }
    Ok(())
}

async fn insert_history(
    tx: &mut Transaction<'_, Postgres>,
    history: &RescheduleEntry,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO booking_reschedule_history
             (id, booking_id, original_room_id, original_start, original_end,
              original_total_cost, new_room_id, new_start, new_end, new_total_cost,
              price_difference, refund_amount, additional_amount, reason, created_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)",
    )
    .bind(history.id.as_uuid())
    .bind(history.booking_id.as_uuid())
    .bind(history.original_room_id.as_uuid())
    .bind(history.original_interval.start())
    .bind(history.original_interval.end())
    .bind(history.original_total_cost.cents())
    .bind(history.new_room_id.as_uuid())
    .bind(history.new_interval.start())
    .bind(history.new_interval.end())
    .bind(history.new_total_cost.cents())
    .bind(history.price_difference.cents())
    .bind(history.refund_amount.cents())
    .bind(history.additional_amount.cents())
    .bind(history.reason.as_deref())
    .bind(history.created_at)
    .execute(&mut **tx)
    .await
    .map_err(pg_err)?;
    Ok(())
}

// ============================================================================
// Row mapping
// ============================================================================

fn room_from_row(row: &PgRow) -> Result<Room> {
    Ok(Room {
        id: RoomId::from_uuid(get(row, "id")?),
        venue_id: VenueId::from_uuid(get(row, "venue_id")?),
        name: get(row, "name")?,
        capacity: u32_from_int(get(row, "capacity")?)?,
        rate_per_hour: Money::from_cents(get(row, "rate_per_hour")?),
    })
}

fn addon_from_row(row: &PgRow) -> Result<Addon> {
    Ok(Addon {
        id: AddonId::from_uuid(get(row, "id")?),
        venue_id: VenueId::from_uuid(get(row, "venue_id")?),
        name: get(row, "name")?,
        price: Money::from_cents(get(row, "price")?),
    })
}

fn booking_from_row(row: &PgRow) -> Result<Booking> {
    let original_start: Option<DateTime<Utc>> = get(row, "original_start")?;
    let original_end: Option<DateTime<Utc>> = get(row, "original_end")?;
    let original_interval = match (original_start, original_end) {
        (Some(start), Some(end)) => Some(Interval::new(start, end)?),
        _ => None,
    };

    Ok(Booking {
        id: BookingId::from_uuid(get(row, "id")?),
        room_id: RoomId::from_uuid(get(row, "room_id")?),
        interval: Interval::new(get(row, "start_time")?, get(row, "end_time")?)?,
        status: parse_status(&get::<String>(row, "status")?)?,
        total_cost: Money::from_cents(get(row, "total_cost")?),
        rescheduled: get(row, "rescheduled")?,
        original_interval,
        created_at: get(row, "created_at")?,
        updated_at: get(row, "updated_at")?,
    })
}

fn line_from_row(row: &PgRow) -> Result<BookingLine> {
    Ok(BookingLine {
        addon_id: AddonId::from_uuid(get(row, "addon_id")?),
        quantity: u32_from_int(get(row, "quantity")?)?,
        subtotal: Money::from_cents(get(row, "subtotal")?),
    })
}

fn customer_from_row(row: &PgRow) -> Result<CustomerDetails> {
    Ok(CustomerDetails {
        user_id: get::<Option<Uuid>>(row, "user_id")?.map(UserId::from_uuid),
        first_name: get(row, "first_name")?,
        last_name: get(row, "last_name")?,
        address: get(row, "address")?,
        phone: get(row, "phone")?,
    })
}

fn history_from_row(row: &PgRow) -> Result<RescheduleEntry> {
    Ok(RescheduleEntry {
        id: HistoryEntryId::from_uuid(get(row, "id")?),
        booking_id: BookingId::from_uuid(get(row, "booking_id")?),
        original_room_id: RoomId::from_uuid(get(row, "original_room_id")?),
        original_interval: Interval::new(get(row, "original_start")?, get(row, "original_end")?)?,
        original_total_cost: Money::from_cents(get(row, "original_total_cost")?),
        new_room_id: RoomId::from_uuid(get(row, "new_room_id")?),
        new_interval: Interval::new(get(row, "new_start")?, get(row, "new_end")?)?,
        new_total_cost: Money::from_cents(get(row, "new_total_cost")?),
        price_difference: Money::from_cents(get(row, "price_difference")?),
        refund_amount: Money::from_cents(get(row, "refund_amount")?),
        additional_amount: Money::from_cents(get(row, "additional_amount")?),
        reason: get(row, "reason")?,
        created_at: get(row, "created_at")?,
    })
}

fn wallet_from_row(row: &PgRow) -> Result<Wallet> {
    Ok(Wallet {
        user_id: UserId::from_uuid(get(row, "user_id")?),
        balance: Money::from_cents(get(row, "balance")?),
        created_at: get(row, "created_at")?,
        updated_at: get(row, "updated_at")?,
    })
}

fn entry_from_row(row: &PgRow) -> Result<LedgerEntry> {
    Ok(LedgerEntry {
        id: LedgerEntryId::from_uuid(get(row, "id")?),
        user_id: UserId::from_uuid(get(row, "user_id")?),
        booking_id: get::<Option<Uuid>>(row, "booking_id")?.map(BookingId::from_uuid),
        amount: Money::from_cents(get(row, "amount")?),
        kind: parse_kind(&get::<String>(row, "kind")?)?,
        status: parse_entry_status(&get::<String>(row, "status")?)?,
        description: get(row, "description")?,
        reference: get(row, "reference")?,
        created_at: get(row, "created_at")?,
    })
}

fn get<'r, T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>>(
    row: &'r PgRow,
    column: &str,
) -> Result<T> {
    row.try_get(column).map_err(pg_err)
}

// ============================================================================
// Value conversions
// ============================================================================

fn pg_err(err: sqlx::Error) -> BookingError {
    if let sqlx::Error::Database(db) = &err {
        // The exclusion constraint is the backstop for the advisory-lock
        // protocol; surface it as the domain conflict it is.
        if db.constraint() == Some("bookings_no_overlap") {
            return BookingError::SlotUnavailable;
        }
    }
    BookingError::Persistence(err.to_string())
}

fn int_from_u32(value: u32) -> Result<i32> {
    i32::try_from(value)
        .map_err(|_| BookingError::Persistence(format!("integer column overflow: {value}")))
}

fn u32_from_int(value: i32) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| BookingError::Persistence(format!("negative integer column: {value}")))
}

const fn kind_str(kind: EntryKind) -> &'static str {
    match kind {
        EntryKind::Refund => "refund",
        EntryKind::Payment => "payment",
        EntryKind::Adjustment => "adjustment",
    }
}

const fn status_str(status: EntryStatus) -> &'static str {
    match status {
        EntryStatus::Completed => "completed",
        EntryStatus::Pending => "pending",
        EntryStatus::Failed => "failed",
    }
}

fn parse_status(raw: &str) -> Result<BookingStatus> {
    match raw {
        "pending" => Ok(BookingStatus::Pending),
        "confirmed" => Ok(BookingStatus::Confirmed),
        "cancelled" => Ok(BookingStatus::Cancelled),
        other => Err(BookingError::Persistence(format!("unknown booking status: {other}"))),
    }
}

fn parse_kind(raw: &str) -> Result<EntryKind> {
    match raw {
        "refund" => Ok(EntryKind::Refund),
        "payment" => Ok(EntryKind::Payment),
        "adjustment" => Ok(EntryKind::Adjustment),
        other => Err(BookingError::Persistence(format!("unknown ledger kind: {other}"))),
    }
}

fn parse_entry_status(raw: &str) -> Result<EntryStatus> {
    match raw {
        "completed" => Ok(EntryStatus::Completed),
        "pending" => Ok(EntryStatus::Pending),
        "failed" => Ok(EntryStatus::Failed),
        other => Err(BookingError::Persistence(format!("unknown ledger status: {other}"))),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn enum_text_round_trips() {
        for kind in [EntryKind::Refund, EntryKind::Payment, EntryKind::Adjustment] {
            assert_eq!(parse_kind(kind_str(kind)).unwrap(), kind);
        }
        for status in [EntryStatus::Completed, EntryStatus::Pending, EntryStatus::Failed] {
            assert_eq!(parse_entry_status(status_str(status)).unwrap(), status);
        }
        for status in
            [BookingStatus::Pending, BookingStatus::Confirmed, BookingStatus::Cancelled]
        {
            assert_eq!(parse_status(&status.to_string()).unwrap(), status);
        }
        assert!(parse_status("unknown").is_err());
    }
}
