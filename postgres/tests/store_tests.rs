//! Integration tests against a live Postgres.
//!
//! Ignored by default; run with a scratch database:
//!
//! ```sh
//! DATABASE_URL=postgres://localhost/roomhire_test cargo test -p roomhire-postgres -- --ignored
//! ```

#![allow(clippy::unwrap_used)]

use chrono::{Duration, Utc};
use roomhire_core::schedule::Interval;
use roomhire_core::store::{BookingStore, Write};
use roomhire_core::types::{
    Addon, AddonId, Booking, BookingId, BookingStatus, CustomerDetails, Money, Room, RoomId,
    UserId, VenueId,
};
use roomhire_core::wallet::Settlement;
use roomhire_postgres::{PostgresBookingStore, PostgresConfig};

async fn store() -> Option<PostgresBookingStore> {
    if std::env::var("DATABASE_URL").is_err() {
        return None;
    }
    let config = PostgresConfig::from_env().unwrap();
    let pool = config.connect().await.unwrap();
    let store = PostgresBookingStore::new(pool);
    store.migrate().await.unwrap();
    Some(store)
}

fn sample_room() -> Room {
    Room {
        id: RoomId::new(),
        venue_id: VenueId::new(),
        name: "Integration Studio".to_string(),
        capacity: 10,
        rate_per_hour: Money::from_dollars(50),
    }
}

fn sample_booking(room: RoomId, interval: Interval) -> Booking {
    let now = Utc::now();
    Booking {
        id: BookingId::new(),
        room_id: room,
        interval,
        status: BookingStatus::Confirmed,
        total_cost: Money::from_dollars(100),
        rescheduled: false,
        original_interval: None,
        created_at: now,
        updated_at: now,
    }
}

fn slot(from_hours: i64, to_hours: i64) -> Interval {
    let now = Utc::now();
    Interval::new(now + Duration::hours(from_hours), now + Duration::hours(to_hours)).unwrap()
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn create_read_and_cancel_round_trip() {
    let Some(store) = store().await else { return };
    let room = sample_room();
    store.insert_room(&room).await.unwrap();

    let user = UserId::new();
    let booking = sample_booking(room.id, slot(72, 74));
    store
        .persist(Write::Create {
            booking: booking.clone(),
            lines: Vec::new(),
            customers: vec![CustomerDetails {
                user_id: Some(user),
                first_name: "Ada".to_string(),
                last_name: "Lovelace".to_string(),
                address: "1 Analytical Way".to_string(),
                phone: "555-0100".to_string(),
            }],
        })
        .await
        .unwrap();

    let record = store.booking(booking.id).await.unwrap();
    assert_eq!(record.booking.interval, booking.interval);
    assert_eq!(record.customers.len(), 1);
    assert_eq!(record.owner(), Some(user));

    let cancelled = Booking { status: BookingStatus::Cancelled, ..booking.clone() };
    let persisted = store
        .persist(Write::Cancel {
            booking: cancelled,
            settlement: Settlement::Refund {
                amount: Money::from_dollars(75),
                description: "test refund".to_string(),
            },
            settle_for: user,
        })
        .await
        .unwrap();

    assert_eq!(persisted.settlement.refunded, Money::from_dollars(75));
    assert_eq!(persisted.wallet.unwrap().balance, Money::from_dollars(75));

    let entries = store.ledger_entries(user, 0, 10).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].amount, Money::from_dollars(75));
    assert_eq!(entries[0].booking_id, Some(booking.id));
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn overlapping_create_is_rejected_by_the_store() {
    let Some(store) = store().await else { return };
    let room = sample_room();
    store.insert_room(&room).await.unwrap();

    let interval = slot(48, 50);
    store
        .persist(Write::Create {
            booking: sample_booking(room.id, interval),
            lines: Vec::new(),
            customers: Vec::new(),
        })
        .await
        .unwrap();

    let overlapping = slot(49, 51);
    let result = store
        .persist(Write::Create {
            booking: sample_booking(room.id, overlapping),
            lines: Vec::new(),
            customers: Vec::new(),
        })
        .await;
    assert!(matches!(result, Err(roomhire_core::error::BookingError::SlotUnavailable)));
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn adjustments_update_the_wallet_atomically() {
    let Some(store) = store().await else { return };
    let user = UserId::new();

    let (wallet, entry) = store
        .append_adjustment(user, Money::from_dollars(40), None, Some("ref-1".to_string()))
        .await
        .unwrap();
    assert_eq!(wallet.balance, Money::from_dollars(40));
    assert_eq!(entry.reference.as_deref(), Some("ref-1"));

    let reloaded = store.wallet(user).await.unwrap();
    assert_eq!(reloaded.balance, Money::from_dollars(40));
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn addon_lookup_round_trips() {
    let Some(store) = store().await else { return };
    let addon = Addon {
        id: AddonId::new(),
        venue_id: VenueId::new(),
        name: "Projector".to_string(),
        price: Money::from_dollars(25),
    };
    store.insert_addon(&addon).await.unwrap();
    assert_eq!(store.addon(addon.id).await.unwrap(), addon);
}
