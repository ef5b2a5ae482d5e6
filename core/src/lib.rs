//! Core domain engine for venue room booking.
//!
//! This crate holds the pure scheduling, pricing, refund, and wallet
//! engines plus the booking lifecycle manager that orchestrates them.
//! Storage is abstracted behind [`store::BookingStore`]; the only
//! implementations live in the companion `roomhire-postgres` and
//! `roomhire-testing` crates.
//!
//! # Design
//!
//! - Time intervals are half-open `[start, end)`; bookings that merely
//!   touch at an endpoint never conflict.
//! - All money is integer cents ([`types::Money`]); ledger debits are
//!   negative amounts.
//! - The store's `persist` is the single atomic commit point for every
//!   state change. Validation runs against a snapshot first, then the
//!   store re-checks conflicts and clamps wallet charges inside its
//!   critical section.

pub mod booking;
pub mod config;
pub mod environment;
pub mod error;
pub mod pricing;
pub mod refund;
pub mod schedule;
pub mod store;
pub mod types;
pub mod wallet;

pub use booking::{
    BookingDetail, BookingService, CancellationOutcome, CostBreakdown, NewBooking,
    RescheduleOutcome, RescheduleRequest,
};
pub use config::BookingPolicy;
pub use environment::{Clock, LogNotifier, NotificationEvent, Notifier, SystemClock};
pub use error::{BookingError, Result};
pub use pricing::{HourRounding, PricingPolicy, Quote};
pub use refund::{RefundBreakdown, calculate_refund};
pub use schedule::{Interval, OperatingHours, UnavailableSlot};
pub use store::{BookingStore, Persisted, Write};
pub use types::{
    Addon, AddonId, AddonSelection, Booking, BookingId, BookingLine, BookingRecord, BookingStatus,
    Caller, CustomerDetails, HistoryEntryId, LedgerEntryId, Money, RescheduleEntry, Role, Room,
    RoomId, UserId, VenueId,
};
pub use wallet::{EntryKind, EntryStatus, LedgerEntry, Settlement, SettlementOutcome, Wallet};
