//! Typed errors for the booking core.
//!
//! Every failure the core can produce is a variant here; the transport layer
//! above maps variants to response codes. Nothing is retried automatically
//! inside the core.

use crate::types::BookingId;
use thiserror::Error;

/// Result alias used throughout the core
pub type Result<T> = std::result::Result<T, BookingError>;

/// Errors produced by the booking core.
///
/// A shortfall during reschedule settlement is deliberately *not* an error:
/// partial payment never blocks a reschedule, so the remainder is reported as
/// `additional_due` on the outcome instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BookingError {
    /// The requested interval overlaps a non-cancelled booking on the room.
    /// Recoverable: the caller should pick another interval.
    #[error("time slot not available: conflicting reservation on the room")]
    SlotUnavailable,

    /// End not after start, or start not strictly in the future
    #[error("invalid interval: {0}")]
    InvalidInterval(String),

    /// Add-on not found, or offered by a different venue than the room
    #[error("invalid line item: {0}")]
    InvalidLineItem(String),

    /// Role or ownership check failed
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The booking is already cancelled; `cancelled` is terminal
    #[error("booking {0} is already cancelled")]
    AlreadyCancelled(BookingId),

    /// The booking has already used its single permitted reschedule
    #[error("booking {0} has already been rescheduled once")]
    AlreadyRescheduled(BookingId),

    /// Reschedules may only move a booking to a room in the same venue
    #[error("cannot change to a room in a different venue")]
    CrossVenueRoomChange,

    /// Unknown room, add-on, booking, or wallet
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity kind, e.g. `"room"`
        entity: &'static str,
        /// The identifier that failed to resolve
        id: String,
    },

    /// A deposit or adjustment amount that must be positive was not
    #[error("amount must be positive, got {0}")]
    InvalidAmount(crate::types::Money),

    /// The transactional store failed; the whole operation was rolled back
    #[error("persistence failure: {0}")]
    Persistence(String),
}

impl BookingError {
    /// Shorthand for a `NotFound` error
    #[must_use]
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound { entity, id: id.to_string() }
    }
}
