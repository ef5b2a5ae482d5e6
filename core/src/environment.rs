//! Injected dependencies: time and the notification collaborator.

use crate::types::BookingId;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Clock trait - abstracts time operations for testability
///
/// Production uses [`SystemClock`]; tests use a fixed clock from the
/// testing crate for deterministic refund tiers and future-start checks.
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> DateTime<Utc>;
}

/// System clock backed by `Utc::now()`
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Lifecycle events the notification sink is told about, after commit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotificationEvent {
    /// A booking was created and confirmed
    BookingConfirmed,
    /// A booking was rescheduled
    BookingRescheduled,
    /// A booking was cancelled
    BookingCancelled,
}

/// Notification delivery failure. Best-effort only: the lifecycle manager
/// logs it and never rolls back or retries.
#[derive(Error, Debug)]
#[error("notification failed: {0}")]
pub struct NotifyError(pub String);

/// Best-effort notification sink, invoked strictly after commit.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Delivers one lifecycle event for one booking.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError`] on delivery failure; callers log and move on.
    async fn notify(&self, event: NotificationEvent, booking: BookingId)
        -> Result<(), NotifyError>;
}

/// Notifier that only logs. The default collaborator when no delivery
/// channel is wired up.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(
        &self,
        event: NotificationEvent,
        booking: BookingId,
    ) -> Result<(), NotifyError> {
        tracing::info!(?event, %booking, "notification");
        Ok(())
    }
}
