//! Wallet ledger: append-only transaction log plus a derived balance.
//!
//! The core invariant: a wallet's balance always equals the sum of its
//! completed entry amounts. Stores enforce it by applying [`Settlement`]s
//! inside their per-account critical section; [`balance_matches_entries`]
//! lets tests and audits verify it.

use crate::error::{BookingError, Result};
use crate::types::{BookingId, LedgerEntryId, Money, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of a ledger movement
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// Credit from a cancellation or reschedule price drop
    Refund,
    /// Debit covering a reschedule price increase
    Payment,
    /// Manual balance adjustment
    Adjustment,
}

/// Processing status of a ledger entry. Only `Completed` entries count
/// toward the balance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    /// Applied to the balance
    Completed,
    /// Recorded but not yet applied
    Pending,
    /// Recorded and abandoned
    Failed,
}

/// One append-only ledger row. Amounts are signed: credits positive,
/// debits negative.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Entry identity
    pub id: LedgerEntryId,
    /// Account holder
    pub user_id: UserId,
    /// The booking event that caused this movement, if any
    pub booking_id: Option<BookingId>,
    /// Signed amount
    pub amount: Money,
    /// Movement kind
    pub kind: EntryKind,
    /// Processing status
    pub status: EntryStatus,
    /// Human-readable description
    pub description: Option<String>,
    /// External payment reference, if any
    pub reference: Option<String>,
    /// When the entry was appended
    pub created_at: DateTime<Utc>,
}

/// One balance per account holder, materialized from completed entries.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Wallet {
    /// Account holder
    pub user_id: UserId,
    /// Sum of completed entry amounts
    pub balance: Money,
    /// When the wallet was created
    pub created_at: DateTime<Utc>,
    /// Last balance change
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    /// A fresh wallet with zero balance
    #[must_use]
    pub const fn new(user_id: UserId, now: DateTime<Utc>) -> Self {
        Self { user_id, balance: Money::ZERO, created_at: now, updated_at: now }
    }
}

/// Whether a wallet's materialized balance equals the sum of its completed
/// entries. Must hold at all times, even after partial failures.
#[must_use]
pub fn balance_matches_entries(wallet: &Wallet, entries: &[LedgerEntry]) -> bool {
    let sum: Money = entries
        .iter()
        .filter(|e| e.user_id == wallet.user_id && e.status == EntryStatus::Completed)
        .map(|e| e.amount)
        .sum();
    wallet.balance == sum
}

/// A ledger movement the lifecycle manager asks the store to apply
/// atomically with the rest of a write-set.
///
/// `Charge` is clamped to the available balance *inside the store's critical
/// section*; the uncovered remainder is informational and never blocks the
/// operation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Settlement {
    /// No money moves
    None,
    /// Credit the full amount to the account
    Refund {
        /// Amount to credit; must be positive
        amount: Money,
        /// Ledger entry description
        description: String,
    },
    /// Debit up to the available balance; the shortfall is reported
    Charge {
        /// Amount owed; must be positive
        amount: Money,
        /// Ledger entry description
        description: String,
    },
}

impl Settlement {
    /// Builds the settlement for a reschedule price delta
    /// (`new_cost - original_cost`).
    #[must_use]
    pub fn for_price_delta(delta: Money, description: String) -> Self {
        if delta.is_negative() {
            Self::Refund { amount: delta.abs(), description }
        } else if delta.is_positive() {
            Self::Charge { amount: delta, description }
        } else {
            Self::None
        }
    }

    /// Applies the movement to a wallet, producing the entries to append.
    ///
    /// Must be called while holding the account's critical section: the
    /// charge clamp reads the balance it mutates.
    #[must_use]
    pub fn apply(
        &self,
        wallet: &mut Wallet,
        booking_id: Option<BookingId>,
        now: DateTime<Utc>,
    ) -> SettlementOutcome {
        match self {
            Self::None => SettlementOutcome::default(),
            Self::Refund { amount, description } => {
                wallet.balance = wallet.balance + *amount;
                wallet.updated_at = now;
                SettlementOutcome {
                    refunded: *amount,
                    entries: vec![LedgerEntry {
                        id: LedgerEntryId::new(),
                        user_id: wallet.user_id,
                        booking_id,
                        amount: *amount,
                        kind: EntryKind::Refund,
                        status: EntryStatus::Completed,
                        description: Some(description.clone()),
                        reference: None,
                        created_at: now,
                    }],
                    ..SettlementOutcome::default()
                }
            }
            Self::Charge { amount, description } => {
                let covered = wallet.balance.max(Money::ZERO).min(*amount);
                let additional_due = *amount - covered;
                let mut entries = Vec::new();
                if covered.is_positive() {
                    wallet.balance = wallet.balance - covered;
                    wallet.updated_at = now;
                    entries.push(LedgerEntry {
                        id: LedgerEntryId::new(),
                        user_id: wallet.user_id,
                        booking_id,
                        amount: -covered,
                        kind: EntryKind::Payment,
                        status: EntryStatus::Completed,
                        description: Some(format!("{description} (from wallet)")),
                        reference: None,
                        created_at: now,
                    });
                }
                SettlementOutcome { charged: covered, additional_due, entries, refunded: Money::ZERO }
            }
        }
    }
}

/// What a settlement actually did once applied under the account lock.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SettlementOutcome {
    /// Amount credited
    pub refunded: Money,
    /// Amount debited from the wallet
    pub charged: Money,
    /// Amount still owed after the wallet debit; informational only
    pub additional_due: Money,
    /// Ledger entries appended
    pub entries: Vec<LedgerEntry>,
}

/// Builds a manual adjustment entry (fund deposit).
///
/// # Errors
///
/// Returns [`BookingError::InvalidAmount`] when `amount` is not positive.
pub fn adjustment_entry(
    wallet: &mut Wallet,
    amount: Money,
    description: Option<String>,
    reference: Option<String>,
    now: DateTime<Utc>,
) -> Result<LedgerEntry> {
    if !amount.is_positive() {
        return Err(BookingError::InvalidAmount(amount));
    }
    wallet.balance = wallet.balance + amount;
    wallet.updated_at = now;
    Ok(LedgerEntry {
        id: LedgerEntryId::new(),
        user_id: wallet.user_id,
        booking_id: None,
        amount,
        kind: EntryKind::Adjustment,
        status: EntryStatus::Completed,
        description: description.or_else(|| Some("Manual fund addition".to_string())),
        reference,
        created_at: now,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn refund_credits_the_full_amount() {
        let mut wallet = Wallet::new(UserId::new(), now());
        let settlement = Settlement::Refund {
            amount: Money::from_dollars(75),
            description: "cancellation refund".to_string(),
        };
        let outcome = settlement.apply(&mut wallet, None, now());
        assert_eq!(wallet.balance, Money::from_dollars(75));
        assert_eq!(outcome.refunded, Money::from_dollars(75));
        assert_eq!(outcome.entries.len(), 1);
        assert_eq!(outcome.entries[0].kind, EntryKind::Refund);
        assert!(balance_matches_entries(&wallet, &outcome.entries));
    }

    #[test]
    fn charge_is_clamped_to_the_balance() {
        let mut wallet = Wallet::new(UserId::new(), now());
        wallet.balance = Money::from_dollars(30);
        let settlement = Settlement::Charge {
            amount: Money::from_dollars(50),
            description: "reschedule payment".to_string(),
        };
        let outcome = settlement.apply(&mut wallet, None, now());
        assert_eq!(outcome.charged, Money::from_dollars(30));
        assert_eq!(outcome.additional_due, Money::from_dollars(20));
        assert_eq!(wallet.balance, Money::ZERO);
        assert_eq!(outcome.entries[0].amount, Money::from_dollars(-30));
    }

    #[test]
    fn charge_against_empty_wallet_writes_no_entry() {
        let mut wallet = Wallet::new(UserId::new(), now());
        let settlement = Settlement::Charge {
            amount: Money::from_dollars(50),
            description: "reschedule payment".to_string(),
        };
        let outcome = settlement.apply(&mut wallet, None, now());
        assert!(outcome.entries.is_empty());
        assert_eq!(outcome.additional_due, Money::from_dollars(50));
        assert_eq!(wallet.balance, Money::ZERO);
    }

    #[test]
    fn for_price_delta_picks_the_direction() {
        assert!(matches!(
            Settlement::for_price_delta(Money::from_dollars(-10), String::new()),
            Settlement::Refund { amount, .. } if amount == Money::from_dollars(10)
        ));
        assert!(matches!(
            Settlement::for_price_delta(Money::from_dollars(10), String::new()),
            Settlement::Charge { amount, .. } if amount == Money::from_dollars(10)
        ));
        assert!(matches!(
            Settlement::for_price_delta(Money::ZERO, String::new()),
            Settlement::None
        ));
    }

    #[test]
    fn adjustment_requires_positive_amount() {
        let mut wallet = Wallet::new(UserId::new(), now());
        assert!(adjustment_entry(&mut wallet, Money::ZERO, None, None, now()).is_err());
        let entry =
            adjustment_entry(&mut wallet, Money::from_dollars(20), None, None, now()).unwrap();
        assert_eq!(entry.kind, EntryKind::Adjustment);
        assert_eq!(wallet.balance, Money::from_dollars(20));
    }

    #[test]
    fn balance_invariant_over_a_mixed_sequence() {
        let mut wallet = Wallet::new(UserId::new(), now());
        let mut entries = Vec::new();

        entries.push(
            adjustment_entry(&mut wallet, Money::from_dollars(100), None, None, now()).unwrap(),
        );
        let refund = Settlement::Refund {
            amount: Money::from_dollars(40),
            description: "r".to_string(),
        };
        entries.extend(refund.apply(&mut wallet, None, now()).entries);
        let charge = Settlement::Charge {
            amount: Money::from_dollars(90),
            description: "c".to_string(),
        };
        entries.extend(charge.apply(&mut wallet, None, now()).entries);

        assert_eq!(wallet.balance, Money::from_dollars(50));
        assert!(balance_matches_entries(&wallet, &entries));
    }
}
