//! Per-process table of bracket submissions, keyed for idempotency.

use chrono::{DateTime, NaiveDate, Utc};
use orbfib_core::Direction;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One entry per trade date, symbol, direction and opening range length.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubmissionKey {
    pub trade_date: NaiveDate,
    pub symbol: String,
    pub direction: Direction,
    pub orb_len: u32,
}

impl std::fmt::Display for SubmissionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.trade_date, self.symbol, self.direction, self.orb_len
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmissionStatus {
    /// Reserved while the gateway call is in flight.
    Pending,
    Submitted { order_id: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub status: SubmissionStatus,
    pub option_symbol: String,
    pub quantity: u32,
    pub updated_at: DateTime<Utc>,
}

/// Shared submission table.
///
/// A key is reserved before the gateway is called, so a second caller with
/// the same key sees it immediately. Failed submissions release the key.
#[derive(Debug, Default)]
pub struct SubmissionLedger {
    entries: Mutex<HashMap<SubmissionKey, SubmissionRecord>>,
}

impl SubmissionLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves `key`. Returns false if it is already pending or submitted.
    pub fn try_reserve(&self, key: &SubmissionKey, option_symbol: &str, quantity: u32) -> bool {
        let mut entries = self.entries.lock();
        if entries.contains_key(key) {
            return false;
        }
        entries.insert(
            key.clone(),
            SubmissionRecord {
                status: SubmissionStatus::Pending,
                option_symbol: option_symbol.to_string(),
                quantity,
                updated_at: Utc::now(),
            },
        );
        true
    }

    pub fn mark_submitted(&self, key: &SubmissionKey, order_id: &str) {
        if let Some(record) = self.entries.lock().get_mut(key) {
            record.status = SubmissionStatus::Submitted {
                order_id: order_id.to_string(),
            };
            record.updated_at = Utc::now();
        }
    }

    /// Drops a pending reservation so the key can be retried.
    pub fn release(&self, key: &SubmissionKey) {
        let mut entries = self.entries.lock();
        if matches!(
            entries.get(key).map(|r| &r.status),
            Some(SubmissionStatus::Pending)
        ) {
            entries.remove(key);
        }
    }

    #[must_use]
    pub fn get(&self, key: &SubmissionKey) -> Option<SubmissionRecord> {
        self.entries.lock().get(key).cloned()
    }

    #[must_use]
    pub fn submitted_count(&self) -> usize {
        self.entries
            .lock()
            .values()
            .filter(|r| matches!(r.status, SubmissionStatus::Submitted { .. }))
            .count()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(orb_len: u32) -> SubmissionKey {
        SubmissionKey {
            trade_date: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
            symbol: "SPY".to_string(),
            direction: Direction::Long,
            orb_len,
        }
    }

    #[test]
    fn reserve_is_exclusive_per_key() {
        let ledger = SubmissionLedger::new();
        assert!(ledger.try_reserve(&key(30), "SPY_20240105_C470", 5));
        assert!(!ledger.try_reserve(&key(30), "SPY_20240105_C470", 5));
        assert!(ledger.try_reserve(&key(15), "SPY_20240105_C470", 5));
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.submitted_count(), 0);
    }

    #[test]
    fn release_only_drops_pending() {
        let ledger = SubmissionLedger::new();
        ledger.try_reserve(&key(30), "X", 1);
        ledger.release(&key(30));
        assert!(ledger.is_empty());

        ledger.try_reserve(&key(30), "X", 1);
        ledger.mark_submitted(&key(30), "PAPER-7");
        ledger.release(&key(30));
        assert_eq!(
            ledger.get(&key(30)).map(|r| r.status),
            Some(SubmissionStatus::Submitted {
                order_id: "PAPER-7".to_string()
            })
        );
        assert_eq!(ledger.submitted_count(), 1);
    }

    #[test]
    fn key_display() {
        assert_eq!(key(30).to_string(), "2024-01-05:SPY:long:30");
    }
}
