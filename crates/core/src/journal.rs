//! Records exchanged with the trade journal.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::direction::Direction;

/// Risk-limit counters for one trade date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LimitsState {
    pub trades_taken: u32,
    pub mtd_pnl: Decimal,
    pub daily_loss_hit: bool,
}

/// A trade opened by the runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub trade_date: NaiveDate,
    pub symbol: String,
    pub orb_len: u32,
    pub direction: Direction,
    pub anchor_a: Decimal,
    pub anchor_b: Decimal,
    /// Fib level key the entry tagged, e.g. `0.618`.
    pub entry_level: String,
    pub entry_ts: DateTime<Utc>,
    pub entry_under_px: Decimal,
    pub stop_under_px: Decimal,
    pub t1_under_px: Decimal,
    pub t2_under_px: Decimal,
    pub option_sym: String,
    pub qty: u32,
    pub entry_opt_px: Decimal,
    pub hard_stop_opt_px: Decimal,
    pub exit_reason: String,
    pub notes: String,
}

/// Exit leg: the partial take at target-1 or the final close.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitLeg {
    Partial,
    Final,
}

impl ExitLeg {
    #[must_use]
    pub const fn number(self) -> u8 {
        match self {
            Self::Partial => 1,
            Self::Final => 2,
        }
    }
}

/// An exit recorded against an existing trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExitRecord {
    pub trade_id: i64,
    pub ts: DateTime<Utc>,
    pub price: Decimal,
    pub leg: ExitLeg,
    pub reason: Option<String>,
    pub pnl_usd: Option<Decimal>,
    pub pnl_pct: Option<Decimal>,
}

/// A journaled trade together with whatever exits have been recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalRow {
    pub trade_id: i64,
    pub trade: TradeRecord,
    pub exit1_ts: Option<DateTime<Utc>>,
    pub exit1_px: Option<Decimal>,
    pub exit2_ts: Option<DateTime<Utc>>,
    pub exit2_px: Option<Decimal>,
    pub pnl_usd: Option<Decimal>,
    pub pnl_pct: Option<Decimal>,
}
