//! Types for options position management.

use chrono::{DateTime, NaiveDate, Utc};
use orbfib_core::Direction;
use orbfib_strategy::TradeSignal;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An open options position owned by a single watcher.
///
/// Trigger levels are underlying prices; `qty` and `runner_qty` count option
/// contracts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionState {
    pub symbol: String,
    pub option_symbol: String,
    pub direction: Direction,
    pub stop: Decimal,
    pub t1: Decimal,
    pub t2: Decimal,
    pub t1618: Decimal,
    pub order_id: String,
    pub qty: u32,
    pub entry_under_px: Decimal,
    pub trade_id: i64,
    pub entry_ts: DateTime<Utc>,
    pub runner_qty: u32,
    pub exit1_done: bool,
    pub exit2_done: bool,
}

impl PositionState {
    /// Builds the state for a freshly filled entry.
    ///
    /// Target-1 is the first signal target, target-2 the second (or the first
    /// when only one exists) and the final extension the last.
    #[must_use]
    pub fn from_signal(
        signal: &TradeSignal,
        symbol: &str,
        option_symbol: &str,
        qty: u32,
        order_id: &str,
        trade_id: i64,
    ) -> Self {
        let t1 = signal.targets.first().copied().unwrap_or(signal.entry);
        let t2 = signal.targets.get(1).copied().unwrap_or(t1);
        let t1618 = signal.targets.last().copied().unwrap_or(t2);
        Self {
            symbol: symbol.to_string(),
            option_symbol: option_symbol.to_string(),
            direction: signal.direction,
            stop: signal.stop,
            t1,
            t2,
            t1618,
            order_id: order_id.to_string(),
            qty,
            entry_under_px: signal.entry,
            trade_id,
            entry_ts: signal.entry_time,
            runner_qty: qty,
            exit1_done: false,
            exit2_done: false,
        }
    }

    #[must_use]
    pub const fn phase(&self) -> PositionPhase {
        match (self.exit1_done, self.exit2_done) {
            (_, true) => PositionPhase::Closed,
            (true, false) => PositionPhase::PartialDone,
            (false, false) => PositionPhase::Open,
        }
    }

    /// Moves the stop to `candidate` if that tightens it. Returns true on change.
    pub fn ratchet_stop(&mut self, candidate: Decimal) -> bool {
        let tightened = self.direction.tighter(self.stop, candidate);
        if tightened == self.stop {
            return false;
        }
        self.stop = tightened;
        true
    }
}

/// Watcher state derived from the exit flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionPhase {
    Open,
    PartialDone,
    Closed,
}

/// Why a position left the book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    KillSwitch,
    UnderlyingStop,
    Target1,
    Runner,
}

impl std::fmt::Display for ExitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::KillSwitch => write!(f, "kill_switch"),
            Self::UnderlyingStop => write!(f, "underlying_stop"),
            Self::Target1 => write!(f, "target1"),
            Self::Runner => write!(f, "runner"),
        }
    }
}

/// Loss-control action from the stop rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopAction {
    /// Close the entire remaining position.
    CloseAll { reason: ExitReason },
}

/// Profit-taking action from the target rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetAction {
    /// Target-1 reached. `quantity` contracts are sold, possibly none.
    Target1 { quantity: u32 },
    /// Target-2 or the final extension reached; sell the runner.
    CloseRunner,
}

/// Everything the executor needs to place one bracket entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryRequest {
    pub option_symbol: String,
    pub qty: u32,
    pub hard_stop_opt_price: Decimal,
    pub take_profit_opt_price: Option<Decimal>,
    pub trade_date: NaiveDate,
    pub symbol: String,
    pub direction: Direction,
    pub orb_len: u32,
}

/// Outcome of an entry attempt. Never an error: failures carry a reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderResult {
    pub submitted: bool,
    pub order_id: Option<String>,
    pub reason: String,
}

impl OrderResult {
    #[must_use]
    pub fn submitted(order_id: String) -> Self {
        Self {
            submitted: true,
            order_id: Some(order_id),
            reason: String::new(),
        }
    }

    #[must_use]
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            submitted: false,
            order_id: None,
            reason: reason.into(),
        }
    }
}

/// How a watcher finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchOutcome {
    Closed {
        reason: ExitReason,
        state: PositionState,
    },
    /// Stopped through the stop handle; the position may still be open.
    Cancelled { state: PositionState },
}

impl WatchOutcome {
    #[must_use]
    pub const fn state(&self) -> &PositionState {
        match self {
            Self::Closed { state, .. } | Self::Cancelled { state } => state,
        }
    }

    #[must_use]
    pub const fn reason(&self) -> Option<ExitReason> {
        match self {
            Self::Closed { reason, .. } => Some(*reason),
            Self::Cancelled { .. } => None,
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    /// Long SPY position: entry 105, stop 100, targets 110 / 112.72 / 116.18.
    pub fn long_position(qty: u32) -> PositionState {
        PositionState {
            symbol: "SPY".to_string(),
            option_symbol: "SPY_20240105_C105".to_string(),
            direction: Direction::Long,
            stop: dec!(100),
            t1: dec!(110),
            t2: dec!(112.72),
            t1618: dec!(116.18),
            order_id: "PAPER-1".to_string(),
            qty,
            entry_under_px: dec!(105),
            trade_id: 1,
            entry_ts: Utc.with_ymd_and_hms(2024, 1, 5, 15, 10, 0).unwrap(),
            runner_qty: qty,
            exit1_done: false,
            exit2_done: false,
        }
    }

    /// Short mirror: entry 95, stop 100, targets 90 / 87.28 / 83.82.
    pub fn short_position(qty: u32) -> PositionState {
        PositionState {
            option_symbol: "SPY_20240105_P95".to_string(),
            direction: Direction::Short,
            stop: dec!(100),
            t1: dec!(90),
            t2: dec!(87.28),
            t1618: dec!(83.82),
            entry_under_px: dec!(95),
            ..long_position(qty)
        }
    }
}
