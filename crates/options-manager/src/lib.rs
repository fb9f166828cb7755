//! Options execution and position management for the ORB/Fibonacci strategy.
//!
//! The runner turns session bars into a signal, picks and sizes a contract,
//! submits one bracket order per symbol per day and starts a watcher task.
//! The watcher owns the position until it is flat:
//! - kill-switch and underlying stop first
//! - then target-1 (optional partial take with stop ratchet)
//! - then the runner target
//!
//! Decision rules are pure functions; order actions go through
//! [`executor::BracketExecutor`], which never submits a key twice.

pub mod executor;
pub mod journal;
pub mod limits;
pub mod notify;
pub mod selector;
pub mod service;
pub mod stops;
pub mod submissions;
pub mod targets;
pub mod types;
pub mod watcher;

pub use executor::{BracketExecutor, REASON_DUPLICATE, REASON_NO_CLIENT};
pub use journal::{export_csv, InMemoryJournal, SqliteJournal, TRADE_COLUMNS};
pub use limits::{can_open_new_position, enforce_daily_limits, limits_breached};
pub use notify::{notify_quietly, LogNotifier, WebhookNotifier};
pub use selector::{next_friday, pick_expiry, pick_strike, OptionsSelector};
pub use service::OrbRunner;
pub use stops::{check_stop_rules, trail_candidates};
pub use submissions::{SubmissionKey, SubmissionLedger, SubmissionRecord, SubmissionStatus};
pub use targets::{check_profit_targets, partial_quantity};
pub use types::{
    EntryRequest, ExitReason, OrderResult, PositionPhase, PositionState, StopAction,
    TargetAction, WatchOutcome,
};
pub use watcher::{session_open_utc, PositionWatcher, EMA_TRAIL_PERIOD};
