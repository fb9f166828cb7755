use crate::bar::{Bar, Timeframe};
use crate::journal::{ExitRecord, JournalRow, LimitsState, TradeRecord};
use crate::options::OptionQuote;
use crate::orders::{BracketOrder, GatewayError};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

/// Source of underlying bars and last-trade prices.
#[async_trait]
pub trait MarketData: Send + Sync {
    /// Bars in non-decreasing timestamp order. Gaps are allowed.
    async fn get_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Bar>>;

    async fn latest_price(&self, symbol: &str) -> Result<Decimal>;
}

#[async_trait]
pub trait OptionChainSource: Send + Sync {
    async fn option_chain(&self, symbol: &str, expiry: NaiveDate) -> Result<Vec<OptionQuote>>;
}

/// Brokerage order entry.
#[async_trait]
pub trait OrderGateway: Send + Sync {
    /// Submits a bracket order and returns the broker's order id.
    async fn submit_bracket(&self, order: &BracketOrder) -> Result<String, GatewayError>;

    /// Closes `quantity` contracts of `option_symbol` at market, or all of it when `None`.
    async fn close_position(
        &self,
        option_symbol: &str,
        quantity: Option<u32>,
    ) -> Result<(), GatewayError>;

    async fn cancel_child_orders(&self, order_id: &str) -> Result<(), GatewayError>;
}

/// Durable trade journal and per-date risk-limit state.
///
/// Counters only increase within a date and `daily_loss_hit` is never cleared.
#[async_trait]
pub trait TradeJournal: Send + Sync {
    async fn limits_state(&self, date: NaiveDate) -> Result<LimitsState>;

    async fn mark_daily_loss_hit(&self, date: NaiveDate) -> Result<()>;

    /// Stores the trade, bumps `trades_taken` for its date and returns the trade id.
    async fn record_trade(&self, trade: &TradeRecord) -> Result<i64>;

    async fn record_exit(&self, exit: &ExitRecord) -> Result<()>;

    async fn update_mtd_pnl(&self, date: NaiveDate, pnl_delta: Decimal) -> Result<()>;

    async fn all_trades(&self) -> Result<Vec<JournalRow>>;
}

/// Where a notification is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyChannel {
    Slack,
    Email,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, channel: NotifyChannel, message: &str) -> Result<()>;
}
