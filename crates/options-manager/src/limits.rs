//! Daily risk limits, read and written through the trade journal.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use orbfib_core::{LimitsConfig, LimitsState, TradeJournal};

/// True when the counters for a date exceed the configured limits.
pub fn limits_breached(state: &LimitsState, limits: &LimitsConfig) -> bool {
    let trades_exhausted = limits
        .max_trades_per_day
        .is_some_and(|max| state.trades_taken >= max);
    let loss_exhausted = limits
        .max_mtd_loss
        .is_some_and(|max| state.mtd_pnl <= -max);
    trades_exhausted || loss_exhausted
}

/// Marks `date` as loss-hit when a limit is breached.
///
/// Returns whether the date is (now) marked. A date that is already marked
/// is left alone.
pub async fn enforce_daily_limits(
    journal: &dyn TradeJournal,
    date: NaiveDate,
    limits: &LimitsConfig,
) -> Result<bool> {
    let state = journal
        .limits_state(date)
        .await
        .with_context(|| format!("Failed to read limits state for {date}"))?;
    if state.daily_loss_hit {
        return Ok(true);
    }
    if !limits_breached(&state, limits) {
        return Ok(false);
    }

    tracing::warn!(
        %date,
        trades_taken = state.trades_taken,
        mtd_pnl = %state.mtd_pnl,
        "Daily risk limit reached; blocking new entries"
    );
    journal
        .mark_daily_loss_hit(date)
        .await
        .with_context(|| format!("Failed to mark daily loss for {date}"))?;
    Ok(true)
}

/// Read-side check used before opening a position.
pub async fn can_open_new_position(
    journal: &dyn TradeJournal,
    date: NaiveDate,
    limits: &LimitsConfig,
) -> Result<bool> {
    let state = journal.limits_state(date).await?;
    if state.daily_loss_hit {
        tracing::info!(%date, "Daily loss flag set; no new positions");
        return Ok(false);
    }
    if limits_breached(&state, limits) {
        tracing::info!(
            %date,
            trades_taken = state.trades_taken,
            "Daily limits exhausted; no new positions"
        );
        return Ok(false);
    }
    Ok(true)
}
