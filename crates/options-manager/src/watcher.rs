//! Position watcher: polls the underlying and drives one position to close.
//!
//! Each tick runs the kill-switch, the stop breach, target-1 and the runner
//! target in that order, so a tick that satisfies both a stop and a target
//! always exits through the stop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use orbfib_core::{
    ExitLeg, ExitRecord, LimitsConfig, MarketData, Timeframe, TradeJournal, WatcherConfig,
};
use rand::Rng;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::executor::BracketExecutor;
use crate::limits::enforce_daily_limits;
use crate::stops::{check_stop_rules, trail_candidates};
use crate::targets::check_profit_targets;
use crate::types::{ExitReason, PositionPhase, PositionState, StopAction, TargetAction, WatchOutcome};

pub const EMA_TRAIL_PERIOD: usize = 21;

/// Watches a single position until it is closed or stopped.
pub struct PositionWatcher {
    market: Arc<dyn MarketData>,
    executor: Arc<BracketExecutor>,
    journal: Arc<dyn TradeJournal>,
    config: WatcherConfig,
    limits: LimitsConfig,
    timezone: Tz,
    should_stop: Arc<AtomicBool>,
}

impl PositionWatcher {
    pub fn new(
        market: Arc<dyn MarketData>,
        executor: Arc<BracketExecutor>,
        journal: Arc<dyn TradeJournal>,
        config: WatcherConfig,
        limits: LimitsConfig,
        timezone: Tz,
    ) -> Self {
        Self {
            market,
            executor,
            journal,
            config,
            limits,
            timezone,
            should_stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Setting the returned flag ends the loop at the next iteration.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.should_stop.clone()
    }

    /// Polls until the position is closed or the stop handle is set.
    ///
    /// Daily limits are enforced on every way out.
    pub async fn watch(&self, mut state: PositionState, trade_date: NaiveDate) -> WatchOutcome {
        info!(
            symbol = state.symbol,
            option_symbol = state.option_symbol,
            direction = %state.direction,
            qty = state.qty,
            stop = %state.stop,
            t1 = %state.t1,
            t2 = %state.t2,
            "Watching position"
        );

        let outcome = loop {
            if self.should_stop.load(Ordering::SeqCst) {
                info!(symbol = state.symbol, "Watcher stopping; position left open");
                break WatchOutcome::Cancelled { state };
            }

            match self.market.latest_price(&state.symbol).await {
                Ok(price) => {
                    if let Some(reason) = self.on_tick(&mut state, price, trade_date).await {
                        info!(symbol = state.symbol, %reason, %price, "Position closed");
                        break WatchOutcome::Closed { reason, state };
                    }
                }
                Err(e) => warn!(symbol = state.symbol, error = %e, "Failed to fetch price"),
            }

            tokio::time::sleep(self.poll_interval()).await;
        };

        if let Err(e) = enforce_daily_limits(self.journal.as_ref(), trade_date, &self.limits).await
        {
            warn!(%trade_date, error = %e, "Failed to enforce daily limits");
        }
        outcome
    }

    /// Applies one price. Returns the exit reason once the position is flat.
    async fn on_tick(
        &self,
        state: &mut PositionState,
        price: Decimal,
        trade_date: NaiveDate,
    ) -> Option<ExitReason> {
        if let Some(StopAction::CloseAll { reason }) =
            check_stop_rules(state, price, self.config.kill_switch_pct)
        {
            return self.close_all(state, price, reason).await.then_some(reason);
        }

        let partial = &self.config.partial_take;
        let mut trailed = false;
        for action in check_profit_targets(state, price, partial) {
            match action {
                TargetAction::Target1 { quantity } => {
                    if quantity > 0 {
                        if !self
                            .executor
                            .close_option_market(&state.option_symbol, Some(quantity))
                            .await
                        {
                            // still open; the next poll retries
                            return None;
                        }
                        state.runner_qty -= quantity;
                        self.record_exit(state, price, ExitLeg::Partial, None).await;
                    }
                    state.exit1_done = true;

                    if state.runner_qty == 0 {
                        self.executor.cancel_children(&state.order_id).await;
                        state.exit2_done = true;
                        self.record_exit(state, price, ExitLeg::Final, Some(ExitReason::Target1))
                            .await;
                        return Some(ExitReason::Target1);
                    }
                    if partial.enabled {
                        self.apply_trail(state, trade_date).await;
                        trailed = true;
                    }
                }
                TargetAction::CloseRunner => {
                    return self
                        .close_all(state, price, ExitReason::Runner)
                        .await
                        .then_some(ExitReason::Runner);
                }
            }
        }

        if !trailed
            && partial.enabled
            && partial.trail_with_ema21
            && state.phase() == PositionPhase::PartialDone
        {
            if let Some(ema) = self.session_ema(&state.symbol, trade_date).await {
                self.ratchet(state, ema);
            }
        }
        None
    }

    /// Closes the remaining contracts and cancels the bracket children.
    ///
    /// Returns false when the close failed and the position is still open.
    async fn close_all(&self, state: &mut PositionState, price: Decimal, reason: ExitReason) -> bool {
        if !self
            .executor
            .close_option_market(&state.option_symbol, None)
            .await
        {
            warn!(symbol = state.symbol, %reason, "Close failed; retrying on next poll");
            return false;
        }
        self.executor.cancel_children(&state.order_id).await;
        state.runner_qty = 0;
        state.exit2_done = true;
        self.record_exit(state, price, ExitLeg::Final, Some(reason)).await;
        true
    }

    async fn apply_trail(&self, state: &mut PositionState, trade_date: NaiveDate) {
        let partial = &self.config.partial_take;
        let ema = if partial.trail_with_ema21 {
            self.session_ema(&state.symbol, trade_date).await
        } else {
            None
        };
        for candidate in trail_candidates(state, partial, ema) {
            self.ratchet(state, candidate);
        }
    }

    fn ratchet(&self, state: &mut PositionState, candidate: Decimal) {
        let previous = state.stop;
        if state.ratchet_stop(candidate) {
            info!(
                symbol = state.symbol,
                from = %previous,
                to = %state.stop,
                "Stop tightened"
            );
        }
    }

    /// EMA-21 of today's 5-minute closes, if enough bars exist.
    async fn session_ema(&self, symbol: &str, trade_date: NaiveDate) -> Option<Decimal> {
        let start = session_open_utc(self.timezone, trade_date)?;
        let bars = match self
            .market
            .get_bars(symbol, Timeframe::FiveMinute, start, Utc::now())
            .await
        {
            Ok(bars) => bars,
            Err(e) => {
                warn!(symbol, error = %e, "Failed to fetch bars for EMA trail");
                return None;
            }
        };
        let closes: Vec<Decimal> = bars.iter().map(|b| b.close).collect();
        match orbfib_strategy::ema(&closes, EMA_TRAIL_PERIOD) {
            Ok(series) => series.last().copied(),
            Err(e) => {
                debug!(symbol, error = %e, "EMA trail unavailable");
                None
            }
        }
    }

    async fn record_exit(
        &self,
        state: &PositionState,
        price: Decimal,
        leg: ExitLeg,
        reason: Option<ExitReason>,
    ) {
        let exit = ExitRecord {
            trade_id: state.trade_id,
            ts: Utc::now(),
            price,
            leg,
            reason: reason.map(|r| r.to_string()),
            pnl_usd: None,
            pnl_pct: None,
        };
        if let Err(e) = self.journal.record_exit(&exit).await {
            warn!(trade_id = state.trade_id, leg = leg.number(), error = %e, "Failed to journal exit");
        }
    }

    fn poll_interval(&self) -> Duration {
        let min = self.config.poll_min_ms;
        let max = self.config.poll_max_ms.max(min);
        Duration::from_millis(rand::thread_rng().gen_range(min..=max))
    }
}

/// 09:30 local time on `date` in `tz`, as UTC.
pub fn session_open_utc(tz: Tz, date: NaiveDate) -> Option<DateTime<Utc>> {
    let open = NaiveTime::from_hms_opt(9, 30, 0)?;
    tz.from_local_datetime(&date.and_time(open))
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}
