//! Session runner: turns bars into at most one entry per symbol per day and
//! hands each entry to its own watcher task.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc, Weekday};
use chrono_tz::Tz;
use orbfib_core::{
    AppConfig, MarketData, Notifier, NotifyChannel, OptionChainSource, PositionSizer, Timeframe,
    TradeJournal, TradeRecord,
};
use orbfib_strategy::{EngineConfig, FibOrbEngine, TradeSignal};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::executor::BracketExecutor;
use crate::limits::can_open_new_position;
use crate::notify::notify_quietly;
use crate::selector::OptionsSelector;
use crate::types::{EntryRequest, PositionState, WatchOutcome};
use crate::watcher::{session_open_utc, PositionWatcher};

/// Regular session hours, inclusive at both ends.
fn within_market_hours(local_time: NaiveTime, weekday: Weekday) -> bool {
    if matches!(weekday, Weekday::Sat | Weekday::Sun) {
        return false;
    }
    match (
        NaiveTime::from_hms_opt(9, 30, 0),
        NaiveTime::from_hms_opt(16, 0, 0),
    ) {
        (Some(open), Some(close)) => open <= local_time && local_time <= close,
        _ => false,
    }
}

pub struct OrbRunner {
    config: AppConfig,
    engine: FibOrbEngine,
    sizer: PositionSizer,
    selector: OptionsSelector,
    market: Arc<dyn MarketData>,
    executor: Arc<BracketExecutor>,
    journal: Arc<dyn TradeJournal>,
    notifier: Arc<dyn Notifier>,
    locks: Mutex<HashSet<(String, NaiveDate)>>,
    watcher_stops: Mutex<Vec<Arc<AtomicBool>>>,
}

impl OrbRunner {
    /// # Errors
    ///
    /// Returns error if the session or risk configuration is invalid.
    pub fn new(
        config: AppConfig,
        market: Arc<dyn MarketData>,
        chains: Arc<dyn OptionChainSource>,
        executor: Arc<BracketExecutor>,
        journal: Arc<dyn TradeJournal>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        let engine = FibOrbEngine::new(
            EngineConfig::from_session(&config.session).context("Invalid session config")?,
        );
        let sizer = PositionSizer::from_config(&config.risk).context("Invalid risk config")?;
        let selector = OptionsSelector::new(chains, market.clone(), config.options.clone());

        Ok(Self {
            config,
            engine,
            sizer,
            selector,
            market,
            executor,
            journal,
            notifier,
            locks: Mutex::new(HashSet::new()),
            watcher_stops: Mutex::new(Vec::new()),
        })
    }

    fn timezone(&self) -> Tz {
        self.config.session.timezone
    }

    /// Returns the trade date when entries are allowed at `now`.
    #[must_use]
    pub fn market_guard(&self, now: DateTime<Utc>) -> Option<NaiveDate> {
        let local = now.with_timezone(&self.timezone());
        if let Some(cutoff) = self.config.session.latest_entry_time {
            if local.time() > cutoff {
                info!(%cutoff, "Past latest entry cutoff; standing down");
                return None;
            }
        }
        within_market_hours(local.time(), local.weekday()).then(|| local.date_naive())
    }

    #[must_use]
    pub fn is_locked(&self, symbol: &str, trade_date: NaiveDate) -> bool {
        self.locks
            .lock()
            .contains(&(symbol.to_string(), trade_date))
    }

    /// Looks for an entry on `symbol` and, if one is placed, returns its watcher task.
    ///
    /// ORB lengths are tried in configured order; a length that yields no
    /// signal, no contract, no size or a rejected order moves on to the next.
    ///
    /// # Errors
    ///
    /// Returns error if bars or limit state cannot be loaded.
    pub async fn run_for_symbol(
        &self,
        symbol: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<JoinHandle<WatchOutcome>>> {
        let Some(trade_date) = self.market_guard(now) else {
            info!(symbol, "Market guard rejected entries");
            return Ok(None);
        };
        if self.is_locked(symbol, trade_date) {
            info!(symbol, %trade_date, "Symbol already traded today");
            return Ok(None);
        }
        if !can_open_new_position(self.journal.as_ref(), trade_date, &self.config.limits).await? {
            warn!(symbol, %trade_date, "Risk limits preventing new trades");
            return Ok(None);
        }

        let session_start = session_open_utc(self.timezone(), trade_date)
            .context("Session open does not exist in the configured timezone")?;
        let bars_1m = self
            .market
            .get_bars(symbol, Timeframe::OneMinute, session_start, now)
            .await
            .with_context(|| format!("Failed to load 1m bars for {symbol}"))?;
        let bars_5m = self
            .market
            .get_bars(symbol, Timeframe::FiveMinute, session_start, now)
            .await
            .with_context(|| format!("Failed to load 5m bars for {symbol}"))?;
        if bars_1m.is_empty() || bars_5m.is_empty() {
            info!(symbol, "No session bars yet");
            return Ok(None);
        }

        for &orb_len in &self.config.session.orb_sequence {
            let Some(signal) = self.engine.evaluate_orb(&bars_1m, &bars_5m, orb_len) else {
                continue;
            };
            if let Some(handle) = self.try_enter(symbol, trade_date, orb_len, &signal).await {
                return Ok(Some(handle));
            }
        }
        Ok(None)
    }

    async fn try_enter(
        &self,
        symbol: &str,
        trade_date: NaiveDate,
        orb_len: u32,
        signal: &TradeSignal,
    ) -> Option<JoinHandle<WatchOutcome>> {
        let as_of = signal.entry_time.with_timezone(&self.timezone()).date_naive();
        let option = match self
            .selector
            .contracts_for_entry(symbol, signal.direction, as_of)
            .await
        {
            Ok(Some(option)) => option,
            Ok(None) => return None,
            Err(e) => {
                warn!(symbol, orb_len, error = %e, "Option selection failed");
                return None;
            }
        };

        let Some(size) = self.sizer.contracts_for_trade(option.ask, option.ask) else {
            info!(symbol, orb_len, ask = %option.ask, "Allocation too small for one contract");
            return None;
        };

        let request = EntryRequest {
            option_symbol: option.option_symbol.clone(),
            qty: size.contracts,
            hard_stop_opt_price: size.hard_stop_price,
            take_profit_opt_price: None,
            trade_date,
            symbol: symbol.to_string(),
            direction: signal.direction,
            orb_len,
        };
        let result = self.executor.enter_with_bracket(&request).await;
        if !result.submitted {
            warn!(symbol, orb_len, reason = result.reason, "Order failed");
            return None;
        }
        let order_id = result.order_id.unwrap_or_default();
        self.locks.lock().insert((symbol.to_string(), trade_date));

        let t1 = signal.targets.first().copied().unwrap_or(signal.entry);
        let record = TradeRecord {
            trade_date,
            symbol: symbol.to_string(),
            orb_len,
            direction: signal.direction,
            anchor_a: signal.anchor_a,
            anchor_b: signal.anchor_b,
            entry_level: signal.entry_level.as_str().to_string(),
            entry_ts: signal.entry_time,
            entry_under_px: signal.entry,
            stop_under_px: signal.stop,
            t1_under_px: t1,
            t2_under_px: signal.targets.get(1).copied().unwrap_or(t1),
            option_sym: option.option_symbol.clone(),
            qty: size.contracts,
            entry_opt_px: option.ask,
            hard_stop_opt_px: size.hard_stop_price,
            exit_reason: signal.reason.clone(),
            notes: String::new(),
        };
        let trade_id = match self.journal.record_trade(&record).await {
            Ok(id) => id,
            Err(e) => {
                error!(symbol, order_id, error = %e, "Failed to journal trade; watching anyway");
                0
            }
        };

        let state = PositionState::from_signal(
            signal,
            symbol,
            &option.option_symbol,
            size.contracts,
            &order_id,
            trade_id,
        );
        let handle = self.spawn_watcher(state, trade_date);

        notify_quietly(
            self.notifier.as_ref(),
            NotifyChannel::Slack,
            &format!("{symbol} {} signal sent", signal.direction),
        )
        .await;
        notify_quietly(
            self.notifier.as_ref(),
            NotifyChannel::Email,
            &format!("{symbol} {} signal submitted as order {order_id}", signal.direction),
        )
        .await;

        info!(
            symbol,
            orb_len,
            order_id,
            trade_id,
            contracts = size.contracts,
            option_symbol = option.option_symbol,
            "Entry placed"
        );
        Some(handle)
    }

    fn spawn_watcher(&self, state: PositionState, trade_date: NaiveDate) -> JoinHandle<WatchOutcome> {
        let watcher = PositionWatcher::new(
            self.market.clone(),
            self.executor.clone(),
            self.journal.clone(),
            self.config.watcher.clone(),
            self.config.limits.clone(),
            self.timezone(),
        );
        self.watcher_stops.lock().push(watcher.stop_handle());
        tokio::spawn(async move { watcher.watch(state, trade_date).await })
    }

    /// Runs every configured symbol, then waits for all watchers to finish.
    pub async fn run_session(&self, now: DateTime<Utc>) -> Vec<WatchOutcome> {
        let mut handles = Vec::new();
        for symbol in &self.config.symbols {
            match self.run_for_symbol(symbol, now).await {
                Ok(Some(handle)) => handles.push(handle),
                Ok(None) => {}
                Err(e) => error!(symbol, error = %e, "Symbol run failed"),
            }
        }

        let mut outcomes = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => error!(error = %e, "Watcher task failed"),
            }
        }
        info!(positions = outcomes.len(), "Session complete");
        outcomes
    }

    /// Signals every watcher started so far to stop at its next poll.
    pub fn stop_watchers(&self) {
        let stops = self.watcher_stops.lock();
        for stop in stops.iter() {
            stop.store(true, Ordering::SeqCst);
        }
        info!(count = stops.len(), "Stop requested for watchers");
    }
}
