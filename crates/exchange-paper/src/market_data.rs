//! Replays recorded bars and a price tape as a [`MarketData`] source.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use orbfib_core::{Bar, MarketData, Timeframe};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::path::Path;

use crate::csv_bars::load_bars_csv;

#[derive(Debug, Default)]
struct Tape {
    prices: Vec<Decimal>,
    cursor: usize,
}

impl Tape {
    /// Next price, holding the last one once the tape is exhausted.
    fn advance(&mut self) -> Option<Decimal> {
        let price = self.peek()?;
        if self.cursor < self.prices.len() {
            self.cursor += 1;
        }
        Some(price)
    }

    fn peek(&self) -> Option<Decimal> {
        self.prices
            .get(self.cursor)
            .or_else(|| self.prices.last())
            .copied()
    }
}

/// Serves `get_bars` from loaded series and `latest_price` from a tape.
#[derive(Debug, Default)]
pub struct ReplayMarketData {
    series: HashMap<(String, Timeframe), Vec<Bar>>,
    tapes: Mutex<HashMap<String, Tape>>,
}

impl ReplayMarketData {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_bars(mut self, symbol: &str, timeframe: Timeframe, mut bars: Vec<Bar>) -> Self {
        bars.sort_by_key(|b| b.timestamp);
        self.series.insert((symbol.to_uppercase(), timeframe), bars);
        self
    }

    #[must_use]
    pub fn with_tape(self, symbol: &str, prices: Vec<Decimal>) -> Self {
        self.tapes
            .lock()
            .insert(symbol.to_uppercase(), Tape { prices, cursor: 0 });
        self
    }

    /// Loads `{dir}/{SYMBOL}_1m.csv` and `{dir}/{SYMBOL}_5m.csv` for each symbol.
    ///
    /// The tape replays the 1-minute closes after `split`, so entries see
    /// bars up to `split` and the watcher sees what came next.
    ///
    /// # Errors
    ///
    /// Returns error if a bar file is missing or malformed.
    pub fn from_csv_dir(dir: &Path, symbols: &[String], split: DateTime<Utc>) -> Result<Self> {
        let mut data = Self::new();
        for symbol in symbols {
            let symbol = symbol.to_uppercase();
            let one = load_bars_csv(&dir.join(format!("{symbol}_1m.csv")))?;
            let five = load_bars_csv(&dir.join(format!("{symbol}_5m.csv")))?;

            let mut tape: Vec<Decimal> = one
                .iter()
                .filter(|b| b.timestamp > split)
                .map(|b| b.close)
                .collect();
            if tape.is_empty() {
                tape.extend(one.last().map(|b| b.close));
            }
            tracing::debug!(
                symbol,
                bars_1m = one.len(),
                bars_5m = five.len(),
                tape = tape.len(),
                "Loaded replay data"
            );

            data = data
                .with_bars(&symbol, Timeframe::OneMinute, one)
                .with_bars(&symbol, Timeframe::FiveMinute, five)
                .with_tape(&symbol, tape);
        }
        Ok(data)
    }

    /// Current tape price without advancing it.
    #[must_use]
    pub fn peek_price(&self, symbol: &str) -> Option<Decimal> {
        self.tapes.lock().get(&symbol.to_uppercase())?.peek()
    }

    /// Close of the last 1-minute bar at or before `at`.
    #[must_use]
    pub fn close_at(&self, symbol: &str, at: DateTime<Utc>) -> Option<Decimal> {
        self.series
            .get(&(symbol.to_uppercase(), Timeframe::OneMinute))?
            .iter()
            .take_while(|b| b.timestamp <= at)
            .last()
            .map(|b| b.close)
    }
}

#[async_trait]
impl MarketData for ReplayMarketData {
    async fn get_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Bar>> {
        Ok(self
            .series
            .get(&(symbol.to_uppercase(), timeframe))
            .map(|bars| {
                bars.iter()
                    .filter(|b| b.timestamp >= start && b.timestamp <= end)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn latest_price(&self, symbol: &str) -> Result<Decimal> {
        self.tapes
            .lock()
            .get_mut(&symbol.to_uppercase())
            .and_then(Tape::advance)
            .ok_or_else(|| anyhow!("No price tape for {symbol}"))
    }
}
