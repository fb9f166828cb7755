//! Chooses the option contract to trade for a signal.

use anyhow::{Context, Result};
use chrono::{Datelike, Duration, NaiveDate};
use orbfib_core::{
    build_option_symbol, Direction, ExpiryPolicy, MarketData, OptionChainSource, OptionQuote,
    OptionRight, OptionsConfig, SelectedOption, StrikeFallback,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info};

/// The next Friday on or after `date`.
#[must_use]
pub fn next_friday(date: NaiveDate) -> NaiveDate {
    let weekday = i64::from(date.weekday().num_days_from_monday());
    date + Duration::days((4 - weekday).rem_euclid(7))
}

#[must_use]
pub fn pick_expiry(as_of: NaiveDate, policy: ExpiryPolicy) -> NaiveDate {
    match policy {
        ExpiryPolicy::SameDay => as_of,
        ExpiryPolicy::NextWeekly => next_friday(as_of),
    }
}

/// Picks the contract whose delta is closest to the target for `direction`.
///
/// Only contracts of the matching right are considered. Without any delta,
/// the ATM fallback takes the strike nearest `underlying`.
#[must_use]
pub fn pick_strike<'a>(
    underlying: Decimal,
    chain: &'a [OptionQuote],
    direction: Direction,
    target_delta: f64,
    fallback: StrikeFallback,
) -> Option<&'a OptionQuote> {
    if chain.is_empty() {
        return None;
    }

    let right = OptionRight::for_direction(direction);
    let filtered: Vec<&OptionQuote> = chain.iter().filter(|q| q.right == right).collect();

    let target = match direction {
        Direction::Long => target_delta,
        Direction::Short => -target_delta,
    };
    let by_delta = filtered
        .iter()
        .filter_map(|q| q.delta.map(|d| (*q, (d - target).abs())))
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(q, _)| q);
    if by_delta.is_some() {
        return by_delta;
    }

    match fallback {
        StrikeFallback::Atm => {
            let pool: Vec<&OptionQuote> = if filtered.is_empty() {
                chain.iter().collect()
            } else {
                filtered
            };
            pool.into_iter()
                .min_by_key(|q| (q.strike - underlying).abs())
        }
        StrikeFallback::Disabled => None,
    }
}

/// Resolves a tradeable contract through a chain source and a price feed.
pub struct OptionsSelector {
    chains: Arc<dyn OptionChainSource>,
    market: Arc<dyn MarketData>,
    config: OptionsConfig,
}

impl OptionsSelector {
    pub fn new(
        chains: Arc<dyn OptionChainSource>,
        market: Arc<dyn MarketData>,
        config: OptionsConfig,
    ) -> Self {
        Self {
            chains,
            market,
            config,
        }
    }

    /// Returns `None` when no chain or no priced contract is available.
    ///
    /// # Errors
    ///
    /// Returns error if the chain or price lookup fails.
    pub async fn contracts_for_entry(
        &self,
        symbol: &str,
        direction: Direction,
        as_of: NaiveDate,
    ) -> Result<Option<SelectedOption>> {
        let mut expiry = pick_expiry(as_of, self.config.expiry_policy);
        let mut chain = self
            .chains
            .option_chain(symbol, expiry)
            .await
            .with_context(|| format!("Failed to load {symbol} chain for {expiry}"))?;

        if chain.is_empty() && self.config.expiry_policy == ExpiryPolicy::SameDay {
            expiry = next_friday(as_of + Duration::days(1));
            debug!(symbol, %expiry, "No same-day chain, trying next weekly");
            chain = self
                .chains
                .option_chain(symbol, expiry)
                .await
                .with_context(|| format!("Failed to load {symbol} chain for {expiry}"))?;
        }
        if chain.is_empty() {
            info!(symbol, %expiry, "Empty option chain");
            return Ok(None);
        }

        let underlying = self.market.latest_price(symbol).await?;
        let Some(quote) = pick_strike(
            underlying,
            &chain,
            direction,
            self.config.target_delta,
            self.config.fallback,
        ) else {
            info!(symbol, %direction, "No contract matched the delta target");
            return Ok(None);
        };

        let Some(ask) = quote.entry_price() else {
            info!(symbol, strike = %quote.strike, "Selected contract has no ask or mid");
            return Ok(None);
        };

        let option_symbol = quote
            .option_symbol
            .clone()
            .unwrap_or_else(|| build_option_symbol(symbol, quote.strike, quote.right, quote.expiry));

        Ok(Some(SelectedOption {
            option_symbol,
            strike: quote.strike,
            right: quote.right,
            expiry: quote.expiry,
            delta: quote.delta.unwrap_or(0.0),
            ask,
        }))
    }
}
