//! Deterministic option chains priced off a reference underlying price.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Weekday};
use orbfib_core::{build_option_symbol, OptionChainSource, OptionQuote, OptionRight};
use parking_lot::Mutex;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Builds a strike ladder around each symbol's reference price.
///
/// Call delta starts at 0.5 at the money and moves 0.1 per strike step,
/// clamped to `[0.02, 0.98]`; put delta is call delta minus one. Weekend
/// expiries have no listings.
#[derive(Debug)]
pub struct SyntheticOptionChain {
    strike_step: Decimal,
    strikes_each_side: u32,
    underlying: Mutex<HashMap<String, Decimal>>,
}

impl Default for SyntheticOptionChain {
    fn default() -> Self {
        Self::new(Decimal::ONE, 10)
    }
}

impl SyntheticOptionChain {
    #[must_use]
    pub fn new(strike_step: Decimal, strikes_each_side: u32) -> Self {
        Self {
            strike_step,
            strikes_each_side,
            underlying: Mutex::new(HashMap::new()),
        }
    }

    pub fn set_underlying(&self, symbol: &str, price: Decimal) {
        self.underlying.lock().insert(symbol.to_uppercase(), price);
    }

    fn quote(
        &self,
        symbol: &str,
        spot: Decimal,
        strike: Decimal,
        right: OptionRight,
        expiry: NaiveDate,
    ) -> OptionQuote {
        let steps = ((strike - spot) / self.strike_step).to_f64().unwrap_or(0.0);
        let call_delta = (0.5 - 0.1 * steps).clamp(0.02, 0.98);
        let delta = match right {
            OptionRight::Call => call_delta,
            OptionRight::Put => call_delta - 1.0,
        };

        let intrinsic = match right {
            OptionRight::Call => (spot - strike).max(Decimal::ZERO),
            OptionRight::Put => (strike - spot).max(Decimal::ZERO),
        };
        let distance = ((strike - spot).abs() / self.strike_step) + Decimal::ONE;
        let extrinsic = spot * Decimal::new(5, 3) / distance;
        let mid = (intrinsic + extrinsic).max(Decimal::new(5, 2)).round_dp(2);
        let half_spread = Decimal::new(2, 2);

        OptionQuote {
            option_symbol: Some(build_option_symbol(symbol, strike, right, expiry)),
            strike,
            right,
            expiry,
            delta: Some((delta * 100.0).round() / 100.0),
            bid: Some((mid - half_spread).max(Decimal::new(1, 2))),
            ask: Some(mid + half_spread),
            mid: Some(mid),
        }
    }
}

#[async_trait]
impl OptionChainSource for SyntheticOptionChain {
    async fn option_chain(&self, symbol: &str, expiry: NaiveDate) -> Result<Vec<OptionQuote>> {
        if matches!(expiry.weekday(), Weekday::Sat | Weekday::Sun) {
            return Ok(Vec::new());
        }
        let spot = self
            .underlying
            .lock()
            .get(&symbol.to_uppercase())
            .copied()
            .ok_or_else(|| anyhow!("No reference price for {symbol}"))?;

        let atm = (spot / self.strike_step).round() * self.strike_step;
        let side = i64::from(self.strikes_each_side);
        let mut chain = Vec::with_capacity(4 * self.strikes_each_side as usize + 2);
        for offset in -side..=side {
            let strike = atm + self.strike_step * Decimal::from(offset);
            if strike <= Decimal::ZERO {
                continue;
            }
            for right in [OptionRight::Call, OptionRight::Put] {
                chain.push(self.quote(symbol, spot, strike, right, expiry));
            }
        }
        Ok(chain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn friday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 5).unwrap()
    }

    #[tokio::test]
    async fn ladder_is_centered_and_priced() {
        let chains = SyntheticOptionChain::new(dec!(1), 3);
        chains.set_underlying("SPY", dec!(100.2));
        let chain = chains.option_chain("spy", friday()).await.unwrap();
        assert_eq!(chain.len(), 14);

        let atm_call = chain
            .iter()
            .find(|q| q.strike == dec!(100) && q.right == OptionRight::Call)
            .unwrap();
        assert_eq!(atm_call.option_symbol.as_deref(), Some("SPY_20240105_C100"));
        assert_eq!(atm_call.delta, Some(0.52));
        assert!(atm_call.ask.unwrap() > atm_call.bid.unwrap());

        let put = chain
            .iter()
            .find(|q| q.strike == dec!(103) && q.right == OptionRight::Put)
            .unwrap();
        assert!(put.delta.unwrap() < -0.7);
        assert!(put.mid.unwrap() >= dec!(2.8));
    }

    #[tokio::test]
    async fn weekends_and_unknown_symbols() {
        let chains = SyntheticOptionChain::default();
        chains.set_underlying("SPY", dec!(470));
        let saturday = NaiveDate::from_ymd_opt(2024, 1, 6).unwrap();
        assert!(chains.option_chain("SPY", saturday).await.unwrap().is_empty());
        assert!(chains.option_chain("QQQ", friday()).await.is_err());
    }
}
