//! EMA and MACD over closing prices.

use orbfib_core::Direction;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StrategyError};

pub const MACD_FAST: usize = 12;
pub const MACD_SLOW: usize = 26;
pub const MACD_SIGNAL: usize = 9;

/// Exponential moving average series.
///
/// The first output equals the first input; later values use
/// `alpha = 2 / (period + 1)`.
///
/// # Errors
///
/// `InsufficientData` when `values` is shorter than `period`, `InvalidPeriod`
/// for a zero period.
pub fn ema(values: &[Decimal], period: usize) -> Result<Vec<Decimal>> {
    if period == 0 {
        return Err(StrategyError::InvalidPeriod { what: "ema", period });
    }
    if values.len() < period {
        return Err(StrategyError::insufficient("ema", period, values.len()));
    }

    let alpha = Decimal::TWO / Decimal::from(period + 1);
    let mut out = Vec::with_capacity(values.len());
    let mut prev = values[0];
    out.push(prev);
    for &value in &values[1..] {
        prev += (value - prev) * alpha;
        out.push(prev);
    }
    Ok(out)
}

/// Latest MACD line, signal line and histogram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacdReading {
    pub macd: Decimal,
    pub signal: Decimal,
    pub histogram: Decimal,
}

impl MacdReading {
    /// Long needs MACD at or above signal with a non-negative histogram; short mirrors it.
    #[must_use]
    pub fn confirms(&self, direction: Direction) -> bool {
        match direction {
            Direction::Long => self.macd >= self.signal && self.histogram >= Decimal::ZERO,
            Direction::Short => self.macd <= self.signal && self.histogram <= Decimal::ZERO,
        }
    }
}

/// MACD with the given fast, slow and signal periods.
///
/// # Errors
///
/// `InsufficientData` when there are fewer than `slow + signal` prices.
pub fn macd(prices: &[Decimal], fast: usize, slow: usize, signal: usize) -> Result<MacdReading> {
    let needed = slow + signal;
    if prices.len() < needed {
        return Err(StrategyError::insufficient("macd", needed, prices.len()));
    }

    let fast_ema = ema(prices, fast)?;
    let slow_ema = ema(prices, slow)?;
    let macd_line: Vec<Decimal> = fast_ema
        .iter()
        .zip(&slow_ema)
        .map(|(f, s)| f - s)
        .collect();
    let signal_line = ema(&macd_line, signal)?;

    // both series have one value per price
    let macd = macd_line[macd_line.len() - 1];
    let signal = signal_line[signal_line.len() - 1];
    Ok(MacdReading {
        macd,
        signal,
        histogram: macd - signal,
    })
}

/// MACD with the standard 12/26/9 periods.
///
/// # Errors
///
/// `InsufficientData` when there are fewer than 35 prices.
pub fn macd_default(prices: &[Decimal]) -> Result<MacdReading> {
    macd(prices, MACD_FAST, MACD_SLOW, MACD_SIGNAL)
}
