use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single OHLCV price bar for the underlying.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: u64,
}

impl Bar {
    #[must_use]
    pub const fn new(
        timestamp: DateTime<Utc>,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: u64,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// True when `price` lies inside the bar's `[low, high]` range.
    #[must_use]
    pub fn contains(&self, price: Decimal) -> bool {
        self.low <= price && price <= self.high
    }
}

/// Highest high and lowest low over a bar slice, or `None` when empty.
#[must_use]
pub fn session_extremes(bars: &[Bar]) -> Option<(Decimal, Decimal)> {
    let first = bars.first()?;
    let (low, high) = bars.iter().fold((first.low, first.high), |(lo, hi), b| {
        (lo.min(b.low), hi.max(b.high))
    });
    Some((low, high))
}

/// Bar interval requested from a market data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1Min")]
    OneMinute,
    #[serde(rename = "5Min")]
    FiveMinute,
}

impl Timeframe {
    #[must_use]
    pub fn duration(self) -> Duration {
        match self {
            Self::OneMinute => Duration::minutes(1),
            Self::FiveMinute => Duration::minutes(5),
        }
    }
}

impl std::fmt::Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OneMinute => write!(f, "1Min"),
            Self::FiveMinute => write!(f, "5Min"),
        }
    }
}
