//! Option contract types shared by the chain source, selector and executor.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::direction::Direction;

/// Options contract right (call or put).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionRight {
    Call,
    Put,
}

impl OptionRight {
    /// Calls for long trades, puts for short trades.
    #[must_use]
    pub const fn for_direction(direction: Direction) -> Self {
        match direction {
            Direction::Long => Self::Call,
            Direction::Short => Self::Put,
        }
    }

    /// Single-letter code used in contract symbols.
    #[must_use]
    pub const fn code(self) -> char {
        match self {
            Self::Call => 'C',
            Self::Put => 'P',
        }
    }
}

impl std::fmt::Display for OptionRight {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// One row of an option chain as returned by a chain source.
///
/// Price and greek fields are optional because providers fill them unevenly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionQuote {
    /// Provider symbol, if the provider supplies one.
    pub option_symbol: Option<String>,
    pub strike: Decimal,
    pub right: OptionRight,
    pub expiry: NaiveDate,
    pub delta: Option<f64>,
    pub bid: Option<Decimal>,
    pub ask: Option<Decimal>,
    pub mid: Option<Decimal>,
}

impl OptionQuote {
    /// Entry price for sizing: ask, falling back to mid.
    #[must_use]
    pub fn entry_price(&self) -> Option<Decimal> {
        self.ask.or(self.mid)
    }
}

/// Contract chosen for entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedOption {
    pub option_symbol: String,
    pub strike: Decimal,
    pub right: OptionRight,
    pub expiry: NaiveDate,
    pub delta: f64,
    pub ask: Decimal,
}

/// Builds `{SYM}_{YYYYMMDD}_{C|P}{strike}`, dropping a zero fractional strike.
#[must_use]
pub fn build_option_symbol(
    underlying: &str,
    strike: Decimal,
    right: OptionRight,
    expiry: NaiveDate,
) -> String {
    format!(
        "{}_{}_{}{}",
        underlying.to_uppercase(),
        expiry.format("%Y%m%d"),
        right.code(),
        strike.normalize()
    )
}
