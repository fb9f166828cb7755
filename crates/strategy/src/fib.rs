//! Fibonacci retracement and extension grid between two anchors.

use orbfib_core::Direction;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Grid level keys.
///
/// Retracements sit between the anchors (`B - diff * k`), extensions beyond B
/// (`B + diff * (k - 1)`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub enum FibLevel {
    R236,
    R382,
    R500,
    R618,
    R786,
    E1272,
    E1618,
}

impl FibLevel {
    pub const ALL: [Self; 7] = [
        Self::R236,
        Self::R382,
        Self::R500,
        Self::R618,
        Self::R786,
        Self::E1272,
        Self::E1618,
    ];

    #[must_use]
    pub const fn ratio(self) -> Decimal {
        match self {
            Self::R236 => Decimal::from_parts(236, 0, 0, false, 3),
            Self::R382 => Decimal::from_parts(382, 0, 0, false, 3),
            Self::R500 => Decimal::from_parts(5, 0, 0, false, 1),
            Self::R618 => Decimal::from_parts(618, 0, 0, false, 3),
            Self::R786 => Decimal::from_parts(786, 0, 0, false, 3),
            Self::E1272 => Decimal::from_parts(1272, 0, 0, false, 3),
            Self::E1618 => Decimal::from_parts(1618, 0, 0, false, 3),
        }
    }

    #[must_use]
    pub const fn is_extension(self) -> bool {
        matches!(self, Self::E1272 | Self::E1618)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::R236 => "0.236",
            Self::R382 => "0.382",
            Self::R500 => "0.5",
            Self::R618 => "0.618",
            Self::R786 => "0.786",
            Self::E1272 => "1.272",
            Self::E1618 => "1.618",
        }
    }
}

impl fmt::Display for FibLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<f64> for FibLevel {
    type Error = String;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|level| (level_f64(*level) - value).abs() < 1e-9)
            .ok_or_else(|| format!("unknown fib level {value}"))
    }
}

impl From<FibLevel> for f64 {
    fn from(level: FibLevel) -> Self {
        level_f64(level)
    }
}

fn level_f64(level: FibLevel) -> f64 {
    match level {
        FibLevel::R236 => 0.236,
        FibLevel::R382 => 0.382,
        FibLevel::R500 => 0.5,
        FibLevel::R618 => 0.618,
        FibLevel::R786 => 0.786,
        FibLevel::E1272 => 1.272,
        FibLevel::E1618 => 1.618,
    }
}

/// `(A, B)`: long anchors on the day low, short on the day high.
#[must_use]
pub fn anchors(direction: Direction, day_low: Decimal, day_high: Decimal) -> (Decimal, Decimal) {
    match direction {
        Direction::Long => (day_low, day_high),
        Direction::Short => (day_high, day_low),
    }
}

/// Price grid derived from anchors A and B.
///
/// Fields are private so a grid can only exist consistent with its anchors;
/// moving B produces a new grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FibGrid {
    anchor_a: Decimal,
    anchor_b: Decimal,
}

impl FibGrid {
    #[must_use]
    pub const fn new(anchor_a: Decimal, anchor_b: Decimal) -> Self {
        Self { anchor_a, anchor_b }
    }

    #[must_use]
    pub fn for_session(direction: Direction, day_low: Decimal, day_high: Decimal) -> Self {
        let (a, b) = anchors(direction, day_low, day_high);
        Self::new(a, b)
    }

    #[must_use]
    pub const fn anchor_a(&self) -> Decimal {
        self.anchor_a
    }

    #[must_use]
    pub const fn anchor_b(&self) -> Decimal {
        self.anchor_b
    }

    #[must_use]
    pub const fn with_anchor_b(&self, anchor_b: Decimal) -> Self {
        Self::new(self.anchor_a, anchor_b)
    }

    #[must_use]
    pub fn diff(&self) -> Decimal {
        self.anchor_b - self.anchor_a
    }

    /// Retracement price for an arbitrary ratio. `price_at(0)` is B, `price_at(1)` is A.
    #[must_use]
    pub fn price_at(&self, ratio: Decimal) -> Decimal {
        self.anchor_b - self.diff() * ratio
    }

    #[must_use]
    pub fn level(&self, level: FibLevel) -> Decimal {
        let k = level.ratio();
        if level.is_extension() {
            self.anchor_b + self.diff() * (k - Decimal::ONE)
        } else {
            self.price_at(k)
        }
    }

    /// All seven levels in key order.
    #[must_use]
    pub fn levels(&self) -> Vec<(FibLevel, Decimal)> {
        FibLevel::ALL
            .into_iter()
            .map(|level| (level, self.level(level)))
            .collect()
    }
}
