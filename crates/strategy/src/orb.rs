//! Opening range box and breakout detection.

use chrono::{DateTime, Duration, Utc};
use orbfib_core::{Bar, Direction};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StrategyError};

/// High/low of the opening window, `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpeningRangeBox {
    pub high: Decimal,
    pub low: Decimal,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Which bound of the opening range was broken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BreakoutSide {
    Up,
    Down,
}

impl BreakoutSide {
    #[must_use]
    pub const fn direction(self) -> Direction {
        match self {
            Self::Up => Direction::Long,
            Self::Down => Direction::Short,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breakout {
    pub side: BreakoutSide,
    pub timestamp: DateTime<Utc>,
}

/// Builds the opening range from bars strictly before `first.timestamp + minutes`.
///
/// # Errors
///
/// `InsufficientData` when `bars` is empty or no bar falls inside the window.
pub fn compute_orb(bars: &[Bar], minutes: u32) -> Result<OpeningRangeBox> {
    let first = bars
        .first()
        .ok_or(StrategyError::insufficient("opening range", 1, 0))?;
    let start = first.timestamp;
    let end = start + Duration::minutes(i64::from(minutes));

    let mut window = bars.iter().filter(|b| b.timestamp < end);
    let seed = window
        .next()
        .ok_or(StrategyError::insufficient("opening range window", 1, 0))?;
    let (low, high) = window.fold((seed.low, seed.high), |(lo, hi), b| {
        (lo.min(b.low), hi.max(b.high))
    });

    Ok(OpeningRangeBox {
        high,
        low,
        start,
        end,
    })
}

/// First bar after `or_end` whose close (or wick) leaves the range.
///
/// Later breaches are ignored once one bar qualifies.
#[must_use]
pub fn detect_breakout(
    bars: &[Bar],
    or_high: Decimal,
    or_low: Decimal,
    or_end: DateTime<Utc>,
    require_close: bool,
) -> Option<Breakout> {
    bars.iter()
        .filter(|b| b.timestamp > or_end)
        .find_map(|bar| {
            let (up_probe, down_probe) = if require_close {
                (bar.close, bar.close)
            } else {
                (bar.high, bar.low)
            };
            let side = if up_probe > or_high {
                BreakoutSide::Up
            } else if down_probe < or_low {
                BreakoutSide::Down
            } else {
                return None;
            };
            Some(Breakout {
                side,
                timestamp: bar.timestamp,
            })
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{five_minute_bars, replace_bar};
    use rust_decimal_macros::dec;

    #[test]
    fn range_covers_bars_before_cutoff() {
        let bars = five_minute_bars(12, dec!(100));
        let orb = compute_orb(&bars, 30).unwrap();
        // six bars inside 09:30..10:00, last price 101.0
        assert_eq!(orb.low, dec!(99.5));
        assert_eq!(orb.high, dec!(101.5));
        assert_eq!(orb.start, bars[0].timestamp);
        assert_eq!(orb.end, bars[6].timestamp);
        assert!(orb.high >= orb.low);
    }

    #[test]
    fn range_requires_bars() {
        assert!(matches!(
            compute_orb(&[], 30),
            Err(StrategyError::InsufficientData { .. })
        ));
    }

    #[test]
    fn range_of_single_bar() {
        let bars = five_minute_bars(1, dec!(50));
        let orb = compute_orb(&bars, 1).unwrap();
        assert_eq!((orb.low, orb.high), (dec!(49.5), dec!(50.5)));
    }

    #[test]
    fn no_breakout_inside_range_then_first_break_wins() {
        let mut bars = five_minute_bars(12, dec!(100));
        for i in 6..bars.len() {
            replace_bar(&mut bars, i, dec!(101), dec!(101.3), dec!(100.7), dec!(101));
        }
        let orb = compute_orb(&bars, 30).unwrap();
        assert!(detect_breakout(&bars, orb.high, orb.low, orb.end, true).is_none());

        replace_bar(&mut bars, 7, dec!(102), dec!(103), dec!(101.5), dec!(103));
        replace_bar(&mut bars, 9, dec!(98), dec!(98.5), dec!(97), dec!(97));
        let breakout = detect_breakout(&bars, orb.high, orb.low, orb.end, true).unwrap();
        assert_eq!(breakout.side, BreakoutSide::Up);
        assert_eq!(breakout.timestamp, bars[7].timestamp);
        assert_eq!(breakout.side.direction(), Direction::Long);
    }

    #[test]
    fn bar_at_range_end_is_ignored() {
        let mut bars = five_minute_bars(8, dec!(100));
        replace_bar(&mut bars, 6, dec!(104), dec!(105), dec!(103), dec!(105));
        let orb = compute_orb(&bars, 30).unwrap();
        assert_eq!(bars[6].timestamp, orb.end);
        let breakout = detect_breakout(&bars, orb.high, orb.low, orb.end, true);
        assert!(breakout.map_or(true, |b| b.timestamp > orb.end));
    }

    #[test]
    fn wick_mode_uses_highs_and_lows() {
        let mut bars = five_minute_bars(10, dec!(100));
        for i in 6..bars.len() {
            replace_bar(&mut bars, i, dec!(101), dec!(101.3), dec!(100.7), dec!(101));
        }
        // wick below the range, close back inside
        replace_bar(&mut bars, 8, dec!(100), dec!(100.2), dec!(99), dec!(100));
        let orb = compute_orb(&bars, 30).unwrap();
        assert!(detect_breakout(&bars, orb.high, orb.low, orb.end, true).is_none());
        let breakout = detect_breakout(&bars, orb.high, orb.low, orb.end, false).unwrap();
        assert_eq!(breakout.side, BreakoutSide::Down);
        assert_eq!(breakout.timestamp, bars[8].timestamp);
    }
}
