//! Walks bars after a breakout looking for a retracement tag.

use chrono::{DateTime, Duration, Utc};
use orbfib_core::{Bar, Direction};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::fib::{FibGrid, FibLevel};

pub const DEFAULT_PULLBACK_LEVELS: [FibLevel; 2] = [FibLevel::R500, FibLevel::R618];

/// Result of a pullback walk. Every variant carries the grid as it stood when
/// the walk ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PullbackOutcome {
    Entry {
        level: FibLevel,
        timestamp: DateTime<Utc>,
        price: Decimal,
        grid: FibGrid,
    },
    /// A close beyond the 0.786 retracement against the trade.
    Invalidated { grid: FibGrid },
    /// Timed out or ran out of bars.
    NoEntry { grid: FibGrid },
}

impl PullbackOutcome {
    #[must_use]
    pub const fn grid(&self) -> &FibGrid {
        match self {
            Self::Entry { grid, .. } | Self::Invalidated { grid } | Self::NoEntry { grid } => grid,
        }
    }

    #[must_use]
    pub const fn is_entry(&self) -> bool {
        matches!(self, Self::Entry { .. })
    }
}

/// Scans bars after `breakout_ts` for the first bar whose range contains one
/// of `levels`, checked in the given order.
///
/// A new extreme beyond B moves B before any other check on that bar. Bars
/// after `breakout_ts + timeout_minutes` are not considered.
#[must_use]
pub fn await_pullback_to(
    bars: &[Bar],
    direction: Direction,
    grid: FibGrid,
    breakout_ts: DateTime<Utc>,
    levels: &[FibLevel],
    timeout_minutes: Option<u32>,
) -> PullbackOutcome {
    let levels = if levels.is_empty() {
        &DEFAULT_PULLBACK_LEVELS[..]
    } else {
        levels
    };
    let expiry = timeout_minutes.map(|m| breakout_ts + Duration::minutes(i64::from(m)));
    let mut grid = grid;

    for bar in bars.iter().filter(|b| b.timestamp > breakout_ts) {
        if expiry.is_some_and(|expiry| bar.timestamp > expiry) {
            break;
        }

        let extreme = match direction {
            Direction::Long => bar.high,
            Direction::Short => bar.low,
        };
        if direction.exceeds(extreme, grid.anchor_b()) {
            grid = grid.with_anchor_b(extreme);
        }

        if direction.exceeds(grid.level(FibLevel::R786), bar.close) {
            return PullbackOutcome::Invalidated { grid };
        }

        for &level in levels {
            let price = grid.level(level);
            if bar.contains(price) {
                return PullbackOutcome::Entry {
                    level,
                    timestamp: bar.timestamp,
                    price,
                    grid,
                };
            }
        }
    }

    PullbackOutcome::NoEntry { grid }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{five_minute_bars, replace_bar};
    use orbfib_core::session_extremes;
    use rust_decimal_macros::dec;

    #[test]
    fn extends_b_before_tagging_the_half_retracement() {
        let mut bars = five_minute_bars(12, dec!(100));
        let (low, high) = session_extremes(&bars).unwrap();
        let grid = FibGrid::for_session(Direction::Long, low, high);
        let breakout_ts = bars[6].timestamp;
        replace_bar(&mut bars, 7, dec!(111), dec!(112), dec!(109), dec!(112));
        replace_bar(&mut bars, 8, dec!(106), dec!(107), dec!(104), dec!(105));

        let outcome = await_pullback_to(
            &bars,
            Direction::Long,
            grid,
            breakout_ts,
            &DEFAULT_PULLBACK_LEVELS,
            Some(60),
        );
        let PullbackOutcome::Entry {
            level,
            timestamp,
            price,
            grid,
        } = outcome
        else {
            panic!("expected entry, got {outcome:?}");
        };
        assert_eq!(level, FibLevel::R500);
        assert_eq!(timestamp, bars[8].timestamp);
        assert_eq!(grid.anchor_b(), dec!(112));
        assert_eq!(grid.level(FibLevel::R500), price);
    }

    #[test]
    fn requested_order_breaks_ties_within_a_bar() {
        let mut bars = five_minute_bars(12, dec!(100));
        let grid = FibGrid::new(dec!(99.5), dec!(112));
        let breakout_ts = bars[6].timestamp;
        replace_bar(&mut bars, 7, dec!(111), dec!(112), dec!(109), dec!(112));
        replace_bar(&mut bars, 8, dec!(106), dec!(107), dec!(104), dec!(105));
        replace_bar(&mut bars, 9, dec!(106), dec!(106.5), dec!(103), dec!(104));

        let outcome = await_pullback_to(
            &bars,
            Direction::Long,
            grid,
            breakout_ts,
            &[FibLevel::R618, FibLevel::R500],
            Some(60),
        );
        // bar 8 contains both 0.618 (104.275) and 0.5 (105.75); requested order decides
        match outcome {
            PullbackOutcome::Entry {
                level, timestamp, ..
            } => {
                assert_eq!(timestamp, bars[8].timestamp);
                assert_eq!(level, FibLevel::R618);
            }
            other => panic!("expected entry, got {other:?}"),
        }
    }

    #[test]
    fn close_beyond_786_invalidates() {
        let mut bars = five_minute_bars(12, dec!(100));
        let grid = FibGrid::new(dec!(99.5), dec!(110));
        let breakout_ts = bars[6].timestamp;
        // 0.786 sits at 101.747; the close below it beats the tags inside the range
        replace_bar(&mut bars, 7, dec!(109), dec!(109.5), dec!(101), dec!(101));

        let outcome = await_pullback_to(
            &bars,
            Direction::Long,
            grid,
            breakout_ts,
            &DEFAULT_PULLBACK_LEVELS,
            Some(60),
        );
        assert_eq!(outcome, PullbackOutcome::Invalidated { grid });
    }

    #[test]
    fn times_out_without_tag() {
        let mut bars = five_minute_bars(30, dec!(100));
        let grid = FibGrid::new(dec!(90), dec!(120));
        let breakout_ts = bars[6].timestamp;
        for i in 7..bars.len() {
            replace_bar(&mut bars, i, dec!(118), dec!(119), dec!(117), dec!(118));
        }
        let outcome = await_pullback_to(
            &bars,
            Direction::Long,
            grid,
            breakout_ts,
            &DEFAULT_PULLBACK_LEVELS,
            Some(15),
        );
        assert_eq!(outcome, PullbackOutcome::NoEntry { grid });
        assert!(!outcome.is_entry());
    }

    #[test]
    fn short_walk_extends_down_and_tags() {
        let mut bars = five_minute_bars(12, dec!(100));
        let grid = FibGrid::for_session(Direction::Short, dec!(95), dec!(105));
        let breakout_ts = bars[6].timestamp;
        replace_bar(&mut bars, 7, dec!(95), dec!(95.5), dec!(90), dec!(90.5));
        // new grid A=105 B=90: 0.5 at 97.5
        replace_bar(&mut bars, 8, dec!(96), dec!(98), dec!(95.5), dec!(97));

        let outcome = await_pullback_to(
            &bars,
            Direction::Short,
            grid,
            breakout_ts,
            &DEFAULT_PULLBACK_LEVELS,
            None,
        );
        match outcome {
            PullbackOutcome::Entry {
                level, price, grid, ..
            } => {
                assert_eq!(level, FibLevel::R500);
                assert_eq!(price, dec!(97.5));
                assert_eq!(grid.anchor_b(), dec!(90));
            }
            other => panic!("expected entry, got {other:?}"),
        }
    }
}
