//! Structural stop and profit targets for an entry on the grid.

use orbfib_core::{Direction, TargetMode};
use rust_decimal::Decimal;

use crate::fib::{FibGrid, FibLevel};

/// Reward multiple used by [`TargetMode::Rr`].
pub const RR_MULTIPLE: Decimal = Decimal::TWO;

/// Stop and ordered targets for an entry at `entry_price`.
///
/// The stop is the further of the 0.786 level and anchor A. Targets start with
/// the B retest; fib mode adds the 1.272 and 1.618 extensions, rr mode a 2R
/// target.
#[must_use]
pub fn stops_targets(
    direction: Direction,
    grid: &FibGrid,
    entry_price: Decimal,
    mode: TargetMode,
) -> (Decimal, Vec<Decimal>) {
    let stop = direction.looser(grid.level(FibLevel::R786), grid.anchor_a());
    let retest = grid.anchor_b();

    let targets = match mode {
        TargetMode::Fib => vec![
            retest,
            grid.level(FibLevel::E1272),
            grid.level(FibLevel::E1618),
        ],
        // entry - stop carries the sign for both directions
        TargetMode::Rr => vec![retest, entry_price + RR_MULTIPLE * (entry_price - stop)],
    };
    (stop, targets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn long_fib_targets() {
        let grid = FibGrid::new(dec!(100), dec!(110));
        let (stop, targets) = stops_targets(Direction::Long, &grid, dec!(105), TargetMode::Fib);
        assert_eq!(stop, dec!(100));
        assert_eq!(targets, vec![dec!(110), dec!(112.72), dec!(116.18)]);
    }

    #[test]
    fn short_stop_is_the_higher_of_a_and_786() {
        let grid = FibGrid::new(dec!(110), dec!(100));
        let (stop, targets) = stops_targets(Direction::Short, &grid, dec!(105), TargetMode::Fib);
        assert_eq!(stop, dec!(110));
        assert_eq!(targets[0], dec!(100));
        assert_eq!(targets[1], dec!(97.28));
        assert!(stop > dec!(105));
    }

    #[test]
    fn rr_target_is_two_r_each_way() {
        let grid = FibGrid::new(dec!(100), dec!(110));
        let (stop, targets) = stops_targets(Direction::Long, &grid, dec!(105), TargetMode::Rr);
        assert_eq!(targets, vec![dec!(110), dec!(115)]);
        assert_eq!(stop, dec!(100));

        let grid = FibGrid::new(dec!(110), dec!(100));
        let (_, targets) = stops_targets(Direction::Short, &grid, dec!(105), TargetMode::Rr);
        assert_eq!(targets, vec![dec!(100), dec!(95)]);
    }
}
