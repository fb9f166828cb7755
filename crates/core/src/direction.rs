//! Trade direction and the mirrored price comparisons that go with it.
//!
//! Every component that compares prices against levels goes through these
//! helpers, so long/short symmetry is written exactly once.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Direction of a trade on the underlying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Break above the opening range high; trade calls.
    Long,
    /// Break below the opening range low; trade puts.
    Short,
}

impl Direction {
    /// Returns the opposite direction.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Long => Self::Short,
            Self::Short => Self::Long,
        }
    }

    /// `+1` for long, `-1` for short.
    #[must_use]
    pub fn sign(self) -> Decimal {
        match self {
            Self::Long => Decimal::ONE,
            Self::Short => Decimal::NEGATIVE_ONE,
        }
    }

    /// True when `price` is strictly beyond `level` in the trade's favour.
    #[must_use]
    pub fn exceeds(self, price: Decimal, level: Decimal) -> bool {
        match self {
            Self::Long => price > level,
            Self::Short => price < level,
        }
    }

    /// True when `price` has reached or passed a profit `target`.
    #[must_use]
    pub fn reached(self, price: Decimal, target: Decimal) -> bool {
        match self {
            Self::Long => price >= target,
            Self::Short => price <= target,
        }
    }

    /// True when `price` has touched or crossed a protective `stop`.
    #[must_use]
    pub fn breached(self, price: Decimal, stop: Decimal) -> bool {
        match self {
            Self::Long => price <= stop,
            Self::Short => price >= stop,
        }
    }

    /// The tighter of two stops (closer to price on the protective side).
    #[must_use]
    pub fn tighter(self, a: Decimal, b: Decimal) -> Decimal {
        match self {
            Self::Long => a.max(b),
            Self::Short => a.min(b),
        }
    }

    /// The looser of two stops (further from price on the protective side).
    #[must_use]
    pub fn looser(self, a: Decimal, b: Decimal) -> Decimal {
        match self {
            Self::Long => a.min(b),
            Self::Short => a.max(b),
        }
    }

    /// Adverse move from `entry` to `price`, in percent of `entry`.
    ///
    /// Positive when price has moved against the trade. Returns zero for a
    /// non-positive entry.
    #[must_use]
    pub fn adverse_move_pct(self, entry: Decimal, price: Decimal) -> Decimal {
        if entry <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        self.sign() * (entry - price) / entry * Decimal::ONE_HUNDRED
    }

    /// Lowercase label used in reasons, keys and the journal.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Long => "long",
            Self::Short => "short",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "long" => Ok(Self::Long),
            "short" => Ok(Self::Short),
            other => Err(format!("unknown direction: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn comparisons_mirror_between_long_and_short() {
        assert!(Direction::Long.reached(dec!(105), dec!(105)));
        assert!(!Direction::Long.reached(dec!(104.99), dec!(105)));
        assert!(Direction::Short.reached(dec!(95), dec!(95)));
        assert!(!Direction::Short.reached(dec!(95.01), dec!(95)));

        assert!(Direction::Long.breached(dec!(99), dec!(99)));
        assert!(Direction::Short.breached(dec!(101), dec!(101)));
        assert!(!Direction::Short.breached(dec!(100.5), dec!(101)));

        assert!(Direction::Long.exceeds(dec!(101), dec!(100)));
        assert!(!Direction::Long.exceeds(dec!(100), dec!(100)));
        assert!(Direction::Short.exceeds(dec!(99), dec!(100)));
    }

    #[test]
    fn tighter_and_looser_stops() {
        assert_eq!(Direction::Long.tighter(dec!(98), dec!(99)), dec!(99));
        assert_eq!(Direction::Long.looser(dec!(98), dec!(99)), dec!(98));
        assert_eq!(Direction::Short.tighter(dec!(102), dec!(101)), dec!(101));
        assert_eq!(Direction::Short.looser(dec!(102), dec!(101)), dec!(102));
    }

    #[test]
    fn adverse_move_is_positive_against_the_trade() {
        assert_eq!(Direction::Long.adverse_move_pct(dec!(100), dec!(97)), dec!(3));
        assert_eq!(Direction::Short.adverse_move_pct(dec!(100), dec!(103)), dec!(3));
        assert_eq!(Direction::Long.adverse_move_pct(dec!(100), dec!(102)), dec!(-2));
        assert_eq!(Direction::Long.adverse_move_pct(dec!(0), dec!(5)), dec!(0));
    }

    #[test]
    fn serde_uses_lowercase_labels() {
        let json = serde_json::to_string(&Direction::Short).unwrap();
        assert_eq!(json, "\"short\"");
        assert_eq!(Direction::Long.to_string(), "long");
        assert_eq!(Direction::Long.opposite(), Direction::Short);
        assert_eq!("SHORT".parse::<Direction>(), Ok(Direction::Short));
        assert!("flat".parse::<Direction>().is_err());
    }
}
