use crate::config::{ConfigError, RiskConfig};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Multiplier from option premium to contract cost.
pub const CONTRACT_MULTIPLIER: Decimal = Decimal::ONE_HUNDRED;

/// Contract count and option-price hard stop for one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionSize {
    pub contracts: u32,
    pub notional: Decimal,
    pub hard_stop_price: Decimal,
}

/// Sizes option entries from a fixed equity allocation.
///
/// Percentages above 1 are read as whole percents (`25` means 25%), values at
/// or below 1 as fractions (`0.25`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionSizer {
    account_equity: Decimal,
    alloc_pct: Decimal,
    hard_stop_pct: Decimal,
}

impl PositionSizer {
    /// # Errors
    ///
    /// Returns `ConfigError::NotPositive` if any argument is zero or negative.
    pub fn new(
        account_equity: Decimal,
        alloc_pct: Decimal,
        hard_stop_pct: Decimal,
    ) -> Result<Self, ConfigError> {
        if account_equity <= Decimal::ZERO {
            return Err(ConfigError::not_positive("account_equity", account_equity));
        }
        if alloc_pct <= Decimal::ZERO {
            return Err(ConfigError::not_positive("portfolio_alloc_pct", alloc_pct));
        }
        if hard_stop_pct <= Decimal::ZERO {
            return Err(ConfigError::not_positive("option_hard_stop_pct", hard_stop_pct));
        }
        Ok(Self {
            account_equity,
            alloc_pct: normalize_pct(alloc_pct),
            hard_stop_pct: normalize_pct(hard_stop_pct),
        })
    }

    /// # Errors
    ///
    /// Returns `ConfigError` for non-positive values in the risk section.
    pub fn from_config(risk: &RiskConfig) -> Result<Self, ConfigError> {
        Self::new(
            risk.account_equity,
            risk.portfolio_alloc_pct,
            risk.option_hard_stop_pct,
        )
    }

    #[must_use]
    pub fn allocation(&self) -> Decimal {
        self.account_equity * self.alloc_pct
    }

    /// Contracts affordable at `ask` and the hard stop below `entry_price`.
    ///
    /// `None` when either price is non-positive or the allocation does not
    /// cover a single contract.
    #[must_use]
    pub fn contracts_for_trade(&self, ask: Decimal, entry_price: Decimal) -> Option<PositionSize> {
        if ask <= Decimal::ZERO || entry_price <= Decimal::ZERO {
            return None;
        }
        let per_contract = ask * CONTRACT_MULTIPLIER;
        let contracts = (self.allocation() / per_contract).floor();
        if contracts < Decimal::ONE {
            return None;
        }
        let contracts = contracts.to_u32()?;

        Some(PositionSize {
            contracts,
            notional: Decimal::from(contracts) * per_contract,
            hard_stop_price: entry_price * (Decimal::ONE - self.hard_stop_pct),
        })
    }
}

/// Whole percents (`> 1`) become fractions; fractions pass through.
#[must_use]
pub fn normalize_pct(pct: Decimal) -> Decimal {
    if pct > Decimal::ONE {
        pct / Decimal::ONE_HUNDRED
    } else {
        pct
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_reference_sizing() {
        let sizer = PositionSizer::new(dec!(50000), dec!(0.25), dec!(0.5)).unwrap();
        let size = sizer.contracts_for_trade(dec!(2.5), dec!(2.5)).unwrap();
        assert_eq!(size.contracts, 50);
        assert_eq!(size.notional, dec!(12500));
        assert_eq!(size.hard_stop_price, dec!(1.25));
    }

    #[test]
    fn test_whole_percent_matches_fraction() {
        let a = PositionSizer::new(dec!(50000), dec!(25), dec!(50)).unwrap();
        let b = PositionSizer::new(dec!(50000), dec!(0.25), dec!(0.5)).unwrap();
        assert_eq!(
            a.contracts_for_trade(dec!(2.5), dec!(2.5)),
            b.contracts_for_trade(dec!(2.5), dec!(2.5))
        );
        assert_eq!(normalize_pct(dec!(1)), dec!(1));
    }

    #[test]
    fn test_contracts_are_floored() {
        let sizer = PositionSizer::new(dec!(10000), dec!(0.25), dec!(0.5)).unwrap();
        // 2500 / 340 = 7.35
        let size = sizer.contracts_for_trade(dec!(3.40), dec!(3.40)).unwrap();
        assert_eq!(size.contracts, 7);
        assert_eq!(size.notional, dec!(2380));
    }

    #[test]
    fn test_no_size_for_bad_prices_or_small_allocation() {
        let sizer = PositionSizer::new(dec!(1000), dec!(0.1), dec!(0.5)).unwrap();
        assert!(sizer.contracts_for_trade(dec!(0), dec!(1)).is_none());
        assert!(sizer.contracts_for_trade(dec!(1), dec!(-1)).is_none());
        // 100 allocation against 150 per contract
        assert!(sizer.contracts_for_trade(dec!(1.5), dec!(1.5)).is_none());
    }

    #[test]
    fn test_rejects_non_positive_parameters() {
        assert!(PositionSizer::new(dec!(0), dec!(0.25), dec!(0.5)).is_err());
        assert!(PositionSizer::new(dec!(1000), dec!(-0.25), dec!(0.5)).is_err());
        assert!(matches!(
            PositionSizer::new(dec!(1000), dec!(0.25), dec!(0)),
            Err(ConfigError::NotPositive {
                field: "option_hard_stop_pct",
                ..
            })
        ));
    }
}
