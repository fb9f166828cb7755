//! Profit target rules: target-1 partial take, then the runner exit.

use orbfib_core::PartialTakeConfig;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::types::{PositionState, TargetAction};

/// Check profit targets against the latest underlying price.
///
/// Target-1 and the runner exit can both fire on one tick: the runner check
/// sees target-1 as done once it has fired. Nothing fires once the partial
/// take has sold every contract.
pub fn check_profit_targets(
    pos: &PositionState,
    price: Decimal,
    partial: &PartialTakeConfig,
) -> Vec<TargetAction> {
    let mut actions = Vec::new();
    let mut exit1_done = pos.exit1_done;
    let mut runner_qty = pos.runner_qty;

    if !exit1_done && pos.direction.reached(price, pos.t1) {
        let quantity = partial_quantity(pos.qty, partial).min(runner_qty);
        tracing::info!(
            symbol = pos.symbol,
            price = %price,
            t1 = %pos.t1,
            sell_quantity = quantity,
            "Target 1 reached"
        );
        actions.push(TargetAction::Target1 { quantity });
        exit1_done = true;
        runner_qty -= quantity;
    }

    let runner_target_hit =
        pos.direction.reached(price, pos.t2) || pos.direction.reached(price, pos.t1618);
    if exit1_done && !pos.exit2_done && runner_qty > 0 && runner_target_hit {
        tracing::info!(
            symbol = pos.symbol,
            price = %price,
            t2 = %pos.t2,
            "Runner target reached, closing remaining"
        );
        actions.push(TargetAction::CloseRunner);
    }

    actions
}

/// Contracts sold at target-1: `floor(qty * pct)` when partial-take is enabled.
pub fn partial_quantity(qty: u32, partial: &PartialTakeConfig) -> u32 {
    if !partial.enabled {
        return 0;
    }
    (Decimal::from(qty) * partial.pct_close_at_t1)
        .floor()
        .to_u32()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::fixtures::{long_position, short_position};
    use rust_decimal_macros::dec;

    fn enabled(pct: Decimal) -> PartialTakeConfig {
        PartialTakeConfig {
            enabled: true,
            pct_close_at_t1: pct,
            ..PartialTakeConfig::default()
        }
    }

    #[test]
    fn target1_sells_configured_fraction() {
        let pos = long_position(5);
        let actions = check_profit_targets(&pos, dec!(110), &enabled(dec!(0.5)));
        assert_eq!(actions, vec![TargetAction::Target1 { quantity: 2 }]);
    }

    #[test]
    fn target1_without_partial_take_sells_nothing() {
        let pos = long_position(5);
        let actions = check_profit_targets(&pos, dec!(110.5), &PartialTakeConfig::default());
        assert_eq!(actions, vec![TargetAction::Target1 { quantity: 0 }]);
    }

    #[test]
    fn single_contract_rounds_down_to_no_partial() {
        assert_eq!(partial_quantity(1, &enabled(dec!(0.5))), 0);
        assert_eq!(partial_quantity(3, &enabled(dec!(0.5))), 1);
        assert_eq!(partial_quantity(4, &enabled(dec!(1))), 4);
    }

    #[test]
    fn gap_through_both_targets_fires_both() {
        let pos = long_position(4);
        let actions = check_profit_targets(&pos, dec!(113), &enabled(dec!(0.5)));
        assert_eq!(
            actions,
            vec![TargetAction::Target1 { quantity: 2 }, TargetAction::CloseRunner]
        );
    }

    #[test]
    fn runner_after_partial_done() {
        let mut pos = long_position(4);
        pos.exit1_done = true;
        pos.runner_qty = 2;
        assert!(check_profit_targets(&pos, dec!(112), &enabled(dec!(0.5))).is_empty());
        assert_eq!(
            check_profit_targets(&pos, dec!(112.72), &enabled(dec!(0.5))),
            vec![TargetAction::CloseRunner]
        );
    }

    #[test]
    fn full_partial_leaves_no_runner() {
        let pos = long_position(4);
        let actions = check_profit_targets(&pos, dec!(120), &enabled(dec!(1)));
        assert_eq!(actions, vec![TargetAction::Target1 { quantity: 4 }]);
    }

    #[test]
    fn short_targets_trigger_below() {
        let pos = short_position(4);
        assert!(check_profit_targets(&pos, dec!(90.5), &enabled(dec!(0.5))).is_empty());
        assert_eq!(
            check_profit_targets(&pos, dec!(90), &enabled(dec!(0.5))),
            vec![TargetAction::Target1 { quantity: 2 }]
        );
    }
}
