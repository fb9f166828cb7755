//! Kill-switch and underlying stop rules, plus the stop ratchet.

use orbfib_core::PartialTakeConfig;
use rust_decimal::Decimal;

use crate::types::{ExitReason, PositionState, StopAction};

/// Check loss-control rules against the latest underlying price.
///
/// The kill-switch is checked before the stop breach.
pub fn check_stop_rules(
    pos: &PositionState,
    price: Decimal,
    kill_switch_pct: Decimal,
) -> Option<StopAction> {
    if let Some(action) = check_kill_switch(pos, price, kill_switch_pct) {
        return Some(action);
    }
    check_stop_breach(pos, price)
}

/// Close everything when the underlying has moved `kill_switch_pct` percent against entry.
fn check_kill_switch(
    pos: &PositionState,
    price: Decimal,
    kill_switch_pct: Decimal,
) -> Option<StopAction> {
    let adverse = pos.direction.adverse_move_pct(pos.entry_under_px, price);
    if adverse >= kill_switch_pct {
        tracing::warn!(
            symbol = pos.symbol,
            adverse_pct = %adverse.round_dp(2),
            threshold = %kill_switch_pct,
            "Kill-switch triggered"
        );
        return Some(StopAction::CloseAll {
            reason: ExitReason::KillSwitch,
        });
    }
    None
}

fn check_stop_breach(pos: &PositionState, price: Decimal) -> Option<StopAction> {
    if pos.direction.breached(price, pos.stop) {
        tracing::warn!(
            symbol = pos.symbol,
            price = %price,
            stop = %pos.stop,
            "Underlying stop breached"
        );
        return Some(StopAction::CloseAll {
            reason: ExitReason::UnderlyingStop,
        });
    }
    None
}

/// Stop candidates after target-1: breakeven and the EMA-21 trail, when enabled.
///
/// The caller applies them through [`PositionState::ratchet_stop`], so a
/// candidate that would loosen the stop is ignored.
pub fn trail_candidates(
    pos: &PositionState,
    partial: &PartialTakeConfig,
    ema21: Option<Decimal>,
) -> Vec<Decimal> {
    let mut out = Vec::with_capacity(2);
    if partial.trail_to_be {
        out.push(pos.entry_under_px);
    }
    if partial.trail_with_ema21 {
        out.extend(ema21);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::fixtures::{long_position, short_position};
    use rust_decimal_macros::dec;

    #[test]
    fn kill_switch_triggers_at_threshold() {
        let pos = long_position(4);
        // 3% under 105
        let action = check_stop_rules(&pos, dec!(101.85), dec!(3));
        assert_eq!(
            action,
            Some(StopAction::CloseAll {
                reason: ExitReason::KillSwitch
            })
        );
        assert!(check_stop_rules(&pos, dec!(102), dec!(3)).is_none());
    }

    #[test]
    fn kill_switch_wins_over_stop() {
        let pos = long_position(4);
        // below stop 100 and more than 3% adverse
        let action = check_stop_rules(&pos, dec!(99), dec!(3));
        assert_eq!(
            action,
            Some(StopAction::CloseAll {
                reason: ExitReason::KillSwitch
            })
        );
    }

    #[test]
    fn stop_breach_when_kill_switch_is_wide() {
        let mut pos = long_position(4);
        pos.stop = dec!(104);
        let action = check_stop_rules(&pos, dec!(104), dec!(3));
        assert_eq!(
            action,
            Some(StopAction::CloseAll {
                reason: ExitReason::UnderlyingStop
            })
        );
        assert!(check_stop_rules(&pos, dec!(104.01), dec!(3)).is_none());
    }

    #[test]
    fn short_rules_mirror_long() {
        let mut pos = short_position(4);
        pos.stop = dec!(96);
        assert_eq!(
            check_stop_rules(&pos, dec!(96), dec!(3)),
            Some(StopAction::CloseAll {
                reason: ExitReason::UnderlyingStop
            })
        );
        assert_eq!(
            check_stop_rules(&pos, dec!(98), dec!(3)),
            Some(StopAction::CloseAll {
                reason: ExitReason::KillSwitch
            })
        );
        assert!(check_stop_rules(&pos, dec!(94), dec!(3)).is_none());
    }

    #[test]
    fn trail_candidates_follow_config() {
        let pos = long_position(4);
        let mut partial = PartialTakeConfig::default();
        assert_eq!(trail_candidates(&pos, &partial, Some(dec!(106))), vec![dec!(105)]);

        partial.trail_with_ema21 = true;
        assert_eq!(
            trail_candidates(&pos, &partial, Some(dec!(106))),
            vec![dec!(105), dec!(106)]
        );
        partial.trail_to_be = false;
        assert!(trail_candidates(&pos, &partial, None).is_empty());
    }
}
