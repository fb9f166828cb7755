use chrono::{DateTime, Utc};
use orbfib_core::{session_extremes, Bar, ConfigError, Direction, MomentumPolicy, SessionConfig, TargetMode};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::StrategyError;
use crate::fib::{FibGrid, FibLevel};
use crate::indicators::{macd, MACD_FAST, MACD_SIGNAL, MACD_SLOW};
use crate::orb::{compute_orb, detect_breakout, OpeningRangeBox};
use crate::pullback::{await_pullback_to, PullbackOutcome, DEFAULT_PULLBACK_LEVELS};
use crate::stops::stops_targets;

/// Fewest bars an evaluation will look at.
pub const MIN_BARS: usize = 6;

/// A fully specified entry produced by [`FibOrbEngine`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeSignal {
    pub direction: Direction,
    pub entry: Decimal,
    pub stop: Decimal,
    /// Retest of B first, then extensions (or the 2R target).
    pub targets: Vec<Decimal>,
    pub reason: String,
    pub orb: OpeningRangeBox,
    pub entry_time: DateTime<Utc>,
    /// Anchors of the grid at entry, after any extension of B.
    pub anchor_a: Decimal,
    pub anchor_b: Decimal,
    pub entry_level: FibLevel,
    pub orb_minutes: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub orb_sequence: Vec<u32>,
    pub require_close: bool,
    pub pullback_levels: Vec<FibLevel>,
    pub no_pullback_timeout_min: Option<u32>,
    pub target_mode: TargetMode,
    pub momentum_policy: MomentumPolicy,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            orb_sequence: vec![30, 15, 60],
            require_close: true,
            pullback_levels: DEFAULT_PULLBACK_LEVELS.to_vec(),
            no_pullback_timeout_min: Some(60),
            target_mode: TargetMode::Fib,
            momentum_policy: MomentumPolicy::SkipWhenInsufficient,
            macd_fast: MACD_FAST,
            macd_slow: MACD_SLOW,
            macd_signal: MACD_SIGNAL,
        }
    }
}

impl EngineConfig {
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` when a pullback level is not a grid key.
    pub fn from_session(session: &SessionConfig) -> Result<Self, ConfigError> {
        let pullback_levels = session
            .pullback_levels
            .iter()
            .map(|value| FibLevel::try_from(*value))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|reason| ConfigError::invalid("session.pullback_levels", reason))?;

        Ok(Self {
            orb_sequence: session.orb_sequence.clone(),
            require_close: session.require_close,
            pullback_levels,
            no_pullback_timeout_min: session.no_pullback_timeout_min,
            target_mode: session.target_mode,
            momentum_policy: session.momentum_policy,
            ..Self::default()
        })
    }
}

/// Opening range breakout with a Fibonacci pullback entry.
///
/// Pipeline per opening range length: range box, first breakout, anchors from
/// the session extremes, pullback walk, MACD confirmation, stop and targets.
/// Any step that produces nothing ends that attempt without error.
#[derive(Debug, Clone, Default)]
pub struct FibOrbEngine {
    config: EngineConfig,
}

impl FibOrbEngine {
    #[must_use]
    pub const fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Tries each configured range length in order and returns the first signal.
    #[must_use]
    pub fn evaluate(&self, bars: &[Bar]) -> Option<TradeSignal> {
        if bars.len() < MIN_BARS {
            debug!(bars = bars.len(), "Not enough bars to evaluate");
            return None;
        }
        self.config
            .orb_sequence
            .iter()
            .find_map(|&orb_len| self.evaluate_orb(bars, bars, orb_len))
    }

    /// Runs one range length.
    ///
    /// `orb_bars` builds the range box and may be finer grained than `bars`,
    /// which drive the breakout, the anchors and the pullback.
    #[must_use]
    pub fn evaluate_orb(&self, orb_bars: &[Bar], bars: &[Bar], orb_len: u32) -> Option<TradeSignal> {
        if bars.len() < MIN_BARS {
            debug!(orb_len, bars = bars.len(), "Not enough bars to evaluate");
            return None;
        }

        let orb = match compute_orb(orb_bars, orb_len) {
            Ok(orb) => orb,
            Err(e) => {
                debug!(orb_len, error = %e, "No opening range");
                return None;
            }
        };

        let Some(breakout) =
            detect_breakout(bars, orb.high, orb.low, orb.end, self.config.require_close)
        else {
            debug!(orb_len, "No breakout");
            return None;
        };
        let direction = breakout.side.direction();

        let (day_low, day_high) = session_extremes(bars)?;
        let grid = FibGrid::for_session(direction, day_low, day_high);

        let outcome = await_pullback_to(
            bars,
            direction,
            grid,
            breakout.timestamp,
            &self.config.pullback_levels,
            self.config.no_pullback_timeout_min,
        );
        let (level, entry_time, entry, grid) = match outcome {
            PullbackOutcome::Entry {
                level,
                timestamp,
                price,
                grid,
            } => (level, timestamp, price, grid),
            PullbackOutcome::Invalidated { .. } => {
                debug!(orb_len, %direction, "Pullback invalidated beyond 0.786");
                return None;
            }
            PullbackOutcome::NoEntry { .. } => {
                debug!(orb_len, %direction, "No pullback entry");
                return None;
            }
        };

        if !self.momentum_confirms(bars, entry_time, direction) {
            debug!(orb_len, %direction, "MACD does not confirm");
            return None;
        }

        let (stop, targets) = stops_targets(direction, &grid, entry, self.config.target_mode);

        Some(TradeSignal {
            direction,
            entry,
            stop,
            targets,
            reason: format!("ORB breakout {direction} with fib pullback at {level}"),
            orb,
            entry_time,
            anchor_a: grid.anchor_a(),
            anchor_b: grid.anchor_b(),
            entry_level: level,
            orb_minutes: orb_len,
        })
    }

    fn momentum_confirms(&self, bars: &[Bar], entry_time: DateTime<Utc>, direction: Direction) -> bool {
        let closes: Vec<Decimal> = bars
            .iter()
            .filter(|b| b.timestamp <= entry_time)
            .map(|b| b.close)
            .collect();

        match macd(
            &closes,
            self.config.macd_fast,
            self.config.macd_slow,
            self.config.macd_signal,
        ) {
            Ok(reading) => reading.confirms(direction),
            Err(StrategyError::InsufficientData { needed, got, .. }) => {
                match self.config.momentum_policy {
                    MomentumPolicy::SkipWhenInsufficient => {
                        debug!(needed, got, "Skipping momentum filter");
                        true
                    }
                    MomentumPolicy::RequireData => false,
                }
            }
            Err(e) => {
                debug!(error = %e, "Momentum filter failed");
                false
            }
        }
    }
}
