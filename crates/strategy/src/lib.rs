//! Signal detection for the opening range breakout / Fibonacci pullback strategy.

pub mod engine;
pub mod error;
pub mod fib;
pub mod indicators;
pub mod orb;
pub mod pullback;
pub mod stops;

pub use engine::{EngineConfig, FibOrbEngine, TradeSignal};
pub use error::StrategyError;
pub use fib::{anchors, FibGrid, FibLevel};
pub use indicators::{ema, macd, macd_default, MacdReading};
pub use orb::{compute_orb, detect_breakout, Breakout, BreakoutSide, OpeningRangeBox};
pub use pullback::{await_pullback_to, PullbackOutcome, DEFAULT_PULLBACK_LEVELS};
pub use stops::stops_targets;
