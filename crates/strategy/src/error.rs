use thiserror::Error;

/// Failures inside the signal pipeline.
///
/// None of these are fatal: the engine turns them into "no signal".
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StrategyError {
    #[error("Insufficient data for {what}: need {needed}, got {got}")]
    InsufficientData {
        what: &'static str,
        needed: usize,
        got: usize,
    },

    #[error("Invalid period for {what}: {period}")]
    InvalidPeriod { what: &'static str, period: usize },
}

impl StrategyError {
    #[must_use]
    pub const fn insufficient(what: &'static str, needed: usize, got: usize) -> Self {
        Self::InsufficientData { what, needed, got }
    }
}

pub type Result<T> = std::result::Result<T, StrategyError>;
