use chrono::NaiveTime;
use chrono_tz::Tz;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Invalid configuration values, raised when a component is set up.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{field} must be positive, got {value}")]
    NotPositive { field: &'static str, value: String },

    #[error("Invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    pub fn not_positive(field: &'static str, value: impl std::fmt::Display) -> Self {
        Self::NotPositive {
            field,
            value: value.to_string(),
        }
    }

    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub session: SessionConfig,
    pub risk: RiskConfig,
    pub limits: LimitsConfig,
    pub watcher: WatcherConfig,
    pub options: OptionsConfig,
    pub notifications: NotificationsConfig,
    pub journal: JournalConfig,
    pub logging: LoggingConfig,
    pub symbols: Vec<String>,
}

impl AppConfig {
    /// Checks values that serde cannot.
    ///
    /// # Errors
    ///
    /// Returns the first invalid field found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.session.validate()?;
        self.risk.validate()?;
        self.watcher.validate()?;
        if !(0.0..=1.0).contains(&self.options.target_delta) {
            return Err(ConfigError::invalid(
                "options.target_delta",
                format!("must be in [0, 1], got {}", self.options.target_delta),
            ));
        }
        if self.limits.max_mtd_loss.is_some_and(|loss| loss < Decimal::ZERO) {
            return Err(ConfigError::invalid(
                "limits.max_mtd_loss",
                "must not be negative",
            ));
        }
        Ok(())
    }
}

/// How profit targets beyond the anchor retest are derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetMode {
    /// 1.272 and 1.618 extensions.
    #[default]
    Fib,
    /// Fixed 2R target from entry and stop.
    Rr,
}

/// What the momentum filter does when there are too few closes for MACD.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MomentumPolicy {
    /// Treat missing momentum as confirmation.
    #[default]
    SkipWhenInsufficient,
    /// Reject the signal.
    RequireData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub timezone: Tz,
    /// Opening range lengths in minutes, tried in order.
    pub orb_sequence: Vec<u32>,
    /// No new entries after this local time.
    pub latest_entry_time: Option<NaiveTime>,
    pub no_pullback_timeout_min: Option<u32>,
    /// Breakout needs a close beyond the range rather than a wick.
    pub require_close: bool,
    pub pullback_levels: Vec<f64>,
    pub target_mode: TargetMode,
    pub momentum_policy: MomentumPolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timezone: chrono_tz::America::New_York,
            orb_sequence: vec![30, 15, 60],
            latest_entry_time: None,
            no_pullback_timeout_min: Some(60),
            require_close: true,
            pullback_levels: vec![0.5, 0.618],
            target_mode: TargetMode::Fib,
            momentum_policy: MomentumPolicy::SkipWhenInsufficient,
        }
    }
}

impl SessionConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.orb_sequence.is_empty() {
            return Err(ConfigError::invalid("session.orb_sequence", "must not be empty"));
        }
        if let Some(len) = self.orb_sequence.iter().find(|len| **len == 0) {
            return Err(ConfigError::not_positive("session.orb_sequence", len));
        }
        if self.pullback_levels.is_empty() {
            return Err(ConfigError::invalid(
                "session.pullback_levels",
                "must not be empty",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    pub account_equity: Decimal,
    /// Fraction (0.25) or whole percent (25) of equity per trade.
    pub portfolio_alloc_pct: Decimal,
    /// Fraction (0.5) or whole percent (50) of the option entry price.
    pub option_hard_stop_pct: Decimal,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            account_equity: Decimal::from(100_000),
            portfolio_alloc_pct: Decimal::new(25, 2),
            option_hard_stop_pct: Decimal::new(5, 1),
        }
    }
}

impl RiskConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.account_equity <= Decimal::ZERO {
            return Err(ConfigError::not_positive("risk.account_equity", self.account_equity));
        }
        if self.portfolio_alloc_pct <= Decimal::ZERO {
            return Err(ConfigError::not_positive(
                "risk.portfolio_alloc_pct",
                self.portfolio_alloc_pct,
            ));
        }
        if self.option_hard_stop_pct <= Decimal::ZERO {
            return Err(ConfigError::not_positive(
                "risk.option_hard_stop_pct",
                self.option_hard_stop_pct,
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_trades_per_day: Option<u32>,
    /// Month-to-date loss bound in USD, as a positive number.
    pub max_mtd_loss: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PartialTakeConfig {
    pub enabled: bool,
    pub pct_close_at_t1: Decimal,
    pub trail_to_be: bool,
    pub trail_with_ema21: bool,
}

impl Default for PartialTakeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            pct_close_at_t1: Decimal::new(5, 1),
            trail_to_be: true,
            trail_with_ema21: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatcherConfig {
    /// Adverse underlying move, in whole percent, that forces a full exit.
    pub kill_switch_pct: Decimal,
    pub poll_min_ms: u64,
    pub poll_max_ms: u64,
    pub partial_take: PartialTakeConfig,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            kill_switch_pct: Decimal::from(3),
            poll_min_ms: 2_000,
            poll_max_ms: 5_000,
            partial_take: PartialTakeConfig::default(),
        }
    }
}

impl WatcherConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.kill_switch_pct <= Decimal::ZERO {
            return Err(ConfigError::not_positive(
                "watcher.kill_switch_pct",
                self.kill_switch_pct,
            ));
        }
        if self.poll_min_ms > self.poll_max_ms {
            return Err(ConfigError::invalid(
                "watcher.poll_min_ms",
                format!(
                    "{} exceeds poll_max_ms {}",
                    self.poll_min_ms, self.poll_max_ms
                ),
            ));
        }
        let pct = self.partial_take.pct_close_at_t1;
        if pct < Decimal::ZERO || pct > Decimal::ONE {
            return Err(ConfigError::invalid(
                "watcher.partial_take.pct_close_at_t1",
                format!("must be in [0, 1], got {pct}"),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryPolicy {
    #[default]
    SameDay,
    NextWeekly,
}

/// Strike choice when no contract in the chain carries a delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StrikeFallback {
    #[default]
    #[serde(rename = "ATM")]
    Atm,
    #[serde(rename = "none")]
    Disabled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OptionsConfig {
    pub expiry_policy: ExpiryPolicy,
    pub target_delta: f64,
    pub fallback: StrikeFallback,
}

impl Default for OptionsConfig {
    fn default() -> Self {
        Self {
            expiry_policy: ExpiryPolicy::SameDay,
            target_delta: 0.35,
            fallback: StrikeFallback::Atm,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationsConfig {
    pub slack_webhook: String,
    pub email_to: String,
    pub from_email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JournalConfig {
    pub database_url: String,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://journal.db?mode=rwc".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub log_file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_file: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.session.orb_sequence, vec![30, 15, 60]);
        assert_eq!(config.risk.portfolio_alloc_pct, dec!(0.25));
        assert_eq!(config.watcher.kill_switch_pct, dec!(3));
    }

    #[test]
    fn rejects_non_positive_equity() {
        let mut config = AppConfig::default();
        config.risk.account_equity = dec!(0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NotPositive {
                field: "risk.account_equity",
                ..
            })
        ));
    }

    #[test]
    fn rejects_inverted_poll_window() {
        let mut config = AppConfig::default();
        config.watcher.poll_min_ms = 6_000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_orb_length() {
        let mut config = AppConfig::default();
        config.session.orb_sequence = vec![30, 0];
        assert!(config.validate().is_err());
    }

    #[test]
    fn deserializes_enums_from_config_labels() {
        let json = r#"{"expiry_policy":"next_weekly","target_delta":0.4,"fallback":"ATM"}"#;
        let options: OptionsConfig = serde_json::from_str(json).unwrap();
        assert_eq!(options.expiry_policy, ExpiryPolicy::NextWeekly);
        assert_eq!(options.fallback, StrikeFallback::Atm);

        let session: SessionConfig =
            serde_json::from_str(r#"{"target_mode":"rr","momentum_policy":"require_data"}"#)
                .unwrap();
        assert_eq!(session.target_mode, TargetMode::Rr);
        assert_eq!(session.momentum_policy, MomentumPolicy::RequireData);
        assert_eq!(session.timezone, chrono_tz::America::New_York);
    }
}
