pub mod bar;
pub mod config;
pub mod config_loader;
pub mod direction;
pub mod journal;
pub mod options;
pub mod orders;
pub mod position_sizing;
pub mod traits;

pub use bar::{session_extremes, Bar, Timeframe};
pub use config::{
    AppConfig, ConfigError, ExpiryPolicy, JournalConfig, LimitsConfig, LoggingConfig,
    MomentumPolicy, NotificationsConfig, OptionsConfig, PartialTakeConfig, RiskConfig,
    SessionConfig, StrikeFallback, TargetMode, WatcherConfig,
};
pub use config_loader::ConfigLoader;
pub use direction::Direction;
pub use journal::{ExitLeg, ExitRecord, JournalRow, LimitsState, TradeRecord};
pub use options::{build_option_symbol, OptionQuote, OptionRight, SelectedOption};
pub use orders::{BracketOrder, GatewayError};
pub use position_sizing::{normalize_pct, PositionSize, PositionSizer};
pub use traits::{
    MarketData, Notifier, NotifyChannel, OptionChainSource, OrderGateway, TradeJournal,
};
