//! Paper trading collaborators.
//!
//! CSV bar replay, synthetic option chains and an in-memory order gateway,
//! used by the CLI for offline sessions and by integration tests.

pub mod csv_bars;
pub mod market_data;
pub mod options_chain;
pub mod paper;

pub use csv_bars::load_bars_csv;
pub use market_data::ReplayMarketData;
pub use options_chain::SyntheticOptionChain;
pub use paper::{PaperEvent, PaperGateway};
