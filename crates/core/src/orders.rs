//! Bracket order types and the gateway error taxonomy.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A market entry with a protective stop leg and an optional take-profit leg.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BracketOrder {
    pub option_symbol: String,
    pub quantity: u32,
    pub stop_loss_price: Decimal,
    pub take_profit_price: Option<Decimal>,
}

/// Errors surfaced by an order gateway.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    /// The broker rejected the request.
    #[error("Order rejected: {reason}")]
    Rejected { reason: String },

    /// Network or API transport failure.
    #[error("Transport error: {0}")]
    Transport(String),

    /// No trading client is wired in.
    #[error("No trading client configured")]
    NotConfigured,
}

impl GatewayError {
    #[must_use]
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected {
            reason: reason.into(),
        }
    }
}
