//! Paper order gateway.
//!
//! Accepts every order immediately and keeps an in-memory log instead of
//! touching a broker.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use orbfib_core::{BracketOrder, GatewayError, OrderGateway};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PaperEvent {
    Submitted {
        order_id: String,
        order: BracketOrder,
        at: DateTime<Utc>,
    },
    Closed {
        option_symbol: String,
        quantity: Option<u32>,
        at: DateTime<Utc>,
    },
    Cancelled {
        order_id: String,
        at: DateTime<Utc>,
    },
}

#[derive(Debug, Default)]
pub struct PaperGateway {
    next_id: AtomicU64,
    events: Mutex<Vec<PaperEvent>>,
    reject_reason: Mutex<Option<String>>,
}

impl PaperGateway {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects every following submission with `reason`; `None` accepts again.
    pub fn reject_submissions(&self, reason: Option<String>) {
        *self.reject_reason.lock() = reason;
    }

    #[must_use]
    pub fn events(&self) -> Vec<PaperEvent> {
        self.events.lock().clone()
    }

    #[must_use]
    pub fn submitted_orders(&self) -> Vec<BracketOrder> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                PaperEvent::Submitted { order, .. } => Some(order.clone()),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl OrderGateway for PaperGateway {
    async fn submit_bracket(&self, order: &BracketOrder) -> Result<String, GatewayError> {
        if let Some(reason) = self.reject_reason.lock().clone() {
            return Err(GatewayError::rejected(reason));
        }

        let order_id = format!("PAPER-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        info!(
            order_id,
            option_symbol = order.option_symbol,
            quantity = order.quantity,
            stop = %order.stop_loss_price,
            "Paper bracket accepted"
        );
        self.events.lock().push(PaperEvent::Submitted {
            order_id: order_id.clone(),
            order: order.clone(),
            at: Utc::now(),
        });
        Ok(order_id)
    }

    async fn close_position(
        &self,
        option_symbol: &str,
        quantity: Option<u32>,
    ) -> Result<(), GatewayError> {
        info!(option_symbol, ?quantity, "Paper close");
        self.events.lock().push(PaperEvent::Closed {
            option_symbol: option_symbol.to_string(),
            quantity,
            at: Utc::now(),
        });
        Ok(())
    }

    async fn cancel_child_orders(&self, order_id: &str) -> Result<(), GatewayError> {
        self.events.lock().push(PaperEvent::Cancelled {
            order_id: order_id.to_string(),
            at: Utc::now(),
        });
        Ok(())
    }
}
