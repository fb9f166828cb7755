//! Idempotent bracket entry plus best-effort close and cancel.

use std::sync::Arc;

use orbfib_core::{BracketOrder, OrderGateway};
use tracing::{info, warn};

use crate::submissions::{SubmissionKey, SubmissionLedger};
use crate::types::{EntryRequest, OrderResult};

pub const REASON_DUPLICATE: &str = "duplicate";
pub const REASON_NO_CLIENT: &str = "no_client";

/// Places entries through an [`OrderGateway`], at most once per submission key.
pub struct BracketExecutor {
    gateway: Option<Arc<dyn OrderGateway>>,
    ledger: Arc<SubmissionLedger>,
}

impl BracketExecutor {
    pub fn new(gateway: Arc<dyn OrderGateway>, ledger: Arc<SubmissionLedger>) -> Self {
        Self {
            gateway: Some(gateway),
            ledger,
        }
    }

    /// An executor that refuses every entry with `no_client`.
    #[must_use]
    pub const fn without_gateway(ledger: Arc<SubmissionLedger>) -> Self {
        Self {
            gateway: None,
            ledger,
        }
    }

    #[must_use]
    pub fn ledger(&self) -> &Arc<SubmissionLedger> {
        &self.ledger
    }

    /// Submits a market entry with a stop-loss leg and an optional take-profit leg.
    ///
    /// A key that is already reserved or submitted returns `duplicate` without
    /// touching the gateway. A failed submission releases the key.
    pub async fn enter_with_bracket(&self, request: &EntryRequest) -> OrderResult {
        let Some(gateway) = &self.gateway else {
            warn!(symbol = request.symbol, "No trading client configured; skipping order");
            return OrderResult::rejected(REASON_NO_CLIENT);
        };

        let key = SubmissionKey {
            trade_date: request.trade_date,
            symbol: request.symbol.clone(),
            direction: request.direction,
            orb_len: request.orb_len,
        };
        if !self
            .ledger
            .try_reserve(&key, &request.option_symbol, request.qty)
        {
            warn!(%key, "Duplicate submission rejected");
            return OrderResult::rejected(REASON_DUPLICATE);
        }

        let order = BracketOrder {
            option_symbol: request.option_symbol.clone(),
            quantity: request.qty,
            stop_loss_price: request.hard_stop_opt_price,
            take_profit_price: request.take_profit_opt_price,
        };

        match gateway.submit_bracket(&order).await {
            Ok(order_id) => {
                self.ledger.mark_submitted(&key, &order_id);
                info!(
                    %key,
                    order_id,
                    option_symbol = request.option_symbol,
                    qty = request.qty,
                    stop = %request.hard_stop_opt_price,
                    "Bracket order submitted"
                );
                OrderResult::submitted(order_id)
            }
            Err(e) => {
                self.ledger.release(&key);
                warn!(%key, error = %e, "Failed to place bracket order");
                OrderResult::rejected(e.to_string())
            }
        }
    }

    /// Closes `qty` contracts (all when `None`) at market. Returns false on failure.
    pub async fn close_option_market(&self, option_symbol: &str, qty: Option<u32>) -> bool {
        let Some(gateway) = &self.gateway else {
            warn!(option_symbol, "No trading client configured; cannot close");
            return false;
        };
        match gateway.close_position(option_symbol, qty).await {
            Ok(()) => {
                info!(option_symbol, ?qty, "Closed at market");
                true
            }
            Err(e) => {
                warn!(option_symbol, ?qty, error = %e, "Failed to close position");
                false
            }
        }
    }

    /// Cancels the bracket's child orders. Returns false on failure.
    pub async fn cancel_children(&self, order_id: &str) -> bool {
        if order_id.is_empty() {
            return true;
        }
        let Some(gateway) = &self.gateway else {
            warn!(order_id, "No trading client configured; cannot cancel");
            return false;
        };
        match gateway.cancel_child_orders(order_id).await {
            Ok(()) => true,
            Err(e) => {
                warn!(order_id, error = %e, "Failed to cancel child orders");
                false
            }
        }
    }
}
