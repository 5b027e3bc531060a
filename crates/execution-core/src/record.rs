//! Persisted order record.

use crate::order::{OrderSide, OrderStatus, OrderType};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An order as stored in the `orders` collection.
///
/// Created from the exchange's immediate response at placement time and
/// afterwards only mutated by stream reconciliation. Never deleted here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedOrder {
    /// Store-assigned document id; `None` until inserted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub user_id: String,
    pub symbol: String,
    pub order_id: i64,
    /// Set for legs of an OCO, and for entries whose OCO was placed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_list_id: Option<i64>,
    pub client_order_id: String,
    pub transact_time: i64,
    pub price: Decimal,
    pub orig_qty: Decimal,
    pub executed_qty: Decimal,
    pub status: OrderStatus,
    pub order_type: OrderType,
    pub side: OrderSide,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub take_profit_price: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_loss_price: Option<Decimal>,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

impl PlacedOrder {
    pub fn is_open(&self) -> bool {
        !self.status.is_terminal()
    }
}
