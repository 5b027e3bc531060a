//! Execution report pushed by the exchange on the private stream.

use crate::order::{ExecutionType, OrderSide, OrderStatus, OrderType};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A decoded `executionReport` event.
///
/// Read-only input to reconciliation; never persisted as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub event_time_ms: i64,
    pub symbol: String,
    pub client_order_id: String,
    pub side: OrderSide,
    pub order_type: OrderType,
    /// Original order quantity.
    pub quantity: Decimal,
    pub price: Decimal,
    pub stop_price: Decimal,
    /// What happened in this event (`x`).
    pub execution_type: ExecutionType,
    /// Order status after this event (`X`).
    pub order_status: OrderStatus,
    /// `NONE` unless the order was rejected.
    pub reject_reason: String,
    /// Exchange-assigned order id, the reconciliation key.
    pub order_id: i64,
    /// `-1` unless the order belongs to an order list (OCO).
    pub order_list_id: i64,
    pub last_executed_qty: Decimal,
    pub cumulative_filled_qty: Decimal,
    pub last_executed_price: Decimal,
    pub commission: Decimal,
    pub commission_asset: Option<String>,
    pub transaction_time_ms: i64,
    /// `-1` when the event carries no trade.
    pub trade_id: i64,
}

impl ExecutionReport {
    /// A trade that completed the order.
    pub fn is_complete_fill(&self) -> bool {
        self.execution_type == ExecutionType::Trade && self.order_status == OrderStatus::Filled
    }

    pub fn is_terminal(&self) -> bool {
        self.order_status.is_terminal()
    }

    pub fn remaining_qty(&self) -> Decimal {
        self.quantity - self.cumulative_filled_qty
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn make_report(execution_type: ExecutionType, status: OrderStatus) -> ExecutionReport {
        ExecutionReport {
            event_time_ms: 1000,
            symbol: "BTCUSDT".into(),
            client_order_id: "gw_test".into(),
            side: OrderSide::Buy,
            order_type: OrderType::Limit,
            quantity: dec!(1.0),
            price: dec!(50000.0),
            stop_price: dec!(0),
            execution_type,
            order_status: status,
            reject_reason: "NONE".into(),
            order_id: 12345,
            order_list_id: -1,
            last_executed_qty: dec!(0),
            cumulative_filled_qty: dec!(0),
            last_executed_price: dec!(0),
            commission: dec!(0),
            commission_asset: None,
            transaction_time_ms: 1000,
            trade_id: -1,
        }
    }

    #[test]
    fn test_complete_fill_requires_trade_and_filled() {
        assert!(make_report(ExecutionType::Trade, OrderStatus::Filled).is_complete_fill());
        assert!(!make_report(ExecutionType::Trade, OrderStatus::PartiallyFilled).is_complete_fill());
        assert!(!make_report(ExecutionType::New, OrderStatus::Filled).is_complete_fill());
    }

    #[test]
    fn test_remaining_qty() {
        let mut report = make_report(ExecutionType::Trade, OrderStatus::PartiallyFilled);
        report.cumulative_filled_qty = dec!(0.3);
        assert_eq!(report.remaining_qty(), dec!(0.7));
    }
}
