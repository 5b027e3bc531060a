//! Exchange responses to persisted records.

use binance_rest::{NewOrderResponse, OrderListResponse};
use execution_core::{
    now_ms, OrderStatus, OrderType, PlacedOrder, ProtectionLegs,
};
use rust_decimal::Decimal;

pub(crate) fn entry_record(response: &NewOrderResponse, user_id: &str) -> PlacedOrder {
    let now = now_ms();

    PlacedOrder {
        id: None,
        user_id: user_id.to_string(),
        symbol: response.symbol.clone(),
        order_id: response.order_id,
        order_list_id: (response.order_list_id >= 0).then_some(response.order_list_id),
        client_order_id: response.client_order_id.clone(),
        transact_time: response.transact_time,
        price: response.average_fill_price(),
        orig_qty: response.orig_qty,
        executed_qty: response.executed_qty,
        status: response.status,
        order_type: response.order_type,
        side: response.side,
        take_profit_price: None,
        stop_loss_price: None,
        created_at_ms: now,
        updated_at_ms: now,
    }
}

/// One record per leg. Falls back to the bare `orders` list when the
/// response carries no per-leg reports.
pub(crate) fn leg_records(
    response: &OrderListResponse,
    legs: &ProtectionLegs,
    quantity: Decimal,
    user_id: &str,
) -> Vec<PlacedOrder> {
    let now = now_ms();
    let base = |order_id: i64, client_order_id: &str| PlacedOrder {
        id: None,
        user_id: user_id.to_string(),
        symbol: response.symbol.clone(),
        order_id,
        order_list_id: Some(response.order_list_id),
        client_order_id: client_order_id.to_string(),
        transact_time: response.transaction_time,
        price: Decimal::ZERO,
        orig_qty: quantity,
        executed_qty: Decimal::ZERO,
        status: OrderStatus::New,
        order_type: OrderType::Limit,
        side: legs.exit_side,
        take_profit_price: Some(legs.take_profit_price),
        stop_loss_price: Some(legs.stop_loss_price),
        created_at_ms: now,
        updated_at_ms: now,
    };

    if response.order_reports.is_empty() {
        return response
            .orders
            .iter()
            .map(|o| base(o.order_id, &o.client_order_id))
            .collect();
    }

    response
        .order_reports
        .iter()
        .map(|report| PlacedOrder {
            transact_time: report.transact_time,
            price: report.price,
            orig_qty: report.orig_qty,
            executed_qty: report.executed_qty,
            status: report.status,
            order_type: report.order_type,
            side: report.side,
            ..base(report.order_id, &report.client_order_id)
        })
        .collect()
}

/// The leg that represents the OCO as a whole: the limit (take-profit) leg.
pub(crate) fn primary_leg(legs: &[PlacedOrder]) -> Option<&PlacedOrder> {
    legs.iter()
        .find(|o| matches!(o.order_type, OrderType::LimitMaker | OrderType::Limit))
        .or_else(|| legs.first())
}
