//! Projection of execution reports onto persisted orders.

use execution_core::{ExecutionReport, ExecutionType, OrderStatus};
use order_store::{OrderFilter, OrderStore, OrderUpdate, StoreError, UpdateOutcome};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Which execution reports are written back to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReconcilePolicy {
    /// Only completed fills (`TRADE` + `FILLED`).
    #[default]
    FillsOnly,
    /// Completed fills plus cancellations, rejections and expiries.
    AllTerminal,
}

impl FromStr for ReconcilePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fills" | "fills_only" => Ok(Self::FillsOnly),
            "terminal" | "all_terminal" => Ok(Self::AllTerminal),
            other => Err(format!("unknown reconcile policy: {other}")),
        }
    }
}

impl fmt::Display for ReconcilePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FillsOnly => write!(f, "fills"),
            Self::AllTerminal => write!(f, "terminal"),
        }
    }
}

/// The store update a report calls for under `policy`, if any.
pub fn reconcile_update(report: &ExecutionReport, policy: ReconcilePolicy) -> Option<OrderUpdate> {
    if report.is_complete_fill() {
        return Some(
            OrderUpdate::status(OrderStatus::Filled)
                .with_executed_qty(report.cumulative_filled_qty),
        );
    }

    if policy == ReconcilePolicy::AllTerminal {
        let terminal = matches!(
            report.execution_type,
            ExecutionType::Canceled | ExecutionType::Rejected | ExecutionType::Expired
        ) && report.order_status.is_terminal();

        if terminal {
            return Some(
                OrderUpdate::status(report.order_status)
                    .with_executed_qty(report.cumulative_filled_qty),
            );
        }
    }

    None
}

/// Apply one execution report to the store.
///
/// Returns `Ok(None)` when the report is only logged. Reports for orders
/// this gateway never stored match nothing and are not inserted.
pub async fn reconcile(
    store: &dyn OrderStore,
    report: &ExecutionReport,
    policy: ReconcilePolicy,
) -> Result<Option<UpdateOutcome>, StoreError> {
    let Some(update) = reconcile_update(report, policy) else {
        log_unpersisted(report);
        return Ok(None);
    };

    let outcome = store
        .update_one(&OrderFilter::by_order_id(report.order_id), &update, false)
        .await?;

    if outcome.matched == 0 {
        debug!(
            order_id = report.order_id,
            symbol = %report.symbol,
            "Execution report for an order not in the store"
        );
    } else {
        info!(
            order_id = report.order_id,
            symbol = %report.symbol,
            status = %report.order_status,
            executed_qty = %report.cumulative_filled_qty,
            modified = outcome.modified,
            "Order reconciled"
        );
    }

    Ok(Some(outcome))
}

fn log_unpersisted(report: &ExecutionReport) {
    match report.order_status {
        OrderStatus::PartiallyFilled => info!(
            order_id = report.order_id,
            symbol = %report.symbol,
            filled = %report.cumulative_filled_qty,
            remaining = %report.remaining_qty(),
            "Order partially filled"
        ),
        OrderStatus::Canceled | OrderStatus::Expired => info!(
            order_id = report.order_id,
            symbol = %report.symbol,
            status = %report.order_status,
            "Order closed without fill"
        ),
        OrderStatus::Rejected => warn!(
            order_id = report.order_id,
            symbol = %report.symbol,
            reason = %report.reject_reason,
            "Order rejected"
        ),
        _ => debug!(
            order_id = report.order_id,
            symbol = %report.symbol,
            status = %report.order_status,
            "Execution report"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use execution_core::{OrderSide, OrderType, PlacedOrder};
    use order_store::InMemoryOrderStore;
    use rust_decimal_macros::dec;

    fn make_report(execution_type: ExecutionType, status: OrderStatus) -> ExecutionReport {
        ExecutionReport {
            event_time_ms: 2000,
            symbol: "BTCUSDT".into(),
            client_order_id: "gw_test".into(),
            side: OrderSide::Buy,
            order_type: OrderType::Market,
            quantity: dec!(0.01),
            price: dec!(0),
            stop_price: dec!(0),
            execution_type,
            order_status: status,
            reject_reason: "NONE".into(),
            order_id: 42,
            order_list_id: -1,
            last_executed_qty: dec!(0.01),
            cumulative_filled_qty: dec!(0.01),
            last_executed_price: dec!(50000),
            commission: dec!(0),
            commission_asset: None,
            transaction_time_ms: 2000,
            trade_id: 7,
        }
    }

    fn make_order(order_id: i64) -> PlacedOrder {
        PlacedOrder {
            id: None,
            user_id: "user-1".into(),
            symbol: "BTCUSDT".into(),
            order_id,
            order_list_id: None,
            client_order_id: "gw_test".into(),
            transact_time: 1000,
            price: dec!(0),
            orig_qty: dec!(0.01),
            executed_qty: dec!(0),
            status: OrderStatus::New,
            order_type: OrderType::Market,
            side: OrderSide::Buy,
            take_profit_price: None,
            stop_loss_price: None,
            created_at_ms: 1000,
            updated_at_ms: 1000,
        }
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!("fills".parse::<ReconcilePolicy>(), Ok(ReconcilePolicy::FillsOnly));
        assert_eq!("Terminal".parse::<ReconcilePolicy>(), Ok(ReconcilePolicy::AllTerminal));
        assert!("everything".parse::<ReconcilePolicy>().is_err());
    }

    #[test]
    fn test_fill_is_persisted_under_both_policies() {
        let report = make_report(ExecutionType::Trade, OrderStatus::Filled);
        let expected = OrderUpdate::status(OrderStatus::Filled).with_executed_qty(dec!(0.01));

        assert_eq!(reconcile_update(&report, ReconcilePolicy::FillsOnly), Some(expected.clone()));
        assert_eq!(reconcile_update(&report, ReconcilePolicy::AllTerminal), Some(expected));
    }

    #[test]
    fn test_partial_fill_is_never_persisted() {
        let report = make_report(ExecutionType::Trade, OrderStatus::PartiallyFilled);

        assert_eq!(reconcile_update(&report, ReconcilePolicy::FillsOnly), None);
        assert_eq!(reconcile_update(&report, ReconcilePolicy::AllTerminal), None);
    }

    #[test]
    fn test_cancel_depends_on_policy() {
        let report = make_report(ExecutionType::Canceled, OrderStatus::Canceled);

        assert_eq!(reconcile_update(&report, ReconcilePolicy::FillsOnly), None);
        assert_eq!(
            reconcile_update(&report, ReconcilePolicy::AllTerminal).and_then(|u| u.status),
            Some(OrderStatus::Canceled)
        );
    }

    #[test]
    fn test_new_is_never_persisted() {
        let report = make_report(ExecutionType::New, OrderStatus::New);
        assert_eq!(reconcile_update(&report, ReconcilePolicy::AllTerminal), None);
    }

    #[tokio::test]
    async fn test_reconcile_fill_is_idempotent() {
        let store = InMemoryOrderStore::new();
        store.insert(make_order(42)).await.unwrap();
        let report = make_report(ExecutionType::Trade, OrderStatus::Filled);

        let first = reconcile(&store, &report, ReconcilePolicy::FillsOnly).await.unwrap();
        assert_eq!(first, Some(UpdateOutcome { matched: 1, modified: 1 }));

        let second = reconcile(&store, &report, ReconcilePolicy::FillsOnly).await.unwrap();
        assert_eq!(second, Some(UpdateOutcome { matched: 1, modified: 0 }));

        let stored = &store.find_by_order_id(42)[0];
        assert_eq!(stored.status, OrderStatus::Filled);
        assert_eq!(stored.executed_qty, dec!(0.01));
    }

    #[tokio::test]
    async fn test_reconcile_unknown_order_inserts_nothing() {
        let store = InMemoryOrderStore::new();
        let report = make_report(ExecutionType::Trade, OrderStatus::Filled);

        let outcome = reconcile(&store, &report, ReconcilePolicy::FillsOnly).await.unwrap();
        assert_eq!(outcome, Some(UpdateOutcome { matched: 0, modified: 0 }));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_reconcile_partial_leaves_store_untouched() {
        let store = InMemoryOrderStore::new();
        store.insert(make_order(42)).await.unwrap();
        let report = make_report(ExecutionType::Trade, OrderStatus::PartiallyFilled);

        let outcome = reconcile(&store, &report, ReconcilePolicy::FillsOnly).await.unwrap();
        assert_eq!(outcome, None);
        assert_eq!(store.find_by_order_id(42)[0].status, OrderStatus::New);
    }
}
