//! In-process order store backed by a concurrent map.

use crate::error::StoreError;
use crate::store::{OrderFilter, OrderStore, OrderUpdate, Page, SortOrder, UpdateOutcome};
use async_trait::async_trait;
use dashmap::DashMap;
use execution_core::{now_ms, PlacedOrder};
use uuid::Uuid;

/// `OrderStore` kept in memory. Each shard lock makes single-document
/// updates atomic.
#[derive(Debug, Default)]
pub struct InMemoryOrderStore {
    orders: DashMap<String, PlacedOrder>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// All records for one exchange order id.
    pub fn find_by_order_id(&self, order_id: i64) -> Vec<PlacedOrder> {
        self.orders
            .iter()
            .filter(|entry| entry.order_id == order_id)
            .map(|entry| entry.value().clone())
            .collect()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn insert(&self, mut order: PlacedOrder) -> Result<PlacedOrder, StoreError> {
        let id = Uuid::new_v4().to_string();
        order.id = Some(id.clone());
        self.orders.insert(id, order.clone());

        tracing::debug!(order_id = order.order_id, user_id = %order.user_id, "Order inserted");
        Ok(order)
    }

    async fn find_many(
        &self,
        filter: &OrderFilter,
        sort: SortOrder,
        limit: usize,
        offset: usize,
    ) -> Result<Page<PlacedOrder>, StoreError> {
        let mut matched: Vec<PlacedOrder> = self
            .orders
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();

        match sort {
            SortOrder::Ascending => matched.sort_by_key(|o| o.created_at_ms),
            SortOrder::Descending => matched.sort_by(|a, b| b.created_at_ms.cmp(&a.created_at_ms)),
        }

        let total = matched.len() as u64;
        let take = if limit == 0 { usize::MAX } else { limit };
        let items = matched.into_iter().skip(offset).take(take).collect();

        Ok(Page { items, total })
    }

    async fn update_one(
        &self,
        filter: &OrderFilter,
        update: &OrderUpdate,
        upsert: bool,
    ) -> Result<UpdateOutcome, StoreError> {
        let now = now_ms();

        for mut entry in self.orders.iter_mut() {
            if filter.matches(entry.value()) {
                let modified = update.apply(entry.value_mut(), now);
                return Ok(UpdateOutcome {
                    matched: 1,
                    modified: u64::from(modified),
                });
            }
        }

        if upsert {
            return Err(StoreError::InvalidUpsert(
                "in-memory store cannot build an order from a partial update".into(),
            ));
        }

        Ok(UpdateOutcome::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use execution_core::{OrderSide, OrderStatus, OrderType};
    use rust_decimal_macros::dec;

    fn order(user_id: &str, order_id: i64, created_at_ms: i64) -> PlacedOrder {
        PlacedOrder {
            id: None,
            user_id: user_id.into(),
            symbol: "BTCUSDT".into(),
            order_id,
            order_list_id: None,
            client_order_id: format!("gw_{order_id}"),
            transact_time: created_at_ms,
            price: dec!(0),
            orig_qty: dec!(0.01),
            executed_qty: dec!(0),
            status: OrderStatus::New,
            order_type: OrderType::Market,
            side: OrderSide::Buy,
            take_profit_price: None,
            stop_loss_price: None,
            created_at_ms,
            updated_at_ms: created_at_ms,
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_id() {
        let store = InMemoryOrderStore::new();
        let saved = store.insert(order("u1", 1, 100)).await.unwrap();

        assert!(saved.id.is_some());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_find_many_sorts_and_pages() {
        let store = InMemoryOrderStore::new();
        for (i, ts) in [(1, 100), (2, 300), (3, 200), (4, 400)] {
            store.insert(order("u1", i, ts)).await.unwrap();
        }
        store.insert(order("u2", 99, 500)).await.unwrap();

        let page = store
            .find_many(&OrderFilter::by_user("u1"), SortOrder::Descending, 2, 1)
            .await
            .unwrap();

        assert_eq!(page.total, 4);
        let ids: Vec<i64> = page.items.iter().map(|o| o.order_id).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[tokio::test]
    async fn test_find_many_zero_limit_returns_all() {
        let store = InMemoryOrderStore::new();
        for i in 0..3 {
            store.insert(order("u1", i, i * 10)).await.unwrap();
        }

        let page = store
            .find_many(&OrderFilter::default(), SortOrder::Ascending, 0, 0)
            .await
            .unwrap();

        assert_eq!(page.items.len(), 3);
        assert_eq!(page.items[0].order_id, 0);
    }

    #[tokio::test]
    async fn test_update_one_is_idempotent() {
        let store = InMemoryOrderStore::new();
        store.insert(order("u1", 42, 100)).await.unwrap();

        let filter = OrderFilter::by_order_id(42);
        let update = OrderUpdate::status(OrderStatus::Filled).with_executed_qty(dec!(0.01));

        let first = store.update_one(&filter, &update, false).await.unwrap();
        assert_eq!(first, UpdateOutcome { matched: 1, modified: 1 });

        let second = store.update_one(&filter, &update, false).await.unwrap();
        assert_eq!(second, UpdateOutcome { matched: 1, modified: 0 });

        let stored = store.find_by_order_id(42);
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].status, OrderStatus::Filled);
        assert_eq!(stored[0].executed_qty, dec!(0.01));
    }

    #[tokio::test]
    async fn test_update_one_without_match() {
        let store = InMemoryOrderStore::new();

        let outcome = store
            .update_one(
                &OrderFilter::by_order_id(7),
                &OrderUpdate::status(OrderStatus::Filled),
                false,
            )
            .await
            .unwrap();
        assert_eq!(outcome, UpdateOutcome::default());

        let err = store
            .update_one(
                &OrderFilter::by_order_id(7),
                &OrderUpdate::status(OrderStatus::Filled),
                true,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidUpsert(_)));
    }

    #[test]
    fn test_update_apply_only_touches_timestamp_on_change() {
        let mut o = order("u1", 1, 100);
        let update = OrderUpdate::status(OrderStatus::New);

        assert!(!update.apply(&mut o, 999));
        assert_eq!(o.updated_at_ms, 100);

        assert!(OrderUpdate::status(OrderStatus::Filled).apply(&mut o, 999));
        assert_eq!(o.updated_at_ms, 999);
    }

    #[tokio::test]
    async fn test_protection_update_links_entry_to_oco() {
        let store = InMemoryOrderStore::new();
        store.insert(order("u1", 42, 100)).await.unwrap();

        let update = OrderUpdate::protection(9, dec!(51000), dec!(49000));
        let outcome = store
            .update_one(&OrderFilter::by_order_id(42), &update, false)
            .await
            .unwrap();
        assert_eq!(outcome, UpdateOutcome { matched: 1, modified: 1 });

        let stored = &store.find_by_order_id(42)[0];
        assert_eq!(stored.order_list_id, Some(9));
        assert_eq!(stored.take_profit_price, Some(dec!(51000)));
        assert_eq!(stored.stop_loss_price, Some(dec!(49000)));
        assert_eq!(stored.status, OrderStatus::New);
    }
}
