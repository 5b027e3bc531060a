use crate::error::StoreError;
use async_trait::async_trait;
use execution_core::{OrderStatus, PlacedOrder};
use rust_decimal::Decimal;
use std::sync::Arc;

/// Collection the gateway writes orders to.
pub const ORDERS_COLLECTION: &str = "orders";

/// Equality filter over the fields the gateway queries by.
///
/// Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderFilter {
    pub user_id: Option<String>,
    pub order_id: Option<i64>,
}

impl OrderFilter {
    pub fn by_user(user_id: &str) -> Self {
        Self {
            user_id: Some(user_id.to_string()),
            ..Self::default()
        }
    }

    pub fn by_order_id(order_id: i64) -> Self {
        Self {
            order_id: Some(order_id),
            ..Self::default()
        }
    }

    pub fn matches(&self, order: &PlacedOrder) -> bool {
        self.user_id.as_deref().map_or(true, |u| u == order.user_id)
            && self.order_id.map_or(true, |id| id == order.order_id)
    }
}

/// Sort direction on `created_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Ascending,
    #[default]
    Descending,
}

/// Field assignments applied by `update_one`. Unset fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderUpdate {
    pub status: Option<OrderStatus>,
    pub executed_qty: Option<Decimal>,
    pub order_list_id: Option<i64>,
    pub take_profit_price: Option<Decimal>,
    pub stop_loss_price: Option<Decimal>,
}

impl OrderUpdate {
    pub fn status(status: OrderStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn with_executed_qty(mut self, qty: Decimal) -> Self {
        self.executed_qty = Some(qty);
        self
    }

    /// Link an entry to the OCO that protects it.
    pub fn protection(
        order_list_id: i64,
        take_profit_price: Decimal,
        stop_loss_price: Decimal,
    ) -> Self {
        Self {
            order_list_id: Some(order_list_id),
            take_profit_price: Some(take_profit_price),
            stop_loss_price: Some(stop_loss_price),
            ..Self::default()
        }
    }

    /// Apply to `order`, returning whether anything changed.
    pub fn apply(&self, order: &mut PlacedOrder, now_ms: i64) -> bool {
        let mut changed = false;

        if let Some(status) = self.status {
            if order.status != status {
                order.status = status;
                changed = true;
            }
        }
        if let Some(qty) = self.executed_qty {
            if order.executed_qty != qty {
                order.executed_qty = qty;
                changed = true;
            }
        }
        if self.order_list_id.is_some() && order.order_list_id != self.order_list_id {
            order.order_list_id = self.order_list_id;
            changed = true;
        }
        if self.take_profit_price.is_some() && order.take_profit_price != self.take_profit_price {
            order.take_profit_price = self.take_profit_price;
            changed = true;
        }
        if self.stop_loss_price.is_some() && order.stop_loss_price != self.stop_loss_price {
            order.stop_loss_price = self.stop_loss_price;
            changed = true;
        }
        if changed {
            order.updated_at_ms = now_ms;
        }
        changed
    }
}

/// One page of results plus the total number of matches.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
}

/// Result of `update_one`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub matched: u64,
    pub modified: u64,
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Insert a new record and return it with its assigned id.
    async fn insert(&self, order: PlacedOrder) -> Result<PlacedOrder, StoreError>;

    /// Matching records sorted by creation time. `limit == 0` means no limit.
    async fn find_many(
        &self,
        filter: &OrderFilter,
        sort: SortOrder,
        limit: usize,
        offset: usize,
    ) -> Result<Page<PlacedOrder>, StoreError>;

    /// Update the first matching record.
    async fn update_one(
        &self,
        filter: &OrderFilter,
        update: &OrderUpdate,
        upsert: bool,
    ) -> Result<UpdateOutcome, StoreError>;
}

pub type SharedOrderStore = Arc<dyn OrderStore>;
