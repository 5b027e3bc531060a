//! Strategy executor.

use crate::convert::{entry_record, leg_records, primary_leg};
use crate::error::EngineError;
use crate::gateway::{ExchangeGateway, PriceOracle};
use crate::outcome::{PlacementOutcome, PlacementWarning, ProtectionStatus};
use binance_rest::{BinanceRestClient, NewOrder, OcoOrder, OrderListResponse};
use execution_core::{
    build_legs, OrderError, OrderRequest, OrderType, PlacedOrder, ProtectionLegs, ProtectionSpec,
    Strategy,
};
use order_store::{OrderFilter, OrderUpdate, Page, SharedOrderStore, SortOrder};
use rust_decimal::Decimal;
use std::sync::Arc;

/// Paging for [`OrderEngine::history`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryQuery {
    pub limit: usize,
    pub offset: usize,
}

impl Default for HistoryQuery {
    fn default() -> Self {
        Self {
            limit: 10,
            offset: 0,
        }
    }
}

/// Places orders according to their resolved strategy and records the
/// results.
///
/// Placement runs entirely on the caller's task. Within one call the entry
/// order always completes before any OCO is attempted; separate calls are
/// independent of each other.
#[derive(Clone)]
pub struct OrderEngine {
    gateway: Arc<dyn ExchangeGateway>,
    oracle: Arc<dyn PriceOracle>,
    store: SharedOrderStore,
}

impl OrderEngine {
    pub fn new(
        gateway: Arc<dyn ExchangeGateway>,
        oracle: Arc<dyn PriceOracle>,
        store: SharedOrderStore,
    ) -> Self {
        Self {
            gateway,
            oracle,
            store,
        }
    }

    /// Use one REST client as both gateway and oracle.
    pub fn with_client(client: Arc<BinanceRestClient>, store: SharedOrderStore) -> Self {
        Self::new(client.clone(), client, store)
    }

    /// Resolve the strategy for `req` and run it on behalf of `user_id`.
    pub async fn execute(
        &self,
        req: &OrderRequest,
        user_id: &str,
    ) -> Result<PlacementOutcome, EngineError> {
        let strategy = Strategy::resolve(req)?;

        tracing::info!(
            user_id = %user_id,
            symbol = %req.symbol,
            side = %req.side,
            strategy = %strategy,
            "Executing order request"
        );

        self.execute_strategy(strategy, req, user_id).await
    }

    pub async fn execute_strategy(
        &self,
        strategy: Strategy,
        req: &OrderRequest,
        user_id: &str,
    ) -> Result<PlacementOutcome, EngineError> {
        match strategy {
            Strategy::Simple => self.place_simple(req, user_id).await,
            Strategy::MarketWithProtection(spec) => {
                self.place_market_with_protection(spec, req, user_id).await
            }
            Strategy::LimitOcoAbsolute { .. } | Strategy::LimitOcoDynamic { .. } => {
                self.place_limit_oco(strategy, req, user_id).await
            }
        }
    }

    async fn place_simple(
        &self,
        req: &OrderRequest,
        user_id: &str,
    ) -> Result<PlacementOutcome, EngineError> {
        let order = match req.order_type {
            OrderType::Limit => {
                let price = match req.price {
                    Some(price) => price,
                    None => self.oracle.last_price(&req.symbol).await?,
                };
                NewOrder::limit(&req.symbol, req.side, &req.quantity, price)
            }
            _ => NewOrder::market(&req.symbol, req.side, &req.quantity),
        };

        let response = self.gateway.place_order(&order).await?;

        let mut warnings = Vec::new();
        let record = self
            .persist(entry_record(&response, user_id), &mut warnings)
            .await;

        Ok(PlacementOutcome {
            strategy: Strategy::Simple,
            order: record,
            protection: ProtectionStatus::NotRequested,
            warnings,
        })
    }

    async fn place_market_with_protection(
        &self,
        spec: ProtectionSpec,
        req: &OrderRequest,
        user_id: &str,
    ) -> Result<PlacementOutcome, EngineError> {
        let order = NewOrder::market(&req.symbol, req.side, &req.quantity);
        let response = self.gateway.place_order(&order).await?;

        // The entry is live from here on; every failure below is a partial success.
        let mut warnings = Vec::new();
        let mut entry = self
            .persist(entry_record(&response, user_id), &mut warnings)
            .await;

        let protection = match self.protect(req, &spec).await {
            Ok((legs, list)) => {
                entry.order_list_id = Some(list.order_list_id);
                entry.take_profit_price = Some(legs.take_profit_price);
                entry.stop_loss_price = Some(legs.stop_loss_price);
                if entry.id.is_some() {
                    self.link_protection(&entry, &legs, list.order_list_id, &mut warnings)
                        .await;
                }

                let records = leg_records(&list, &legs, entry.orig_qty, user_id);
                ProtectionStatus::Placed {
                    order_list_id: list.order_list_id,
                    legs: self.persist_all(records, &mut warnings).await,
                }
            }
            Err(e) => {
                tracing::warn!(
                    order_id = entry.order_id,
                    symbol = %entry.symbol,
                    error = %e,
                    "Entry order placed but protection failed"
                );
                ProtectionStatus::Failed {
                    reason: e.to_string(),
                }
            }
        };

        Ok(PlacementOutcome {
            strategy: Strategy::MarketWithProtection(spec),
            order: entry,
            protection,
            warnings,
        })
    }

    /// Fetch the price, build and validate the legs, submit the OCO.
    async fn protect(
        &self,
        req: &OrderRequest,
        spec: &ProtectionSpec,
    ) -> Result<(ProtectionLegs, OrderListResponse), EngineError> {
        let price = self.oracle.last_price(&req.symbol).await?;
        let legs = build_legs(req.side, Some(price), spec)?;
        let list = self
            .gateway
            .place_oco(&OcoOrder::new(&req.symbol, &req.quantity, legs))
            .await?;
        Ok((legs, list))
    }

    async fn place_limit_oco(
        &self,
        strategy: Strategy,
        req: &OrderRequest,
        user_id: &str,
    ) -> Result<PlacementOutcome, EngineError> {
        let spec = strategy.protection().ok_or_else(|| {
            OrderError::InvalidRequest(format!("strategy {} places no OCO", strategy))
        })?;

        // Absolute prices are checked against the limit price when one is given.
        let current_price = match spec {
            ProtectionSpec::Absolute { .. } => req.price,
            ProtectionSpec::Multiplier { .. } => Some(self.oracle.last_price(&req.symbol).await?),
        };
        let legs = build_legs(req.side, current_price, &spec)?;

        let list = self
            .gateway
            .place_oco(&OcoOrder::new(&req.symbol, &req.quantity, legs))
            .await?;

        let quantity = req.quantity.trim().parse::<Decimal>().unwrap_or_default();
        let mut warnings = Vec::new();
        let records = self
            .persist_all(leg_records(&list, &legs, quantity, user_id), &mut warnings)
            .await;

        let order = primary_leg(&records).cloned().ok_or_else(|| {
            OrderError::InvalidRequest(format!(
                "order list {} came back without legs",
                list.order_list_id
            ))
        })?;

        Ok(PlacementOutcome {
            strategy,
            order,
            protection: ProtectionStatus::Placed {
                order_list_id: list.order_list_id,
                legs: records,
            },
            warnings,
        })
    }

    /// Insert `record`, downgrading a store failure to a warning.
    async fn persist(
        &self,
        record: PlacedOrder,
        warnings: &mut Vec<PlacementWarning>,
    ) -> PlacedOrder {
        match self.store.insert(record.clone()).await {
            Ok(saved) => saved,
            Err(e) => {
                tracing::error!(
                    order_id = record.order_id,
                    error = %e,
                    "Order placed on exchange but not persisted"
                );
                warnings.push(PlacementWarning::NotPersisted {
                    order_id: record.order_id,
                    error: e.to_string(),
                });
                record
            }
        }
    }

    /// Record the OCO on an already stored entry.
    async fn link_protection(
        &self,
        entry: &PlacedOrder,
        legs: &ProtectionLegs,
        order_list_id: i64,
        warnings: &mut Vec<PlacementWarning>,
    ) {
        let update =
            OrderUpdate::protection(order_list_id, legs.take_profit_price, legs.stop_loss_price);
        if let Err(e) = self
            .store
            .update_one(&OrderFilter::by_order_id(entry.order_id), &update, false)
            .await
        {
            tracing::error!(
                order_id = entry.order_id,
                order_list_id,
                error = %e,
                "Protection placed but entry record not updated"
            );
            warnings.push(PlacementWarning::NotPersisted {
                order_id: entry.order_id,
                error: e.to_string(),
            });
        }
    }

    async fn persist_all(
        &self,
        records: Vec<PlacedOrder>,
        warnings: &mut Vec<PlacementWarning>,
    ) -> Vec<PlacedOrder> {
        let mut saved = Vec::with_capacity(records.len());
        for record in records {
            saved.push(self.persist(record, warnings).await);
        }
        saved
    }

    /// A user's orders, newest first.
    pub async fn history(
        &self,
        user_id: &str,
        query: HistoryQuery,
    ) -> Result<Page<PlacedOrder>, EngineError> {
        Ok(self
            .store
            .find_many(
                &OrderFilter::by_user(user_id),
                SortOrder::Descending,
                query.limit,
                query.offset,
            )
            .await?)
    }

    /// Current price for `symbol`, straight from the oracle.
    pub async fn symbol_price(&self, symbol: &str) -> Result<Decimal, EngineError> {
        Ok(self.oracle.last_price(symbol).await?)
    }

    /// Cancel a previously placed OCO.
    pub async fn cancel_protection(
        &self,
        symbol: &str,
        order_list_id: i64,
    ) -> Result<OrderListResponse, EngineError> {
        Ok(self.gateway.cancel_order_list(symbol, order_list_id).await?)
    }
}

impl std::fmt::Debug for OrderEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderEngine").finish_non_exhaustive()
    }
}
