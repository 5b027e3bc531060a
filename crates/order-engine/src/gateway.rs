use async_trait::async_trait;
use binance_rest::{
    BinanceRestClient, BinanceRestError, NewOrder, NewOrderResponse, OcoOrder, OrderListResponse,
};
use rust_decimal::Decimal;

/// Order-entry side of the exchange.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ExchangeGateway: Send + Sync {
    async fn place_order(&self, order: &NewOrder) -> Result<NewOrderResponse, BinanceRestError>;

    async fn place_oco(&self, order: &OcoOrder) -> Result<OrderListResponse, BinanceRestError>;

    async fn cancel_order_list(
        &self,
        symbol: &str,
        order_list_id: i64,
    ) -> Result<OrderListResponse, BinanceRestError>;
}

/// Current market price. Implementations must not cache.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PriceOracle: Send + Sync {
    async fn last_price(&self, symbol: &str) -> Result<Decimal, BinanceRestError>;
}

#[async_trait]
impl ExchangeGateway for BinanceRestClient {
    async fn place_order(&self, order: &NewOrder) -> Result<NewOrderResponse, BinanceRestError> {
        BinanceRestClient::place_order(self, order).await
    }

    async fn place_oco(&self, order: &OcoOrder) -> Result<OrderListResponse, BinanceRestError> {
        BinanceRestClient::place_oco(self, order).await
    }

    async fn cancel_order_list(
        &self,
        symbol: &str,
        order_list_id: i64,
    ) -> Result<OrderListResponse, BinanceRestError> {
        BinanceRestClient::cancel_order_list(self, symbol, order_list_id).await
    }
}

#[async_trait]
impl PriceOracle for BinanceRestClient {
    async fn last_price(&self, symbol: &str) -> Result<Decimal, BinanceRestError> {
        BinanceRestClient::last_price(self, symbol).await
    }
}
