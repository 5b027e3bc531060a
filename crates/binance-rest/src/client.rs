//! Binance REST API client.

use crate::config::ClientConfig;
use crate::error::BinanceRestError;
use crate::requests::{NewOrder, OcoOrder};
use crate::responses::{
    ListenKeyResponse, NewOrderResponse, OrderListResponse, ServerTimeResponse, TickerPriceResponse,
};
use auth::RequestSigner;
use common::{BinanceEnvironment, RetryDecision};
use execution_core::now_ms;
use rest_client::{Method, RestClient};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use std::sync::atomic::{AtomicI64, Ordering};

const API_KEY_HEADER: &str = "X-MBX-APIKEY";

/// How a request is authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Security {
    /// Public market data.
    None,
    /// API key header only (listen-key endpoints).
    ApiKey,
    /// API key header plus `recvWindow`, `timestamp` and HMAC `signature`.
    Signed,
}

/// Binance REST API client with authentication support.
///
/// Every call goes through the configured `RetryPolicy`; signed requests
/// are re-signed with a fresh timestamp on each attempt.
pub struct BinanceRestClient {
    client: RestClient,
    config: ClientConfig,
    /// Time offset between local clock and Binance server (local - server).
    time_offset_ms: AtomicI64,
}

impl BinanceRestClient {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self, BinanceRestError> {
        let client = RestClient::new(config.base_url(), config.timeout)?;

        Ok(Self {
            client,
            config,
            time_offset_ms: AtomicI64::new(0),
        })
    }

    pub fn environment(&self) -> BinanceEnvironment {
        self.config.environment
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Get the API key (for logging/debugging).
    pub fn api_key(&self) -> &str {
        self.config.credentials.api_key()
    }

    /// Estimated Binance server time from the local clock and the last
    /// measured offset.
    pub fn server_timestamp_ms(&self) -> i64 {
        now_ms() - self.time_offset_ms.load(Ordering::Relaxed)
    }

    async fn execute(
        &self,
        operation: &str,
        method: Method,
        path: &str,
        params: &[(&str, String)],
        security: Security,
    ) -> Result<String, BinanceRestError> {
        self.execute_with(
            operation,
            method,
            path,
            params,
            security,
            BinanceRestError::retry_decision,
        )
        .await
    }

    /// Like `execute`, for requests that create orders. Those are repeated
    /// only when the first attempt certainly never reached the exchange.
    async fn execute_placement(
        &self,
        operation: &str,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<String, BinanceRestError> {
        let result = self
            .execute_with(
                operation,
                Method::POST,
                path,
                params,
                Security::Signed,
                BinanceRestError::placement_retry_decision,
            )
            .await;

        if let Err(e) = &result {
            if e.is_ambiguous() {
                tracing::error!(
                    operation = %operation,
                    error = %e,
                    "Placement outcome unknown; the order may be live on the exchange"
                );
            }
        }
        result
    }

    async fn execute_with(
        &self,
        operation: &str,
        method: Method,
        path: &str,
        params: &[(&str, String)],
        security: Security,
        classify: fn(&BinanceRestError) -> RetryDecision,
    ) -> Result<String, BinanceRestError> {
        let method = &method;

        self.config
            .retry
            .run_classified(
                operation,
                move || async move { self.send_once(method.clone(), path, params, security).await },
                classify,
            )
            .await
    }

    async fn send_once(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, String)],
        security: Security,
    ) -> Result<String, BinanceRestError> {
        let refs: Vec<(&str, &str)> = params.iter().map(|(k, v)| (*k, v.as_str())).collect();

        let query = match security {
            Security::Signed => RequestSigner::new(&self.config.credentials).sign_query(
                &refs,
                Some(self.config.recv_window_ms),
                self.server_timestamp_ms(),
            )?,
            Security::None | Security::ApiKey => refs
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join("&"),
        };

        let api_key = [(API_KEY_HEADER, self.config.credentials.api_key())];
        let headers: &[(&str, &str)] = match security {
            Security::None => &[],
            Security::ApiKey | Security::Signed => &api_key,
        };

        Ok(self.client.send(method, path, Some(&query), headers).await?)
    }

    fn decode<T: DeserializeOwned>(body: &str) -> Result<T, BinanceRestError> {
        serde_json::from_str(body).map_err(|e| {
            tracing::warn!(body = %body, error = %e, "Failed to parse response");
            BinanceRestError::Parse(e.to_string())
        })
    }

    // ========================================================================
    // Time Synchronization
    // ========================================================================

    /// Synchronize with Binance server time.
    ///
    /// Signed requests use the corrected clock afterwards. Call on startup
    /// and whenever timestamps are rejected.
    pub async fn sync_time(&self) -> Result<(), BinanceRestError> {
        let before = std::time::Instant::now();
        let body = self
            .execute("sync_time", Method::GET, "/api/v3/time", &[], Security::None)
            .await?;
        let response: ServerTimeResponse = Self::decode(&body)?;
        let rtt = before.elapsed().as_millis() as i64;

        let local_time = now_ms();
        // Estimate server time at midpoint of request
        let estimated_server_time = response.server_time + (rtt / 2);
        let offset = local_time - estimated_server_time;

        self.time_offset_ms.store(offset, Ordering::Relaxed);

        tracing::info!(
            server_time = response.server_time,
            local_time = local_time,
            offset_ms = offset,
            rtt_ms = rtt,
            "Time synchronized with Binance server"
        );

        Ok(())
    }

    // ========================================================================
    // Market Data
    // ========================================================================

    /// Last traded price for `symbol`.
    ///
    /// GET /api/v3/ticker/price
    ///
    /// Unauthenticated and uncached: every call is a fresh fetch.
    pub async fn last_price(&self, symbol: &str) -> Result<Decimal, BinanceRestError> {
        let params = [("symbol", symbol.to_string())];
        let body = self
            .execute(
                "last_price",
                Method::GET,
                "/api/v3/ticker/price",
                &params,
                Security::None,
            )
            .await?;
        let response: TickerPriceResponse = Self::decode(&body)?;

        tracing::debug!(symbol = %response.symbol, price = %response.price, "Fetched last price");
        Ok(response.price)
    }

    // ========================================================================
    // Listen Key Management
    // ========================================================================

    /// Create a new listen key for user data stream.
    ///
    /// POST /api/v3/userDataStream
    ///
    /// The listen key is valid for 60 minutes and must be refreshed periodically.
    pub async fn create_listen_key(&self) -> Result<String, BinanceRestError> {
        let body = self
            .execute(
                "create_listen_key",
                Method::POST,
                "/api/v3/userDataStream",
                &[],
                Security::ApiKey,
            )
            .await?;
        let response: ListenKeyResponse = Self::decode(&body)?;

        tracing::info!("Created listen key");
        Ok(response.listen_key)
    }

    /// Extend a listen key's validity by 60 minutes.
    ///
    /// PUT /api/v3/userDataStream
    pub async fn keepalive_listen_key(&self, listen_key: &str) -> Result<(), BinanceRestError> {
        let params = [("listenKey", listen_key.to_string())];
        self.execute(
            "keepalive_listen_key",
            Method::PUT,
            "/api/v3/userDataStream",
            &params,
            Security::ApiKey,
        )
        .await?;

        tracing::debug!("Listen key refreshed");
        Ok(())
    }

    /// Close a listen key.
    ///
    /// DELETE /api/v3/userDataStream
    pub async fn close_listen_key(&self, listen_key: &str) -> Result<(), BinanceRestError> {
        let params = [("listenKey", listen_key.to_string())];
        self.execute(
            "close_listen_key",
            Method::DELETE,
            "/api/v3/userDataStream",
            &params,
            Security::ApiKey,
        )
        .await?;

        tracing::info!("Listen key closed");
        Ok(())
    }

    // ========================================================================
    // Order Management
    // ========================================================================

    /// Place a single MARKET or LIMIT order.
    ///
    /// POST /api/v3/order
    pub async fn place_order(&self, order: &NewOrder) -> Result<NewOrderResponse, BinanceRestError> {
        tracing::info!(
            symbol = %order.symbol,
            side = %order.side,
            order_type = ?order.order_type,
            quantity = %order.quantity,
            client_order_id = %order.client_order_id,
            "Placing order"
        );

        let body = self
            .execute_placement("place_order", "/api/v3/order", &order.params())
            .await?;
        let response: NewOrderResponse = Self::decode(&body)?;

        tracing::info!(
            order_id = response.order_id,
            status = %response.status,
            "Order placed"
        );

        Ok(response)
    }

    /// Place a take-profit/stop-loss OCO pair.
    ///
    /// POST /api/v3/order/oco
    pub async fn place_oco(&self, order: &OcoOrder) -> Result<OrderListResponse, BinanceRestError> {
        tracing::info!(
            symbol = %order.symbol,
            side = %order.side(),
            quantity = %order.quantity,
            take_profit = %order.legs.take_profit_price,
            stop_loss = %order.legs.stop_loss_price,
            stop_limit = %order.legs.stop_limit_price,
            list_client_order_id = %order.list_client_order_id,
            "Placing OCO order"
        );

        let body = self
            .execute_placement("place_oco", "/api/v3/order/oco", &order.params())
            .await?;
        let response: OrderListResponse = Self::decode(&body)?;

        tracing::info!(
            order_list_id = response.order_list_id,
            list_status = %response.list_order_status,
            "OCO order placed"
        );

        Ok(response)
    }

    /// Cancel every open leg of an order list.
    ///
    /// DELETE /api/v3/orderList
    pub async fn cancel_order_list(
        &self,
        symbol: &str,
        order_list_id: i64,
    ) -> Result<OrderListResponse, BinanceRestError> {
        let params = [
            ("orderListId", order_list_id.to_string()),
            ("symbol", symbol.to_string()),
        ];

        tracing::info!(symbol = %symbol, order_list_id = order_list_id, "Canceling order list");

        let body = self
            .execute(
                "cancel_order_list",
                Method::DELETE,
                "/api/v3/orderList",
                &params,
                Security::Signed,
            )
            .await?;
        let response: OrderListResponse = Self::decode(&body)?;

        tracing::info!(
            order_list_id = response.order_list_id,
            list_status = %response.list_order_status,
            "Order list canceled"
        );

        Ok(response)
    }
}

impl std::fmt::Debug for BinanceRestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinanceRestClient")
            .field("environment", &self.config.environment)
            .field("base_url", &self.client.base_url())
            .field("api_key", &self.api_key())
            .field(
                "time_offset_ms",
                &self.time_offset_ms.load(Ordering::Relaxed),
            )
            .finish()
    }
}
