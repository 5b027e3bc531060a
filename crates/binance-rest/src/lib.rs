//! Binance REST API client.
//!
//! This crate is the signed request client and the price oracle:
//!
//! - **Configuration**: [`ClientConfig`] is passed in explicitly, nothing is global
//! - **Signing**: HMAC-SHA256 over the canonical query with `recvWindow` and a clock-corrected `timestamp`
//! - **Retries**: transport failures go through the configured `RetryPolicy`; exchange rejections never do
//! - **Endpoints**: orders, OCO order lists, last price, listen keys, server time
//!
//! # Example
//!
//! ```rust,ignore
//! use auth::ApiCredentials;
//! use binance_rest::{BinanceRestClient, ClientConfig, NewOrder};
//! use common::BinanceEnvironment;
//!
//! let config = ClientConfig::new(ApiCredentials::from_env()?, BinanceEnvironment::from_env()?);
//! let client = BinanceRestClient::new(config)?;
//! client.sync_time().await?;
//!
//! let price = client.last_price("BTCUSDT").await?;
//! let response = client
//!     .place_order(&NewOrder::market("BTCUSDT", OrderSide::Buy, "0.01"))
//!     .await?;
//! ```

mod client;
mod config;
mod error;
mod requests;
mod responses;

pub use client::BinanceRestClient;
pub use config::{ClientConfig, DEFAULT_RECV_WINDOW_MS};
pub use error::{BinanceRestError, LISTEN_KEY_EXPIRED_CODE};
pub use requests::{NewOrder, OcoOrder};
pub use responses::{
    ListenKeyResponse, NewOrderResponse, OrderFill, OrderListEntry, OrderListResponse, OrderReport,
    ServerTimeResponse, TickerPriceResponse,
};
