use async_trait::async_trait;
use binance_rest::{BinanceRestClient, BinanceRestError};

/// Listen-key lifecycle used by the execution stream.
#[async_trait]
pub trait ListenKeyProvider: Send + Sync {
    async fn create_listen_key(&self) -> Result<String, BinanceRestError>;

    async fn keepalive_listen_key(&self, listen_key: &str) -> Result<(), BinanceRestError>;

    async fn close_listen_key(&self, listen_key: &str) -> Result<(), BinanceRestError>;
}

#[async_trait]
impl ListenKeyProvider for BinanceRestClient {
    async fn create_listen_key(&self) -> Result<String, BinanceRestError> {
        BinanceRestClient::create_listen_key(self).await
    }

    async fn keepalive_listen_key(&self, listen_key: &str) -> Result<(), BinanceRestError> {
        BinanceRestClient::keepalive_listen_key(self, listen_key).await
    }

    async fn close_listen_key(&self, listen_key: &str) -> Result<(), BinanceRestError> {
        BinanceRestClient::close_listen_key(self, listen_key).await
    }
}
