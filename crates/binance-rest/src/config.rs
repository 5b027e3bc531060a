//! Explicit client configuration.

use auth::ApiCredentials;
use common::{BinanceEnvironment, RetryPolicy};
use std::time::Duration;

/// Default `recvWindow` sent with every signed request.
pub const DEFAULT_RECV_WINDOW_MS: u64 = 5000;

/// Everything a [`crate::BinanceRestClient`] needs, owned by the client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub credentials: ApiCredentials,
    pub environment: BinanceEnvironment,
    /// Overrides the environment's REST endpoint (tests, proxies).
    pub rest_base_url: Option<String>,
    pub timeout: Duration,
    pub recv_window_ms: u64,
    pub retry: RetryPolicy,
}

impl ClientConfig {
    pub fn new(credentials: ApiCredentials, environment: BinanceEnvironment) -> Self {
        Self {
            credentials,
            environment,
            rest_base_url: None,
            timeout: rest_client::DEFAULT_TIMEOUT,
            recv_window_ms: DEFAULT_RECV_WINDOW_MS,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.rest_base_url = Some(url.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_recv_window(mut self, recv_window_ms: u64) -> Self {
        self.recv_window_ms = recv_window_ms;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// The REST endpoint requests are sent to.
    pub fn base_url(&self) -> &str {
        self.rest_base_url
            .as_deref()
            .unwrap_or_else(|| self.environment.rest_base_url())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials() -> ApiCredentials {
        ApiCredentials::new("key".into(), "secret".into())
    }

    #[test]
    fn test_defaults() {
        let config = ClientConfig::new(credentials(), BinanceEnvironment::Production);

        assert_eq!(config.base_url(), "https://api.binance.com");
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.recv_window_ms, 5000);
        assert_eq!(config.retry.max_attempts(), 3);
    }

    #[test]
    fn test_base_url_override() {
        let config = ClientConfig::new(credentials(), BinanceEnvironment::Testnet)
            .with_base_url("http://127.0.0.1:9000");
        assert_eq!(config.base_url(), "http://127.0.0.1:9000");
    }
}
