use common::BinanceEnvironment;
use model::Tick;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, watch};

#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    #[error("Parse error: {0}")]
    Parse(String),

    /// The listen key could not be created or renewed.
    #[error("Session error: {0}")]
    Session(String),

    #[error("Channel closed")]
    ChannelClosed,

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Shutdown requested")]
    Shutdown,
}

/// Lifecycle of a stream connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamState {
    #[default]
    Disconnected,
    Connecting,
    Streaming,
}

impl fmt::Display for StreamState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Streaming => write!(f, "streaming"),
        }
    }
}

/// Symbols relayed when nothing else is configured.
pub const DEFAULT_TICKER_SYMBOLS: [&str; 10] = [
    "BGBUSDT",
    "CARVUSDT",
    "PUFFERUSDT",
    "BTCUSDT",
    "DOGSUSDT",
    "CATSUSDT",
    "DOGEUSDT",
    "SUIUSDT",
    "PEPEUSDT",
    "SOLUSDT",
];

#[derive(Debug, Clone)]
pub struct TickerRelayConfig {
    /// Interest set; also the subscription list.
    pub symbols: Vec<String>,
    pub ws_base_url: String,
    pub connect_timeout: Duration,
}

impl Default for TickerRelayConfig {
    fn default() -> Self {
        Self::for_environment(BinanceEnvironment::default())
    }
}

impl TickerRelayConfig {
    pub fn for_environment(environment: BinanceEnvironment) -> Self {
        Self {
            symbols: DEFAULT_TICKER_SYMBOLS.iter().map(|s| s.to_string()).collect(),
            ws_base_url: environment.ws_base_url().to_string(),
            connect_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_symbols(mut self, symbols: Vec<String>) -> Self {
        self.symbols = symbols;
        self
    }

    pub fn with_ws_base_url(mut self, url: impl Into<String>) -> Self {
        self.ws_base_url = url.into();
        self
    }

    /// Case-insensitive membership in the interest set.
    pub fn is_interesting(&self, symbol: &str) -> bool {
        self.symbols.iter().any(|s| s.eq_ignore_ascii_case(symbol))
    }
}

pub type TickSender = mpsc::UnboundedSender<Tick>;
pub type TickReceiver = mpsc::UnboundedReceiver<Tick>;

pub fn create_tick_channel() -> (TickSender, TickReceiver) {
    mpsc::unbounded_channel()
}

/// Resolve once `true` has been published on the shutdown channel.
///
/// Never resolves if the sender is dropped without signalling.
pub async fn shutdown_requested(shutdown_rx: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown_rx.borrow_and_update() {
            return;
        }
        if shutdown_rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Sleep for `delay` unless shutdown comes first. Returns `true` on shutdown.
pub async fn sleep_or_shutdown(delay: Duration, shutdown_rx: &mut watch::Receiver<bool>) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(delay) => false,
        _ = shutdown_requested(shutdown_rx) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interest_set_is_case_insensitive() {
        let config = TickerRelayConfig::default();

        assert!(config.is_interesting("BTCUSDT"));
        assert!(config.is_interesting("btcusdt"));
        assert!(config.is_interesting("PepeUsdt"));
        assert!(!config.is_interesting("ETHUSDT"));
    }

    #[test]
    fn test_default_config_uses_production_stream() {
        let config = TickerRelayConfig::default();
        assert_eq!(config.ws_base_url, "wss://stream.binance.com:9443");
        assert_eq!(config.symbols.len(), 10);
    }

    #[tokio::test]
    async fn test_shutdown_requested_sees_earlier_signal() {
        let (tx, mut rx) = watch::channel(false);
        tx.send(true).unwrap();

        tokio::time::timeout(Duration::from_secs(1), shutdown_requested(&mut rx))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_sleep_or_shutdown() {
        let (tx, mut rx) = watch::channel(false);

        assert!(!sleep_or_shutdown(Duration::from_millis(5), &mut rx).await);

        tx.send(true).unwrap();
        assert!(sleep_or_shutdown(Duration::from_secs(30), &mut rx).await);
    }
}
