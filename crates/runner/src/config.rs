//! Gateway configuration read from the environment.

use auth::{ApiCredentials, AuthError};
use common::{BinanceEnvironment, ParseEnvironmentError};
use connector_binance::ReconcilePolicy;
use connector_core::DEFAULT_TICKER_SYMBOLS;
use thiserror::Error;

const TICKER_SYMBOLS_VAR: &str = "TICKER_SYMBOLS";
const RECONCILE_POLICY_VAR: &str = "RECONCILE_POLICY";
const WS_URL_VAR: &str = "BINANCE_WS_URL";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Credentials(#[from] AuthError),

    #[error(transparent)]
    Environment(#[from] ParseEnvironmentError),

    #[error("RECONCILE_POLICY: {0}")]
    ReconcilePolicy(String),

    #[error("TICKER_SYMBOLS is set but names no symbols")]
    EmptySymbols,
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub credentials: ApiCredentials,
    pub environment: BinanceEnvironment,
    pub ticker_symbols: Vec<String>,
    pub reconcile_policy: ReconcilePolicy,
    /// Overrides the environment's stream endpoint.
    pub ws_base_url: Option<String>,
}

impl GatewayConfig {
    /// Credentials load `.env` first, so the variables below may live there too.
    pub fn from_env() -> Result<Self, ConfigError> {
        let credentials = ApiCredentials::from_env()?;
        let environment = BinanceEnvironment::from_env()?;

        let ticker_symbols = match non_empty_var(TICKER_SYMBOLS_VAR) {
            Some(raw) => parse_symbols(&raw)?,
            None => default_symbols(),
        };
        let reconcile_policy = match non_empty_var(RECONCILE_POLICY_VAR) {
            Some(raw) => raw.parse().map_err(ConfigError::ReconcilePolicy)?,
            None => ReconcilePolicy::default(),
        };

        Ok(Self {
            credentials,
            environment,
            ticker_symbols,
            reconcile_policy,
            ws_base_url: non_empty_var(WS_URL_VAR),
        })
    }

    pub fn ws_base_url(&self) -> &str {
        self.ws_base_url
            .as_deref()
            .unwrap_or_else(|| self.environment.ws_base_url())
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn default_symbols() -> Vec<String> {
    DEFAULT_TICKER_SYMBOLS.iter().map(|s| s.to_string()).collect()
}

/// Comma-separated symbols, upper-cased, blanks and duplicates dropped.
fn parse_symbols(raw: &str) -> Result<Vec<String>, ConfigError> {
    let mut symbols: Vec<String> = Vec::new();
    for symbol in raw.split(',').map(|s| s.trim().to_ascii_uppercase()) {
        if !symbol.is_empty() && !symbols.contains(&symbol) {
            symbols.push(symbol);
        }
    }

    if symbols.is_empty() {
        return Err(ConfigError::EmptySymbols);
    }
    Ok(symbols)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_symbols() {
        let symbols = parse_symbols(" btcusdt, SOLUSDT,,BTCUSDT ").unwrap();
        assert_eq!(symbols, vec!["BTCUSDT".to_string(), "SOLUSDT".to_string()]);
    }

    #[test]
    fn test_parse_symbols_rejects_empty_list() {
        assert!(matches!(parse_symbols(" , ,"), Err(ConfigError::EmptySymbols)));
    }

    #[test]
    fn test_default_symbols() {
        let symbols = default_symbols();
        assert_eq!(symbols.len(), 10);
        assert!(symbols.contains(&"BTCUSDT".to_string()));
    }

    #[test]
    fn test_ws_base_url_override() {
        let mut config = GatewayConfig {
            credentials: ApiCredentials::new("key".into(), "secret".into()),
            environment: BinanceEnvironment::Testnet,
            ticker_symbols: default_symbols(),
            reconcile_policy: ReconcilePolicy::FillsOnly,
            ws_base_url: None,
        };
        assert_eq!(config.ws_base_url(), "wss://testnet.binance.vision");

        config.ws_base_url = Some("ws://127.0.0.1:9000".into());
        assert_eq!(config.ws_base_url(), "ws://127.0.0.1:9000");
    }
}
