//! Exchange environment selection.

use std::fmt;
use std::str::FromStr;

const ENVIRONMENT_VAR: &str = "BINANCE_ENVIRONMENT";

/// Which Binance deployment the gateway talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BinanceEnvironment {
    /// Real funds.
    #[default]
    Production,
    /// Spot testnet; orders never reach the real book.
    Testnet,
}

impl BinanceEnvironment {
    /// REST API base URL.
    pub fn rest_base_url(&self) -> &'static str {
        match self {
            Self::Production => "https://api.binance.com",
            Self::Testnet => "https://testnet.binance.vision",
        }
    }

    /// WebSocket base for both the private user data stream and public
    /// market streams.
    pub fn ws_base_url(&self) -> &'static str {
        match self {
            Self::Production => "wss://stream.binance.com:9443",
            Self::Testnet => "wss://testnet.binance.vision",
        }
    }

    /// Read `BINANCE_ENVIRONMENT`. Unset or blank means production; an
    /// unrecognised value is an error rather than a silent fallback.
    pub fn from_env() -> Result<Self, ParseEnvironmentError> {
        match std::env::var(ENVIRONMENT_VAR) {
            Ok(value) if !value.trim().is_empty() => value.trim().parse(),
            _ => Ok(Self::default()),
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

impl fmt::Display for BinanceEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Production => "production",
            Self::Testnet => "testnet",
        })
    }
}

impl FromStr for BinanceEnvironment {
    type Err = ParseEnvironmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "production" | "prod" | "mainnet" | "live" => Ok(Self::Production),
            "testnet" | "test" | "sandbox" => Ok(Self::Testnet),
            _ => Err(ParseEnvironmentError(s.to_string())),
        }
    }
}

/// `BINANCE_ENVIRONMENT` held something other than a known alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEnvironmentError(String);

impl fmt::Display for ParseEnvironmentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{ENVIRONMENT_VAR}: unknown environment '{}' (use production or testnet)",
            self.0
        )
    }
}

impl std::error::Error for ParseEnvironmentError {}
