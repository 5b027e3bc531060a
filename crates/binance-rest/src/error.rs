//! Binance REST API error types.

use auth::AuthError;
use common::RetryDecision;
use rest_client::RestError;
use std::time::Duration;
use thiserror::Error;

/// Binance error code for an unknown or expired listen key.
pub const LISTEN_KEY_EXPIRED_CODE: i32 = -1125;

/// Errors that can occur when interacting with the Binance REST API.
#[derive(Debug, Error)]
pub enum BinanceRestError {
    /// The request did not complete: timeout, connection failure, throttling.
    #[error("transport error: {0}")]
    Transport(RestError),

    /// The exchange answered and rejected the request.
    #[error("exchange error (HTTP {status}, code {}): {message}", display_code(.code))]
    Exchange {
        status: u16,
        /// `None` when the body was not `{"code","msg"}` JSON.
        code: Option<i32>,
        /// Exchange message, or the raw body when it could not be parsed.
        message: String,
    },

    #[error("authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("parse error: {0}")]
    Parse(String),
}

fn display_code(code: &Option<i32>) -> String {
    code.map_or_else(|| "none".to_string(), |c| c.to_string())
}

impl BinanceRestError {
    /// Classify a non-2xx response.
    ///
    /// Binance returns errors in the format: `{"code": -1000, "msg": "..."}`
    pub fn from_api_response(status: u16, body: &str) -> Self {
        #[derive(serde::Deserialize)]
        struct ApiError {
            code: i32,
            msg: String,
        }

        match serde_json::from_str::<ApiError>(body) {
            Ok(err) => Self::Exchange {
                status,
                code: Some(err.code),
                message: err.msg,
            },
            Err(_) => Self::Exchange {
                status,
                code: None,
                message: body.to_string(),
            },
        }
    }

    /// Only transport failures are retried; exchange rejections never are.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_transport(),
            _ => false,
        }
    }

    /// Retry treatment for requests that are safe to repeat. Throttling
    /// waits for the exchange's `Retry-After`.
    pub fn retry_decision(&self) -> RetryDecision {
        match self {
            Self::Transport(RestError::RateLimited { retry_after_ms }) => {
                RetryDecision::RetryAfter(Duration::from_millis(*retry_after_ms))
            }
            _ if self.is_retryable() => RetryDecision::Retry,
            _ => RetryDecision::Fail,
        }
    }

    /// Retry treatment for order placements. They are repeated only when
    /// the exchange certainly did not act on the first attempt; a timeout
    /// may have placed the order and is returned as is.
    pub fn placement_retry_decision(&self) -> RetryDecision {
        match self {
            Self::Transport(e) if e.is_unprocessed() => self.retry_decision(),
            _ => RetryDecision::Fail,
        }
    }

    /// Transport failure after which the order may or may not exist.
    pub fn is_ambiguous(&self) -> bool {
        matches!(self, Self::Transport(e) if !e.is_unprocessed())
    }

    pub fn code(&self) -> Option<i32> {
        match self {
            Self::Exchange { code, .. } => *code,
            _ => None,
        }
    }

    pub fn is_listen_key_expired(&self) -> bool {
        self.code() == Some(LISTEN_KEY_EXPIRED_CODE)
    }
}

impl From<RestError> for BinanceRestError {
    fn from(err: RestError) -> Self {
        match err {
            RestError::HttpError { status, message } => Self::from_api_response(status, &message),
            RestError::Parse(msg) => Self::Parse(msg),
            other => Self::Transport(other),
        }
    }
}
