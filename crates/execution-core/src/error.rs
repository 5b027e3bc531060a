use thiserror::Error;

/// Request and protection-price validation failures. None are retryable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("invalid protection prices: {0}")]
    InvalidProtectionPrices(String),

    #[error("invalid price ordering: {0}")]
    InvalidPriceOrdering(String),
}
