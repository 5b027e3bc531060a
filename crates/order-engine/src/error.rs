use binance_rest::BinanceRestError;
use execution_core::OrderError;
use order_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// The request was rejected before anything was sent.
    #[error(transparent)]
    Validation(#[from] OrderError),

    #[error("exchange call failed: {0}")]
    Exchange(#[from] BinanceRestError),

    /// Only returned by reads; write failures after a successful exchange
    /// call are reported as warnings on the outcome.
    #[error("order store failed: {0}")]
    Persistence(#[from] StoreError),
}
