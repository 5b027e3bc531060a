//! Shared infrastructure for the gateway crates.

mod backoff;
mod environment;
mod logging;
mod retry;

pub use backoff::ExponentialBackoff;
pub use environment::{BinanceEnvironment, ParseEnvironmentError};
pub use logging::init_logging;
pub use retry::{RetryDecision, RetryPolicy};
