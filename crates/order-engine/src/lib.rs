//! Order placement on top of the exchange client and the order store.
//!
//! [`OrderEngine::execute`] resolves a [`execution_core::Strategy`] for the
//! request and runs the matching handler. Exchange access goes through the
//! [`ExchangeGateway`] and [`PriceOracle`] traits so the handlers can be
//! exercised without a network.

mod convert;
mod engine;
mod error;
mod gateway;
mod outcome;

pub use engine::{HistoryQuery, OrderEngine};
pub use error::EngineError;
pub use gateway::{ExchangeGateway, PriceOracle};
pub use outcome::{PlacementOutcome, PlacementWarning, ProtectionStatus};
