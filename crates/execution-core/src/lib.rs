//! Core order types and pure placement logic.
//!
//! - **Requests**: [`OrderRequest`] as received from the request layer
//! - **Strategies**: [`Strategy::resolve`] picks one of four placement strategies
//! - **Protection**: [`build_legs`] derives and validates take-profit/stop-loss legs
//! - **Records**: [`PlacedOrder`] is what gets persisted
//! - **Events**: [`ExecutionReport`] is what the private stream pushes back
//!
//! Nothing in this crate performs I/O.

mod error;
mod execution;
mod ids;
mod order;
mod protection;
mod record;
mod request;
mod strategy;

pub use error::OrderError;
pub use execution::ExecutionReport;
pub use ids::{generate_client_order_id, now_ms, CLIENT_ORDER_ID_PREFIX};
pub use order::{ExecutionType, OrderSide, OrderStatus, OrderType, TimeInForce};
pub use protection::{build_legs, format_price, ProtectionLegs, STOP_LIMIT_BUFFER};
pub use record::PlacedOrder;
pub use request::OrderRequest;
pub use strategy::{ProtectionSpec, Strategy};
