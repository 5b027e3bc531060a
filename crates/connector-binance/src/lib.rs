//! Binance WebSocket connectors.
//!
//! - [`ExecutionStream`]: private user data stream, reconciles execution
//!   reports into the order store
//! - [`run_ticker_relay`]: public 24hr-ticker stream, forwards ticks for the
//!   interest set to a local channel

mod client;
mod parser;
mod reconcile;
mod session;
mod user_data_parser;
mod user_data_stream;

pub use client::run_ticker_relay;
pub use parser::{parse_message, ParsedMessage};
pub use reconcile::{reconcile, reconcile_update, ReconcilePolicy};
pub use session::ListenKeyProvider;
pub use user_data_parser::{parse_user_data_message, UserDataMessage};
pub use user_data_stream::{
    ExecutionStream, ExecutionStreamConfig, CLOSE_GRACE, LISTEN_KEY_KEEPALIVE_INTERVAL,
    PING_INTERVAL,
};
