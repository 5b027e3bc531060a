//! Generic REST client infrastructure.
//!
//! Wraps `reqwest` with a fixed per-request timeout and maps every failure
//! onto [`RestError`], keeping the response body of non-2xx answers so the
//! caller can classify exchange-specific error payloads.

mod client;
mod error;

pub use client::{RestClient, DEFAULT_TIMEOUT};
pub use error::RestError;
pub use reqwest::Method;
