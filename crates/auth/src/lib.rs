//! Credentials and request signing for the exchange gateway.
//!
//! The API secret is held in a `SecretString` and only exposed to the HMAC
//! routine. Nothing in this crate is global: callers load an
//! [`ApiCredentials`] once and hand it to the client that owns it.
//!
//! ```rust,ignore
//! use auth::{ApiCredentials, RequestSigner};
//!
//! let credentials = ApiCredentials::from_env()?;
//! let signer = RequestSigner::new(&credentials);
//! let query = signer.sign_query(&[("symbol", "BTCUSDT")], Some(5000), timestamp_ms)?;
//! ```

mod credentials;
mod error;
mod signer;

pub use credentials::ApiCredentials;
pub use error::AuthError;
pub use signer::RequestSigner;
