//! HMAC-SHA256 request signing for Binance API.

use crate::credentials::ApiCredentials;
use crate::error::AuthError;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Request signer for authenticated Binance API calls.
pub struct RequestSigner<'a> {
    credentials: &'a ApiCredentials,
}

impl<'a> RequestSigner<'a> {
    pub fn new(credentials: &'a ApiCredentials) -> Self {
        Self { credentials }
    }

    /// Sign a message and return the lowercase hex HMAC-SHA256 digest.
    pub fn sign(&self, message: &str) -> Result<String, AuthError> {
        let mut mac = HmacSha256::new_from_slice(self.credentials.expose_secret().as_bytes())
            .map_err(|_| AuthError::InvalidKeyFormat)?;

        mac.update(message.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Build a signed query string, preserving parameter order.
    ///
    /// `recvWindow` (when given) and `timestamp` are appended after the
    /// caller's parameters, the whole string is signed, and
    /// `&signature=<hex>` is appended last.
    pub fn sign_query(
        &self,
        params: &[(&str, &str)],
        recv_window_ms: Option<u64>,
        timestamp_ms: i64,
    ) -> Result<String, AuthError> {
        let mut query_parts: Vec<String> =
            params.iter().map(|(k, v)| format!("{}={}", k, v)).collect();

        if let Some(window) = recv_window_ms {
            query_parts.push(format!("recvWindow={}", window));
        }
        query_parts.push(format!("timestamp={}", timestamp_ms));

        let query_string = query_parts.join("&");
        let signature = self.sign(&query_string)?;
        Ok(format!("{}&signature={}", query_string, signature))
    }
}
