//! Exchange API credentials.

use crate::error::AuthError;
use secrecy::{ExposeSecret, SecretString};

const API_KEY_VAR: &str = "BINANCE_API_KEY";
const SECRET_KEY_VAR: &str = "BINANCE_SECRET_KEY";

fn required_var(name: &str) -> Result<String, AuthError> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(AuthError::MissingEnvVar(name.to_string())),
    }
}

/// API key plus HMAC secret, owned by whichever client signs requests.
#[derive(Clone)]
pub struct ApiCredentials {
    api_key: String,
    secret_key: SecretString,
}

impl ApiCredentials {
    /// Load credentials from `BINANCE_API_KEY` and `BINANCE_SECRET_KEY`.
    ///
    /// A `.env` file in the working directory is read first when present.
    /// Empty values are treated as missing.
    pub fn from_env() -> Result<Self, AuthError> {
        dotenvy::dotenv().ok();

        let api_key = required_var(API_KEY_VAR)?;
        let secret_key = required_var(SECRET_KEY_VAR)?;

        Ok(Self::new(api_key, secret_key))
    }

    pub fn new(api_key: String, secret_key: String) -> Self {
        Self {
            api_key,
            secret_key: SecretString::from(secret_key),
        }
    }

    /// Sent as `X-MBX-APIKEY`; safe to log.
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Expose the secret key. Only the signer should call this.
    pub fn expose_secret(&self) -> &str {
        self.secret_key.expose_secret()
    }
}

impl std::fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiCredentials")
            .field("api_key", &self.api_key)
            .field("secret_key", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_credentials() {
        let creds = ApiCredentials::new("gateway-key".into(), "gateway-secret".into());
        assert_eq!(creds.api_key(), "gateway-key");
        assert_eq!(creds.expose_secret(), "gateway-secret");
    }

    #[test]
    fn test_required_var_rejects_missing() {
        let err = required_var("GATEWAY_TEST_SURELY_UNSET_VAR").unwrap_err();
        assert!(matches!(err, AuthError::MissingEnvVar(name) if name == "GATEWAY_TEST_SURELY_UNSET_VAR"));
    }

    #[test]
    fn test_debug_never_prints_secret() {
        let creds = ApiCredentials::new("gateway-key".into(), "hmac-secret-value".into());
        let rendered = format!("{creds:?}");

        assert!(rendered.contains("gateway-key"));
        assert!(!rendered.contains("hmac-secret-value"));
    }
}
