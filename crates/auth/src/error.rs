use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    /// A required credential variable is unset or blank.
    #[error("credential variable {0} is not set")]
    MissingEnvVar(String),

    /// The HMAC key could not be constructed from the secret.
    #[error("secret key rejected by HMAC-SHA256")]
    InvalidKeyFormat,
}
