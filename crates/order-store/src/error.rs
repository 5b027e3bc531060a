use thiserror::Error;

/// Storage failures. Surfaced distinctly from exchange failures because the
/// exchange side effect has usually already happened.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("upsert not possible: {0}")]
    InvalidUpsert(String),
}
