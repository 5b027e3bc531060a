use thiserror::Error;

/// Failure of a single HTTP exchange, before any exchange-specific decoding.
#[derive(Debug, Error)]
pub enum RestError {
    /// Non-2xx response. `message` is the body as received, so callers can
    /// decode the exchange's `{code, msg}` payload from it.
    #[error("status {status}: {message}")]
    HttpError { status: u16, message: String },

    #[error("request timed out")]
    Timeout,

    /// No connection was established, so nothing was sent.
    #[error("could not connect: {0}")]
    Connect(String),

    /// The connection broke after the request may have been written.
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("malformed response body: {0}")]
    Parse(String),

    /// HTTP 429; `retry_after_ms` comes from `Retry-After` when present.
    #[error("throttled for {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("could not build request: {0}")]
    RequestBuild(String),
}

impl RestError {
    /// The request may not have been processed: it never arrived, timed
    /// out, or was throttled.
    pub fn is_transport(&self) -> bool {
        match self {
            RestError::Timeout
            | RestError::Connect(_)
            | RestError::Connection(_)
            | RestError::RateLimited { .. } => true,
            RestError::HttpError { .. } | RestError::Parse(_) | RestError::RequestBuild(_) => {
                false
            }
        }
    }

    /// The exchange certainly did not act on the request: it was never
    /// sent, or it was throttled. A timeout or a broken connection is
    /// ambiguous and does not qualify.
    pub fn is_unprocessed(&self) -> bool {
        matches!(self, RestError::Connect(_) | RestError::RateLimited { .. })
    }
}

impl From<reqwest::Error> for RestError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return RestError::Timeout;
        }
        if err.is_connect() {
            return RestError::Connect(err.to_string());
        }
        if err.is_builder() {
            return RestError::RequestBuild(err.to_string());
        }
        if err.is_decode() {
            return RestError::Parse(err.to_string());
        }
        match err.status() {
            Some(status) => RestError::HttpError {
                status: status.as_u16(),
                message: err.to_string(),
            },
            None => RestError::Connection(err.to_string()),
        }
    }
}
