use std::time::Duration;
use thiserror::Error;

/// Result type for oracle operations
pub type Result<T> = std::result::Result<T, OracleError>;

/// Failures of a completion request or of the response cache.
#[derive(Error, Debug)]
pub enum OracleError {
    /// The service signalled backpressure (HTTP 429)
    #[error("rate limited by completion service")]
    RateLimited,

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Connection failure or server-side (5xx) error
    #[error("transport error: {0}")]
    Transport(String),

    /// The service answered but produced no text
    #[error("empty response from completion service")]
    EmptyResponse,

    /// Client-side rejection (bad key, bad request); retrying will not help
    #[error("request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        last: Box<OracleError>,
    },

    #[error("cache IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl OracleError {
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            message: message.into(),
        }
    }

    /// Whether the orchestrator should back off and try again.
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited | Self::Timeout(_) | Self::Transport(_)
        )
    }
}
