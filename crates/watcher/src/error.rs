use scribe_protocol::ProtocolError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, WatcherError>;

#[derive(Error, Debug)]
pub enum WatcherError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("pending queue has unsupported schema version {0}")]
    UnsupportedSchema(u32),

    #[error("watcher init failed: {0}")]
    Notify(String),

    #[error("{0}")]
    Lock(String),

    #[error(transparent)]
    Workspace(#[from] ProtocolError),
}

impl WatcherError {
    pub fn lock(msg: impl Into<String>) -> Self {
        Self::Lock(msg.into())
    }
}
