use scribe_editor::EditorError;
use scribe_oracle::OracleError;
use scribe_protocol::ProtocolError;
use scribe_watcher::WatcherError;
use thiserror::Error;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// No key in the config file or the environment
    #[error("no API key configured (set {0} or oracle.api_key)")]
    MissingApiKey(String),

    #[error("backup error: {0}")]
    Backup(String),

    #[error(transparent)]
    Workspace(#[from] ProtocolError),

    #[error(transparent)]
    Oracle(#[from] OracleError),

    #[error(transparent)]
    Editor(#[from] EditorError),

    #[error(transparent)]
    Queue(#[from] WatcherError),
}

impl EngineError {
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    pub fn backup(msg: impl Into<String>) -> Self {
        Self::Backup(msg.into())
    }
}

impl From<toml::de::Error> for EngineError {
    fn from(err: toml::de::Error) -> Self {
        Self::InvalidConfig(err.to_string())
    }
}

impl From<toml::ser::Error> for EngineError {
    fn from(err: toml::ser::Error) -> Self {
        Self::InvalidConfig(err.to_string())
    }
}
