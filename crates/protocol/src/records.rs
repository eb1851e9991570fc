use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Version of the persisted pending-change queue document.
pub const PENDING_SCHEMA_VERSION: u32 = 1;

/// One file extracted from an oracle response, ready to be written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedFile {
    /// Workspace-relative path as named by the response
    pub path: String,
    pub content: String,
}

impl GeneratedFile {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

/// A queued file modification awaiting a trigger.
///
/// At most one record exists per `file_path`; a newer event replaces the
/// older record wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingChange {
    /// Workspace-relative path with `/` separators
    pub file_path: String,
    pub timestamp_ms: u64,
    pub is_schema: bool,
    /// Set once a trigger has claimed the record
    #[serde(default)]
    pub triggered: bool,
}

impl PendingChange {
    pub fn new(file_path: impl Into<String>, timestamp_ms: u64, is_schema: bool) -> Self {
        Self {
            file_path: file_path.into(),
            timestamp_ms,
            is_schema,
            triggered: false,
        }
    }

    pub fn kind(&self) -> &'static str {
        if self.is_schema {
            "schema"
        } else {
            "code"
        }
    }
}

pub fn unix_ms_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}
