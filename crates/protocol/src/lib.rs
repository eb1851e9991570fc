//! # Scribe Protocol
//!
//! Shared vocabulary for the scribe crates: the records that flow between the
//! watcher, the oracle and the engine, the language suffix table, and the
//! root-scoped [`Workspace`] every file operation goes through.
//!
//! ```text
//! <root>/
//!   .scribe/
//!     config.toml          engine configuration
//!     pending_changes.json queued file changes (watcher -> trigger)
//!     pending.lock         advisory lock for the queue
//!     cache/               oracle response cache
//!     snapshots/           last-known file versions for diffing
//!     backups/             workspace copies taken before destructive writes
//! ```

mod error;
mod language;
pub mod path_filters;
mod records;
mod workspace;

pub use error::{ProtocolError, Result};
pub use language::Language;
pub use records::{unix_ms_now, GeneratedFile, PendingChange, PENDING_SCHEMA_VERSION};
pub use workspace::{write_atomic, Workspace};

use std::path::{Path, PathBuf};

/// Name of the per-project state directory.
pub const SCRIBE_DIR_NAME: &str = ".scribe";

/// Returns `<root>/.scribe`.
pub fn scribe_dir_for_root(root: &Path) -> PathBuf {
    root.join(SCRIBE_DIR_NAME)
}
