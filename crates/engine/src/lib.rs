//! # Scribe Engine
//!
//! Wires the scribe components to a workspace:
//!
//! - [`ScribeConfig`]: `.scribe/config.toml` plus environment overrides
//! - [`Engine`]: instruction generation, trigger processing of the pending
//!   queue, analysis, explain and fix
//! - [`SnapshotStore`]: last-known file versions, the old side of every diff
//! - [`BackupManager`]: workspace copies taken before destructive writes
//! - [`ProjectContext`]: summary of existing files sent with generation prompts
//!
//! ## Trigger flow
//!
//! ```text
//! take_all() -> for each record, in queue order:
//!     schema: parse -> schema prompt -> oracle (cached) -> extract -> write
//!     code:   snapshot diff -> change prompt -> oracle (uncached) -> extract
//!             -> update definitions in place | overwrite -> snapshot
//! ```
//!
//! One record failing never stops the others; every record yields a
//! [`ChangeOutcome`].

mod backup;
pub mod config;
mod context;
mod engine;
mod error;
mod outcome;
pub mod prompts;
mod snapshot;

pub use backup::{BackupInfo, BackupManager, DEFAULT_BACKUP_KEEP};
pub use config::ScribeConfig;
pub use context::{ProjectContext, ProjectFile};
pub use engine::{Engine, CACHE_DIR_NAME};
pub use error::{EngineError, Result};
pub use outcome::{
    AnalysisSource, ChangeOutcome, FileOutcome, FileStatus, GenerationReport,
    InstructionAnalysis, TriggerReport,
};
pub use snapshot::SnapshotStore;
