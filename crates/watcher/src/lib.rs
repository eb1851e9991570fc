//! # Scribe Watcher
//!
//! Debounced change detection feeding the pending-change queue.
//!
//! ```text
//! notify event -> ignore dirs / ignored scopes / extensions -> debounce (per path)
//!              -> classify schema|code -> PendingChangeStore::upsert
//! ```
//!
//! The queue is consumed in one step by [`PendingChangeStore::take_all`].

mod classify;
mod debounce;
mod error;
mod store;
mod watcher;

pub use classify::is_schema_content;
pub use debounce::{Debouncer, DEFAULT_DEBOUNCE};
pub use error::{Result, WatcherError};
pub use store::{
    JsonPendingStore, MemoryPendingStore, PendingChangeStore, PENDING_FILE_NAME, PENDING_LOCK_NAME,
};
pub use watcher::{ChangeWatcher, WatchConfig, WatchHandle};
