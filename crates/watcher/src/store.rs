use fs2::FileExt;
use log::{debug, warn};
use scribe_protocol::{scribe_dir_for_root, write_atomic, PendingChange, PENDING_SCHEMA_VERSION};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{Result, WatcherError};

pub const PENDING_FILE_NAME: &str = "pending_changes.json";
pub const PENDING_LOCK_NAME: &str = "pending.lock";

/// The queue of file changes awaiting a trigger.
///
/// Shared by the watcher (producer) and the trigger (consumer). Records keep
/// first-seen order; at most one record exists per path.
pub trait PendingChangeStore: Send + Sync {
    fn load(&self) -> Result<Vec<PendingChange>>;

    /// Insert `change`, replacing any record for the same path in place.
    fn upsert(&self, change: PendingChange) -> Result<()>;

    /// Remove every record. Returns how many were removed.
    fn clear_all(&self) -> Result<usize>;

    /// Read and clear the queue in one step. Returned records are marked
    /// `triggered`.
    fn take_all(&self) -> Result<Vec<PendingChange>>;
}

fn upsert_into(changes: &mut Vec<PendingChange>, change: PendingChange) {
    match changes
        .iter_mut()
        .find(|existing| existing.file_path == change.file_path)
    {
        Some(existing) => *existing = change,
        None => changes.push(change),
    }
}

fn mark_triggered(mut changes: Vec<PendingChange>) -> Vec<PendingChange> {
    for change in &mut changes {
        change.triggered = true;
    }
    changes
}

#[derive(Serialize, Deserialize, Debug, Default)]
struct QueueDocument {
    schema_version: u32,
    changes: Vec<PendingChange>,
}

/// Queue persisted as `.scribe/pending_changes.json`.
///
/// Every read-modify-write holds an exclusive advisory lock on
/// `.scribe/pending.lock`, and the document is replaced whole via a temp file
/// and rename.
#[derive(Debug, Clone)]
pub struct JsonPendingStore {
    path: PathBuf,
    lock_path: PathBuf,
}

struct QueueLock {
    file: File,
}

impl Drop for QueueLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

impl JsonPendingStore {
    pub fn for_root(root: &Path) -> Self {
        let dir = scribe_dir_for_root(root);
        Self {
            path: dir.join(PENDING_FILE_NAME),
            lock_path: dir.join(PENDING_LOCK_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> Result<QueueLock> {
        if let Some(parent) = self.lock_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&self.lock_path)
            .map_err(|err| {
                WatcherError::lock(format!("open queue lock {}: {err}", self.lock_path.display()))
            })?;
        file.lock_exclusive().map_err(|err| {
            WatcherError::lock(format!(
                "acquire queue lock {}: {err}",
                self.lock_path.display()
            ))
        })?;
        Ok(QueueLock { file })
    }

    fn read_unlocked(&self) -> Result<Vec<PendingChange>> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        let doc: QueueDocument = match serde_json::from_slice(&bytes) {
            Ok(doc) => doc,
            Err(err) => {
                warn!("Pending queue corrupted {}: {err}", self.path.display());
                return Ok(Vec::new());
            }
        };
        if doc.schema_version != PENDING_SCHEMA_VERSION {
            return Err(WatcherError::UnsupportedSchema(doc.schema_version));
        }
        Ok(doc.changes)
    }

    fn write_unlocked(&self, changes: Vec<PendingChange>) -> Result<()> {
        let doc = QueueDocument {
            schema_version: PENDING_SCHEMA_VERSION,
            changes,
        };
        let bytes = serde_json::to_vec_pretty(&doc)?;
        write_atomic(&self.path, &bytes)?;
        Ok(())
    }
}

impl PendingChangeStore for JsonPendingStore {
    fn load(&self) -> Result<Vec<PendingChange>> {
        let _lock = self.lock()?;
        self.read_unlocked()
    }

    fn upsert(&self, change: PendingChange) -> Result<()> {
        let _lock = self.lock()?;
        let mut changes = self.read_unlocked()?;
        debug!("queueing {} change for {}", change.kind(), change.file_path);
        upsert_into(&mut changes, change);
        self.write_unlocked(changes)
    }

    fn clear_all(&self) -> Result<usize> {
        let _lock = self.lock()?;
        let removed = self.read_unlocked()?.len();
        self.write_unlocked(Vec::new())?;
        Ok(removed)
    }

    fn take_all(&self) -> Result<Vec<PendingChange>> {
        let _lock = self.lock()?;
        let changes = self.read_unlocked()?;
        self.write_unlocked(Vec::new())?;
        Ok(mark_triggered(changes))
    }
}

/// In-process queue for tests and one-shot runs.
#[derive(Debug, Default)]
pub struct MemoryPendingStore {
    changes: Mutex<Vec<PendingChange>>,
}

impl MemoryPendingStore {
    fn guard(&self) -> Result<std::sync::MutexGuard<'_, Vec<PendingChange>>> {
        self.changes
            .lock()
            .map_err(|_| WatcherError::lock("pending queue lock poisoned"))
    }
}

impl PendingChangeStore for MemoryPendingStore {
    fn load(&self) -> Result<Vec<PendingChange>> {
        Ok(self.guard()?.clone())
    }

    fn upsert(&self, change: PendingChange) -> Result<()> {
        upsert_into(&mut *self.guard()?, change);
        Ok(())
    }

    fn clear_all(&self) -> Result<usize> {
        let mut guard = self.guard()?;
        let removed = guard.len();
        guard.clear();
        Ok(removed)
    }

    fn take_all(&self) -> Result<Vec<PendingChange>> {
        Ok(mark_triggered(std::mem::take(&mut *self.guard()?)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn exercise(store: &dyn PendingChangeStore) {
        store.upsert(PendingChange::new("a.txt", 1, true)).unwrap();
        store.upsert(PendingChange::new("b.py", 2, false)).unwrap();
        store.upsert(PendingChange::new("a.txt", 3, false)).unwrap();

        assert_eq!(
            store.load().unwrap(),
            vec![
                PendingChange::new("a.txt", 3, false),
                PendingChange::new("b.py", 2, false),
            ]
        );

        let taken = store.take_all().unwrap();
        assert_eq!(taken.len(), 2);
        assert!(taken.iter().all(|change| change.triggered));
        assert!(store.load().unwrap().is_empty());

        store.upsert(PendingChange::new("c.rs", 4, false)).unwrap();
        assert_eq!(store.clear_all().unwrap(), 1);
        assert!(store.take_all().unwrap().is_empty());
    }

    #[test]
    fn memory_store_semantics() {
        exercise(&MemoryPendingStore::default());
    }

    #[test]
    fn json_store_semantics() {
        let dir = TempDir::new().unwrap();
        exercise(&JsonPendingStore::for_root(dir.path()));
    }

    #[test]
    fn json_store_persists_across_instances() {
        let dir = TempDir::new().unwrap();
        JsonPendingStore::for_root(dir.path())
            .upsert(PendingChange::new("spec.txt", 10, true))
            .unwrap();

        let reopened = JsonPendingStore::for_root(dir.path());
        assert_eq!(
            reopened.load().unwrap(),
            vec![PendingChange::new("spec.txt", 10, true)]
        );
        let raw = std::fs::read_to_string(reopened.path()).unwrap();
        assert!(raw.contains("\"schema_version\": 1"));
    }

    #[test]
    fn unknown_schema_version_is_an_error() {
        let dir = TempDir::new().unwrap();
        let store = JsonPendingStore::for_root(dir.path());
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(store.path(), r#"{"schema_version": 7, "changes": []}"#).unwrap();

        assert!(matches!(
            store.load(),
            Err(WatcherError::UnsupportedSchema(7))
        ));
    }

    #[test]
    fn corrupted_queue_reads_as_empty() {
        let dir = TempDir::new().unwrap();
        let store = JsonPendingStore::for_root(dir.path());
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(store.path(), "not json").unwrap();

        assert!(store.load().unwrap().is_empty());
        store.upsert(PendingChange::new("x.py", 1, false)).unwrap();
        assert_eq!(store.load().unwrap().len(), 1);
    }
}
