use log::{debug, error, info, warn};
use notify::{Config as NotifyConfig, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use scribe_protocol::path_filters::{extension_allowed, is_ignored_scope};
use scribe_protocol::{unix_ms_now, PendingChange, Workspace};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::classify::is_schema_content;
use crate::debounce::Debouncer;
use crate::error::{Result, WatcherError};
use crate::store::PendingChangeStore;

#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// Extensions admitted, with or without a leading dot
    pub extensions: Vec<String>,
    pub debounce: Duration,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            extensions: scribe_protocol::path_filters::DEFAULT_WATCH_EXTENSIONS
                .iter()
                .map(|ext| (*ext).to_string())
                .collect(),
            debounce: crate::debounce::DEFAULT_DEBOUNCE,
        }
    }
}

/// Turns file-system events into pending-change records.
///
/// The watcher only ever enqueues; it performs no generation or network I/O.
pub struct ChangeWatcher {
    workspace: Workspace,
    store: Arc<dyn PendingChangeStore>,
    config: WatchConfig,
    debouncer: Mutex<Debouncer>,
}

impl ChangeWatcher {
    pub fn new(workspace: Workspace, store: Arc<dyn PendingChangeStore>, config: WatchConfig) -> Self {
        let debouncer = Mutex::new(Debouncer::new(config.debounce));
        Self {
            workspace,
            store,
            config,
            debouncer,
        }
    }

    pub fn store(&self) -> &Arc<dyn PendingChangeStore> {
        &self.store
    }

    /// Handle one modification of `path` observed at `now`.
    ///
    /// Returns the queued record, or `None` when the event was filtered out
    /// (directory, ignored scope, extension, debounce, or outside the root).
    pub fn observe(&self, path: &Path, now: Instant) -> Result<Option<PendingChange>> {
        if path.is_dir() {
            return Ok(None);
        }
        let Some(rel) = self.workspace.relative(path) else {
            debug!("ignoring event outside workspace: {}", path.display());
            return Ok(None);
        };
        if is_ignored_scope(&rel) || !extension_allowed(&rel, &self.config.extensions) {
            return Ok(None);
        }

        let admitted = self
            .debouncer
            .lock()
            .map_err(|_| WatcherError::lock("debounce state lock poisoned"))?
            .admit(&rel, now);
        if !admitted {
            debug!("debounced {rel}");
            return Ok(None);
        }

        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                debug!("skipping unreadable {rel}: {err}");
                return Ok(None);
            }
        };
        let change = PendingChange::new(rel, unix_ms_now(), is_schema_content(&content));
        info!("Detected {} change: {}", change.kind(), change.file_path);
        self.store.upsert(change.clone())?;
        Ok(Some(change))
    }

    /// Start watching the workspace root recursively. Events are handled on a
    /// tokio task until the returned handle is stopped or dropped.
    pub fn start(self: Arc<Self>) -> Result<WatchHandle> {
        let (event_tx, mut event_rx) = mpsc::channel::<notify::Result<Event>>(1024);
        let mut watcher = RecommendedWatcher::new(
            move |res| {
                let _ = event_tx.blocking_send(res);
            },
            NotifyConfig::default(),
        )
        .map_err(|e| WatcherError::Notify(e.to_string()))?;
        watcher
            .watch(self.workspace.root(), RecursiveMode::Recursive)
            .map_err(|e| WatcherError::Notify(e.to_string()))?;
        info!("Watching {}", self.workspace.root().display());

        let this = Arc::clone(&self);
        let task = tokio::spawn(async move {
            while let Some(res) = event_rx.recv().await {
                match res {
                    Ok(event) => {
                        this.handle_event(event).await;
                    }
                    Err(err) => warn!("watch error: {err}"),
                }
            }
            debug!("watch event channel closed");
        });

        Ok(WatchHandle {
            _watcher: watcher,
            task,
        })
    }

    /// Queue the paths of a create/modify event. File reads and store writes
    /// block, so they run on the blocking pool. Returns the queued records.
    pub async fn handle_event(self: &Arc<Self>, event: Event) -> Vec<PendingChange> {
        if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
            return Vec::new();
        }
        let this = Arc::clone(self);
        let now = Instant::now();
        let observed = tokio::task::spawn_blocking(move || {
            let mut queued = Vec::new();
            for path in &event.paths {
                match this.observe(path, now) {
                    Ok(Some(change)) => queued.push(change),
                    Ok(None) => {}
                    Err(err) => error!("Failed to queue {}: {err}", path.display()),
                }
            }
            queued
        })
        .await;
        observed.unwrap_or_else(|err| {
            error!("watch event handler failed: {err}");
            Vec::new()
        })
    }
}

/// Keeps the OS watcher and its event task alive.
pub struct WatchHandle {
    _watcher: RecommendedWatcher,
    task: JoinHandle<()>,
}

impl WatchHandle {
    pub fn stop(self) {
        self.task.abort();
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
