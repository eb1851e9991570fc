use log::{debug, info, warn};
use scribe_protocol::path_filters::IGNORED_SCOPES;
use scribe_protocol::{scribe_dir_for_root, unix_ms_now};
use serde::Serialize;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{EngineError, Result};

pub const BACKUP_DIR_NAME: &str = "backups";
pub const DEFAULT_BACKUP_KEEP: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupInfo {
    /// Directory name under `.scribe/backups`: `<unix ms>[_label]`
    pub id: String,
    pub created_ms: u64,
    pub size_bytes: u64,
    pub files: usize,
}

/// Whole-workspace copies taken before destructive writes.
#[derive(Debug, Clone)]
pub struct BackupManager {
    root: PathBuf,
    dir: PathBuf,
    keep: usize,
}

impl BackupManager {
    pub fn new(root: &Path, keep: usize) -> Self {
        Self {
            root: root.to_path_buf(),
            dir: scribe_dir_for_root(root).join(BACKUP_DIR_NAME),
            keep: keep.max(1),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Copy the workspace into a new backup, then prune to the newest `keep`.
    /// Ignored scopes (`.scribe`, VCS, build and dependency directories) and
    /// compiled Python files are skipped.
    pub fn create(&self, label: Option<&str>) -> Result<BackupInfo> {
        std::fs::create_dir_all(&self.dir)?;
        let (id, target) = self.allocate_id(label)?;

        let mut files = 0usize;
        let mut size_bytes = 0u64;
        let walker = WalkDir::new(&self.root)
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_ignored_dir(entry));
        for entry in walker {
            let entry = entry.map_err(|err| EngineError::backup(err.to_string()))?;
            if !entry.file_type().is_file() || is_compiled(entry.path()) {
                continue;
            }
            let rel = entry
                .path()
                .strip_prefix(&self.root)
                .map_err(|err| EngineError::backup(err.to_string()))?;
            let dest = target.join(rel);
            if let Some(parent) = dest.parent() {
                std::fs::create_dir_all(parent)?;
            }
            size_bytes += std::fs::copy(entry.path(), &dest)?;
            files += 1;
        }

        let created_ms = parse_created(&id).unwrap_or_else(unix_ms_now);
        info!("Created backup {id} ({files} files, {size_bytes} bytes)");
        self.prune()?;
        Ok(BackupInfo {
            id,
            created_ms,
            size_bytes,
            files,
        })
    }

    /// Newest first.
    pub fn list(&self) -> Result<Vec<BackupInfo>> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut backups = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let id = entry.file_name().to_string_lossy().into_owned();
            let Some(created_ms) = parse_created(&id) else {
                debug!("skipping foreign directory in backups: {id}");
                continue;
            };
            let (files, size_bytes) = measure(&entry.path());
            backups.push(BackupInfo {
                id,
                created_ms,
                size_bytes,
                files,
            });
        }
        backups.sort_by(|a, b| b.created_ms.cmp(&a.created_ms).then_with(|| b.id.cmp(&a.id)));
        Ok(backups)
    }

    /// Write every file of backup `id` back into the workspace. Files created
    /// after the backup are left in place.
    pub fn restore(&self, id: &str) -> Result<usize> {
        if id.is_empty() || id.contains(['/', '\\']) || id.starts_with('.') {
            return Err(EngineError::backup(format!("invalid backup id: {id}")));
        }
        let source = self.dir.join(id);
        if !source.is_dir() {
            return Err(EngineError::backup(format!("no backup named {id}")));
        }

        let mut restored = 0usize;
        for entry in WalkDir::new(&source) {
            let entry = entry.map_err(|err| EngineError::backup(err.to_string()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let rel = entry
                .path()
                .strip_prefix(&source)
                .map_err(|err| EngineError::backup(err.to_string()))?;
            let dest = self.root.join(rel);
            if let Some(parent) = dest.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(entry.path(), &dest)?;
            restored += 1;
        }
        info!("Restored {restored} files from backup {id}");
        Ok(restored)
    }

    /// Delete all but the newest `keep` backups. Returns how many were removed.
    pub fn prune(&self) -> Result<usize> {
        let backups = self.list()?;
        let mut removed = 0usize;
        for stale in backups.iter().skip(self.keep) {
            match std::fs::remove_dir_all(self.dir.join(&stale.id)) {
                Ok(()) => removed += 1,
                Err(err) => warn!("Failed to prune backup {}: {err}", stale.id),
            }
        }
        if removed > 0 {
            debug!("pruned {removed} backup(s)");
        }
        Ok(removed)
    }

    fn allocate_id(&self, label: Option<&str>) -> Result<(String, PathBuf)> {
        let suffix = label
            .map(sanitize_label)
            .filter(|label| !label.is_empty())
            .map(|label| format!("_{label}"))
            .unwrap_or_default();
        let mut ms = unix_ms_now();
        loop {
            let id = format!("{ms}{suffix}");
            let path = self.dir.join(&id);
            match std::fs::create_dir(&path) {
                Ok(()) => return Ok((id, path)),
                Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => ms += 1,
                Err(err) => return Err(err.into()),
            }
        }
    }
}

fn is_ignored_dir(entry: &walkdir::DirEntry) -> bool {
    if !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy().to_lowercase();
    IGNORED_SCOPES.contains(&name.as_str())
}

fn is_compiled(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext == "pyc" || ext == "pyo")
}

fn sanitize_label(label: &str) -> String {
    label
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect::<String>()
        .trim_matches('_')
        .to_string()
}

fn parse_created(id: &str) -> Option<u64> {
    id.split('_').next()?.parse().ok()
}

fn measure(dir: &Path) -> (usize, u64) {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .fold((0, 0), |(files, bytes), entry| {
            let len = entry.metadata().map(|meta| meta.len()).unwrap_or(0);
            (files + 1, bytes + len)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn create_excludes_state_dir_and_restore_overwrites() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "main.py", "print(1)\n");
        write(dir.path(), "pkg/util.py", "x = 1\n");
        write(dir.path(), ".scribe/pending_changes.json", "{}");

        let manager = BackupManager::new(dir.path(), 10);
        let info = manager.create(Some("before trigger")).unwrap();
        assert!(info.id.ends_with("_before_trigger"));
        assert_eq!(info.files, 2);
        assert!(!manager.dir().join(&info.id).join(".scribe").exists());

        write(dir.path(), "main.py", "broken(\n");
        write(dir.path(), "new.py", "fresh\n");
        assert_eq!(manager.restore(&info.id).unwrap(), 2);

        assert_eq!(
            std::fs::read_to_string(dir.path().join("main.py")).unwrap(),
            "print(1)\n"
        );
        assert!(dir.path().join("new.py").exists());
    }

    #[test]
    fn create_skips_vcs_build_and_dependency_dirs() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "main.py", "print(1)\n");
        write(dir.path(), "src/lib.rs", "pub fn f() {}\n");
        write(dir.path(), ".git/objects/pack", "pack");
        write(dir.path(), "target/debug/big.rlib", "rlib");
        write(dir.path(), "web/node_modules/left-pad/index.js", "x");
        write(dir.path(), "venv/bin/python", "");
        write(dir.path(), "pkg/__pycache__/util.cpython-312.pyc", "");
        write(dir.path(), "pkg/stale.pyc", "");

        let manager = BackupManager::new(dir.path(), 10);
        let info = manager.create(None).unwrap();
        let copy = manager.dir().join(&info.id);

        assert_eq!(info.files, 2);
        assert!(copy.join("main.py").exists());
        assert!(copy.join("src/lib.rs").exists());
        for skipped in [".git", "target", "web/node_modules", "venv", "pkg"] {
            assert!(!copy.join(skipped).exists(), "{skipped} was copied");
        }
    }

    #[test]
    fn prune_keeps_newest() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.txt", "a");
        let manager = BackupManager::new(dir.path(), 2);

        let first = manager.create(None).unwrap();
        let second = manager.create(None).unwrap();
        let third = manager.create(None).unwrap();

        let ids: Vec<String> = manager.list().unwrap().into_iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![third.id, second.id]);
        assert!(!manager.dir().join(first.id).exists());
    }

    #[test]
    fn restore_rejects_unknown_and_traversal_ids() {
        let dir = TempDir::new().unwrap();
        let manager = BackupManager::new(dir.path(), 3);
        assert!(matches!(manager.restore("123"), Err(EngineError::Backup(_))));
        assert!(matches!(manager.restore("../x"), Err(EngineError::Backup(_))));
        assert!(manager.list().unwrap().is_empty());
    }
}
