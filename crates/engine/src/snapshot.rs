use log::debug;
use scribe_protocol::{scribe_dir_for_root, write_atomic};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

use crate::error::Result;

pub const SNAPSHOT_DIR_NAME: &str = "snapshots";

/// Last-known version of each workspace file, used as the "old" side when
/// diffing a code change.
///
/// One file per path under `.scribe/snapshots/`, named by the SHA-256 of the
/// workspace-relative path.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn for_root(root: &Path) -> Self {
        Self {
            dir: scribe_dir_for_root(root).join(SNAPSHOT_DIR_NAME),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, rel: &str) -> PathBuf {
        let digest = Sha256::digest(rel.as_bytes());
        let name: String = digest.iter().map(|b| format!("{b:02x}")).collect();
        self.dir.join(format!("{name}.snap"))
    }

    /// `None` when the path has never been recorded.
    pub fn get(&self, rel: &str) -> Result<Option<String>> {
        match std::fs::read_to_string(self.entry_path(rel)) {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!("no snapshot for {rel}");
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }

    pub fn put(&self, rel: &str, content: &str) -> Result<()> {
        write_atomic(&self.entry_path(rel), content.as_bytes())?;
        debug!("snapshot updated for {rel}");
        Ok(())
    }

    pub fn remove(&self, rel: &str) -> Result<bool> {
        match std::fs::remove_file(self.entry_path(rel)) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }
}
