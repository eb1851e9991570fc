use crate::{ProtocolError, Result};
use std::path::{Component, Path, PathBuf};

/// File system access scoped to a workspace root.
///
/// Every relative path is validated before use: absolute paths, `..`
/// components and symlinks that lead outside the root are rejected.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Open a workspace, creating the root directory when missing.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        std::fs::create_dir_all(root)?;
        let root = root.canonicalize()?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a workspace-relative path to an absolute path inside the root.
    pub fn resolve(&self, rel: &str) -> Result<PathBuf> {
        let rel = rel.trim().replace('\\', "/");
        let candidate = Path::new(&rel);
        let mut has_component = false;
        for component in candidate.components() {
            match component {
                Component::Prefix(_) | Component::RootDir | Component::ParentDir => {
                    return Err(ProtocolError::escapes(rel.clone()));
                }
                Component::CurDir => {}
                Component::Normal(_) => has_component = true,
            }
        }
        if !has_component {
            return Err(ProtocolError::invalid_path(format!("empty path '{rel}'")));
        }

        let joined = self.root.join(candidate);
        // A symlink inside the tree may still point outside of it.
        let probe = nearest_existing(&joined);
        if let Ok(real) = probe.canonicalize() {
            if !real.starts_with(&self.root) {
                return Err(ProtocolError::escapes(rel));
            }
        }
        Ok(joined)
    }

    /// Workspace-relative form of an absolute path, `/`-separated.
    pub fn relative(&self, path: &Path) -> Option<String> {
        if let Ok(rel) = path.strip_prefix(&self.root) {
            return Some(to_slash(rel));
        }
        // Watcher events may arrive with a non-canonical prefix (e.g. /tmp vs /private/tmp).
        let real = path.canonicalize().ok()?;
        real.strip_prefix(&self.root).ok().map(to_slash)
    }

    pub fn exists(&self, rel: &str) -> bool {
        self.resolve(rel).map(|p| p.exists()).unwrap_or(false)
    }

    pub fn read_to_string(&self, rel: &str) -> Result<String> {
        let path = self.resolve(rel)?;
        Ok(std::fs::read_to_string(path)?)
    }

    /// Write a file with whole-document replace semantics.
    pub fn write(&self, rel: &str, contents: &str) -> Result<()> {
        let path = self.resolve(rel)?;
        write_atomic(&path, contents.as_bytes())?;
        log::debug!("wrote {rel} ({} bytes)", contents.len());
        Ok(())
    }

    pub fn delete(&self, rel: &str) -> Result<()> {
        let path = self.resolve(rel)?;
        std::fs::remove_file(path)?;
        Ok(())
    }

    /// List regular files directly inside a workspace directory, sorted.
    pub fn list_dir(&self, rel_dir: &str) -> Result<Vec<String>> {
        let dir = if rel_dir.trim().is_empty() || rel_dir.trim() == "." {
            self.root.clone()
        } else {
            self.resolve(rel_dir)?
        };
        let mut out = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(rel) = self.relative(&entry.path()) {
                out.push(rel);
            }
        }
        out.sort();
        Ok(out)
    }
}

/// Write `bytes` to `path` via a sibling temp file and a rename, so readers
/// never observe a partially written document.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut tmp_name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);
    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, path)
}

fn nearest_existing(path: &Path) -> PathBuf {
    let mut current = path.to_path_buf();
    while !current.exists() {
        match current.parent() {
            Some(parent) => current = parent.to_path_buf(),
            None => break,
        }
    }
    current
}

fn to_slash(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn rejects_parent_and_absolute_paths() {
        let temp = TempDir::new().unwrap();
        let ws = Workspace::open(temp.path()).unwrap();

        assert!(matches!(
            ws.resolve("../outside.txt"),
            Err(ProtocolError::PathEscapesRoot(_))
        ));
        assert!(matches!(
            ws.resolve("src/../../x"),
            Err(ProtocolError::PathEscapesRoot(_))
        ));
        assert!(matches!(
            ws.resolve("/etc/passwd"),
            Err(ProtocolError::PathEscapesRoot(_))
        ));
        assert!(ws.resolve("").is_err());
    }

    #[test]
    fn write_then_read_creates_parents() {
        let temp = TempDir::new().unwrap();
        let ws = Workspace::open(temp.path()).unwrap();

        ws.write("src/app/main.py", "print('hi')\n").unwrap();
        assert_eq!(ws.read_to_string("src/app/main.py").unwrap(), "print('hi')\n");
        assert!(ws.exists("./src/app/main.py"));
        assert!(!temp.path().join("src/app/main.py.tmp").exists());
    }

    #[test]
    fn list_dir_returns_relative_sorted_files() {
        let temp = TempDir::new().unwrap();
        let ws = Workspace::open(temp.path()).unwrap();
        ws.write("b.txt", "b").unwrap();
        ws.write("a.txt", "a").unwrap();
        ws.write("nested/c.txt", "c").unwrap();

        assert_eq!(ws.list_dir(".").unwrap(), vec!["a.txt", "b.txt"]);
        assert_eq!(ws.list_dir("nested").unwrap(), vec!["nested/c.txt"]);
    }

    #[cfg(unix)]
    #[test]
    fn rejects_symlink_escape() {
        let outside = TempDir::new().unwrap();
        let temp = TempDir::new().unwrap();
        std::os::unix::fs::symlink(outside.path(), temp.path().join("link")).unwrap();
        let ws = Workspace::open(temp.path()).unwrap();

        assert!(matches!(
            ws.resolve("link/secret.txt"),
            Err(ProtocolError::PathEscapesRoot(_))
        ));
    }
}
