//! Path filtering shared by the watcher and the project context builder.

/// Directory names never watched or scanned.
pub const IGNORED_SCOPES: &[&str] = &[
    ".scribe",
    ".git",
    ".hg",
    ".svn",
    "target",
    "node_modules",
    "__pycache__",
    "venv",
    ".venv",
    ".idea",
    ".vscode",
];

/// Extensions watched by default.
pub const DEFAULT_WATCH_EXTENSIONS: &[&str] = &[
    "txt", "md", "ail", "py", "rs", "js", "ts", "java", "go", "c", "cpp", "rb",
];

/// True when any directory component of `rel_path` is an ignored scope.
pub fn is_ignored_scope(rel_path: &str) -> bool {
    let normalized = normalize_filter_path(rel_path);
    let mut parts = normalized.split('/').peekable();
    while let Some(part) = parts.next() {
        // the last component is the file itself
        if parts.peek().is_none() {
            break;
        }
        let lowered = part.to_lowercase();
        if IGNORED_SCOPES.iter().any(|ignored| *ignored == lowered) {
            return true;
        }
    }
    false
}

/// True when the file extension of `rel_path` is in `allow_list`.
///
/// Entries may be written with or without a leading dot; matching is
/// case-insensitive. An empty allow-list admits nothing.
pub fn extension_allowed(rel_path: &str, allow_list: &[String]) -> bool {
    let normalized = normalize_filter_path(rel_path);
    let Some(file_name) = normalized.rsplit('/').next() else {
        return false;
    };
    let Some((stem, ext)) = file_name.rsplit_once('.') else {
        return false;
    };
    if stem.is_empty() {
        return false;
    }
    let ext = ext.to_lowercase();
    allow_list
        .iter()
        .any(|allowed| allowed.trim().trim_start_matches('.').to_lowercase() == ext)
}

pub fn normalize_filter_path(raw: &str) -> String {
    let mut value = raw.trim().replace('\\', "/");
    while let Some(stripped) = value.strip_prefix("./") {
        value = stripped.to_string();
    }
    let value = value.trim_matches('/');
    if value == "." {
        return String::new();
    }
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allow(exts: &[&str]) -> Vec<String> {
        exts.iter().map(|e| (*e).to_string()).collect()
    }

    #[test]
    fn ignored_scopes_match_directory_components_only() {
        assert!(is_ignored_scope(".scribe/pending_changes.json"));
        assert!(is_ignored_scope("web/node_modules/react/index.js"));
        assert!(!is_ignored_scope("src/target.py"));
        assert!(!is_ignored_scope("target"));
    }

    #[test]
    fn extension_allow_list_accepts_dotted_and_bare_entries() {
        let list = allow(&[".py", "RS"]);
        assert!(extension_allowed("src/calc.py", &list));
        assert!(extension_allowed("./lib.rs", &list));
        assert!(!extension_allowed("notes.md", &list));
        assert!(!extension_allowed(".py", &list));
        assert!(!extension_allowed("Makefile", &list));
        assert!(!extension_allowed("calc.py", &[]));
    }

    #[test]
    fn normalize_strips_dot_prefixes_and_slashes() {
        assert_eq!(normalize_filter_path("./././src/"), "src");
        assert_eq!(normalize_filter_path("."), "");
        assert_eq!(normalize_filter_path("a\\b.rs"), "a/b.rs");
    }
}
