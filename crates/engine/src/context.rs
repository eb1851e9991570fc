use ignore::WalkBuilder;
use log::{debug, warn};
use scribe_editor::{parse_elements, supports_structure, ElementKind};
use scribe_protocol::path_filters::is_ignored_scope;
use scribe_protocol::{Language, Workspace};
use serde::Serialize;

pub const PREVIEW_CHARS: usize = 1000;
pub const MAX_CONTEXT_FILES: usize = 50;
const MAX_FILE_SIZE_BYTES: u64 = 512 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectFile {
    pub path: String,
    pub lines: usize,
    pub preview: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub functions: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub classes: Vec<String>,
}

/// What the service is told about the project before a generation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectContext {
    pub language: Language,
    pub framework: Option<String>,
    pub files: Vec<ProjectFile>,
}

impl ProjectContext {
    /// Scan `workspace` for files of `language` (gitignore aware, ignored
    /// scopes skipped), in path order, up to [`MAX_CONTEXT_FILES`].
    pub fn collect(workspace: &Workspace, language: Language, framework: Option<String>) -> Self {
        let root = workspace.root().to_path_buf();
        let mut builder = WalkBuilder::new(&root);
        builder
            .hidden(true)
            .git_ignore(true)
            .git_global(false)
            .git_exclude(true)
            .sort_by_file_path(|a, b| a.cmp(b));

        let mut files = Vec::new();
        for result in builder.build() {
            let entry = match result {
                Ok(entry) => entry,
                Err(err) => {
                    warn!("Failed to read entry: {err}");
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }
            let Some(rel) = workspace.relative(entry.path()) else {
                continue;
            };
            if is_ignored_scope(&rel) || Language::from_path(&rel) != language {
                continue;
            }
            if entry
                .metadata()
                .is_ok_and(|meta| meta.len() > MAX_FILE_SIZE_BYTES)
            {
                debug!("skipping large file {rel}");
                continue;
            }
            let Ok(content) = workspace.read_to_string(&rel) else {
                debug!("skipping unreadable {rel}");
                continue;
            };
            files.push(describe(rel, &content, language));
            if files.len() >= MAX_CONTEXT_FILES {
                debug!("context truncated at {MAX_CONTEXT_FILES} files");
                break;
            }
        }

        Self {
            language,
            framework,
            files,
        }
    }

    /// Summary of existing files, as embedded in the generation prompt.
    pub fn render_files(&self) -> String {
        serde_json::to_string_pretty(&self.files).unwrap_or_else(|_| "[]".to_string())
    }
}

fn describe(path: String, content: &str, language: Language) -> ProjectFile {
    let mut functions = Vec::new();
    let mut classes = Vec::new();
    if supports_structure(language) {
        match parse_elements(content, language) {
            Ok(elements) => {
                for element in elements {
                    match element.kind {
                        ElementKind::Function => functions.push(element.name),
                        ElementKind::Class => classes.push(element.name),
                    }
                }
            }
            Err(err) => debug!("no structure for {path}: {err}"),
        }
    }

    ProjectFile {
        lines: content.lines().count(),
        preview: content.chars().take(PREVIEW_CHARS).collect(),
        path,
        functions,
        classes,
    }
}
