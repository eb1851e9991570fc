use crate::types::{FreeFormSegment, InstructionDocument, InstructionMetadata, ParseWarning, Step};
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use scribe_protocol::Language;

static STEP_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(step|function|task)\s*(\d*)\s*:\s*(.*)$").expect("valid step regex")
});

static METADATA_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([A-Za-z_][A-Za-z0-9_-]*)\s*:\s*(.*)$").expect("valid metadata regex")
});

const COMMENT_PREFIXES: &[&str] = &["#", "//"];

/// Permissive line-oriented parser for instruction documents.
///
/// Never fails: unusable lines are skipped and reported as
/// [`ParseWarning`]s on the resulting document.
#[derive(Debug, Clone, Copy)]
pub struct InstructionParser {
    default_language: Language,
}

impl Default for InstructionParser {
    fn default() -> Self {
        Self::new(Language::Python)
    }
}

/// Step being accumulated while scanning.
struct OpenStep {
    id: String,
    description: String,
    details: Vec<String>,
}

impl OpenStep {
    fn close(self) -> Step {
        Step {
            id: self.id,
            description: self.description,
            details: self.details,
        }
    }
}

impl InstructionParser {
    pub const fn new(default_language: Language) -> Self {
        Self { default_language }
    }

    pub fn parse(&self, text: &str) -> InstructionDocument {
        let mut metadata = InstructionMetadata::with_language(self.default_language);
        let mut steps = Vec::new();
        let mut free_form = Vec::new();
        let mut warnings = Vec::new();
        let mut current: Option<OpenStep> = None;

        for (idx, raw) in text.lines().enumerate() {
            let line_no = idx + 1;
            let trimmed = raw.trim();
            if trimmed.is_empty() || is_comment(trimmed) {
                continue;
            }

            if let Some(caps) = STEP_MARKER.captures(raw) {
                if let Some(previous) = current.take() {
                    steps.push(previous.close());
                }
                let keyword = caps[1].to_lowercase();
                let id = format!("{keyword}{}", &caps[2]);
                current = Some(OpenStep {
                    id,
                    description: caps[3].trim().to_string(),
                    details: Vec::new(),
                });
                continue;
            }

            if let Some(step) = current.as_mut() {
                step.details.push(raw.to_string());
                continue;
            }

            if let Some(caps) = METADATA_LINE.captures(raw) {
                let key = caps[1].to_lowercase();
                let value = caps[2].trim();
                match apply_metadata(&mut metadata, &key, value) {
                    MetadataOutcome::Stored => continue,
                    MetadataOutcome::Malformed(reason) => {
                        debug!("skipping line {line_no}: {reason}");
                        warnings.push(ParseWarning {
                            line: line_no,
                            reason,
                        });
                        continue;
                    }
                    MetadataOutcome::Unrecognized => {}
                }
            }

            free_form.push(FreeFormSegment {
                text: trimmed.to_string(),
                line: line_no,
            });
        }

        if let Some(last) = current.take() {
            steps.push(last.close());
        }

        if let Some(file) = metadata.file.as_deref() {
            let inferred = Language::from_path(file);
            metadata.language = if inferred == Language::Unknown {
                self.default_language
            } else {
                inferred
            };
        }

        InstructionDocument {
            metadata,
            steps,
            free_form,
            warnings,
        }
    }
}

enum MetadataOutcome {
    Stored,
    Malformed(String),
    Unrecognized,
}

fn apply_metadata(metadata: &mut InstructionMetadata, key: &str, value: &str) -> MetadataOutcome {
    match key {
        "file" => {
            if value.is_empty() {
                return MetadataOutcome::Malformed("file: without a path".to_string());
            }
            metadata.file = Some(value.to_string());
        }
        "version" => {
            if value.is_empty() {
                return MetadataOutcome::Malformed("version: without a value".to_string());
            }
            metadata.version = Some(value.to_string());
        }
        "dependencies" => {
            metadata.dependencies = value
                .split(',')
                .map(str::trim)
                .filter(|dep| !dep.is_empty())
                .map(str::to_string)
                .collect();
        }
        _ => return MetadataOutcome::Unrecognized,
    }
    MetadataOutcome::Stored
}

fn is_comment(trimmed: &str) -> bool {
    COMMENT_PREFIXES
        .iter()
        .any(|prefix| trimmed.starts_with(prefix))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(text: &str) -> InstructionDocument {
        InstructionParser::default().parse(text)
    }

    #[test]
    fn parses_metadata_and_single_step() {
        let doc = parse("file: calc.py\ndependencies: math, os\nstep1: add two numbers\n    input: a, b\n");

        assert_eq!(doc.metadata.file.as_deref(), Some("calc.py"));
        assert_eq!(doc.metadata.dependencies, vec!["math", "os"]);
        assert_eq!(doc.metadata.language, Language::Python);
        assert_eq!(
            doc.steps,
            vec![Step {
                id: "step1".to_string(),
                description: "add two numbers".to_string(),
                details: vec!["    input: a, b".to_string()],
            }]
        );
        assert!(doc.free_form.is_empty());
        assert!(doc.warnings.is_empty());
    }

    #[test]
    fn metadata_inside_open_step_is_detail() {
        let doc = parse("step1: setup\nversion: 2.0\n\nfile: other.rs\n");

        assert_eq!(doc.metadata.version, None);
        assert_eq!(doc.metadata.file, None);
        assert_eq!(doc.steps[0].details, vec!["version: 2.0", "file: other.rs"]);
    }

    #[test]
    fn step_marker_closes_previous_step() {
        let doc = parse("Task1: read input\n  ask the user\nfunction2: compute\n  sum it\nstep: finish\n");

        let ids: Vec<_> = doc.steps.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["task1", "function2", "step"]);
        assert_eq!(doc.steps[0].details, vec!["  ask the user"]);
        assert_eq!(doc.steps[1].details, vec!["  sum it"]);
        assert!(doc.steps[2].details.is_empty());
    }

    #[test]
    fn free_form_keeps_source_line_numbers() {
        let doc = parse("# header comment\nBuild a tiny calculator\n\nnote: keep it simple\nstep1: go\n");

        assert_eq!(
            doc.free_form,
            vec![
                FreeFormSegment {
                    text: "Build a tiny calculator".to_string(),
                    line: 2
                },
                FreeFormSegment {
                    text: "note: keep it simple".to_string(),
                    line: 4
                },
            ]
        );
    }

    #[test]
    fn language_inferred_from_file_suffix() {
        assert_eq!(parse("file: src/lib.rs").metadata.language, Language::Rust);
        assert_eq!(parse("file: app.ts").metadata.language, Language::TypeScript);
        assert_eq!(parse("file: README").metadata.language, Language::Python);
        assert_eq!(parse("just words").metadata.language, Language::Python);

        let rust_default = InstructionParser::new(Language::Rust).parse("just words");
        assert_eq!(rust_default.metadata.language, Language::Rust);
    }

    #[test]
    fn malformed_metadata_is_skipped_with_warning() {
        let doc = parse("file:\nversion: 1.0\n");

        assert_eq!(doc.metadata.file, None);
        assert_eq!(doc.metadata.version.as_deref(), Some("1.0"));
        assert_eq!(doc.warnings.len(), 1);
        assert_eq!(doc.warnings[0].line, 1);
        assert!(doc.free_form.is_empty());
    }

    #[test]
    fn dependencies_drop_empty_entries() {
        let doc = parse("dependencies: requests, , flask ,");
        assert_eq!(doc.metadata.dependencies, vec!["requests", "flask"]);
    }
}
