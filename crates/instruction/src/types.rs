use scribe_protocol::Language;
use serde::Serialize;

/// Parsed instruction document. Rebuilt on every read, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstructionDocument {
    pub metadata: InstructionMetadata,
    pub steps: Vec<Step>,
    pub free_form: Vec<FreeFormSegment>,
    /// Lines that looked like metadata but could not be used
    pub warnings: Vec<ParseWarning>,
}

impl InstructionDocument {
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty() && self.free_form.is_empty() && self.metadata.file.is_none()
    }

    /// All free-form text joined with newlines.
    pub fn free_text(&self) -> String {
        self.free_form
            .iter()
            .map(|segment| segment.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstructionMetadata {
    pub file: Option<String>,
    pub version: Option<String>,
    pub dependencies: Vec<String>,
    /// Inferred from the suffix of `file`, or the parser's default
    pub language: Language,
}

impl InstructionMetadata {
    pub(crate) fn with_language(language: Language) -> Self {
        Self {
            file: None,
            version: None,
            dependencies: Vec::new(),
            language,
        }
    }
}

/// A labeled block of detail lines opened by a `stepN:`/`taskN:`/`functionN:` marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Step {
    pub id: String,
    pub description: String,
    /// Raw lines, indentation preserved
    pub details: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FreeFormSegment {
    pub text: String,
    /// 1-based source line
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseWarning {
    pub line: usize,
    pub reason: String,
}
