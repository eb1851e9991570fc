use serde::{Deserialize, Serialize};

/// What happened to one file during a generation or trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileStatus {
    /// Whole-file write
    Written,
    /// Existing definitions replaced in place
    Updated { elements: Vec<String> },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileOutcome {
    pub path: String,
    #[serde(flatten)]
    pub status: FileStatus,
}

impl FileOutcome {
    pub fn written(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            status: FileStatus::Written,
        }
    }

    pub fn updated(path: impl Into<String>, elements: Vec<String>) -> Self {
        Self {
            path: path.into(),
            status: FileStatus::Updated { elements },
        }
    }

    pub fn failed(path: impl Into<String>, error: impl ToString) -> Self {
        Self {
            path: path.into(),
            status: FileStatus::Failed {
                error: error.to_string(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        !matches!(self.status, FileStatus::Failed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationReport {
    pub files: Vec<FileOutcome>,
    pub from_cache: bool,
}

/// Result of processing one queued change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeOutcome {
    pub file_path: String,
    pub kind: &'static str,
    pub files: Vec<FileOutcome>,
    /// Set when the record failed before any file was written
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ChangeOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.files.iter().all(FileOutcome::is_success)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TriggerReport {
    /// In queue order
    pub changes: Vec<ChangeOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_id: Option<String>,
}

impl TriggerReport {
    pub fn failures(&self) -> usize {
        self.changes.iter().filter(|c| !c.is_success()).count()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisSource {
    #[default]
    Oracle,
    Heuristic,
}

/// Structured reading of a free-form instruction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstructionAnalysis {
    pub intent: String,
    pub language: String,
    pub framework: String,
    pub files_needed: Vec<String>,
    pub dependencies: Vec<String>,
    pub actions: Vec<String>,
    pub source: AnalysisSource,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_serializes_flat() {
        let json = serde_json::to_value(FileOutcome::updated("a.py", vec!["f".into()])).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"path": "a.py", "status": "updated", "elements": ["f"]})
        );
        let failed = FileOutcome::failed("../x", "escapes root");
        assert!(!failed.is_success());
    }
}
