use scribe_protocol::ProtocolError;
use thiserror::Error;

/// Result type for editor operations
pub type Result<T> = std::result::Result<T, EditorError>;

/// Errors that can occur while locating or mutating code elements.
///
/// Every variant leaves the target file untouched.
#[derive(Error, Debug)]
pub enum EditorError {
    /// No function or class with this name was found
    #[error("element not found: {0}")]
    ElementNotFound(String),

    /// Rename matched no definition, nothing was changed
    #[error("no definition of `{0}` to rename")]
    RenameNoOp(String),

    /// No structural grammar for this language
    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("parse error: {0}")]
    ParseError(String),

    #[error("tree-sitter error: {0}")]
    TreeSitterError(String),

    /// The edit cannot be expressed line-exactly
    #[error("invalid edit: {0}")]
    InvalidEdit(String),

    #[error(transparent)]
    Workspace(#[from] ProtocolError),
}

impl EditorError {
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::ElementNotFound(name.into())
    }

    pub fn unsupported_language(lang: impl Into<String>) -> Self {
        Self::UnsupportedLanguage(lang.into())
    }

    pub fn tree_sitter(msg: impl Into<String>) -> Self {
        Self::TreeSitterError(msg.into())
    }

    pub fn invalid_edit(msg: impl Into<String>) -> Self {
        Self::InvalidEdit(msg.into())
    }
}
