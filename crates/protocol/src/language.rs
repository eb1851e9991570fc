use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Target language of a generated or watched file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Python,
    Rust,
    JavaScript,
    TypeScript,
    Go,
    Java,
    C,
    Cpp,
    Ruby,
    Unknown,
}

impl Language {
    /// Detect language from file extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "py" | "pyw" => Language::Python,
            "rs" => Language::Rust,
            "js" | "mjs" | "cjs" | "jsx" => Language::JavaScript,
            "ts" | "tsx" => Language::TypeScript,
            "go" => Language::Go,
            "java" => Language::Java,
            "c" | "h" => Language::C,
            "cpp" | "cc" | "cxx" | "hpp" | "hh" | "hxx" => Language::Cpp,
            "rb" => Language::Ruby,
            _ => Language::Unknown,
        }
    }

    /// Detect language from file path
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(Self::from_extension)
            .unwrap_or(Language::Unknown)
    }

    /// Parse a language name as written in configuration or by the oracle
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "python" | "py" => Language::Python,
            "rust" | "rs" => Language::Rust,
            "javascript" | "js" | "node" => Language::JavaScript,
            "typescript" | "ts" => Language::TypeScript,
            "go" | "golang" => Language::Go,
            "java" => Language::Java,
            "c" => Language::C,
            "cpp" | "c++" => Language::Cpp,
            "ruby" | "rb" => Language::Ruby,
            _ => Language::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::Rust => "rust",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Go => "go",
            Language::Java => "java",
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::Ruby => "ruby",
            Language::Unknown => "unknown",
        }
    }

    /// Canonical file extension, used for default output paths
    pub fn extension(self) -> &'static str {
        match self {
            Language::Python | Language::Unknown => "py",
            Language::Rust => "rs",
            Language::JavaScript => "js",
            Language::TypeScript => "ts",
            Language::Go => "go",
            Language::Java => "java",
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::Ruby => "rb",
        }
    }

    /// Line comment prefixes
    pub fn comment_prefixes(self) -> &'static [&'static str] {
        match self {
            Language::Rust
            | Language::JavaScript
            | Language::TypeScript
            | Language::Go
            | Language::Java
            | Language::C
            | Language::Cpp => &["//", "/*", "*"],
            Language::Python | Language::Ruby => &["#"],
            Language::Unknown => &["#", "//"],
        }
    }

    /// Import/use statement prefixes
    pub fn import_patterns(self) -> &'static [&'static str] {
        match self {
            Language::Python => &["import ", "from "],
            Language::Rust => &["use ", "extern crate ", "pub use "],
            Language::JavaScript | Language::TypeScript => &["import ", "require("],
            Language::Go | Language::Java => &["import ", "package "],
            Language::C | Language::Cpp => &["#include "],
            Language::Ruby => &["require ", "require_relative "],
            Language::Unknown => &["import ", "from ", "use "],
        }
    }

    /// Keyword introducing a function definition
    pub fn function_keyword(self) -> &'static str {
        match self {
            Language::Python => "def",
            Language::Rust => "fn",
            Language::JavaScript | Language::TypeScript => "function",
            Language::Go => "func",
            Language::Ruby => "def",
            Language::Java | Language::C | Language::Cpp | Language::Unknown => "def",
        }
    }

    /// Whether blocks are closed by a dedicated line (`}`) rather than by dedent
    pub fn uses_braces(self) -> bool {
        !matches!(self, Language::Python | Language::Ruby | Language::Unknown)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
