//! # Scribe Editor
//!
//! Scoped, line-exact code mutation. Files are parsed with tree-sitter into
//! [`CodeElement`] spans (functions and classes); edits splice whole lines so
//! that everything outside the targeted span survives byte for byte.
//!
//! The pure functions in [`edit`] work on strings; [`CodeEditor`] applies them
//! to files inside a [`scribe_protocol::Workspace`].

pub mod edit;
mod editor;
mod elements;
mod error;

pub use edit::{ImportOutcome, RenameReport};
pub use editor::CodeEditor;
pub use elements::{parse_elements, supports_structure, top_level, CodeElement, ElementKind, ElementParser};
pub use error::{EditorError, Result};
