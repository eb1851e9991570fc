//! Whole-instruction keyword detection (language and requested action).
//!
//! Same best-effort register as [`crate::intent`]: first matching table row wins.

use scribe_protocol::Language;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestedAction {
    Create,
    Modify,
    Analyze,
}

const LANGUAGE_HINTS: &[(Language, &[&str])] = &[
    (Language::Python, &["python", ".py", "def ", "import "]),
    (Language::TypeScript, &["typescript", ".ts", "interface "]),
    (
        Language::JavaScript,
        &["javascript", ".js", "function ", "const ", "let "],
    ),
    (Language::Rust, &["rust", ".rs", "fn ", "cargo"]),
    (Language::Go, &["golang", ".go", "func "]),
    (Language::Java, &[" java", ".java", "public class"]),
];

const ACTION_HINTS: &[(RequestedAction, &[&str])] = &[
    (
        RequestedAction::Create,
        &["create", "new", "generate", "build", "make"],
    ),
    (
        RequestedAction::Modify,
        &["modify", "update", "change", "edit", "add", "fix"],
    ),
    (
        RequestedAction::Analyze,
        &["analyze", "check", "review", "explain", "test"],
    ),
];

/// Guess the target language of an instruction; `default` when nothing matches.
pub fn detect_language(text: &str, default: Language) -> Language {
    let lowered = text.to_lowercase();
    LANGUAGE_HINTS
        .iter()
        .find(|(_, hints)| hints.iter().any(|hint| lowered.contains(hint)))
        .map_or(default, |(language, _)| *language)
}

/// Guess whether the instruction asks to create, modify or analyze code.
pub fn detect_action(text: &str) -> RequestedAction {
    let lowered = text.to_lowercase();
    ACTION_HINTS
        .iter()
        .find(|(_, hints)| hints.iter().any(|hint| lowered.contains(hint)))
        .map_or(RequestedAction::Create, |(action, _)| *action)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_table_order_wins() {
        assert_eq!(
            detect_language("write a python script", Language::Rust),
            Language::Python
        );
        assert_eq!(
            detect_language("export interface Props", Language::Python),
            Language::TypeScript
        );
        assert_eq!(
            detect_language("nothing to see", Language::Rust),
            Language::Rust
        );
    }

    #[test]
    fn action_defaults_to_create() {
        assert_eq!(detect_action("Fix the login bug"), RequestedAction::Modify);
        assert_eq!(detect_action("please review"), RequestedAction::Analyze);
        assert_eq!(detect_action("hello"), RequestedAction::Create);
    }
}
