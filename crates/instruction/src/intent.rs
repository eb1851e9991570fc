//! Best-effort intent classification for free-form English.
//!
//! This is a keyword heuristic, not a parser: it looks for fixed words and a
//! handful of regexes (`input:`, `variable:`, `name = ...`) and reports what
//! it found. It will misclassify unusual phrasing; callers treat the result
//! as a hint for prompt assembly, never as ground truth.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Input,
    Output,
    Loop,
    Conditional,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Input => "input",
            Action::Output => "output",
            Action::Loop => "loop",
            Action::Conditional => "conditional",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Addition,
    Subtraction,
    Multiplication,
    Division,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Addition => "addition",
            Operation::Subtraction => "subtraction",
            Operation::Multiplication => "multiplication",
            Operation::Division => "division",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Intent {
    pub actions: BTreeSet<Action>,
    pub operations: BTreeSet<Operation>,
    pub defines_function: bool,
    pub defines_class: bool,
    /// Candidate identifier names, in first-seen order, deduplicated
    pub variables: Vec<String>,
}

impl Intent {
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
            && self.operations.is_empty()
            && !self.defines_function
            && !self.defines_class
            && self.variables.is_empty()
    }
}

const ACTION_KEYWORDS: &[(Action, &[&str])] = &[
    (Action::Input, &["input", "read", "enter", "ask", "prompt"]),
    (Action::Output, &["print", "output", "display", "show", "return"]),
    (Action::Loop, &["loop", "repeat", "iterate", "each", "while", "times"]),
    (Action::Conditional, &["if", "else", "otherwise", "when", "unless"]),
];

const OPERATION_KEYWORDS: &[(Operation, &[&str])] = &[
    (Operation::Addition, &["add", "sum", "plus", "total", "increment"]),
    (Operation::Subtraction, &["subtract", "minus", "difference", "decrement"]),
    (Operation::Multiplication, &["multiply", "product", "times"]),
    (Operation::Division, &["divide", "quotient", "ratio", "average"]),
];

const FUNCTION_KEYWORDS: &[&str] = &["function", "method", "procedure", "def", "routine"];
const CLASS_KEYWORDS: &[&str] = &["class", "object", "struct", "type"];

static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z]+").expect("valid word regex"));

static INPUT_LIST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)\binputs?\s*:\s*([A-Za-z_][\w\s,]*)").expect("valid input regex")
});

static VARIABLE_LIST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)\bvariables?\s*:\s*([A-Za-z_][\w\s,]*)").expect("valid variable regex")
});

static ASSIGNMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)\b([A-Za-z_]\w*)\s*=[^=]").expect("valid assignment regex")
});

static IDENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_]\w*$").expect("valid identifier regex"));

/// Classify free-form text by keyword sets. Best effort; see module docs.
pub fn extract_intent(text: &str) -> Intent {
    let words: BTreeSet<String> = WORD
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .collect();
    let has = |kw: &&str| words.contains(*kw);

    let mut intent = Intent::default();
    for (action, keywords) in ACTION_KEYWORDS {
        if keywords.iter().any(has) {
            intent.actions.insert(*action);
        }
    }
    for (operation, keywords) in OPERATION_KEYWORDS {
        if keywords.iter().any(has) {
            intent.operations.insert(*operation);
        }
    }
    intent.defines_function = FUNCTION_KEYWORDS.iter().any(has);
    intent.defines_class = CLASS_KEYWORDS.iter().any(has);

    let mut push = |name: &str| {
        let name = name.trim();
        if IDENT.is_match(name) && !intent.variables.iter().any(|v| v == name) {
            intent.variables.push(name.to_string());
        }
    };
    for caps in INPUT_LIST
        .captures_iter(text)
        .chain(VARIABLE_LIST.captures_iter(text))
    {
        // Stop at the line end so trailing prose is not harvested.
        let list = caps[1].lines().next().unwrap_or_default();
        for name in list.split(',') {
            push(name);
        }
    }
    for caps in ASSIGNMENT.captures_iter(text) {
        push(&caps[1]);
    }

    intent
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_text_has_no_intent() {
        assert!(extract_intent("").is_empty());
        assert!(extract_intent("lorem ipsum").is_empty());
    }

    #[test]
    fn keyword_matching_is_word_based() {
        // "address" contains "add" but is not the word "add"
        let intent = extract_intent("store the address");
        assert!(intent.operations.is_empty());
    }

    #[test]
    fn variables_are_deduplicated_in_order() {
        let intent = extract_intent("input: a, b\nvariable: b, c\nc = a + b");
        assert_eq!(intent.variables, vec!["a", "b", "c"]);
    }

    #[test]
    fn comparison_is_not_assignment() {
        let intent = extract_intent("if x == 3 then stop");
        assert!(intent.variables.is_empty());
        assert!(intent.actions.contains(&Action::Conditional));
    }
}
