//! Identifier-level summary of what changed between two versions.
//!
//! Definitions and imports are found with line patterns, not a parser, so
//! the summary is only as good as the source's formatting.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

static FUNCTION_DEF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?m)^\s*(?:export\s+)?(?:default\s+)?(?:pub(?:\([^)]*\))?\s+)?(?:async\s+)?(?:def|fn|function)\s+([A-Za-z_]\w*)",
    )
    .expect("valid function regex")
});

static CLASS_DEF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?m)^\s*(?:export\s+)?(?:pub(?:\([^)]*\))?\s+)?(?:class|struct|enum|trait|interface)\s+([A-Za-z_]\w*)",
    )
    .expect("valid class regex")
});

static IMPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*(?:from\s+([\w.]+)\s+import\b|import\s+([\w.]+)|use\s+([\w:]+))")
        .expect("valid import regex")
});

fn names(pattern: &Regex, text: &str) -> BTreeSet<String> {
    pattern
        .captures_iter(text)
        .filter_map(|caps| {
            caps.iter()
                .skip(1)
                .flatten()
                .next()
                .map(|m| m.as_str().to_string())
        })
        .collect()
}

fn joined<'a>(names: impl Iterator<Item = &'a String>) -> String {
    names.map(String::as_str).collect::<Vec<_>>().join(", ")
}

pub(crate) fn summarize(old: &str, new: &str, total_changes: usize) -> String {
    let (old_fns, new_fns) = (names(&FUNCTION_DEF, old), names(&FUNCTION_DEF, new));
    let (old_classes, new_classes) = (names(&CLASS_DEF, old), names(&CLASS_DEF, new));
    let (old_imports, new_imports) = (names(&IMPORT, old), names(&IMPORT, new));

    let categories = [
        ("Added functions", joined(new_fns.difference(&old_fns))),
        ("Removed functions", joined(old_fns.difference(&new_fns))),
        ("Added classes", joined(new_classes.difference(&old_classes))),
        ("Removed classes", joined(old_classes.difference(&new_classes))),
        ("Added imports", joined(new_imports.difference(&old_imports))),
    ];

    let parts: Vec<String> = categories
        .into_iter()
        .filter(|(_, list)| !list.is_empty())
        .map(|(label, list)| format!("{label}: {list}"))
        .collect();

    if parts.is_empty() {
        format!("Modified {total_changes} lines")
    } else {
        parts.join("; ")
    }
}
