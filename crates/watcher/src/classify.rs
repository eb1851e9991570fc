use once_cell::sync::Lazy;
use regex::Regex;

const SCHEMA_MARKERS: &[&str] = &["file:", "version:", "dependencies:"];

static SCHEMA_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)step\d+:|input\s*[:=]").expect("valid schema marker regex")
});

/// True when `content` looks like an instruction document rather than code.
pub fn is_schema_content(content: &str) -> bool {
    SCHEMA_MARKERS.iter().any(|marker| content.contains(marker)) || SCHEMA_PATTERN.is_match(content)
}
