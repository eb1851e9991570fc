//! Line-exact edits over source text.
//!
//! Lines are kept with their terminators, so every line outside the edited
//! range is copied through byte for byte.

use log::debug;
use regex::{NoExpand, Regex};
use scribe_protocol::Language;
use serde::Serialize;

use crate::elements::{parse_elements, top_level, CodeElement, ElementKind};
use crate::error::{EditorError, Result};

const DEFAULT_INDENT_STEP: &str = "    ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportOutcome {
    /// Inserted at this 0-based line
    Inserted(usize),
    AlreadyPresent,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RenameReport {
    pub definitions: usize,
    /// Call sites `name(`, not counting the definitions themselves
    pub calls: usize,
}

/// Replace the first element named `name` with `new_body`, re-indented to
/// the element's column.
pub fn update_element(source: &str, language: Language, name: &str, new_body: &str) -> Result<String> {
    let elements = parse_elements(source, language)?;
    let element = elements
        .iter()
        .find(|el| el.name == name)
        .ok_or_else(|| EditorError::not_found(name))?;
    Ok(replace_element(source, element, new_body))
}

/// Like [`update_element`], but only a top-level element of `kind` matches,
/// so a method never stands in for a module-level function of the same name.
pub fn update_top_level_element(
    source: &str,
    language: Language,
    kind: ElementKind,
    name: &str,
    new_body: &str,
) -> Result<String> {
    let elements = parse_elements(source, language)?;
    let element = top_level(&elements)
        .into_iter()
        .find(|el| el.kind == kind && el.name == name)
        .ok_or_else(|| EditorError::not_found(name))?;
    Ok(replace_element(source, element, new_body))
}

/// Splice `new_body` over the lines of `element`, which must come from a
/// parse of `source`.
pub fn replace_element(source: &str, element: &CodeElement, new_body: &str) -> String {
    let lines = split_lines(source);
    let indent = leading_whitespace(lines.get(element.start_line).copied().unwrap_or_default());
    let body = reindent(new_body, indent);
    debug!(
        "replacing {} lines {}..{} with {} line(s)",
        element.name,
        element.start_line,
        element.end_line,
        body.len()
    );
    splice(&lines, element.start_line, element.end_line, &body)
}

/// Insert `method_body` into the type named `type_name`, one level deeper
/// than the type and after a blank separator line.
///
/// Brace languages insert before the closing line; Python appends at the end
/// of the class span.
pub fn add_method_to_type(
    source: &str,
    language: Language,
    type_name: &str,
    method_body: &str,
) -> Result<String> {
    let elements = parse_elements(source, language)?;
    let ty = elements
        .iter()
        .find(|el| el.kind == ElementKind::Class && el.name == type_name)
        .ok_or_else(|| EditorError::not_found(type_name))?;

    let lines = split_lines(source);
    let insert_at = if language.uses_braces() {
        if ty.line_count() < 2 {
            return Err(EditorError::invalid_edit(format!(
                "{type_name} is declared on a single line"
            )));
        }
        ty.end_line - 1
    } else {
        ty.end_line.min(lines.len())
    };

    let indent = member_indent(&lines, ty);
    let mut inserted = vec!["\n".to_string()];
    inserted.extend(reindent(method_body, &indent));
    Ok(splice(&lines, insert_at, insert_at, &inserted))
}

/// Add `statement` after the leading import block unless the file already
/// contains it verbatim.
pub fn insert_import_if_absent(
    source: &str,
    language: Language,
    statement: &str,
) -> (String, ImportOutcome) {
    let statement = statement.trim_end();
    if source.contains(statement) {
        return (source.to_string(), ImportOutcome::AlreadyPresent);
    }

    let lines = split_lines(source);
    let mut insert_at = 0;
    for (idx, line) in lines.iter().enumerate() {
        let trimmed = line.trim();
        if language
            .import_patterns()
            .iter()
            .any(|pattern| trimmed.starts_with(pattern))
        {
            insert_at = idx + 1;
        } else if trimmed.is_empty()
            || language
                .comment_prefixes()
                .iter()
                .any(|prefix| trimmed.starts_with(prefix))
        {
            continue;
        } else {
            break;
        }
    }

    let updated = splice(&lines, insert_at, insert_at, &[format!("{statement}\n")]);
    (updated, ImportOutcome::Inserted(insert_at))
}

/// Rename a function definition and its call sites.
///
/// Fails with [`EditorError::RenameNoOp`] when no definition matches; call
/// sites alone are never renamed.
pub fn rename_identifier(
    source: &str,
    language: Language,
    old_name: &str,
    new_name: &str,
) -> Result<(String, RenameReport)> {
    if !is_identifier(new_name) {
        return Err(EditorError::invalid_edit(format!(
            "`{new_name}` is not an identifier"
        )));
    }

    let keyword = regex::escape(language.function_keyword());
    let old = regex::escape(old_name);
    let definition = Regex::new(&format!(r"\b({keyword}\s+){old}\b"))
        .map_err(|e| EditorError::invalid_edit(e.to_string()))?;
    let call = Regex::new(&format!(r"\b{old}\("))
        .map_err(|e| EditorError::invalid_edit(e.to_string()))?;

    let definitions = definition.find_iter(source).count();
    if definitions == 0 {
        return Err(EditorError::RenameNoOp(old_name.to_string()));
    }
    let renamed = definition.replace_all(source, format!("${{1}}{new_name}").as_str());

    let calls = call.find_iter(&renamed).count();
    let renamed = call.replace_all(&renamed, NoExpand(&format!("{new_name}(")));

    Ok((renamed.into_owned(), RenameReport { definitions, calls }))
}

fn split_lines(source: &str) -> Vec<&str> {
    source.split_inclusive('\n').collect()
}

/// `lines[..start] + replacement + lines[end..]`, keeping line terminators
/// consistent at the splice seams.
fn splice(lines: &[&str], start: usize, end: usize, replacement: &[String]) -> String {
    let end = end.min(lines.len());
    let start = start.min(end);
    let mut out = String::new();
    for line in &lines[..start] {
        out.push_str(line);
    }
    if !out.is_empty() && !out.ends_with('\n') && !replacement.is_empty() {
        out.push('\n');
    }
    for line in replacement {
        out.push_str(line);
    }
    let tail = &lines[end..];
    if tail.is_empty() {
        // Keep a missing final newline missing when the replaced range was the end.
        let replaced_last_had_newline = lines[start..end]
            .last()
            .map_or(true, |line| line.ends_with('\n'));
        if !replaced_last_had_newline && out.ends_with('\n') {
            out.pop();
        }
    }
    for line in tail {
        out.push_str(line);
    }
    out
}

/// Strip the common indentation of `body`, then prefix `indent` to every
/// non-blank line. Each returned line ends with `\n`.
fn reindent(body: &str, indent: &str) -> Vec<String> {
    let common = body
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| leading_whitespace(line).len())
        .min()
        .unwrap_or(0);

    body.lines()
        .map(|line| {
            if line.trim().is_empty() {
                "\n".to_string()
            } else {
                format!("{indent}{}\n", &line[common..])
            }
        })
        .collect()
}

/// Indentation used by existing members of `ty`, or one step deeper than `ty`.
fn member_indent(lines: &[&str], ty: &CodeElement) -> String {
    let type_indent = lines
        .get(ty.start_line)
        .map_or("", |line| leading_whitespace(line));
    lines
        .iter()
        .take(ty.end_line)
        .skip(ty.start_line + 1)
        .filter(|line| !line.trim().is_empty())
        .map(|line| leading_whitespace(line))
        .find(|indent| indent.len() > type_indent.len())
        .map_or_else(
            || format!("{type_indent}{DEFAULT_INDENT_STEP}"),
            str::to_string,
        )
}

fn leading_whitespace(line: &str) -> &str {
    let trimmed = line.trim_start_matches([' ', '\t']);
    &line[..line.len() - trimmed.len()]
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
