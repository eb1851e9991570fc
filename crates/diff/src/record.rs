use log::debug;
use serde::Serialize;
use similar::{ChangeTag, TextDiff};

use crate::summary::summarize;

/// One entry of a tagged line stream.
///
/// `Hint` carries sub-line emphasis markers (ndiff `? ` lines). They hold no
/// file content and never move the line counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOp<'a> {
    Unchanged(&'a str),
    Inserted(&'a str),
    Deleted(&'a str),
    Hint,
}

impl<'a> LineOp<'a> {
    /// Decode one line of ndiff-style output (`"  "`, `"+ "`, `"- "`, `"? "` prefixes).
    ///
    /// Lines without a recognized prefix are treated as hints.
    pub fn from_ndiff_line(line: &'a str) -> Self {
        let body = |prefix_len: usize| line.get(prefix_len..).unwrap_or_default();
        match line.as_bytes() {
            [b' ', b' ', ..] => Self::Unchanged(body(2)),
            [b'+', b' ', ..] => Self::Inserted(body(2)),
            [b'-', b' ', ..] => Self::Deleted(body(2)),
            _ => Self::Hint,
        }
    }
}

/// Whether the record was computed against a stored previous version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Baseline {
    Snapshot,
    /// No previous version was stored; every line counts as added
    FirstVersionMissing,
}

/// A line number (1-based, new-file numbering) with its text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineChange {
    pub line: usize,
    pub text: String,
}

/// Inclusive `[start, end]` range of unchanged lines in the new file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn len(&self) -> usize {
        self.end + 1 - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeRecord {
    pub added_lines: Vec<LineChange>,
    /// Positioned at the new-file line where the deletion took effect
    pub deleted_lines: Vec<LineChange>,
    pub unchanged_spans: Vec<Span>,
    pub summary: String,
    pub total_changes: usize,
    pub baseline: Baseline,
}

impl ChangeRecord {
    pub fn has_changes(&self) -> bool {
        self.total_changes > 0
    }
}

/// Diff two versions of a file. `old = None` means no previous version exists.
pub fn analyze(old: Option<&str>, new: &str) -> ChangeRecord {
    let Some(old) = old else {
        debug!("no previous version stored, treating all lines as added");
        let ops = new.lines().map(LineOp::Inserted);
        let mut record = from_ops(ops, "", new);
        record.baseline = Baseline::FirstVersionMissing;
        return record;
    };

    let old_lines: Vec<&str> = old.lines().collect();
    let new_lines: Vec<&str> = new.lines().collect();
    let diff = TextDiff::from_slices(&old_lines, &new_lines);
    let ops = diff.iter_all_changes().map(|change| {
        let text = change.value();
        match change.tag() {
            ChangeTag::Equal => LineOp::Unchanged(text),
            ChangeTag::Insert => LineOp::Inserted(text),
            ChangeTag::Delete => LineOp::Deleted(text),
        }
    });
    from_ops(ops, old, new)
}

/// Build a record from an already tagged line stream.
///
/// `old` and `new` are only used for the semantic summary.
pub fn from_ops<'a>(ops: impl IntoIterator<Item = LineOp<'a>>, old: &str, new: &str) -> ChangeRecord {
    let mut builder = SpanBuilder::default();
    for op in ops {
        builder.push(op);
    }
    let (added_lines, deleted_lines, unchanged_spans) = builder.finish();
    let total_changes = added_lines.len() + deleted_lines.len();

    ChangeRecord {
        summary: summarize(old, new, total_changes),
        added_lines,
        deleted_lines,
        unchanged_spans,
        total_changes,
        baseline: Baseline::Snapshot,
    }
}

struct SpanBuilder {
    /// Next line number in the new file
    counter: usize,
    open_span: Option<usize>,
    added: Vec<LineChange>,
    deleted: Vec<LineChange>,
    spans: Vec<Span>,
}

impl Default for SpanBuilder {
    fn default() -> Self {
        Self {
            counter: 1,
            open_span: None,
            added: Vec::new(),
            deleted: Vec::new(),
            spans: Vec::new(),
        }
    }
}

impl SpanBuilder {
    fn push(&mut self, op: LineOp<'_>) {
        match op {
            LineOp::Unchanged(_) => {
                self.open_span.get_or_insert(self.counter);
                self.counter += 1;
            }
            LineOp::Inserted(text) => {
                self.close_span();
                self.added.push(LineChange {
                    line: self.counter,
                    text: text.to_string(),
                });
                self.counter += 1;
            }
            LineOp::Deleted(text) => {
                self.close_span();
                self.deleted.push(LineChange {
                    line: self.counter,
                    text: text.to_string(),
                });
            }
            LineOp::Hint => {}
        }
    }

    fn close_span(&mut self) {
        if let Some(start) = self.open_span.take() {
            self.spans.push(Span {
                start,
                end: self.counter - 1,
            });
        }
    }

    fn finish(mut self) -> (Vec<LineChange>, Vec<LineChange>, Vec<Span>) {
        self.close_span();
        (self.added, self.deleted, self.spans)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn identical_input_is_one_span() {
        let text = "a\nb\nc\n";
        let record = analyze(Some(text), text);

        assert_eq!(record.unchanged_spans, vec![Span { start: 1, end: 3 }]);
        assert!(record.added_lines.is_empty());
        assert!(record.deleted_lines.is_empty());
        assert_eq!(record.summary, "Modified 0 lines");
    }

    #[test]
    fn replacement_splits_spans() {
        let record = analyze(Some("a\nb\nc\n"), "a\nB\nc\n");

        assert_eq!(
            record.unchanged_spans,
            vec![Span { start: 1, end: 1 }, Span { start: 3, end: 3 }]
        );
        assert_eq!(
            record.added_lines,
            vec![LineChange {
                line: 2,
                text: "B".to_string()
            }]
        );
        assert_eq!(
            record.deleted_lines,
            vec![LineChange {
                line: 2,
                text: "b".to_string()
            }]
        );
        assert_eq!(record.total_changes, 2);
    }

    #[test]
    fn missing_previous_version_adds_everything() {
        let record = analyze(None, "x\ny\n");

        assert_eq!(record.baseline, Baseline::FirstVersionMissing);
        assert_eq!(record.added_lines.len(), 2);
        assert!(record.unchanged_spans.is_empty());
        assert_eq!(record.added_lines[1].line, 2);
    }

    #[test]
    fn hints_do_not_move_counters() {
        let stream = "  keep\n- old line\n? ^^^\n+ new line\n?     ^\n  tail";
        let ops = stream.lines().map(LineOp::from_ndiff_line);
        let record = from_ops(ops, "", "");

        assert_eq!(
            record.unchanged_spans,
            vec![Span { start: 1, end: 1 }, Span { start: 3, end: 3 }]
        );
        assert_eq!(record.added_lines[0].line, 2);
        assert_eq!(record.deleted_lines[0].line, 2);
        assert_eq!(record.total_changes, 2);
    }

    #[test]
    fn ndiff_prefix_decoding() {
        assert_eq!(LineOp::from_ndiff_line("  x"), LineOp::Unchanged("x"));
        assert_eq!(LineOp::from_ndiff_line("+ "), LineOp::Inserted(""));
        assert_eq!(LineOp::from_ndiff_line("- y"), LineOp::Deleted("y"));
        assert_eq!(LineOp::from_ndiff_line("? ^"), LineOp::Hint);
        assert_eq!(LineOp::from_ndiff_line(""), LineOp::Hint);
    }
}
