//! # Scribe Diff
//!
//! Line-level change records between two versions of a file, with a short
//! identifier-level summary used when prompting for follow-up edits.
//!
//! ```
//! use scribe_diff::{analyze, Span};
//!
//! let record = analyze(Some("a\nb\n"), "a\nb\nc\n");
//! assert_eq!(record.unchanged_spans, vec![Span { start: 1, end: 2 }]);
//! assert_eq!(record.added_lines[0].line, 3);
//! ```

mod record;
mod summary;

pub use record::{analyze, from_ops, Baseline, ChangeRecord, LineChange, LineOp, Span};
