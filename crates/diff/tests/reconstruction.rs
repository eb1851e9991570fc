use pretty_assertions::assert_eq;
use scribe_diff::{analyze, ChangeRecord};

/// Every new-file line number must be claimed exactly once, by a span or an addition.
fn assert_reconstructs(record: &ChangeRecord, new: &str) {
    let new_lines: Vec<&str> = new.lines().collect();
    let mut claimed = vec![0usize; new_lines.len()];

    for span in &record.unchanged_spans {
        for line in span.start..=span.end {
            claimed[line - 1] += 1;
        }
    }
    for added in &record.added_lines {
        claimed[added.line - 1] += 1;
        assert_eq!(added.text, new_lines[added.line - 1]);
    }

    assert!(
        claimed.iter().all(|&count| count == 1),
        "line coverage {claimed:?} for {record:#?}"
    );
    assert_eq!(
        record.total_changes,
        record.added_lines.len() + record.deleted_lines.len()
    );
}

const SAMPLES: &[(&str, &str)] = &[
    ("", ""),
    ("", "one\ntwo\n"),
    ("one\ntwo\n", ""),
    ("a\nb\nc\nd\n", "a\nc\nd\ne\n"),
    ("a\nb\nc\n", "x\ny\nz\n"),
    (
        "def f():\n    return 1\n\ndef g():\n    return 2\n",
        "def f():\n    return 10\n\ndef h():\n    pass\n\ndef g():\n    return 2\n",
    ),
    ("same\nsame\nsame\n", "same\nother\nsame\nsame\nsame\n"),
    ("no trailing newline", "no trailing newline\nbut now two"),
];

#[test]
fn spans_and_additions_reconstruct_new_file() {
    for (old, new) in SAMPLES {
        assert_reconstructs(&analyze(Some(old), new), new);
        assert_reconstructs(&analyze(None, new), new);
    }
}

#[test]
fn unchanged_text_is_single_full_span() {
    let text = "fn a() {}\n\nfn b() {}\n";
    let record = analyze(Some(text), text);

    assert_eq!(record.unchanged_spans.len(), 1);
    assert_eq!(record.unchanged_spans[0].len(), 3);
    assert!(!record.has_changes());
}

#[test]
fn deleted_lines_keep_their_text() {
    let record = analyze(Some("keep\ndrop me\nkeep too\n"), "keep\nkeep too\n");

    assert_eq!(record.deleted_lines.len(), 1);
    assert_eq!(record.deleted_lines[0].text, "drop me");
    assert_eq!(record.deleted_lines[0].line, 2);
    assert_eq!(record.summary, "Modified 1 lines");
}

#[test]
fn summary_names_new_function() {
    let old = "def f():\n    return 1\n";
    let new = "def f():\n    return 1\n\ndef g():\n    return 2\n";
    assert_eq!(analyze(Some(old), new).summary, "Added functions: g");
}
