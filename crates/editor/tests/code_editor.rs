use pretty_assertions::assert_eq;
use scribe_editor::{CodeEditor, EditorError, ElementKind, ImportOutcome, RenameReport};
use scribe_protocol::Workspace;
use tempfile::TempDir;

const APP: &str = "import os\n\n\ndef login(user):\n    return user\n\n\ndef logout(user):\n    # keep this comment\n    return None\n\n\nclass Session:\n    def start(self):\n        return login(self)\n";

fn editor_with(rel: &str, contents: &str) -> (TempDir, CodeEditor) {
    let dir = TempDir::new().unwrap();
    let workspace = Workspace::open(dir.path()).unwrap();
    workspace.write(rel, contents).unwrap();
    (dir, CodeEditor::new(workspace))
}

fn read(editor: &CodeEditor, rel: &str) -> String {
    editor.workspace().read_to_string(rel).unwrap()
}

#[test]
fn update_changes_only_target_range() {
    let (_dir, editor) = editor_with("app.py", APP);
    let before: Vec<String> = APP.lines().map(str::to_string).collect();

    editor
        .update_element("app.py", "login", "def login(user):\n    check(user)\n    return user")
        .unwrap();

    let after = read(&editor, "app.py");
    let after_lines: Vec<&str> = after.lines().collect();
    assert_eq!(after_lines.len(), before.len() + 1);
    assert_eq!(&after_lines[..3], &before[..3]);
    assert_eq!(after_lines[4], "    check(user)");
    // Everything after the function shifted by one line, unchanged.
    assert_eq!(&after_lines[6..], &before[5..]);
    assert!(after.contains("def logout(user):\n    # keep this comment\n    return None\n"));
}

#[test]
fn elements_are_rederived_after_mutation() {
    let (_dir, editor) = editor_with("app.py", APP);
    let logout_before = editor
        .elements("app.py")
        .unwrap()
        .into_iter()
        .find(|el| el.name == "logout")
        .unwrap();

    editor
        .update_element("app.py", "login", "def login(user):\n    a = 1\n    b = 2\n    return user")
        .unwrap();

    let logout_after = editor
        .elements("app.py")
        .unwrap()
        .into_iter()
        .find(|el| el.name == "logout")
        .unwrap();
    assert_eq!(logout_after.start_line, logout_before.start_line + 2);
    assert_eq!(logout_after.kind, ElementKind::Function);
}

#[test]
fn add_method_then_import_twice() {
    let (_dir, editor) = editor_with("app.py", APP);

    editor
        .add_method_to_type("app.py", "Session", "def stop(self):\n    return logout(self)")
        .unwrap();
    assert!(read(&editor, "app.py").ends_with(
        "        return login(self)\n\n    def stop(self):\n        return logout(self)\n"
    ));

    assert_eq!(
        editor.insert_import_if_absent("app.py", "import json").unwrap(),
        ImportOutcome::Inserted(1)
    );
    assert_eq!(
        editor.insert_import_if_absent("app.py", "import json").unwrap(),
        ImportOutcome::AlreadyPresent
    );
    assert_eq!(read(&editor, "app.py").matches("import json").count(), 1);
}

#[test]
fn rename_reports_counts() {
    let (_dir, editor) = editor_with("app.py", APP);

    let report = editor.rename_identifier("app.py", "login", "sign_in").unwrap();
    assert_eq!(report, RenameReport { definitions: 1, calls: 1 });
    let after = read(&editor, "app.py");
    assert!(after.contains("def sign_in(user):"));
    assert!(after.contains("return sign_in(self)"));
}

#[test]
fn failed_edits_leave_file_untouched() {
    let (_dir, editor) = editor_with("app.py", APP);

    assert!(matches!(
        editor.update_element("app.py", "missing", "def missing(): pass"),
        Err(EditorError::ElementNotFound(_))
    ));
    assert!(matches!(
        editor.rename_identifier("app.py", "check", "verify"),
        Err(EditorError::RenameNoOp(_))
    ));
    assert_eq!(read(&editor, "app.py"), APP);
}

#[test]
fn paths_outside_workspace_are_rejected() {
    let (_dir, editor) = editor_with("app.py", APP);
    assert!(matches!(
        editor.elements("../app.py"),
        Err(EditorError::Workspace(_))
    ));
}
