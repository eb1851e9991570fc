use anyhow::{bail, Context, Result};
use log::info;
use scribe_editor::CodeEditor;
use scribe_engine::config::config_path;
use scribe_engine::{BackupManager, Engine, ScribeConfig, SnapshotStore, CACHE_DIR_NAME};
use scribe_instruction::detect::{detect_action, detect_language};
use scribe_instruction::{extract_intent, InstructionParser};
use scribe_oracle::ResponseCache;
use scribe_protocol::{scribe_dir_for_root, Workspace};
use scribe_watcher::{ChangeWatcher, JsonPendingStore, PendingChangeStore};
use serde::Serialize;
use serde_json::json;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

/// JSON on stdout.
pub struct Output {
    pretty: bool,
}

impl Output {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    pub fn print<T: Serialize>(&self, value: &T) -> Result<()> {
        let rendered = if self.pretty {
            serde_json::to_string_pretty(value)?
        } else {
            serde_json::to_string(value)?
        };
        println!("{rendered}");
        Ok(())
    }
}

pub fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

pub fn read_stdin() -> Result<String> {
    let mut buf = String::new();
    std::io::stdin()
        .read_to_string(&mut buf)
        .context("Failed to read stdin")?;
    Ok(buf)
}

fn open(root: &Path) -> Result<(Workspace, ScribeConfig)> {
    let workspace = Workspace::open(root)
        .with_context(|| format!("Failed to open workspace {}", root.display()))?;
    let config = ScribeConfig::load_with_env(workspace.root())?;
    Ok((workspace, config))
}

fn engine(root: &Path) -> Result<Engine> {
    Engine::open(root).with_context(|| format!("Failed to start engine for {}", root.display()))
}

pub fn init(root: &Path, force: bool, out: &Output) -> Result<()> {
    let workspace = Workspace::open(root)?;
    let path = config_path(workspace.root());
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    ScribeConfig::default().save(workspace.root())?;
    info!("Wrote {}", path.display());
    out.print(&json!({ "config": path }))
}

pub fn show_config(root: &Path) -> Result<()> {
    let (_, config) = open(root)?;
    print!("{}", config.export_redacted()?);
    Ok(())
}

pub fn parse(root: &Path, rel: &str, out: &Output) -> Result<()> {
    let (workspace, config) = open(root)?;
    let text = workspace.read_to_string(rel)?;
    let doc = InstructionParser::new(config.project.language).parse(&text);
    out.print(&doc)
}

pub fn intent(root: &Path, text: &str, out: &Output) -> Result<()> {
    let (_, config) = open(root)?;
    out.print(&json!({
        "language": detect_language(text, config.project.language),
        "action": detect_action(text),
        "intent": extract_intent(text),
    }))
}

pub fn diff(root: &Path, rel: &str, against: Option<&Path>, out: &Output) -> Result<()> {
    let (workspace, _) = open(root)?;
    let new = workspace.read_to_string(rel)?;
    let old = match against {
        Some(path) => Some(read_file(path)?),
        None => SnapshotStore::for_root(workspace.root()).get(rel)?,
    };
    out.print(&scribe_diff::analyze(old.as_deref(), &new))
}

pub async fn generate(root: &Path, instruction: &str, out: &Output) -> Result<()> {
    if instruction.trim().is_empty() {
        bail!("empty instruction");
    }
    let report = engine(root)?.generate_from_instruction(instruction).await?;
    out.print(&report)
}

pub async fn analyze(root: &Path, instruction: &str, out: &Output) -> Result<()> {
    let analysis = engine(root)?.analyze_instruction(instruction).await?;
    out.print(&analysis)
}

pub async fn watch(root: &Path) -> Result<()> {
    let (workspace, config) = open(root)?;
    let store = Arc::new(JsonPendingStore::for_root(workspace.root()));
    let watcher = Arc::new(ChangeWatcher::new(workspace, store, config.watch_config()));
    let handle = watcher.start()?;
    info!("Press Ctrl-C to stop; run `scribe trigger` to process queued changes");
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    handle.stop();
    info!("Stopped watching");
    Ok(())
}

pub async fn trigger(root: &Path, out: &Output) -> Result<()> {
    let report = engine(root)?.trigger().await?;
    out.print(&report)?;
    let failures = report.failures();
    if failures > 0 {
        bail!("{failures} of {} change(s) failed", report.changes.len());
    }
    Ok(())
}

pub fn pending(root: &Path, clear: bool, out: &Output) -> Result<()> {
    let (workspace, _) = open(root)?;
    let store = JsonPendingStore::for_root(workspace.root());
    if clear {
        let removed = store.clear_all()?;
        return out.print(&json!({ "removed": removed }));
    }
    out.print(&store.load()?)
}

pub fn elements(root: &Path, rel: &str, out: &Output) -> Result<()> {
    let (workspace, _) = open(root)?;
    out.print(&CodeEditor::new(workspace).elements(rel)?)
}

pub fn update(root: &Path, rel: &str, name: &str, body: &str, out: &Output) -> Result<()> {
    let (workspace, _) = open(root)?;
    CodeEditor::new(workspace).update_element(rel, name, body)?;
    out.print(&json!({ "path": rel, "updated": name }))
}

pub fn add_method(root: &Path, rel: &str, type_name: &str, body: &str, out: &Output) -> Result<()> {
    let (workspace, _) = open(root)?;
    CodeEditor::new(workspace).add_method_to_type(rel, type_name, body)?;
    out.print(&json!({ "path": rel, "type": type_name }))
}

pub fn add_import(root: &Path, rel: &str, statement: &str, out: &Output) -> Result<()> {
    let (workspace, _) = open(root)?;
    let outcome = CodeEditor::new(workspace).insert_import_if_absent(rel, statement)?;
    out.print(&json!({ "path": rel, "outcome": outcome }))
}

pub fn rename(root: &Path, rel: &str, old_name: &str, new_name: &str, out: &Output) -> Result<()> {
    let (workspace, _) = open(root)?;
    let report = CodeEditor::new(workspace).rename_identifier(rel, old_name, new_name)?;
    out.print(&json!({ "path": rel, "definitions": report.definitions, "calls": report.calls }))
}

fn cache(workspace: &Workspace, config: &ScribeConfig) -> ResponseCache {
    ResponseCache::new(
        scribe_dir_for_root(workspace.root()).join(CACHE_DIR_NAME),
        config.cache_ttl(),
    )
}

/// Hit and miss counters live only as long as one engine, so a standalone
/// command reports what is on disk.
pub async fn cache_stats(root: &Path, out: &Output) -> Result<()> {
    let (workspace, config) = open(root)?;
    let stats = cache(&workspace, &config).stats().await?;
    out.print(&json!({ "entries": stats.entries, "total_bytes": stats.total_bytes }))
}

pub async fn cache_clear(root: &Path, out: &Output) -> Result<()> {
    let (workspace, config) = open(root)?;
    let removed = cache(&workspace, &config).clear().await?;
    out.print(&json!({ "removed": removed }))
}

fn backups(root: &Path) -> Result<BackupManager> {
    let (workspace, config) = open(root)?;
    Ok(BackupManager::new(workspace.root(), config.backup.keep))
}

pub fn backup_create(root: &Path, label: Option<&str>, out: &Output) -> Result<()> {
    out.print(&backups(root)?.create(label)?)
}

pub fn backup_list(root: &Path, out: &Output) -> Result<()> {
    out.print(&backups(root)?.list()?)
}

pub fn backup_restore(root: &Path, id: &str, out: &Output) -> Result<()> {
    let restored = backups(root)?.restore(id)?;
    out.print(&json!({ "id": id, "restored": restored }))
}

pub async fn explain(root: &Path, rel: &str) -> Result<()> {
    let text = engine(root)?.explain(rel).await?;
    println!("{}", text.trim_end());
    Ok(())
}

pub async fn fix(root: &Path, rel: &str, error: &str, out: &Output) -> Result<()> {
    let outcome = engine(root)?.fix_error(rel, error).await?;
    out.print(&outcome)
}
