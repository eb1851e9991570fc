use log::{debug, error, info, warn};
use scribe_diff::analyze;
use scribe_editor::{parse_elements, supports_structure, top_level, CodeEditor, ElementKind};
use scribe_instruction::detect::{detect_action, detect_language, RequestedAction};
use scribe_instruction::{extract_intent, InstructionParser};
use scribe_oracle::{
    CacheMode, CacheStats, CompletionTransport, GeminiTransport, Oracle, OracleStats,
    RateLimiter, ResponseCache, ResponseExtractor,
};
use scribe_protocol::{scribe_dir_for_root, GeneratedFile, Language, PendingChange, Workspace};
use scribe_watcher::{ChangeWatcher, JsonPendingStore, PendingChangeStore};
use std::path::Path;
use std::sync::Arc;

use crate::backup::BackupManager;
use crate::config::ScribeConfig;
use crate::context::ProjectContext;
use crate::error::Result;
use crate::outcome::{
    AnalysisSource, ChangeOutcome, FileOutcome, GenerationReport, InstructionAnalysis,
    TriggerReport,
};
use crate::prompts;
use crate::snapshot::SnapshotStore;

pub const CACHE_DIR_NAME: &str = "cache";

/// Takes at most one backup per batch, right before the first write.
struct BatchBackup<'a> {
    manager: Option<&'a BackupManager>,
    label: &'static str,
    id: Option<String>,
}

impl<'a> BatchBackup<'a> {
    fn new(manager: Option<&'a BackupManager>, label: &'static str) -> Self {
        Self {
            manager,
            label,
            id: None,
        }
    }

    fn ensure(&mut self) -> Result<()> {
        if self.id.is_some() {
            return Ok(());
        }
        if let Some(manager) = self.manager {
            self.id = Some(manager.create(Some(self.label))?.id);
        }
        Ok(())
    }
}

/// Ties the components together for one workspace.
pub struct Engine {
    workspace: Workspace,
    config: ScribeConfig,
    oracle: Oracle,
    editor: CodeEditor,
    snapshots: SnapshotStore,
    backups: BackupManager,
    store: Arc<dyn PendingChangeStore>,
}

impl Engine {
    pub fn new(
        workspace: Workspace,
        config: ScribeConfig,
        transport: Arc<dyn CompletionTransport>,
        store: Arc<dyn PendingChangeStore>,
    ) -> Self {
        let root = workspace.root().to_path_buf();
        let mut oracle = Oracle::new(transport)
            .with_params(config.generation_params())
            .with_retry_policy(config.retry_policy())
            .with_rate_limiter(RateLimiter::new(config.oracle.requests_per_minute));
        if config.cache.enabled {
            oracle = oracle.with_cache(ResponseCache::new(
                scribe_dir_for_root(&root).join(CACHE_DIR_NAME),
                config.cache_ttl(),
            ));
        }

        Self {
            editor: CodeEditor::new(workspace.clone()),
            snapshots: SnapshotStore::for_root(&root),
            backups: BackupManager::new(&root, config.backup.keep),
            workspace,
            config,
            oracle,
            store,
        }
    }

    /// Engine over `root` with the on-disk config, the live transport and the
    /// persisted pending queue.
    pub fn open(root: &Path) -> Result<Self> {
        let workspace = Workspace::open(root)?;
        let config = ScribeConfig::load_with_env(workspace.root())?;
        let transport = GeminiTransport::new(config.api_key()?, config.oracle.model.clone())
            .with_endpoint(config.oracle.endpoint.clone());
        let store = JsonPendingStore::for_root(workspace.root());
        Ok(Self::new(workspace, config, Arc::new(transport), Arc::new(store)))
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn config(&self) -> &ScribeConfig {
        &self.config
    }

    pub fn editor(&self) -> &CodeEditor {
        &self.editor
    }

    pub fn snapshots(&self) -> &SnapshotStore {
        &self.snapshots
    }

    pub fn backups(&self) -> &BackupManager {
        &self.backups
    }

    pub fn store(&self) -> &Arc<dyn PendingChangeStore> {
        &self.store
    }

    pub fn oracle_stats(&self) -> OracleStats {
        self.oracle.stats()
    }

    /// A watcher feeding this engine's pending queue.
    pub fn watcher(&self) -> ChangeWatcher {
        ChangeWatcher::new(
            self.workspace.clone(),
            Arc::clone(&self.store),
            self.config.watch_config(),
        )
    }

    pub async fn cache_stats(&self) -> Result<Option<CacheStats>> {
        match self.oracle.cache() {
            Some(cache) => Ok(Some(cache.stats().await?)),
            None => Ok(None),
        }
    }

    pub async fn clear_cache(&self) -> Result<u64> {
        match self.oracle.cache() {
            Some(cache) => Ok(cache.clear().await?),
            None => Ok(0),
        }
    }

    fn batch_backup(&self, label: &'static str) -> BatchBackup<'_> {
        BatchBackup::new(self.config.backup.enabled.then_some(&self.backups), label)
    }

    fn project_context(&self, language: Language) -> ProjectContext {
        ProjectContext::collect(&self.workspace, language, self.config.project.framework.clone())
    }

    /// Generate files for a free-form instruction and write them.
    pub async fn generate_from_instruction(&self, instruction: &str) -> Result<GenerationReport> {
        let language = detect_language(instruction, self.config.project.language);
        let system = prompts::generation_context(&self.project_context(language));
        let completion = self
            .oracle
            .request(instruction, &system, CacheMode::Use)
            .await?;

        let files = ResponseExtractor::new(self.config.project.output_path.clone())
            .extract(&completion.text);
        let mut backup = self.batch_backup("generate");
        let files = self.write_generated_with(&files, &mut backup);
        info!(
            "Generated {} file(s){}",
            files.len(),
            if completion.from_cache { " from cache" } else { "" }
        );
        Ok(GenerationReport {
            files,
            from_cache: completion.from_cache,
        })
    }

    /// Write extracted records through the workspace, one outcome per record.
    ///
    /// A rejected path fails only its own record.
    pub fn write_generated(&self, files: &[GeneratedFile]) -> Vec<FileOutcome> {
        let mut backup = self.batch_backup("generate");
        self.write_generated_with(files, &mut backup)
    }

    fn write_generated_with(
        &self,
        files: &[GeneratedFile],
        backup: &mut BatchBackup<'_>,
    ) -> Vec<FileOutcome> {
        files
            .iter()
            .map(|file| match self.write_one(file, backup) {
                Ok(()) => FileOutcome::written(&file.path),
                Err(err) => {
                    warn!("Failed to write {}: {err}", file.path);
                    FileOutcome::failed(&file.path, err)
                }
            })
            .collect()
    }

    fn write_one(&self, file: &GeneratedFile, backup: &mut BatchBackup<'_>) -> Result<()> {
        self.workspace.resolve(&file.path)?;
        if self.workspace.exists(&file.path) {
            backup.ensure()?;
        }
        self.workspace.write(&file.path, &file.content)?;
        self.snapshots.put(&file.path, &file.content)?;
        info!("Wrote {}", file.path);
        Ok(())
    }

    /// Drain the pending queue and process every record, sequentially and in
    /// queue order. A failing record is reported and does not stop the rest.
    pub async fn trigger(&self) -> Result<TriggerReport> {
        let changes = self.store.take_all()?;
        if changes.is_empty() {
            info!("No pending changes");
            return Ok(TriggerReport::default());
        }
        info!("Processing {} pending change(s)", changes.len());

        let mut backup = self.batch_backup("trigger");
        let mut report = TriggerReport::default();
        for change in changes {
            report.changes.push(self.process_change(&change, &mut backup).await);
        }
        report.backup_id = backup.id;

        let failures = report.failures();
        if failures > 0 {
            warn!("{failures} of {} change(s) failed", report.changes.len());
        } else {
            info!("Processed {} change(s)", report.changes.len());
        }
        Ok(report)
    }

    async fn process_change(
        &self,
        change: &PendingChange,
        backup: &mut BatchBackup<'_>,
    ) -> ChangeOutcome {
        let result = if change.is_schema {
            self.process_schema_with(&change.file_path, backup).await
        } else {
            self.process_code_change_with(&change.file_path, backup).await
        };
        match result {
            Ok(files) => ChangeOutcome {
                file_path: change.file_path.clone(),
                kind: change.kind(),
                files,
                error: None,
            },
            Err(err) => {
                error!("Failed to process {}: {err}", change.file_path);
                ChangeOutcome {
                    file_path: change.file_path.clone(),
                    kind: change.kind(),
                    files: Vec::new(),
                    error: Some(err.to_string()),
                }
            }
        }
    }

    /// Instruction document at `rel` -> generated files.
    pub async fn process_schema(&self, rel: &str) -> Result<Vec<FileOutcome>> {
        let mut backup = self.batch_backup("schema");
        self.process_schema_with(rel, &mut backup).await
    }

    async fn process_schema_with(
        &self,
        rel: &str,
        backup: &mut BatchBackup<'_>,
    ) -> Result<Vec<FileOutcome>> {
        let text = self.workspace.read_to_string(rel)?;
        let doc = InstructionParser::new(self.config.project.language).parse(&text);
        for warning in &doc.warnings {
            warn!("{rel}:{}: {}", warning.line, warning.reason);
        }
        let target = doc
            .metadata
            .file
            .clone()
            .unwrap_or_else(|| self.config.project.output_path.clone());
        debug!(
            "schema {rel}: {} step(s), target {target}",
            doc.steps.len()
        );

        let prompt = prompts::schema_prompt(&doc, &target);
        let system = prompts::generation_context(&self.project_context(doc.metadata.language));
        let completion = self.oracle.request(&prompt, &system, CacheMode::Use).await?;
        let files = ResponseExtractor::new(target).extract(&completion.text);
        Ok(self.write_generated_with(&files, backup))
    }

    /// User edit of the code file at `rel` -> follow-up changes.
    ///
    /// Diffs against the last-known version, asks for an updated file, applies
    /// it, and records the result as the new last-known version.
    pub async fn process_code_change(&self, rel: &str) -> Result<Vec<FileOutcome>> {
        let mut backup = self.batch_backup("code-change");
        self.process_code_change_with(rel, &mut backup).await
    }

    async fn process_code_change_with(
        &self,
        rel: &str,
        backup: &mut BatchBackup<'_>,
    ) -> Result<Vec<FileOutcome>> {
        let current = self.workspace.read_to_string(rel)?;
        let previous = self.snapshots.get(rel)?;
        let record = analyze(previous.as_deref(), &current);
        if !record.has_changes() {
            debug!("{rel} matches its snapshot, nothing to do");
            return Ok(Vec::new());
        }
        info!("{rel}: {}", record.summary);

        let prompt = prompts::code_change_prompt(rel, &record, &current);
        let system = prompts::generation_context(&self.project_context(Language::from_path(rel)));
        let completion = self
            .oracle
            .request(&prompt, &system, CacheMode::Bypass)
            .await?;
        let files = ResponseExtractor::new(rel).extract(&completion.text);

        let mut outcomes = Vec::with_capacity(files.len());
        let mut target_seen = false;
        for file in &files {
            if file.path != rel {
                outcomes.extend(self.write_generated_with(std::slice::from_ref(file), backup));
                continue;
            }
            target_seen = true;
            let outcome = match self.apply_to_target(rel, &file.content, backup) {
                Ok(outcome) => outcome,
                Err(err) => {
                    warn!("Failed to apply update to {rel}: {err}");
                    FileOutcome::failed(rel, err)
                }
            };
            outcomes.push(outcome);
        }

        if !target_seen {
            debug!("reply did not touch {rel}");
        }
        let latest = self.workspace.read_to_string(rel)?;
        self.snapshots.put(rel, &latest)?;
        Ok(outcomes)
    }

    /// Replace definitions in place when the reply is made only of top-level
    /// definitions the target already has; overwrite the file otherwise.
    fn apply_to_target(
        &self,
        rel: &str,
        content: &str,
        backup: &mut BatchBackup<'_>,
    ) -> Result<FileOutcome> {
        backup.ensure()?;
        if let Some(updates) = self.in_place_updates(rel, content) {
            let mut names = Vec::with_capacity(updates.len());
            for (kind, name, body) in updates {
                self.editor.update_top_level_element(rel, kind, &name, &body)?;
                names.push(name);
            }
            return Ok(FileOutcome::updated(rel, names));
        }
        self.workspace.write(rel, content)?;
        info!("Rewrote {rel}");
        Ok(FileOutcome::written(rel))
    }

    fn in_place_updates(&self, rel: &str, content: &str) -> Option<Vec<(ElementKind, String, String)>> {
        let language = Language::from_path(rel);
        if !supports_structure(language) {
            return None;
        }
        let returned = parse_elements(content, language).ok()?;
        let top = top_level(&returned);
        if top.is_empty() {
            return None;
        }

        let lines: Vec<&str> = content.split_inclusive('\n').collect();
        let only_definitions = lines.iter().enumerate().all(|(idx, line)| {
            line.trim().is_empty()
                || top
                    .iter()
                    .any(|el| (el.start_line..el.end_line).contains(&idx))
        });
        if !only_definitions {
            return None;
        }

        let current = self.workspace.read_to_string(rel).ok()?;
        let existing = parse_elements(&current, language).ok()?;
        let existing_top = top_level(&existing);
        let all_known = top.iter().all(|el| {
            existing_top
                .iter()
                .any(|known| known.name == el.name && known.kind == el.kind)
        });
        if !all_known {
            return None;
        }

        Some(
            top.iter()
                .map(|el| {
                    let end = el.end_line.min(lines.len());
                    (el.kind, el.name.clone(), lines[el.start_line..end].concat())
                })
                .collect(),
        )
    }

    /// Ask the service for a structured analysis of `instruction`; fall back to
    /// the keyword heuristics when the reply is not the expected JSON.
    pub async fn analyze_instruction(&self, instruction: &str) -> Result<InstructionAnalysis> {
        let completion = self
            .oracle
            .request(&prompts::analysis_prompt(instruction), "", CacheMode::Use)
            .await?;
        match serde_json::from_str::<InstructionAnalysis>(prompts::strip_fence(&completion.text)) {
            Ok(mut analysis) => {
                analysis.source = AnalysisSource::Oracle;
                Ok(analysis)
            }
            Err(err) => {
                warn!("Analysis reply was not valid JSON ({err}), using heuristics");
                Ok(self.heuristic_analysis(instruction))
            }
        }
    }

    pub fn heuristic_analysis(&self, instruction: &str) -> InstructionAnalysis {
        let intent = match detect_action(instruction) {
            RequestedAction::Create => "create_project",
            RequestedAction::Modify => "modify_code",
            RequestedAction::Analyze => "analyze",
        };
        let language = detect_language(instruction, self.config.project.language);
        let classified = extract_intent(instruction);
        let actions = classified
            .actions
            .iter()
            .map(|action| action.as_str().to_string())
            .chain(classified.operations.iter().map(|op| op.as_str().to_string()))
            .collect();

        InstructionAnalysis {
            intent: intent.to_string(),
            language: language.as_str().to_string(),
            framework: self
                .config
                .project
                .framework
                .clone()
                .unwrap_or_else(|| "none".to_string()),
            files_needed: Vec::new(),
            dependencies: Vec::new(),
            actions,
            source: AnalysisSource::Heuristic,
        }
    }

    pub async fn explain(&self, rel: &str) -> Result<String> {
        let content = self.workspace.read_to_string(rel)?;
        let completion = self
            .oracle
            .request(&prompts::explain_prompt(rel, &content), "", CacheMode::Use)
            .await?;
        Ok(completion.text)
    }

    /// Ask for a fixed version of `rel` given an error message and write it.
    /// Nothing is written unless the request succeeds.
    pub async fn fix_error(&self, rel: &str, error_message: &str) -> Result<FileOutcome> {
        let content = self.workspace.read_to_string(rel)?;
        let completion = self
            .oracle
            .request(
                &prompts::fix_prompt(rel, &content, error_message),
                "",
                CacheMode::Bypass,
            )
            .await?;

        let mut fixed = prompts::strip_fence(&completion.text).to_string();
        if content.ends_with('\n') && !fixed.ends_with('\n') {
            fixed.push('\n');
        }
        let mut backup = self.batch_backup("fix");
        backup.ensure()?;
        self.workspace.write(rel, &fixed)?;
        self.snapshots.put(rel, &fixed)?;
        info!("Applied fix to {rel}");
        Ok(FileOutcome::written(rel))
    }
}
