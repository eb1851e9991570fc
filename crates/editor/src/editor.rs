use log::info;
use scribe_protocol::{Language, Workspace};

use crate::edit::{self, ImportOutcome, RenameReport};
use crate::elements::{parse_elements, CodeElement, ElementKind};
use crate::error::Result;

/// Applies the line-exact edits of [`crate::edit`] to files inside a
/// [`Workspace`]. A failed edit never writes.
#[derive(Debug, Clone)]
pub struct CodeEditor {
    workspace: Workspace,
}

impl CodeEditor {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    fn load(&self, rel: &str) -> Result<(String, Language)> {
        let source = self.workspace.read_to_string(rel)?;
        Ok((source, Language::from_path(rel)))
    }

    pub fn elements(&self, rel: &str) -> Result<Vec<CodeElement>> {
        let (source, language) = self.load(rel)?;
        parse_elements(&source, language)
    }

    pub fn update_element(&self, rel: &str, name: &str, new_body: &str) -> Result<()> {
        let (source, language) = self.load(rel)?;
        let updated = edit::update_element(&source, language, name, new_body)?;
        self.workspace.write(rel, &updated)?;
        info!("Updated {name} in {rel}");
        Ok(())
    }

    /// [`edit::update_top_level_element`] applied to `rel`.
    pub fn update_top_level_element(
        &self,
        rel: &str,
        kind: ElementKind,
        name: &str,
        new_body: &str,
    ) -> Result<()> {
        let (source, language) = self.load(rel)?;
        let updated = edit::update_top_level_element(&source, language, kind, name, new_body)?;
        self.workspace.write(rel, &updated)?;
        info!("Updated top-level {name} in {rel}");
        Ok(())
    }

    pub fn add_method_to_type(&self, rel: &str, type_name: &str, method_body: &str) -> Result<()> {
        let (source, language) = self.load(rel)?;
        let updated = edit::add_method_to_type(&source, language, type_name, method_body)?;
        self.workspace.write(rel, &updated)?;
        info!("Added method to {type_name} in {rel}");
        Ok(())
    }

    pub fn insert_import_if_absent(&self, rel: &str, statement: &str) -> Result<ImportOutcome> {
        let (source, language) = self.load(rel)?;
        let (updated, outcome) = edit::insert_import_if_absent(&source, language, statement);
        if let ImportOutcome::Inserted(line) = outcome {
            self.workspace.write(rel, &updated)?;
            info!("Inserted `{}` into {rel} at line {}", statement.trim(), line + 1);
        }
        Ok(outcome)
    }

    pub fn rename_identifier(&self, rel: &str, old_name: &str, new_name: &str) -> Result<RenameReport> {
        let (source, language) = self.load(rel)?;
        let (updated, report) = edit::rename_identifier(&source, language, old_name, new_name)?;
        self.workspace.write(rel, &updated)?;
        info!(
            "Renamed {old_name} -> {new_name} in {rel} ({} definition(s), {} call(s))",
            report.definitions, report.calls
        );
        Ok(report)
    }
}
