//! Prompt templates sent to the completion service.

use scribe_diff::ChangeRecord;
use scribe_instruction::InstructionDocument;
use scribe_oracle::FILE_SENTINEL;
use scribe_protocol::Language;

use crate::context::ProjectContext;

fn multi_file_format(example_path: &str) -> String {
    format!(
        "OUTPUT FORMAT:\n\
         For every file, use exactly this block:\n\
         {FILE_SENTINEL}{example_path}\n\
         <complete file content>\n\
         ```\n"
    )
}

/// System context for instruction-driven generation.
pub fn generation_context(context: &ProjectContext) -> String {
    let language = context.language.as_str();
    let framework = context.framework.as_deref().unwrap_or("none");
    format!(
        "You are an expert {language} code generator.\n\
         \n\
         Project:\n\
         - Language: {language}\n\
         - Framework: {framework}\n\
         - Existing files: {files}\n\
         \n\
         Rules:\n\
         1. Produce complete, runnable code with no placeholders.\n\
         2. Put all imports at the top of each file.\n\
         3. Handle errors explicitly.\n\
         4. Follow the conventions of {language}.\n\
         \n\
         {format}\
         For a single file you may return the code directly without fences.",
        files = context.render_files(),
        format = multi_file_format(&format!("path/to/file.{}", context.language.extension())),
    )
}

/// Prompt for a parsed instruction document.
pub fn schema_prompt(doc: &InstructionDocument, target: &str) -> String {
    let mut out = format!(
        "Generate {} code for the file `{target}` from this instruction.\n",
        doc.metadata.language.as_str()
    );
    if let Some(version) = &doc.metadata.version {
        out.push_str(&format!("Version: {version}\n"));
    }
    if !doc.metadata.dependencies.is_empty() {
        out.push_str(&format!(
            "Dependencies: {}\n",
            doc.metadata.dependencies.join(", ")
        ));
    }
    if !doc.steps.is_empty() {
        out.push_str("\nSteps:\n");
        for step in &doc.steps {
            out.push_str(&format!("- {}: {}\n", step.id, step.description));
            for detail in &step.details {
                out.push_str(&format!("  {}\n", detail.trim_end()));
            }
        }
    }
    let free = doc.free_text();
    if !free.trim().is_empty() {
        out.push_str("\nNotes:\n");
        out.push_str(&free);
        out.push('\n');
    }
    out.push('\n');
    out.push_str(&multi_file_format(target));
    out
}

/// Prompt asking for an updated version of `path` after a user edit.
pub fn code_change_prompt(path: &str, record: &ChangeRecord, current: &str) -> String {
    let language = Language::from_path(path);
    let mut out = format!(
        "The file `{path}` ({}) was edited.\n\
         Change summary: {}\n\
         Lines added: {}, lines deleted: {}\n",
        language.as_str(),
        record.summary,
        record.added_lines.len(),
        record.deleted_lines.len(),
    );
    if !record.added_lines.is_empty() {
        out.push_str("\nAdded lines:\n");
        for change in &record.added_lines {
            out.push_str(&format!("{:>5} + {}\n", change.line, change.text));
        }
    }
    if !record.deleted_lines.is_empty() {
        out.push_str("\nDeleted lines:\n");
        for change in &record.deleted_lines {
            out.push_str(&format!("{:>5} - {}\n", change.line, change.text));
        }
    }
    out.push_str(&format!(
        "\nCurrent content:\n{current}\n\n\
         Complete or adjust the code so the edit is consistent with the rest of the file. \
         Return the updated file. If other files must change, return them too.\n\n{}",
        multi_file_format(path)
    ));
    out
}

/// Prompt asking for a JSON analysis of a free-form instruction.
pub fn analysis_prompt(instruction: &str) -> String {
    format!(
        "Analyze this development instruction and return a JSON object.\n\
         \n\
         INSTRUCTION: {instruction}\n\
         \n\
         Return ONLY the JSON object, no markdown and no commentary:\n\
         {{\n  \
           \"intent\": \"create_project|modify_code|add_feature|fix_bug\",\n  \
           \"language\": \"python|javascript|typescript|rust|...\",\n  \
           \"framework\": \"flask|django|react|express|none\",\n  \
           \"files_needed\": [\"file1.py\"],\n  \
           \"dependencies\": [\"package\"],\n  \
           \"actions\": [\"step 1\", \"step 2\"]\n\
         }}"
    )
}

pub fn explain_prompt(path: &str, content: &str) -> String {
    format!(
        "Explain what the {} file `{path}` does: its purpose, its main functions and classes, \
         and anything surprising.\n\n{content}",
        Language::from_path(path).as_str()
    )
}

pub fn fix_prompt(path: &str, content: &str, error_message: &str) -> String {
    format!(
        "Fix this code error.\n\
         \n\
         ERROR MESSAGE:\n{error_message}\n\
         \n\
         CURRENT CODE ({path}):\n{content}\n\
         \n\
         LANGUAGE: {}\n\
         \n\
         Return the COMPLETE fixed file, not just the change. No explanations.",
        Language::from_path(path).as_str()
    )
}

/// Drop one enclosing ```` ``` ```` fence, if the whole reply is wrapped in one.
pub fn strip_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use scribe_instruction::InstructionParser;

    #[test]
    fn strip_fence_variants() {
        assert_eq!(strip_fence("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_fence("```\n{}\n"), "{}");
        assert_eq!(strip_fence("  {\"plain\": true}  "), "{\"plain\": true}");
    }

    #[test]
    fn schema_prompt_lists_steps_and_format() {
        let doc = InstructionParser::default().parse(
            "file: calc.py\ndependencies: math\nstep1: add two numbers\n    input: a, b\n",
        );
        let prompt = schema_prompt(&doc, "calc.py");

        assert!(prompt.contains("python code for the file `calc.py`"));
        assert!(prompt.contains("Dependencies: math"));
        assert!(prompt.contains("- step1: add two numbers\n      input: a, b\n"));
        assert!(prompt.contains("```filename:calc.py"));
    }

    #[test]
    fn code_change_prompt_carries_summary_and_lines() {
        let record = scribe_diff::analyze(Some("x = 1\n"), "x = 1\ndef helper():\n    pass\n");
        let prompt = code_change_prompt("util.py", &record, "x = 1\ndef helper():\n    pass\n");

        assert!(prompt.contains("Added functions: helper"));
        assert!(prompt.contains("    2 + def helper():"));
        assert!(prompt.contains("```filename:util.py"));
    }
}
