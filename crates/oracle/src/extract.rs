use log::{debug, warn};
use scribe_protocol::GeneratedFile;

/// Opens a named file block in a multi-file reply: ```` ```filename:path ````.
pub const FILE_SENTINEL: &str = "```filename:";

const FENCE: &str = "```";

/// Path used when a reply carries a single unnamed file.
pub const DEFAULT_OUTPUT_PATH: &str = "main.py";

/// Splits a completion reply into file records.
///
/// Extraction never fails. A reply in neither recognized shape becomes one
/// record under the default path holding the whole text.
#[derive(Debug, Clone)]
pub struct ResponseExtractor {
    default_path: String,
}

impl Default for ResponseExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_OUTPUT_PATH)
    }
}

impl ResponseExtractor {
    pub fn new(default_path: impl Into<String>) -> Self {
        Self {
            default_path: default_path.into(),
        }
    }

    pub fn default_path(&self) -> &str {
        &self.default_path
    }

    pub fn extract(&self, response: &str) -> Vec<GeneratedFile> {
        if response.contains(FILE_SENTINEL) {
            let files = extract_named_blocks(response);
            if !files.is_empty() {
                debug!("extracted {} named file(s) from response", files.len());
                return files;
            }
            warn!("file sentinel present but no usable block, falling back to single file");
        }
        vec![GeneratedFile::new(
            self.default_path.clone(),
            strip_enclosing_fence(response),
        )]
    }
}

fn extract_named_blocks(response: &str) -> Vec<GeneratedFile> {
    response
        .split(FILE_SENTINEL)
        // Anything before the first sentinel is preamble.
        .skip(1)
        .filter_map(|segment| {
            let (path_line, rest) = segment.split_once('\n').unwrap_or((segment, ""));
            let path = path_line.trim();
            if path.is_empty() {
                debug!("skipping file block without a path");
                return None;
            }
            // Unterminated blocks run to the end of the reply.
            let body = rest.find(FENCE).map_or(rest, |end| &rest[..end]);
            Some(GeneratedFile::new(path, body))
        })
        .collect()
}

/// Remove one enclosing fence (with its optional language tag).
fn strip_enclosing_fence(response: &str) -> String {
    let trimmed = response.trim();
    if !trimmed.starts_with(FENCE) {
        return response.to_string();
    }

    let mut lines: Vec<&str> = trimmed.lines().skip(1).collect();
    if lines.last().is_some_and(|last| last.trim() == FENCE) {
        lines.pop();
    }
    let mut content = lines.join("\n");
    content.push('\n');
    content
}
