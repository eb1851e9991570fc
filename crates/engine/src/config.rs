//! `.scribe/config.toml`.
//!
//! Every field has a default, so a missing or partial file loads. A few
//! settings can be overridden from the environment:
//!
//! | Variable | Overrides |
//! |---|---|
//! | `SCRIBE_API_KEY` | `oracle.api_key` (falls back to the variable named by `oracle.api_key_env`) |
//! | `SCRIBE_MODEL` | `oracle.model` |
//! | `SCRIBE_RATE_LIMIT` | `oracle.requests_per_minute` |

use log::{debug, warn};
use scribe_oracle::{GenerationParams, RetryPolicy, DEFAULT_ENDPOINT, DEFAULT_MODEL, DEFAULT_OUTPUT_PATH};
use scribe_protocol::path_filters::DEFAULT_WATCH_EXTENSIONS;
use scribe_protocol::{scribe_dir_for_root, write_atomic, Language};
use scribe_watcher::WatchConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{EngineError, Result};

pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const ENV_API_KEY: &str = "SCRIBE_API_KEY";
pub const ENV_MODEL: &str = "SCRIBE_MODEL";
pub const ENV_RATE_LIMIT: &str = "SCRIBE_RATE_LIMIT";
const REDACTED: &str = "<redacted>";

pub fn config_path(root: &Path) -> PathBuf {
    scribe_dir_for_root(root).join(CONFIG_FILE_NAME)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScribeConfig {
    pub oracle: OracleSection,
    pub generation: GenerationSection,
    pub cache: CacheSection,
    pub watch: WatchSection,
    pub project: ProjectSection,
    pub backup: BackupSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleSection {
    pub model: String,
    pub endpoint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Environment variable consulted when no key is configured
    pub api_key_env: String,
    pub timeout_secs: u64,
    /// Total attempts per request
    pub max_retries: u32,
    /// 0 disables rate limiting
    pub requests_per_minute: usize,
}

impl Default for OracleSection {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: None,
            api_key_env: "GEMINI_API_KEY".to_string(),
            timeout_secs: 60,
            max_retries: 3,
            requests_per_minute: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSection {
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub top_p: f32,
    pub top_k: u32,
}

impl Default for GenerationSection {
    fn default() -> Self {
        let params = GenerationParams::default();
        Self {
            temperature: params.temperature,
            max_output_tokens: params.max_output_tokens,
            top_p: params.top_p,
            top_k: params.top_k,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSection {
    pub enabled: bool,
    pub ttl_days: u64,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_days: 7,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchSection {
    pub extensions: Vec<String>,
    pub debounce_ms: u64,
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            extensions: DEFAULT_WATCH_EXTENSIONS
                .iter()
                .map(|ext| (*ext).to_string())
                .collect(),
            debounce_ms: 2000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectSection {
    pub language: Language,
    /// Target for single-file replies that name no path
    pub output_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub framework: Option<String>,
}

impl Default for ProjectSection {
    fn default() -> Self {
        Self {
            language: Language::Python,
            output_path: DEFAULT_OUTPUT_PATH.to_string(),
            framework: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupSection {
    pub enabled: bool,
    pub keep: usize,
}

impl Default for BackupSection {
    fn default() -> Self {
        Self {
            enabled: true,
            keep: crate::backup::DEFAULT_BACKUP_KEEP,
        }
    }
}

impl ScribeConfig {
    /// Read `<root>/.scribe/config.toml`; defaults when the file is absent.
    pub fn load(root: &Path) -> Result<Self> {
        let path = config_path(root);
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!("no config at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(err) => return Err(err.into()),
        };
        let config: Self = toml::from_str(&raw)
            .map_err(|err| EngineError::invalid_config(format!("{}: {err}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// [`ScribeConfig::load`] followed by environment overrides.
    pub fn load_with_env(root: &Path) -> Result<Self> {
        let mut config = Self::load(root)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(key) = non_empty(ENV_API_KEY) {
            self.oracle.api_key = Some(key);
        } else if self.oracle.api_key.is_none() {
            self.oracle.api_key = non_empty(&self.oracle.api_key_env);
        }
        if let Some(model) = non_empty(ENV_MODEL) {
            self.oracle.model = model;
        }
        if let Some(raw) = non_empty(ENV_RATE_LIMIT) {
            match raw.parse::<usize>() {
                Ok(limit) => self.oracle.requests_per_minute = limit,
                Err(_) => warn!("ignoring {ENV_RATE_LIMIT}={raw}: not a number"),
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.generation.temperature) {
            return Err(EngineError::invalid_config(
                "generation.temperature must be within 0.0..=2.0",
            ));
        }
        if !(0.0..=1.0).contains(&self.generation.top_p) {
            return Err(EngineError::invalid_config(
                "generation.top_p must be within 0.0..=1.0",
            ));
        }
        if self.oracle.timeout_secs == 0 {
            return Err(EngineError::invalid_config("oracle.timeout_secs must be positive"));
        }
        if self.project.output_path.trim().is_empty() {
            return Err(EngineError::invalid_config("project.output_path is empty"));
        }
        Ok(())
    }

    /// Write the config, including any configured API key.
    pub fn save(&self, root: &Path) -> Result<()> {
        let raw = toml::to_string_pretty(self)?;
        write_atomic(&config_path(root), raw.as_bytes())?;
        Ok(())
    }

    /// TOML for display or sharing; the API key is never included.
    pub fn export_redacted(&self) -> Result<String> {
        let mut redacted = self.clone();
        if redacted.oracle.api_key.is_some() {
            redacted.oracle.api_key = Some(REDACTED.to_string());
        }
        Ok(toml::to_string_pretty(&redacted)?)
    }

    pub fn api_key(&self) -> Result<&str> {
        self.oracle
            .api_key
            .as_deref()
            .ok_or_else(|| EngineError::MissingApiKey(ENV_API_KEY.to_string()))
    }

    pub fn generation_params(&self) -> GenerationParams {
        GenerationParams {
            temperature: self.generation.temperature,
            max_output_tokens: self.generation.max_output_tokens,
            top_p: self.generation.top_p,
            top_k: self.generation.top_k,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.oracle.max_retries,
            timeout: Duration::from_secs(self.oracle.timeout_secs),
            ..RetryPolicy::default()
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_days.saturating_mul(24 * 60 * 60))
    }

    pub fn watch_config(&self) -> WatchConfig {
        WatchConfig {
            extensions: self.watch.extensions.clone(),
            debounce: Duration::from_millis(self.watch.debounce_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = TempDir::new().unwrap();
        let config = ScribeConfig::load(dir.path()).unwrap();
        assert_eq!(config, ScribeConfig::default());
        assert_eq!(config.cache_ttl(), Duration::from_secs(7 * 24 * 60 * 60));
        assert_eq!(config.generation_params(), GenerationParams::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        let path = config_path(dir.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(
            &path,
            "[oracle]\nmax_retries = 5\n\n[project]\nlanguage = \"rust\"\noutput_path = \"src/main.rs\"\n",
        )
        .unwrap();

        let config = ScribeConfig::load(dir.path()).unwrap();
        assert_eq!(config.oracle.max_retries, 5);
        assert_eq!(config.oracle.timeout_secs, 60);
        assert_eq!(config.project.language, Language::Rust);
        assert_eq!(config.project.output_path, "src/main.rs");
        assert_eq!(config.watch.debounce_ms, 2000);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let dir = TempDir::new().unwrap();
        let path = config_path(dir.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "[generation]\ntemperature = 7.5\n").unwrap();

        assert!(matches!(
            ScribeConfig::load(dir.path()),
            Err(EngineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn env_overrides_take_precedence() {
        let mut config = ScribeConfig::default();
        config.oracle.api_key = Some("from-file".to_string());
        config.apply_env_overrides(env(&[
            (ENV_API_KEY, "from-env"),
            (ENV_MODEL, "gemini-pro"),
            (ENV_RATE_LIMIT, "15"),
        ]));

        assert_eq!(config.api_key().unwrap(), "from-env");
        assert_eq!(config.oracle.model, "gemini-pro");
        assert_eq!(config.oracle.requests_per_minute, 15);
    }

    #[test]
    fn api_key_falls_back_to_named_env_var() {
        let mut config = ScribeConfig::default();
        config.apply_env_overrides(env(&[("GEMINI_API_KEY", "g-key"), (ENV_RATE_LIMIT, "lots")]));
        assert_eq!(config.api_key().unwrap(), "g-key");
        assert_eq!(config.oracle.requests_per_minute, 60);

        let mut bare = ScribeConfig::default();
        bare.apply_env_overrides(env(&[]));
        assert!(matches!(bare.api_key(), Err(EngineError::MissingApiKey(_))));
    }

    #[test]
    fn export_redacts_key_and_save_round_trips() {
        let dir = TempDir::new().unwrap();
        let mut config = ScribeConfig::default();
        config.oracle.api_key = Some("secret".to_string());

        let exported = config.export_redacted().unwrap();
        assert!(!exported.contains("secret"));
        assert!(exported.contains(REDACTED));

        config.save(dir.path()).unwrap();
        assert_eq!(ScribeConfig::load(dir.path()).unwrap(), config);
    }
}
