// Configuration structs

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::constants::*;
use crate::errors::{wrap_error_with_suggestion, ConfigError};

/// Research tool settings (`[tools.researcher]`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ResearcherConfig {
    /// Planning model override (falls back to `default_model`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub planning_model: Option<String>,

    /// Content model override (falls back to the Perplexity default)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_model: Option<String>,

    /// Perplexity web search depth: "low", "medium" or "high"
    pub search_context_size: String,

    /// Optional prompt file overrides
    pub prompts: PromptPaths,
}

impl Default for ResearcherConfig {
    fn default() -> Self {
        Self {
            planning_model: None,
            content_model: None,
            search_context_size: "high".to_string(),
            prompts: PromptPaths::default(),
        }
    }
}

/// Paths to prompt files that replace the built-in system prompts
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PromptPaths {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub planning: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<PathBuf>,
}

/// Per-tool sections (`[tools.*]`)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ToolsConfig {
    pub researcher: ResearcherConfig,
}

/// Retry policy for gateway calls (`[retry]`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per call, including the first one
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles each time after that
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 1, // single attempt unless configured otherwise
            base_delay_ms: 1000,
        }
    }
}

/// Application configuration.
///
/// Built once at startup and passed by reference into every stage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Root of the Obsidian vault
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vault_path: Option<PathBuf>,

    /// Where research notes are written; relative paths resolve against `vault_path`
    pub output_dir: PathBuf,

    /// Model used when a tool has no override
    pub default_model: String,

    /// Per-request timeout in seconds
    pub request_timeout: u64,

    /// Tags written verbatim instead of being normalised
    pub exempt_tags: Vec<String>,

    /// Number of content requests in flight at once
    pub content_concurrency: usize,

    pub tools: ToolsConfig,

    pub retry: RetryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            vault_path: None,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            default_model: DEFAULT_PLANNING_MODEL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT_SECS,
            exempt_tags: Vec::new(),
            content_concurrency: 1,
            tools: ToolsConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

impl Config {
    /// Model for the planning stage
    pub fn planning_model(&self) -> &str {
        self.tools
            .researcher
            .planning_model
            .as_deref()
            .unwrap_or(&self.default_model)
    }

    /// Model for the content stage
    pub fn content_model(&self) -> &str {
        self.tools
            .researcher
            .content_model
            .as_deref()
            .unwrap_or(DEFAULT_CONTENT_MODEL)
    }

    /// Directory research notes are written into.
    pub fn resolved_output_dir(&self) -> Result<PathBuf, ConfigError> {
        if self.output_dir.is_absolute() {
            return Ok(self.output_dir.clone());
        }
        match &self.vault_path {
            Some(vault) => Ok(vault.join(&self.output_dir)),
            None => Err(ConfigError::Invalid(wrap_error_with_suggestion(
                format!(
                    "output_dir '{}' is relative but vault_path is not set",
                    self.output_dir.display()
                ),
                "Set vault_path in ~/.obsidian-suite/config.toml,\n\
                 or pass an absolute --output-dir",
            ))),
        }
    }

    /// Validate configuration and return helpful errors
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(vault) = &self.vault_path {
            if !vault.is_dir() {
                return Err(ConfigError::Invalid(wrap_error_with_suggestion(
                    format!("vault_path '{}' is not a directory", vault.display()),
                    "Point vault_path at the root folder of your Obsidian vault",
                )));
            }
        }

        self.resolved_output_dir()?;

        if self.default_model.trim().is_empty() {
            return Err(ConfigError::Invalid("default_model must not be empty".into()));
        }
        for (key, value) in [
            ("planning_model", &self.tools.researcher.planning_model),
            ("content_model", &self.tools.researcher.content_model),
        ] {
            if value.as_deref().is_some_and(|m| m.trim().is_empty()) {
                return Err(ConfigError::Invalid(format!(
                    "tools.researcher.{} must not be empty",
                    key
                )));
            }
        }

        if self.request_timeout == 0 {
            return Err(ConfigError::Invalid(
                "request_timeout must be greater than 0".into(),
            ));
        }
        if self.request_timeout > 3600 {
            return Err(ConfigError::Invalid(wrap_error_with_suggestion(
                format!("request_timeout ({}) is very high", self.request_timeout),
                "Recommended range: 30-600 seconds",
            )));
        }

        if self.content_concurrency == 0 || self.content_concurrency > MAX_CONTENT_CONCURRENCY {
            return Err(ConfigError::Invalid(format!(
                "content_concurrency must be between 1 and {} (got {})",
                MAX_CONTENT_CONCURRENCY, self.content_concurrency
            )));
        }

        if self.retry.max_attempts == 0 || self.retry.max_attempts > 10 {
            return Err(ConfigError::Invalid(format!(
                "retry.max_attempts must be between 1 and 10 (got {})",
                self.retry.max_attempts
            )));
        }

        let valid_sizes = ["low", "medium", "high"];
        if !valid_sizes.contains(&self.tools.researcher.search_context_size.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "Invalid search_context_size '{}'. Valid values: {}",
                self.tools.researcher.search_context_size,
                valid_sizes.join(", ")
            )));
        }

        let prompts = &self.tools.researcher.prompts;
        for path in [&prompts.planning, &prompts.content].into_iter().flatten() {
            check_prompt_file(path)?;
        }

        Ok(())
    }
}

fn check_prompt_file(path: &Path) -> Result<(), ConfigError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!(
            "Prompt file not found: {}",
            path.display()
        )))
    }
}
