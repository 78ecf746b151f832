// Project-wide constants
//
// Centralised here so endpoints, default models and limits have one
// source of truth. Import via `use crate::config::constants::*;`.

/// OpenAI API root (chat completions live under `/v1/chat/completions`).
pub const OPENAI_BASE_URL: &str = "https://api.openai.com";

/// Perplexity API root (chat completions live under `/chat/completions`).
pub const PERPLEXITY_BASE_URL: &str = "https://api.perplexity.ai";

/// Environment variable holding the OpenAI key.
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Environment variable holding the Perplexity key.
pub const PERPLEXITY_API_KEY_ENV: &str = "PERPLEXITY_API_KEY";

/// Environment variable pointing at an alternate config file.
pub const CONFIG_PATH_ENV: &str = "OBSIDIAN_SUITE_CONFIG";

/// Default planning model (OpenAI).
pub const DEFAULT_PLANNING_MODEL: &str = "o4-mini";

/// Default content model (Perplexity, web-search capable).
pub const DEFAULT_CONTENT_MODEL: &str = "sonar-pro";

/// Default request timeout in seconds. Research plans on reasoning models
/// routinely take over a minute.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 180;

/// Output token ceiling for the planning call.
pub const PLANNING_MAX_TOKENS: u32 = 32_000;

/// Output token ceiling for each content call.
pub const CONTENT_MAX_TOKENS: u32 = 16_000;

/// Default directory for research notes, relative to the vault.
pub const DEFAULT_OUTPUT_DIR: &str = "Research";

/// Upper bound for the content worker pool.
pub const MAX_CONTENT_CONCURRENCY: usize = 16;
