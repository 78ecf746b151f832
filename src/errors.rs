// Error taxonomy
//
// Typed errors for each component seam. The binary wraps these in anyhow at
// the edge; library code returns them directly so callers can decide between
// abort (planning, config) and skip-and-continue (content, file writes).

use std::path::PathBuf;
use thiserror::Error;

/// Failures surfaced by the LLM gateway and the providers beneath it.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Missing credential, or the backend rejected it (401/403)
    #[error("{backend}: authentication failed: {reason}")]
    AuthFailure { backend: String, reason: String },

    /// Network error, timeout, or a non-success HTTP status
    #[error("{backend}: transport failure: {reason}")]
    TransportFailure { backend: String, reason: String },

    /// Structured output was requested but the reply did not decode
    #[error("{backend}: malformed response: {reason}")]
    MalformedResponse { backend: String, reason: String },
}

impl GatewayError {
    pub fn auth(backend: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::AuthFailure {
            backend: backend.into(),
            reason: reason.into(),
        }
    }

    pub fn transport(backend: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::TransportFailure {
            backend: backend.into(),
            reason: reason.into(),
        }
    }

    pub fn malformed(backend: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedResponse {
            backend: backend.into(),
            reason: reason.into(),
        }
    }

    /// Only transport failures are worth another attempt; auth and decode
    /// failures will fail the same way again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransportFailure { .. })
    }

    /// Short label used in logs and the run log
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AuthFailure { .. } => "auth_failure",
            Self::TransportFailure { .. } => "transport_failure",
            Self::MalformedResponse { .. } => "malformed_response",
        }
    }
}

/// The planning stage could not produce an outline. Always fatal for the run.
#[derive(Debug, Error)]
pub enum PlanningFailure {
    #[error("planning request failed: {0}")]
    Gateway(#[from] GatewayError),

    #[error("invalid research plan: {0}")]
    InvalidPlan(String),
}

/// Missing or invalid settings. Raised before any API call is made.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {what} at {path}: {source}")]
    Read {
        what: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("{0}")]
    Invalid(String),
}

/// File store failures
#[derive(Debug, Error)]
pub enum VaultError {
    #[error("failed to write {path}: {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid frontmatter in {path}: {reason}")]
    Frontmatter { path: PathBuf, reason: String },
}

/// Top-level error for a research run
#[derive(Debug, Error)]
pub enum SuiteError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Planning(#[from] PlanningFailure),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Vault(#[from] VaultError),

    #[error("no notes were written ({failed} node(s) failed)")]
    NothingWritten { failed: usize },
}

/// Append a "how to fix" hint to an error message.
pub fn wrap_error_with_suggestion(message: impl Into<String>, suggestion: &str) -> String {
    format!("{}\n\n{}", message.into(), suggestion)
}

/// Error text for a credential that is absent from the environment.
pub fn missing_api_key_error(backend: &str, env_var: &str) -> String {
    wrap_error_with_suggestion(
        format!("No API key configured for {}", backend),
        &format!(
            "Set it in the environment before running:\n  export {}=\"...\"\n\n\
             API keys are never read from the config file.",
            env_var
        ),
    )
}
