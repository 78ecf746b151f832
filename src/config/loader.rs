// Configuration loader
// Loads settings from --config, $OBSIDIAN_SUITE_CONFIG or ~/.obsidian-suite/config.toml

use std::fs;
use std::path::{Path, PathBuf};

use super::constants::CONFIG_PATH_ENV;
use super::settings::Config;
use crate::errors::ConfigError;

/// Default config location: `~/.obsidian-suite/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".obsidian-suite").join("config.toml"))
}

/// Load configuration.
///
/// An explicit path (from `--config` or `$OBSIDIAN_SUITE_CONFIG`) must exist.
/// The default location is optional; built-in defaults apply when it is absent.
/// The result is not validated here because CLI overrides are applied first.
pub fn load_config(explicit: Option<&Path>) -> Result<Config, ConfigError> {
    let env_path = std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from);

    if let Some(path) = explicit.map(Path::to_path_buf).or(env_path) {
        tracing::debug!("Loading configuration from {}", path.display());
        return load_from_path(&path);
    }

    match default_config_path() {
        Some(path) if path.exists() => {
            tracing::debug!("Loading configuration from {}", path.display());
            load_from_path(&path)
        }
        _ => {
            tracing::debug!("No config file found; using built-in defaults");
            Ok(Config::default())
        }
    }
}

/// Parse a TOML config file.
pub fn load_from_path(path: &Path) -> Result<Config, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        what: "configuration file",
        path: path.to_path_buf(),
        source,
    })?;

    parse_config(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse config text. Unknown keys are rejected so typos surface early.
pub fn parse_config(contents: &str) -> Result<Config, toml::de::Error> {
    #[derive(serde::Deserialize)]
    #[serde(deny_unknown_fields)]
    struct Strict {
        #[serde(default)]
        vault_path: Option<PathBuf>,
        #[serde(default)]
        output_dir: Option<PathBuf>,
        #[serde(default)]
        default_model: Option<String>,
        #[serde(default)]
        request_timeout: Option<u64>,
        #[serde(default)]
        exempt_tags: Option<Vec<String>>,
        #[serde(default)]
        content_concurrency: Option<usize>,
        #[serde(default)]
        tools: Option<super::settings::ToolsConfig>,
        #[serde(default)]
        retry: Option<super::settings::RetryConfig>,
    }

    let strict: Strict = toml::from_str(contents)?;
    let defaults = Config::default();

    Ok(Config {
        vault_path: strict.vault_path,
        output_dir: strict.output_dir.unwrap_or(defaults.output_dir),
        default_model: strict.default_model.unwrap_or(defaults.default_model),
        request_timeout: strict.request_timeout.unwrap_or(defaults.request_timeout),
        exempt_tags: strict.exempt_tags.unwrap_or(defaults.exempt_tags),
        content_concurrency: strict
            .content_concurrency
            .unwrap_or(defaults.content_concurrency),
        tools: strict.tools.unwrap_or(defaults.tools),
        retry: strict.retry.unwrap_or(defaults.retry),
    })
}
