// Configuration module
// Public interface for configuration loading

pub mod constants;
mod credentials;
mod loader;
mod settings;

pub use credentials::Credentials;
pub use loader::{default_config_path, load_config, load_from_path, parse_config};
pub use settings::{Config, PromptPaths, ResearcherConfig, RetryConfig, ToolsConfig};
