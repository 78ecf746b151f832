// Obsidian Suite - LLM-driven research notes for Obsidian vaults
// Library exports

pub mod cli;
pub mod config;
pub mod errors;
pub mod gateway;
pub mod logging;
pub mod prompts;
pub mod providers;
pub mod research;
pub mod vault;

pub use errors::SuiteError;
pub use research::{ResearchRequest, Researcher, RunReport};
