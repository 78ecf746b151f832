// Prompt builder
//
// System prompts ship as markdown templates compiled into the binary and can be
// replaced per tool through [tools.researcher.prompts] in the config file.
// Templates use `{{name}}` placeholders.

use std::path::Path;

use crate::config::PromptPaths;
use crate::errors::ConfigError;

/// Built-in planning system prompt. Expects `{{user_prompt}}`.
pub const DEFAULT_PLANNING_PROMPT: &str = include_str!("planning.md");

/// Built-in content system prompt
pub const DEFAULT_CONTENT_PROMPT: &str = include_str!("content.md");

/// An extra document handed to the planner alongside the query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextDocument {
    pub name: String,
    pub text: String,
}

/// Resolved system prompt templates for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptLibrary {
    planning: String,
    content: String,
}

impl Default for PromptLibrary {
    fn default() -> Self {
        Self {
            planning: DEFAULT_PLANNING_PROMPT.to_string(),
            content: DEFAULT_CONTENT_PROMPT.to_string(),
        }
    }
}

impl PromptLibrary {
    /// Load override files named in config, falling back to the defaults
    pub fn from_config(paths: &PromptPaths) -> Result<Self, ConfigError> {
        let mut library = Self::default();
        if let Some(path) = &paths.planning {
            library.planning = read_template(path, "planning prompt")?;
            tracing::debug!("Using planning prompt from {}", path.display());
        }
        if let Some(path) = &paths.content {
            library.content = read_template(path, "content prompt")?;
            tracing::debug!("Using content prompt from {}", path.display());
        }
        Ok(library)
    }

    pub fn with_planning(mut self, template: impl Into<String>) -> Self {
        self.planning = template.into();
        self
    }

    pub fn with_content(mut self, template: impl Into<String>) -> Self {
        self.content = template.into();
        self
    }

    /// Planning system prompt with the query substituted in
    pub fn planning_system(&self, query: &str) -> String {
        fill(&self.planning, &[("user_prompt", query)])
    }

    pub fn content_system(&self) -> &str {
        &self.content
    }
}

fn read_template(path: &Path, what: &'static str) -> Result<String, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        what,
        path: path.to_path_buf(),
        source,
    })?;
    if text.trim().is_empty() {
        return Err(ConfigError::Invalid(format!(
            "{} at {} is empty",
            what,
            path.display()
        )));
    }
    Ok(text)
}

/// Replace each `{{key}}` in `template` with its value. Unknown placeholders
/// are left in place.
pub fn fill(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (key, value) in vars {
        out = out.replace(&format!("{{{{{}}}}}", key), value);
    }
    out
}

/// User message for the planning call: the query, then any context documents
pub fn planning_user_prompt(query: &str, context: &[ContextDocument]) -> String {
    let mut prompt = query.trim().to_string();
    for doc in context {
        prompt.push_str(&format!(
            "\n\n## Additional context: {}\n\n{}",
            doc.name,
            doc.text.trim()
        ));
    }
    prompt
}

/// User message for one content call.
///
/// `parents` is the chain of ancestor titles, outermost first.
pub fn content_user_prompt(title: &str, instructions: &str, parents: &[&str]) -> String {
    let instructions = if instructions.trim().is_empty() {
        format!("Write an overview of \"{}\".", title)
    } else {
        instructions.trim().to_string()
    };

    let mut prompt = String::new();
    if !parents.is_empty() {
        prompt.push_str(&format!(
            "This note, \"{}\", is part of a larger research tree: {}.\n\n",
            title,
            parents.join(" > ")
        ));
    }
    prompt.push_str(&format!(
        "Please generate the content based on the following instructions:\n\n---\n{}\n---",
        instructions
    ));
    prompt
}
