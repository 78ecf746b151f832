// Research request inputs
//
// A query comes from the command line or an input file. Input files are plain
// text (the whole file is the query) or, with a .toml extension, a
// [research_query] table that can also name context documents and the root
// note's file name.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::errors::ConfigError;
use crate::prompts::ContextDocument;

/// Everything one research run needs besides configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResearchRequest {
    pub query: String,
    pub context: Vec<ContextDocument>,
    /// File name for the first top-level note, instead of its title
    pub root_name: Option<String>,
    /// Stop after planning and write nothing
    pub plan_only: bool,
}

impl ResearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    pub fn with_context(mut self, context: Vec<ContextDocument>) -> Self {
        self.context.extend(context);
        self
    }

    pub fn with_root_name(mut self, root_name: Option<String>) -> Self {
        if root_name.is_some() {
            self.root_name = root_name;
        }
        self
    }

    pub fn plan_only(mut self, plan_only: bool) -> Self {
        self.plan_only = plan_only;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.query.trim().is_empty() {
            return Err(ConfigError::Invalid("research query is empty".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct InputFile {
    research_query: QueryTable,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct QueryTable {
    query: String,
    #[serde(default)]
    context_documents: Vec<PathBuf>,
    #[serde(default)]
    root_name: Option<String>,
}

/// Load a request from an input file
pub fn load_input_file(path: &Path) -> Result<ResearchRequest, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        what: "input file",
        path: path.to_path_buf(),
        source,
    })?;

    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    if !is_toml {
        let request = ResearchRequest::new(text.trim());
        request.validate()?;
        return Ok(request);
    }

    let input: InputFile = toml::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    let table = input.research_query;

    // Context paths are relative to the input file
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    let doc_paths: Vec<PathBuf> = table
        .context_documents
        .iter()
        .map(|p| if p.is_absolute() { p.clone() } else { base.join(p) })
        .collect();

    let request = ResearchRequest::new(table.query.trim())
        .with_context(load_context_documents(&doc_paths)?)
        .with_root_name(table.root_name);
    request.validate()?;
    Ok(request)
}

/// Read context documents; a missing or unreadable one is a configuration error
pub fn load_context_documents(paths: &[PathBuf]) -> Result<Vec<ContextDocument>, ConfigError> {
    paths
        .iter()
        .map(|path| {
            let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                what: "context document",
                path: path.clone(),
                source,
            })?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            tracing::debug!("Loaded context document {} ({} bytes)", name, text.len());
            Ok(ContextDocument { name, text })
        })
        .collect()
}
