// Command-line surface
//
// Argument definitions, plus the glue that folds flags into the loaded Config
// and the ResearchRequest before anything talks to an API.

use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::constants::{OPENAI_API_KEY_ENV, PERPLEXITY_API_KEY_ENV};
use crate::config::{Config, Credentials};
use crate::errors::{missing_api_key_error, ConfigError, GatewayError, PlanningFailure, SuiteError};
use crate::research::{load_context_documents, load_input_file, ResearchRequest, RunReport};

#[derive(Debug, Parser)]
#[command(name = "obsidian-suite")]
#[command(about = "Generate interlinked research notes in an Obsidian vault")]
#[command(version)]
pub struct Cli {
    /// Increase log verbosity (-v, -vv). RUST_LOG overrides this.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (default: $OBSIDIAN_SUITE_CONFIG or ~/.obsidian-suite/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Plan a topic, research each part and write linked notes
    Research(ResearchArgs),
}

#[derive(Debug, Clone, Default, Args)]
pub struct ResearchArgs {
    /// What to research
    #[arg(required_unless_present = "input_file")]
    pub query: Option<String>,

    /// Read the query from a text file, or a TOML file with a [research_query] table
    #[arg(short, long, value_name = "FILE")]
    pub input_file: Option<PathBuf>,

    /// File name for the root note instead of its title
    #[arg(long, value_name = "NAME")]
    pub root_name: Option<String>,

    /// Extra document to give the planner (repeatable)
    #[arg(long = "context", value_name = "DOC")]
    pub context: Vec<PathBuf>,

    #[arg(long, value_name = "MODEL")]
    pub planning_model: Option<String>,

    #[arg(long, value_name = "MODEL")]
    pub content_model: Option<String>,

    /// Replace the planning system prompt
    #[arg(long, value_name = "FILE")]
    pub planning_prompt: Option<PathBuf>,

    /// Replace the content system prompt
    #[arg(long, value_name = "FILE")]
    pub content_prompt: Option<PathBuf>,

    /// Where to write notes (relative to the vault, or absolute)
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Parallel content requests
    #[arg(long, value_name = "N")]
    pub concurrency: Option<usize>,

    /// Print the plan and stop without generating notes
    #[arg(long)]
    pub plan_only: bool,
}

impl ResearchArgs {
    /// Apply flag overrides on top of file configuration
    pub fn apply_to(&self, config: &mut Config) {
        let researcher = &mut config.tools.researcher;
        if let Some(model) = &self.planning_model {
            researcher.planning_model = Some(model.clone());
        }
        if let Some(model) = &self.content_model {
            researcher.content_model = Some(model.clone());
        }
        if let Some(path) = &self.planning_prompt {
            researcher.prompts.planning = Some(path.clone());
        }
        if let Some(path) = &self.content_prompt {
            researcher.prompts.content = Some(path.clone());
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(n) = self.concurrency {
            config.content_concurrency = n;
        }
    }

    /// Build the request. A query given on the command line wins over the
    /// input file's; context documents from both are used.
    pub fn to_request(&self) -> Result<ResearchRequest, ConfigError> {
        let mut request = match &self.input_file {
            Some(path) => load_input_file(path)?,
            None => ResearchRequest::default(),
        };
        if let Some(query) = &self.query {
            request.query = query.trim().to_string();
        }
        let request = request
            .with_context(load_context_documents(&self.context)?)
            .with_root_name(self.root_name.clone())
            .plan_only(self.plan_only);
        request.validate()?;
        Ok(request)
    }
}

/// Attach a fix-it hint to errors the user can resolve themselves
pub fn explain(err: &SuiteError, credentials: &Credentials) -> Option<String> {
    let gateway = match err {
        SuiteError::Planning(PlanningFailure::Gateway(e)) | SuiteError::Gateway(e) => e,
        _ => return None,
    };
    match gateway {
        GatewayError::AuthFailure { backend, .. } if backend == "openai" => {
            credentials
                .openai_api_key
                .is_none()
                .then(|| missing_api_key_error("OpenAI", OPENAI_API_KEY_ENV))
        }
        GatewayError::AuthFailure { backend, .. } if backend == "perplexity" => {
            credentials
                .perplexity_api_key
                .is_none()
                .then(|| missing_api_key_error("Perplexity", PERPLEXITY_API_KEY_ENV))
        }
        _ => None,
    }
}

/// Human summary of a finished run, for stdout
pub fn format_report(report: &RunReport) -> String {
    let mut out = String::new();
    if report.written.is_empty() && report.failures.is_empty() {
        if let Some(outline) = &report.outline {
            out.push_str("Research plan:\n\n");
            out.push_str(&outline.render_tree());
        }
        return out;
    }

    out.push_str(&format!("Wrote {} note(s):\n", report.written.len()));
    for path in &report.written {
        out.push_str(&format!("  {}\n", path.display()));
    }
    if !report.failures.is_empty() {
        out.push_str(&format!("\n{} note(s) failed:\n", report.failures.len()));
        for failure in &report.failures {
            out.push_str(&format!(
                "  {} ({}): {}\n",
                failure.title, failure.stage, failure.reason
            ));
        }
    }
    if let Some(root) = &report.root_note {
        out.push_str(&format!("\nRoot note: {}\n", root.display()));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::research::{NodeFailure, Outline, OutlineNode, Stage};
    use tempfile::TempDir;

    fn research_args(argv: &[&str]) -> ResearchArgs {
        let mut full = vec!["obsidian-suite", "research"];
        full.extend_from_slice(argv);
        match Cli::try_parse_from(full).unwrap().command {
            Commands::Research(args) => args,
        }
    }

    #[test]
    fn test_query_or_input_file_required() {
        assert!(Cli::try_parse_from(["obsidian-suite", "research"]).is_err());
        assert!(Cli::try_parse_from(["obsidian-suite", "research", "-i", "q.txt"]).is_ok());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "obsidian-suite",
            "research",
            "Graph theory basics",
            "-vv",
            "--config",
            "/tmp/c.toml",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.toml")));
    }

    #[test]
    fn test_apply_overrides() {
        let args = research_args(&[
            "q",
            "--planning-model",
            "o3",
            "--content-model",
            "sonar",
            "--output-dir",
            "/tmp/notes",
            "--concurrency",
            "4",
        ]);
        let mut config = Config::default();
        args.apply_to(&mut config);

        assert_eq!(config.planning_model(), "o3");
        assert_eq!(config.content_model(), "sonar");
        assert_eq!(config.output_dir, PathBuf::from("/tmp/notes"));
        assert_eq!(config.content_concurrency, 4);
    }

    #[test]
    fn test_cli_query_wins_over_input_file() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("q.txt");
        std::fs::write(&input, "from file").unwrap();
        let ctx = dir.path().join("ctx.md");
        std::fs::write(&ctx, "context").unwrap();

        let args = research_args(&[
            "from flag",
            "-i",
            input.to_str().unwrap(),
            "--context",
            ctx.to_str().unwrap(),
            "--plan-only",
        ]);
        let request = args.to_request().unwrap();
        assert_eq!(request.query, "from flag");
        assert_eq!(request.context.len(), 1);
        assert!(request.plan_only);
    }

    #[test]
    fn test_missing_key_is_explained() {
        let err = SuiteError::Planning(PlanningFailure::Gateway(GatewayError::auth(
            "openai",
            "no API key",
        )));
        let hint = explain(&err, &Credentials::default()).unwrap();
        assert!(hint.contains("OPENAI_API_KEY"));

        let with_key = Credentials {
            openai_api_key: Some("sk".into()),
            perplexity_api_key: None,
        };
        assert!(explain(&err, &with_key).is_none());
    }

    #[test]
    fn test_format_report() {
        let report = RunReport {
            written: vec![PathBuf::from("/v/Research/A.md")],
            failures: vec![NodeFailure {
                title: "B".into(),
                stage: Stage::Content,
                reason: "timeout".into(),
            }],
            root_note: Some(PathBuf::from("/v/Research/A.md")),
            outline: None,
        };
        let text = format_report(&report);
        assert!(text.contains("Wrote 1 note(s)"));
        assert!(text.contains("B (content): timeout"));
        assert!(text.contains("Root note: /v/Research/A.md"));
    }

    #[test]
    fn test_format_plan_only_report() {
        let report = RunReport {
            outline: Some(Outline::new(vec![OutlineNode::new("Graph Theory", "")])),
            ..Default::default()
        };
        assert_eq!(format_report(&report), "Research plan:\n\n- Graph Theory\n");
    }
}
