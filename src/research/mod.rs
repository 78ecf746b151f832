// Researcher
//
// Query → Planning Stage → Content Stage (per node) → Note Assembler → vault.
// Planning failures abort the run. Content and write failures are recorded per
// node; the subtree under a node without content is skipped, and the rest of
// the tree is still written.

use chrono::Local;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

pub mod assembler;
pub mod content;
pub mod input;
pub mod planner;
mod types;

pub use assembler::{AssembledNote, Assembler, WriteOutcome};
pub use content::ContentWriter;
pub use input::{load_context_documents, load_input_file, ResearchRequest};
pub use planner::Planner;
pub use types::{
    GeneratedNote, NodeFailure, NodePath, Outline, OutlineNode, RunReport, Source, Stage,
};

use crate::config::{Config, Credentials};
use crate::errors::{ConfigError, SuiteError};
use crate::gateway::LlmGateway;
use crate::logging::{RunEvent, RunLog};
use crate::prompts::PromptLibrary;
use crate::providers::{create_provider, Backend, LlmProvider, RetryPolicy, WebSearchOptions};
use crate::vault::VaultStore;

/// The two-stage research pipeline
pub struct Researcher {
    planner: Planner,
    writer: ContentWriter,
    prompts: PromptLibrary,
    store: VaultStore,
    concurrency: usize,
    planning_model: String,
    content_model: String,
    run_log: Option<RunLog>,
}

impl Researcher {
    /// Build from explicit providers. `config` must already be validated.
    pub fn new(
        config: &Config,
        planning: Arc<dyn LlmProvider>,
        content: Arc<dyn LlmProvider>,
        prompts: PromptLibrary,
    ) -> Result<Self, ConfigError> {
        let retry = RetryPolicy::from_config(&config.retry);
        let planning_model = config.planning_model().to_string();
        let content_model = config.content_model().to_string();

        let planner = Planner::new(LlmGateway::new(planning, retry.clone()), &planning_model);
        let content_gateway = LlmGateway::new(content, retry).with_web_search(WebSearchOptions {
            search_context_size: config.tools.researcher.search_context_size.clone(),
        });
        let writer = ContentWriter::new(content_gateway, &content_model, prompts.content_system())
            .with_exempt_tags(config.exempt_tags.clone());

        Ok(Self {
            planner,
            writer,
            prompts,
            store: VaultStore::new(config.resolved_output_dir()?),
            concurrency: config.content_concurrency,
            planning_model,
            content_model,
            run_log: None,
        })
    }

    /// Build with the OpenAI and Perplexity providers
    pub fn from_config(config: &Config, credentials: &Credentials) -> Result<Self, SuiteError> {
        let prompts = PromptLibrary::from_config(&config.tools.researcher.prompts)?;
        let planning = create_provider(Backend::OpenAi, config, credentials)?;
        let content = create_provider(Backend::Perplexity, config, credentials)?;
        Ok(Self::new(config, planning, content, prompts)?)
    }

    pub fn with_run_log(mut self, run_log: RunLog) -> Self {
        self.run_log = Some(run_log);
        self
    }

    pub fn store(&self) -> &VaultStore {
        &self.store
    }

    fn record(&self, event: RunEvent) {
        if let Some(log) = &self.run_log {
            log.record(event);
        }
    }

    /// Run the pipeline for one request
    pub async fn run(&self, request: &ResearchRequest) -> Result<RunReport, SuiteError> {
        request.validate()?;
        let started = Instant::now();

        self.record(RunEvent::RunStart {
            query: request.query.clone(),
            planning_model: self.planning_model.clone(),
            content_model: self.content_model.clone(),
        });

        // Stage 1: plan
        let outline = match self
            .planner
            .plan(&request.query, &request.context, &self.prompts)
            .await
        {
            Ok(outline) => outline,
            Err(e) => {
                tracing::error!(stage = "planning", "Planning failed: {}", e);
                self.record(RunEvent::NodeFailed {
                    title: request.query.clone(),
                    stage: Stage::Planning,
                    reason: e.to_string(),
                });
                return Err(e.into());
            }
        };
        self.record(RunEvent::PlanReady {
            notes: outline.len(),
            levels: outline.depth(),
        });

        if request.plan_only {
            tracing::info!("Plan only: skipping content generation");
            return Ok(RunReport {
                outline: Some(outline),
                ..Default::default()
            });
        }

        // Stage 2: content
        let mut results = self.writer.generate_all(&outline, self.concurrency).await;

        let mut notes = BTreeMap::new();
        let mut failures: Vec<(NodePath, NodeFailure)> = Vec::new();
        for (path, node) in outline.walk() {
            match results.remove(&path) {
                Some(Ok(note)) => {
                    notes.insert(path, note);
                }
                Some(Err(e)) => failures.push((
                    path,
                    NodeFailure {
                        title: node.title.clone(),
                        stage: Stage::Content,
                        reason: e.to_string(),
                    },
                )),
                None => {
                    let parent = outline
                        .parent_titles(&path)
                        .last()
                        .map(|t| t.to_string())
                        .unwrap_or_default();
                    tracing::warn!("Skipping '{}': parent '{}' has no content", node.title, parent);
                    failures.push((
                        path,
                        NodeFailure {
                            title: node.title.clone(),
                            stage: Stage::Content,
                            reason: format!("skipped: parent note '{}' was not generated", parent),
                        },
                    ));
                }
            }
        }

        // Stage 3: assemble and write
        let created = Local::now().format("%Y-%m-%dT%H:%M:%S").to_string();
        let outcome = Assembler::new(&self.store, created)
            .with_root_name(request.root_name.clone())
            .write_tree(&outline, &notes);

        let title_of = |path: &NodePath| {
            outline
                .node(path)
                .map(|n| n.title.clone())
                .unwrap_or_default()
        };
        let mut report = RunReport::default();
        for (node, path) in outcome.written {
            tracing::info!("Wrote {}", path.display());
            self.record(RunEvent::NoteWritten {
                title: title_of(&node),
                path: path.display().to_string(),
            });
            if node == NodePath::top(0) {
                report.root_note = Some(path.clone());
            }
            report.written.push(path);
        }
        for (node, e) in outcome.failed {
            failures.push((
                node.clone(),
                NodeFailure {
                    title: title_of(&node),
                    stage: Stage::Write,
                    reason: e.to_string(),
                },
            ));
        }

        failures.sort_by(|a, b| a.0.cmp(&b.0));
        for (_, failure) in &failures {
            self.record(RunEvent::NodeFailed {
                title: failure.title.clone(),
                stage: failure.stage,
                reason: failure.reason.clone(),
            });
        }
        report.failures = failures.into_iter().map(|(_, f)| f).collect();
        report.outline = Some(outline);

        self.record(RunEvent::RunDone {
            written: report.written.len(),
            failed: report.failures.len(),
            duration_s: started.elapsed().as_secs(),
        });

        if report.written.is_empty() {
            return Err(SuiteError::NothingWritten {
                failed: report.failures.len(),
            });
        }
        Ok(report)
    }
}
