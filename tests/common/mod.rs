// Shared fixtures: scripted providers and a throwaway vault

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

use obsidian_suite::config::Config;
use obsidian_suite::errors::GatewayError;
use obsidian_suite::prompts::PromptLibrary;
use obsidian_suite::providers::{LlmProvider, ProviderRequest, ProviderResponse};
use obsidian_suite::Researcher;

type Responder = dyn Fn(&ProviderRequest) -> Result<String, GatewayError> + Send + Sync;

/// Provider whose replies are computed from the request
pub struct StubProvider {
    name: String,
    respond: Box<Responder>,
    delays: Vec<(String, Duration)>,
    pub calls: Mutex<Vec<ProviderRequest>>,
}

impl StubProvider {
    pub fn new<F>(name: &str, respond: F) -> Self
    where
        F: Fn(&ProviderRequest) -> Result<String, GatewayError> + Send + Sync + 'static,
    {
        Self {
            name: name.to_string(),
            respond: Box::new(respond),
            delays: Vec::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Requests whose user prompt contains `marker` take `delay` to answer
    pub fn with_delay(mut self, marker: &str, delay: Duration) -> Self {
        self.delays.push((marker.to_string(), delay));
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmProvider for StubProvider {
    async fn send_message(
        &self,
        request: &ProviderRequest,
    ) -> Result<ProviderResponse, GatewayError> {
        self.calls.lock().unwrap().push(request.clone());
        let delay = self
            .delays
            .iter()
            .find(|(marker, _)| request.user.contains(marker.as_str()))
            .map(|(_, d)| *d);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let text = (self.respond)(request)?;
        Ok(ProviderResponse {
            id: "stub".into(),
            model: request.model.clone(),
            text,
            citations: Vec::new(),
            stop_reason: Some("stop".into()),
            provider: self.name.clone(),
        })
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn default_model(&self) -> &str {
        "stub-model"
    }
}

/// Planner that always returns `plan`
pub fn planner(plan: &str) -> Arc<StubProvider> {
    let plan = plan.to_string();
    Arc::new(StubProvider::new("openai", move |_| Ok(plan.clone())))
}

/// Content provider that writes "About <instructions>." and tags the node
/// with its instructions. Instructions containing `fail_marker` fail.
pub fn writer(fail_marker: Option<&str>) -> StubProvider {
    let fail_marker = fail_marker.map(String::from);
    StubProvider::new("perplexity", move |request| {
        let instructions = instructions_of(&request.user);
        if let Some(marker) = &fail_marker {
            if instructions.contains(marker.as_str()) {
                return Err(GatewayError::transport("perplexity", "connection reset"));
            }
        }
        Ok(serde_json::json!({
            "content": format!("About {}.", instructions),
            "concepts": [instructions.clone(), "Research"],
            "sources": [{"title": "Reference", "url": format!("https://example.org/{}", instructions.replace(' ', "_"))}]
        })
        .to_string())
    })
}

/// The text between the `---` fences of a content prompt
pub fn instructions_of(user_prompt: &str) -> String {
    user_prompt
        .split("---")
        .nth(1)
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

/// Flat plan JSON from (id, title, parent_id, level) rows; instructions are
/// "Explain <title>"
pub fn flat_plan(rows: &[(&str, &str, Option<&str>, u32)]) -> String {
    let notes: Vec<serde_json::Value> = rows
        .iter()
        .map(|(id, title, parent, level)| {
            serde_json::json!({
                "id": id,
                "title": title,
                "instructions": format!("Explain {}", title),
                "parent_id": parent,
                "level": level,
            })
        })
        .collect();
    serde_json::json!({ "notes": notes }).to_string()
}

/// Config pointing at a fresh temporary vault
pub fn temp_vault() -> (Config, TempDir) {
    let dir = TempDir::new().unwrap();
    let config = Config {
        vault_path: Some(dir.path().to_path_buf()),
        ..Config::default()
    };
    (config, dir)
}

pub fn researcher(
    config: &Config,
    planning: Arc<dyn LlmProvider>,
    content: Arc<dyn LlmProvider>,
) -> Researcher {
    config.validate().unwrap();
    Researcher::new(config, planning, content, PromptLibrary::default()).unwrap()
}
