// Full pipeline over HTTP: real providers pointed at a mock chat-completions server

use anyhow::Result;
use mockito::Matcher;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use obsidian_suite::config::Config;
use obsidian_suite::errors::{GatewayError, PlanningFailure, SuiteError};
use obsidian_suite::prompts::PromptLibrary;
use obsidian_suite::providers::OpenAIProvider;
use obsidian_suite::{ResearchRequest, Researcher};

fn completion(model: &str, content: &str) -> String {
    json!({
        "id": "cmpl-1",
        "model": model,
        "choices": [{"message": {"role": "assistant", "content": content}, "finish_reason": "stop"}],
        "citations": ["https://en.wikipedia.org/wiki/Graph_theory"]
    })
    .to_string()
}

fn researcher(server: &mockito::Server, config: &Config, openai_key: Option<&str>) -> Researcher {
    let timeout = Duration::from_secs(5);
    let planning = OpenAIProvider::new_openai(openai_key.map(String::from), timeout)
        .unwrap()
        .with_base_url(server.url());
    let content = OpenAIProvider::new_perplexity(Some("pplx-test".into()), timeout)
        .unwrap()
        .with_base_url(server.url());
    Researcher::new(config, Arc::new(planning), Arc::new(content), PromptLibrary::default()).unwrap()
}

fn config(vault: &TempDir) -> Config {
    let config = Config {
        vault_path: Some(vault.path().to_path_buf()),
        ..Config::default()
    };
    config.validate().unwrap();
    config
}

#[tokio::test]
async fn test_research_over_http() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    let vault = TempDir::new()?;
    let config = config(&vault);

    let plan = json!({"notes": [
        {"id": "root", "title": "Graph Theory", "instructions": "Introduce graph theory", "parent_id": null, "level": 0},
        {"id": "trees", "title": "Trees", "instructions": "Explain trees", "parent_id": "root", "level": 1}
    ]})
    .to_string();
    let planning = server
        .mock("POST", "/v1/chat/completions")
        .match_header("authorization", "Bearer sk-test")
        .match_body(Matcher::PartialJson(json!({
            "model": "o4-mini",
            "max_completion_tokens": 32000,
            "response_format": {"type": "json_schema", "json_schema": {"name": "research_plan"}}
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(completion("o4-mini", &plan))
        .expect(1)
        .create_async()
        .await;

    let note = json!({
        "content": "Graphs are made of vertices and edges.",
        "concepts": ["Graph Theory", "Vertices"],
        "sources": [{"title": "Graph theory", "url": "https://en.wikipedia.org/wiki/Graph_theory"}]
    })
    .to_string();
    let content = server
        .mock("POST", "/chat/completions")
        .match_header("authorization", "Bearer pplx-test")
        .match_body(Matcher::PartialJson(json!({
            "model": "sonar-pro",
            "web_search_options": {"search_context_size": "high"}
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(completion("sonar-pro", &format!("<think>planning the note</think>{}", note)))
        .expect(2)
        .create_async()
        .await;

    let report = researcher(&server, &config, Some("sk-test"))
        .run(&ResearchRequest::new("Graph theory basics"))
        .await?;

    planning.assert_async().await;
    content.assert_async().await;

    let out = vault.path().join("Research");
    assert_eq!(report.written, vec![out.join("Graph Theory.md"), out.join("Trees.md")]);

    let trees = std::fs::read_to_string(out.join("Trees.md"))?;
    assert!(trees.starts_with("---\ntype: \"note\"\ntags: [\"graph_theory\", \"vertices\"]\nparent: \"Graph Theory\"\n"));
    assert!(trees.contains("Graphs are made of vertices and edges."));
    // The citation duplicates the structured source and is folded into it
    assert_eq!(trees.matches("https://en.wikipedia.org/wiki/Graph_theory").count(), 1);
    Ok(())
}

#[tokio::test]
async fn test_missing_openai_key_fails_before_any_request() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    let vault = TempDir::new()?;
    let config = config(&vault);
    let mock = server
        .mock("POST", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let err = researcher(&server, &config, None)
        .run(&ResearchRequest::new("Graph theory basics"))
        .await
        .unwrap_err();

    mock.assert_async().await;
    assert!(matches!(
        err,
        SuiteError::Planning(PlanningFailure::Gateway(GatewayError::AuthFailure { .. }))
    ));
    Ok(())
}

#[tokio::test]
async fn test_content_server_error_skips_node() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    let vault = TempDir::new()?;
    let config = config(&vault);

    let plan = json!([
        {"id": "root", "title": "Root", "instructions": "Root note", "parent_id": null, "level": 0},
        {"id": "child", "title": "Child", "instructions": "Child note", "parent_id": "root", "level": 1}
    ])
    .to_string();
    server
        .mock("POST", "/v1/chat/completions")
        .with_status(200)
        .with_body(completion("o4-mini", &plan))
        .create_async()
        .await;
    server
        .mock("POST", "/chat/completions")
        .match_body(Matcher::Regex("Child note".into()))
        .with_status(503)
        .with_body("upstream overloaded")
        .create_async()
        .await;
    server
        .mock("POST", "/chat/completions")
        .match_body(Matcher::Regex("Root note".into()))
        .with_status(200)
        .with_body(completion("sonar-pro", r#"{"content": "Root body"}"#))
        .create_async()
        .await;

    let report = researcher(&server, &config, Some("sk-test"))
        .run(&ResearchRequest::new("q"))
        .await?;

    assert_eq!(report.written.len(), 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].title, "Child");
    assert!(report.failures[0].reason.contains("503"));
    Ok(())
}
