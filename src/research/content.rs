// Content stage
//
// Expands each outline node into a note body with one structured call to the
// content backend. Nodes are independent: a failure is returned for that node
// and the rest carry on.

use futures::stream::{self, StreamExt};
use serde::Deserialize;
use serde_json::json;
use std::collections::{BTreeMap, HashSet};

use super::types::{GeneratedNote, NodePath, Outline, OutlineNode, Source};
use crate::config::constants::CONTENT_MAX_TOKENS;
use crate::errors::GatewayError;
use crate::gateway::{LlmGateway, Prompt, ResponseShape};
use crate::prompts::content_user_prompt;
use crate::vault::format_tag;

/// Structured reply from the content backend
#[derive(Debug, Clone, Deserialize)]
struct ContentReply {
    content: String,
    #[serde(default)]
    concepts: Vec<String>,
    #[serde(default)]
    sources: Vec<Source>,
}

/// JSON schema sent with each content request
pub fn content_response_shape() -> ResponseShape {
    ResponseShape::new(
        "generated_note_content",
        "Generated markdown content with its key concepts and sources",
        json!({
            "type": "object",
            "properties": {
                "content": { "type": "string" },
                "concepts": { "type": "array", "items": { "type": "string" } },
                "sources": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "title": { "type": "string" },
                            "url": { "type": "string" }
                        },
                        "required": ["title", "url"]
                    }
                }
            },
            "required": ["content", "concepts", "sources"]
        }),
    )
}

/// Content stage over the content backend
pub struct ContentWriter {
    gateway: LlmGateway,
    model: String,
    system_prompt: String,
    exempt_tags: Vec<String>,
}

impl ContentWriter {
    pub fn new(gateway: LlmGateway, model: impl Into<String>, system_prompt: impl Into<String>) -> Self {
        Self {
            gateway,
            model: model.into(),
            system_prompt: system_prompt.into(),
            exempt_tags: Vec::new(),
        }
    }

    /// Tags written exactly as given when a concept matches them
    pub fn with_exempt_tags(mut self, tags: Vec<String>) -> Self {
        self.exempt_tags = tags;
        self
    }

    /// Generate the note for one node. `parents` is the ancestor title chain,
    /// outermost first.
    pub async fn generate(
        &self,
        node: &OutlineNode,
        parents: &[&str],
    ) -> Result<GeneratedNote, GatewayError> {
        let prompt = Prompt {
            system: self.system_prompt.clone(),
            user: content_user_prompt(&node.title, &node.instructions, parents),
            model: self.model.clone(),
            max_tokens: CONTENT_MAX_TOKENS,
        };

        let reply = self
            .gateway
            .generate_json::<ContentReply>(&prompt, Some(&content_response_shape()))
            .await?;

        let body = reply.value.content.trim().to_string();
        if body.is_empty() {
            return Err(GatewayError::malformed(
                self.gateway.backend(),
                format!("empty content for '{}'", node.title),
            ));
        }

        Ok(GeneratedNote {
            title: node.title.clone(),
            body,
            tags: self.tags_for(&reply.value.concepts),
            sources: merge_sources(reply.value.sources, &reply.citations),
            parent: parents.last().map(|p| p.to_string()),
        })
    }

    /// Generate every node, one level at a time, with up to `concurrency`
    /// requests in flight. A node is only requested once its parent has
    /// content, so the subtree under a failed node is never generated and is
    /// missing from the result.
    pub async fn generate_all(
        &self,
        outline: &Outline,
        concurrency: usize,
    ) -> BTreeMap<NodePath, Result<GeneratedNote, GatewayError>> {
        let nodes = outline.walk();
        let total = nodes.len();
        let mut results: BTreeMap<NodePath, Result<GeneratedNote, GatewayError>> = BTreeMap::new();

        for level in 0..outline.depth() {
            let wave: Vec<(NodePath, &OutlineNode)> = nodes
                .iter()
                .filter(|(path, _)| path.level() == level)
                .filter(|(path, _)| match path.parent() {
                    Some(parent) => matches!(results.get(&parent), Some(Ok(_))),
                    None => true,
                })
                .cloned()
                .collect();
            let offset = results.len();

            let done: Vec<(NodePath, Result<GeneratedNote, GatewayError>)> =
                stream::iter(wave.into_iter().enumerate())
                    .map(|(n, (path, node))| async move {
                        let parents = outline.parent_titles(&path);
                        tracing::info!(
                            "[{}/{}] Generating content for '{}'",
                            offset + n + 1,
                            total,
                            node.title
                        );
                        let result = self.generate(node, &parents).await;
                        if let Err(e) = &result {
                            tracing::error!(
                                node = %node.title,
                                stage = "content",
                                error_kind = e.kind(),
                                "Content generation failed: {}",
                                e
                            );
                        }
                        (path, result)
                    })
                    .buffer_unordered(concurrency.max(1))
                    .collect()
                    .await;
            results.extend(done);
        }
        results
    }

    fn tags_for(&self, concepts: &[String]) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut tags = Vec::new();
        for concept in concepts {
            let exempt = self
                .exempt_tags
                .iter()
                .find(|t| t.eq_ignore_ascii_case(concept.trim().trim_start_matches('#')));
            let tag = match exempt {
                Some(t) => Some(t.clone()),
                None => format_tag(concept),
            };
            if let Some(tag) = tag {
                if seen.insert(tag.clone()) {
                    tags.push(tag);
                }
            }
        }
        tags
    }
}

/// Structured sources first, then bare citation URLs; one entry per URL
fn merge_sources(sources: Vec<Source>, citations: &[String]) -> Vec<Source> {
    let mut seen = HashSet::new();
    let mut merged = Vec::new();

    let citation_sources = citations.iter().map(|url| Source {
        title: String::new(),
        url: url.clone(),
    });
    for mut source in sources.into_iter().chain(citation_sources) {
        source.url = source.url.trim().to_string();
        if source.url.is_empty() || !seen.insert(source.url.clone()) {
            continue;
        }
        if source.title.trim().is_empty() {
            source.title = source.url.clone();
        }
        merged.push(source);
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(title: &str, url: &str) -> Source {
        Source {
            title: title.into(),
            url: url.into(),
        }
    }

    #[test]
    fn test_merge_sources_dedupes_by_url() {
        let merged = merge_sources(
            vec![source("A", "https://a"), source("A again", "https://a"), source("", "https://b")],
            &["https://a".into(), "https://c".into()],
        );
        assert_eq!(
            merged,
            vec![
                source("A", "https://a"),
                source("https://b", "https://b"),
                source("https://c", "https://c"),
            ]
        );
    }

    #[test]
    fn test_merge_sources_drops_empty_urls() {
        let merged = merge_sources(vec![source("No link", "  ")], &[]);
        assert!(merged.is_empty());
    }

    #[test]
    fn test_content_reply_defaults() {
        let reply: ContentReply = serde_json::from_str(r#"{"content": "x"}"#).unwrap();
        assert!(reply.concepts.is_empty());
        assert!(reply.sources.is_empty());
    }
}
