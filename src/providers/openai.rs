// OpenAI-compatible chat-completions provider
//
// This provider works for both OpenAI and Perplexity since they use
// compatible API formats. The differences are the endpoint path, the name of
// the token-limit field, and Perplexity's extra `citations` list.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::types::{ProviderRequest, ProviderResponse, ResponseFormat, WebSearchOptions};
use super::LlmProvider;
use crate::config::constants::{OPENAI_BASE_URL, PERPLEXITY_BASE_URL};
use crate::errors::GatewayError;

/// How much of an error body to keep in error messages
const ERROR_BODY_PREVIEW: usize = 200;

/// Which field carries the output token limit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenLimitField {
    /// `max_tokens` (Perplexity, legacy OpenAI models)
    MaxTokens,
    /// `max_completion_tokens` (current OpenAI models, required by o-series)
    MaxCompletionTokens,
}

/// Chat-completions provider
#[derive(Clone)]
pub struct OpenAIProvider {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    path: String,
    default_model: String,
    provider_name: String,
    token_field: TokenLimitField,
    timeout: Duration,
}

impl OpenAIProvider {
    /// Create an OpenAI provider
    pub fn new_openai(api_key: Option<String>, timeout: Duration) -> Result<Self, GatewayError> {
        Self::new(
            api_key,
            OPENAI_BASE_URL.to_string(),
            "/v1/chat/completions".to_string(),
            "gpt-4o".to_string(),
            "openai".to_string(),
            TokenLimitField::MaxCompletionTokens,
            timeout,
        )
    }

    /// Create a Perplexity provider (uses OpenAI-compatible API)
    pub fn new_perplexity(
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        Self::new(
            api_key,
            PERPLEXITY_BASE_URL.to_string(),
            "/chat/completions".to_string(),
            "sonar-pro".to_string(),
            "perplexity".to_string(),
            TokenLimitField::MaxTokens,
            timeout,
        )
    }

    /// Set custom model for this provider
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    /// Point the provider at a different API root (proxies, test servers)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn new(
        api_key: Option<String>,
        base_url: String,
        path: String,
        default_model: String,
        provider_name: String,
        token_field: TokenLimitField,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            GatewayError::transport(&provider_name, format!("failed to create HTTP client: {}", e))
        })?;

        Ok(Self {
            client,
            api_key,
            base_url,
            path,
            default_model,
            provider_name,
            token_field,
            timeout,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}{}", self.base_url, self.path)
    }

    /// Convert ProviderRequest to the chat-completions wire format
    fn to_chat_request<'a>(&'a self, request: &'a ProviderRequest) -> ChatRequest<'a> {
        let model = if request.model.is_empty() {
            self.default_model.as_str()
        } else {
            request.model.as_str()
        };

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &request.system {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: &request.user,
        });

        let (max_tokens, max_completion_tokens) = match self.token_field {
            TokenLimitField::MaxTokens => (Some(request.max_tokens), None),
            TokenLimitField::MaxCompletionTokens => (None, Some(request.max_tokens)),
        };

        // Structured output runs at the API default temperature
        let temperature = if request.response_format.is_some() {
            None
        } else {
            request.temperature
        };

        ChatRequest {
            model,
            messages,
            max_tokens,
            max_completion_tokens,
            temperature,
            response_format: request.response_format.as_ref(),
            web_search_options: request.web_search.as_ref(),
        }
    }

    /// Convert a chat-completions response to ProviderResponse
    fn from_chat_response(&self, response: ChatResponse) -> Result<ProviderResponse, GatewayError> {
        let choice = response.choices.into_iter().next().ok_or_else(|| {
            GatewayError::malformed(&self.provider_name, "response contained no choices")
        })?;

        let text = match (choice.message.content, choice.message.refusal) {
            (Some(text), _) => text,
            (None, Some(refusal)) => {
                return Err(GatewayError::malformed(
                    &self.provider_name,
                    format!("model refused the request: {}", refusal),
                ))
            }
            (None, None) => {
                return Err(GatewayError::malformed(
                    &self.provider_name,
                    "response message had no content",
                ))
            }
        };

        Ok(ProviderResponse {
            id: response.id,
            model: response.model,
            text,
            citations: response.citations,
            stop_reason: choice.finish_reason,
            provider: self.provider_name.clone(),
        })
    }

    fn map_send_error(&self, error: reqwest::Error) -> GatewayError {
        if error.is_timeout() {
            GatewayError::transport(
                &self.provider_name,
                format!("request timed out after {}s", self.timeout.as_secs()),
            )
        } else if error.is_connect() {
            GatewayError::transport(&self.provider_name, format!("connection failed: {}", error))
        } else {
            GatewayError::transport(&self.provider_name, error.to_string())
        }
    }

    fn map_status(&self, status: StatusCode, body: &str) -> GatewayError {
        let preview: String = body.chars().take(ERROR_BODY_PREVIEW).collect();
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GatewayError::auth(
                &self.provider_name,
                format!("API rejected the key (status {}): {}", status, preview),
            ),
            _ => GatewayError::transport(
                &self.provider_name,
                format!("API request failed (status {}): {}", status, preview),
            ),
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAIProvider {
    async fn send_message(
        &self,
        request: &ProviderRequest,
    ) -> Result<ProviderResponse, GatewayError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            GatewayError::auth(&self.provider_name, "no API key configured")
        })?;

        let chat_request = self.to_chat_request(request);
        let url = self.endpoint();

        tracing::debug!(
            provider = %self.provider_name,
            model = chat_request.model,
            "Sending chat completion request"
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("accept", "application/json")
            .json(&chat_request)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        tracing::debug!(provider = %self.provider_name, %status, "Received response");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(self.map_status(status, &body));
        }

        let body = response.text().await.map_err(|e| self.map_send_error(e))?;
        let parsed: ChatResponse = serde_json::from_str(&body).map_err(|e| {
            GatewayError::malformed(
                &self.provider_name,
                format!("could not parse API response envelope: {}", e),
            )
        })?;

        self.from_chat_response(parsed)
    }

    fn name(&self) -> &str {
        &self.provider_name
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }
}

// Chat-completions wire types

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<&'a ResponseFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    web_search_options: Option<&'a WebSearchOptions>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    id: String,
    #[serde(default)]
    model: String,
    choices: Vec<ChatChoice>,
    #[serde(default)]
    citations: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn openai(server: &mockito::Server, key: Option<&str>) -> OpenAIProvider {
        OpenAIProvider::new_openai(key.map(str::to_string), Duration::from_secs(5))
            .unwrap()
            .with_base_url(server.url())
    }

    fn perplexity(server: &mockito::Server) -> OpenAIProvider {
        OpenAIProvider::new_perplexity(Some("pplx-test".into()), Duration::from_secs(5))
            .unwrap()
            .with_base_url(server.url())
    }

    #[test]
    fn test_provider_identity() {
        let provider = OpenAIProvider::new_perplexity(None, Duration::from_secs(5))
            .unwrap()
            .with_model("sonar");
        assert_eq!(provider.name(), "perplexity");
        assert_eq!(provider.default_model(), "sonar");
    }

    #[test]
    fn test_structured_request_drops_temperature() {
        let provider = OpenAIProvider::new_openai(None, Duration::from_secs(5)).unwrap();
        let request = ProviderRequest::new("q")
            .with_temperature(0.7)
            .with_response_format(ResponseFormat::JsonObject);
        let wire = serde_json::to_value(provider.to_chat_request(&request)).unwrap();
        assert!(wire.get("temperature").is_none());
        assert_eq!(wire["max_completion_tokens"], 4096);
        assert!(wire.get("max_tokens").is_none());
        assert_eq!(wire["model"], "gpt-4o");
    }

    #[tokio::test]
    async fn test_openai_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(Matcher::PartialJson(json!({
                "model": "o4-mini",
                "messages": [
                    {"role": "system", "content": "plan things"},
                    {"role": "user", "content": "Graph theory basics"}
                ]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "id": "chatcmpl-1",
                    "model": "o4-mini",
                    "choices": [{"message": {"role": "assistant", "content": "[]"}, "finish_reason": "stop"}]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let provider = openai(&server, Some("sk-test"));
        let request = ProviderRequest::new("Graph theory basics")
            .with_model("o4-mini")
            .with_system("plan things");
        let response = provider.send_message(&request).await.unwrap();

        mock.assert_async().await;
        assert_eq!(response.text, "[]");
        assert_eq!(response.id, "chatcmpl-1");
        assert_eq!(response.stop_reason.as_deref(), Some("stop"));
        assert!(response.citations.is_empty());
    }

    #[tokio::test]
    async fn test_perplexity_sends_web_search_and_returns_citations() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_body(Matcher::PartialJson(json!({
                "max_tokens": 4096,
                "web_search_options": {"search_context_size": "high"}
            })))
            .with_status(200)
            .with_body(
                json!({
                    "id": "p-1",
                    "model": "sonar-pro",
                    "citations": ["https://example.org/graphs"],
                    "choices": [{"message": {"content": "{\"content\": \"hi\"}"}}]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let request = ProviderRequest::new("q").with_web_search(WebSearchOptions {
            search_context_size: "high".into(),
        });
        let response = perplexity(&server).send_message(&request).await.unwrap();

        mock.assert_async().await;
        assert_eq!(response.citations, vec!["https://example.org/graphs"]);
        assert_eq!(response.provider, "perplexity");
    }

    #[tokio::test]
    async fn test_missing_key_is_auth_failure_without_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .expect(0)
            .create_async()
            .await;

        let err = openai(&server, None)
            .send_message(&ProviderRequest::new("q"))
            .await
            .unwrap_err();

        mock.assert_async().await;
        assert!(matches!(err, GatewayError::AuthFailure { .. }));
    }

    #[tokio::test]
    async fn test_unauthorized_status_is_auth_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/chat/completions")
            .with_status(401)
            .with_body(r#"{"error": {"message": "Incorrect API key"}}"#)
            .create_async()
            .await;

        let err = openai(&server, Some("sk-bad"))
            .send_message(&ProviderRequest::new("q"))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::AuthFailure { .. }));
        assert!(err.to_string().contains("Incorrect API key"));
    }

    #[tokio::test]
    async fn test_server_error_is_transport_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/chat/completions")
            .with_status(503)
            .with_body("overloaded")
            .create_async()
            .await;

        let err = openai(&server, Some("sk-test"))
            .send_message(&ProviderRequest::new("q"))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::TransportFailure { .. }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_garbage_envelope_is_malformed() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_body("<html>not json</html>")
            .create_async()
            .await;

        let err = openai(&server, Some("sk-test"))
            .send_message(&ProviderRequest::new("q"))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::MalformedResponse { .. }));
    }

    #[tokio::test]
    async fn test_refusal_is_malformed() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_body(
                json!({"choices": [{"message": {"content": null, "refusal": "no"}}]}).to_string(),
            )
            .create_async()
            .await;

        let err = openai(&server, Some("sk-test"))
            .send_message(&ProviderRequest::new("q"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("refused"));
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_failure() {
        let provider = OpenAIProvider::new_openai(Some("sk-test".into()), Duration::from_secs(2))
            .unwrap()
            .with_base_url("http://127.0.0.1:1");
        let err = provider
            .send_message(&ProviderRequest::new("q"))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::TransportFailure { .. }));
    }
}
