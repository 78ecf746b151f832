// LLM gateway
//
// The boundary every stage calls through: one (system, user) exchange against
// one provider, returned as text or decoded into a static result type.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

use crate::errors::GatewayError;
use crate::providers::{
    JsonSchemaSpec, LlmProvider, ProviderRequest, ProviderResponse, ResponseFormat, RetryPolicy,
    WebSearchOptions,
};

pub mod decode;

pub use decode::{decode_json, strip_markdown_fences, strip_think_blocks};

/// A fully built prompt for one gateway call
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
    pub model: String,
    pub max_tokens: u32,
}

/// Expected shape of a structured reply, forwarded to the API as a JSON schema
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseShape {
    pub name: String,
    pub description: String,
    pub schema: Value,
}

impl ResponseShape {
    pub fn new(name: impl Into<String>, description: impl Into<String>, schema: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            schema,
        }
    }

    fn to_response_format(&self) -> ResponseFormat {
        ResponseFormat::JsonSchema {
            json_schema: JsonSchemaSpec {
                name: self.name.clone(),
                description: self.description.clone(),
                schema: self.schema.clone(),
            },
        }
    }
}

/// A decoded reply plus what the backend said about its sources
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayReply<T> {
    pub value: T,
    pub citations: Vec<String>,
    pub model: String,
}

/// Gateway over a single provider
pub struct LlmGateway {
    provider: Arc<dyn LlmProvider>,
    retry: RetryPolicy,
    web_search: Option<WebSearchOptions>,
}

impl LlmGateway {
    pub fn new(provider: Arc<dyn LlmProvider>, retry: RetryPolicy) -> Self {
        Self {
            provider,
            retry,
            web_search: None,
        }
    }

    /// Attach web search options to every request (Perplexity only)
    pub fn with_web_search(mut self, options: WebSearchOptions) -> Self {
        self.web_search = Some(options);
        self
    }

    /// Provider name, for logs
    pub fn backend(&self) -> &str {
        self.provider.name()
    }

    fn build_request(&self, prompt: &Prompt, format: Option<ResponseFormat>) -> ProviderRequest {
        let mut request = ProviderRequest::new(prompt.user.clone())
            .with_model(prompt.model.clone())
            .with_system(prompt.system.clone())
            .with_max_tokens(prompt.max_tokens);
        if let Some(format) = format {
            request = request.with_response_format(format);
        } else {
            request = request.with_temperature(0.7);
        }
        if let Some(options) = &self.web_search {
            request = request.with_web_search(options.clone());
        }
        request
    }

    async fn send(&self, request: &ProviderRequest) -> Result<ProviderResponse, GatewayError> {
        self.retry
            .run(|| self.provider.send_message(request))
            .await
    }

    /// Free-text completion
    pub async fn generate_text(&self, prompt: &Prompt) -> Result<GatewayReply<String>, GatewayError> {
        let request = self.build_request(prompt, None);
        let response = self.send(&request).await?;
        let text = strip_think_blocks(&response.text);
        if text.is_empty() {
            return Err(GatewayError::malformed(self.backend(), "reply was empty"));
        }
        Ok(GatewayReply {
            value: text,
            citations: response.citations,
            model: response.model,
        })
    }

    /// Structured completion decoded into `T`.
    ///
    /// With a shape, the API is asked for schema-constrained output; without
    /// one, for any JSON object. Either way the reply must decode into `T`.
    pub async fn generate_json<T: DeserializeOwned>(
        &self,
        prompt: &Prompt,
        shape: Option<&ResponseShape>,
    ) -> Result<GatewayReply<T>, GatewayError> {
        let format = shape
            .map(ResponseShape::to_response_format)
            .unwrap_or(ResponseFormat::JsonObject);
        let request = self.build_request(prompt, Some(format));
        let response = self.send(&request).await?;

        tracing::trace!(backend = self.backend(), "Raw structured reply: {}", response.text);

        let value = decode_json::<T>(&response.text, self.backend())?;
        Ok(GatewayReply {
            value,
            citations: response.citations,
            model: response.model,
        })
    }
}
