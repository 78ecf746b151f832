// Unified request/response types for the chat-completion providers
//
// OpenAI and Perplexity share the chat-completions wire format, so these types
// stay close to it. Provider-specific knobs (web search) are optional fields.

use serde::Serialize;
use serde_json::Value;

/// One (system, user) exchange sent to a provider
#[derive(Debug, Clone, Serialize)]
pub struct ProviderRequest {
    /// Model name (provider-specific); empty means the provider default
    pub model: String,

    /// System prompt, sent as a `{"role":"system"}` message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    /// User prompt
    pub user: String,

    /// Maximum tokens to generate
    pub max_tokens: u32,

    /// Sampling temperature. Omitted when structured output is requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Structured output request
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,

    /// Perplexity web search options
    #[serde(skip_serializing_if = "Option::is_none")]
    pub web_search: Option<WebSearchOptions>,
}

impl ProviderRequest {
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            model: String::new(),
            system: None,
            user: user.into(),
            max_tokens: 4096,
            temperature: None,
            response_format: None,
            web_search: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_response_format(mut self, format: ResponseFormat) -> Self {
        self.response_format = Some(format);
        self
    }

    pub fn with_web_search(mut self, options: WebSearchOptions) -> Self {
        self.web_search = Some(options);
        self
    }
}

/// `response_format` as understood by both OpenAI and Perplexity
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseFormat {
    /// Any JSON object
    JsonObject,
    /// JSON matching a schema
    JsonSchema { json_schema: JsonSchemaSpec },
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct JsonSchemaSpec {
    pub name: String,
    pub description: String,
    pub schema: Value,
}

/// Perplexity `web_search_options`
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WebSearchOptions {
    pub search_context_size: String,
}

/// Provider reply, reduced to what the gateway needs
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderResponse {
    /// Response ID
    pub id: String,

    /// Model that generated the reply
    pub model: String,

    /// Message text of the first choice
    pub text: String,

    /// URLs the backend cited (Perplexity returns these alongside the message)
    pub citations: Vec<String>,

    /// Finish reason, if given
    pub stop_reason: Option<String>,

    /// Provider name that answered
    pub provider: String,
}
