// LLM provider support
//
// This module provides an abstraction layer over the chat-completion backends
// (OpenAI for planning, Perplexity for content) so the gateway and the stages
// above it can be tested against stub providers.

use async_trait::async_trait;

use crate::errors::GatewayError;

pub mod types;

// Provider implementations
pub mod openai;

// Provider factory
pub mod factory;

// Retry policy wrapped around every provider call
pub mod retry;

// Re-export commonly used types
pub use factory::{create_provider, Backend};
pub use openai::OpenAIProvider;
pub use retry::RetryPolicy;
pub use types::{
    JsonSchemaSpec, ProviderRequest, ProviderResponse, ResponseFormat, WebSearchOptions,
};

/// Trait for LLM providers
///
/// Each call is a single attempt; retries live in [`RetryPolicy`].
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send a request and wait for the complete response
    async fn send_message(&self, request: &ProviderRequest)
        -> Result<ProviderResponse, GatewayError>;

    /// Get the provider name (e.g., "openai", "perplexity")
    fn name(&self) -> &str;

    /// Get the default model for this provider
    fn default_model(&self) -> &str;
}
