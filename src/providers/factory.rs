// Provider factory
//
// Creates LLM providers for the two research backends from config + credentials

use std::sync::Arc;
use std::time::Duration;

use super::openai::OpenAIProvider;
use super::LlmProvider;
use crate::config::{Config, Credentials};
use crate::errors::GatewayError;

/// The backends the research pipeline talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Planning stage
    OpenAi,
    /// Content stage (web-search capable)
    Perplexity,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::OpenAi => "openai",
            Backend::Perplexity => "perplexity",
        }
    }
}

/// Create a provider for `backend`.
///
/// A missing key does not fail here; the provider reports `AuthFailure` on
/// first use so `--plan-only` runs work with only the OpenAI key set.
pub fn create_provider(
    backend: Backend,
    config: &Config,
    credentials: &Credentials,
) -> Result<Arc<dyn LlmProvider>, GatewayError> {
    let timeout = Duration::from_secs(config.request_timeout);

    let provider = match backend {
        Backend::OpenAi => {
            if credentials.openai_api_key.is_none() {
                tracing::warn!("OPENAI_API_KEY is not set; planning requests will fail");
            }
            OpenAIProvider::new_openai(credentials.openai_api_key.clone(), timeout)?
                .with_model(config.planning_model())
        }
        Backend::Perplexity => {
            if credentials.perplexity_api_key.is_none() {
                tracing::warn!("PERPLEXITY_API_KEY is not set; content requests will fail");
            }
            OpenAIProvider::new_perplexity(credentials.perplexity_api_key.clone(), timeout)?
                .with_model(config.content_model())
        }
    };

    tracing::debug!(
        "Created {} provider (model: {}, timeout: {}s)",
        backend.as_str(),
        provider.default_model(),
        config.request_timeout
    );

    Ok(Arc::new(provider))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_providers_use_configured_models() {
        let mut config = Config::default();
        config.tools.researcher.planning_model = Some("o3".into());
        config.tools.researcher.content_model = Some("sonar".into());
        let creds = Credentials::default();

        let planner = create_provider(Backend::OpenAi, &config, &creds).unwrap();
        assert_eq!(planner.name(), "openai");
        assert_eq!(planner.default_model(), "o3");

        let content = create_provider(Backend::Perplexity, &config, &creds).unwrap();
        assert_eq!(content.name(), "perplexity");
        assert_eq!(content.default_model(), "sonar");
    }
}
