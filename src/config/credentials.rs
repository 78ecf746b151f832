// API credentials
//
// Keys come from the environment only and are never serialised.

use std::fmt;

use super::constants::{OPENAI_API_KEY_ENV, PERPLEXITY_API_KEY_ENV};

#[derive(Clone, Default)]
pub struct Credentials {
    pub openai_api_key: Option<String>,
    pub perplexity_api_key: Option<String>,
}

impl Credentials {
    /// Read both keys from the process environment. Empty values count as missing.
    pub fn from_env() -> Self {
        Self {
            openai_api_key: read_key(OPENAI_API_KEY_ENV),
            perplexity_api_key: read_key(PERPLEXITY_API_KEY_ENV),
        }
    }
}

fn read_key(var: &str) -> Option<String> {
    std::env::var(var)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn mask(key: &Option<String>) -> &'static str {
            if key.is_some() {
                "<set>"
            } else {
                "<unset>"
            }
        }
        f.debug_struct("Credentials")
            .field("openai_api_key", &mask(&self.openai_api_key))
            .field("perplexity_api_key", &mask(&self.perplexity_api_key))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_never_prints_keys() {
        let creds = Credentials {
            openai_api_key: Some("sk-secret".into()),
            perplexity_api_key: None,
        };
        let printed = format!("{:?}", creds);
        assert!(!printed.contains("sk-secret"));
        assert!(printed.contains("<set>"));
        assert!(printed.contains("<unset>"));
    }
}
