//! AI provider configuration

use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// AI provider configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AiConfig {
    /// Which backend answers completion requests
    #[serde(default)]
    pub provider: AiProvider,

    /// OpenAI API key
    pub openai_api_key: Option<Secret<String>>,

    /// Model used for streamed replies
    #[serde(default = "default_model")]
    pub model: String,

    /// Model used for title generation; falls back to `model`
    pub title_model: Option<String>,

    /// Base URL of the OpenAI-compatible API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Maximum retries on failure
    #[serde(default = "default_retries")]
    pub max_retries: u32,

    /// Sampling temperature; provider default when unset
    pub temperature: Option<f32>,

    /// Completion length cap; provider default when unset
    pub max_tokens: Option<u32>,
}

/// AI provider type
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AiProvider {
    #[default]
    OpenAI,
    /// Scripted echo provider for local development without an API key
    Mock,
}

impl AiConfig {
    /// Get timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Model used for title generation
    pub fn title_model(&self) -> &str {
        self.title_model.as_deref().unwrap_or(&self.model)
    }

    /// Check if OpenAI is configured
    pub fn has_openai(&self) -> bool {
        self.openai_api_key
            .as_ref()
            .is_some_and(|k| !k.expose_secret().is_empty())
    }

    /// Validate AI configuration
    pub fn validate(&self, production: bool) -> Result<(), ValidationError> {
        match self.provider {
            AiProvider::OpenAI if !self.has_openai() => {
                return Err(ValidationError::MissingRequired("OPENAI_API_KEY"));
            }
            AiProvider::Mock if production => {
                return Err(ValidationError::MockProviderInProduction);
            }
            _ => {}
        }

        if let Some(temperature) = self.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(ValidationError::InvalidTemperature);
            }
        }

        Ok(())
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: AiProvider::default(),
            openai_api_key: None,
            model: default_model(),
            title_model: None,
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
            max_retries: default_retries(),
            temperature: None,
            max_tokens: None,
        }
    }
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_timeout() -> u64 {
    120
}

fn default_retries() -> u32 {
    3
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_key() -> AiConfig {
        AiConfig {
            openai_api_key: Some(Secret::new("sk-test".to_string())),
            ..Default::default()
        }
    }

    #[test]
    fn defaults() {
        let config = AiConfig::default();
        assert_eq!(config.provider, AiProvider::OpenAI);
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.title_model(), "gpt-4o-mini");
        assert_eq!(config.timeout(), Duration::from_secs(120));
        assert_eq!(config.max_retries, 3);
    }

    #[test]
    fn openai_requires_key() {
        assert_eq!(
            AiConfig::default().validate(false),
            Err(ValidationError::MissingRequired("OPENAI_API_KEY"))
        );
        let blank = AiConfig {
            openai_api_key: Some(Secret::new(String::new())),
            ..Default::default()
        };
        assert!(!blank.has_openai());
        assert!(with_key().validate(true).is_ok());
    }

    #[test]
    fn mock_provider_is_development_only() {
        let config = AiConfig {
            provider: AiProvider::Mock,
            ..Default::default()
        };
        assert!(config.validate(false).is_ok());
        assert_eq!(
            config.validate(true),
            Err(ValidationError::MockProviderInProduction)
        );
    }

    #[test]
    fn temperature_must_be_in_range() {
        let config = AiConfig {
            temperature: Some(2.5),
            ..with_key()
        };
        assert_eq!(config.validate(false), Err(ValidationError::InvalidTemperature));
    }

    #[test]
    fn title_model_override() {
        let config = AiConfig {
            title_model: Some("gpt-4o".to_string()),
            ..Default::default()
        };
        assert_eq!(config.title_model(), "gpt-4o");
    }

    #[test]
    fn api_key_is_redacted_in_debug_output() {
        let rendered = format!("{:?}", with_key());
        assert!(!rendered.contains("sk-test"));
    }
}
