//! LLM provider clients

pub mod client;
pub mod demo;
pub mod gemini;
pub mod github;
pub mod ollama;
pub mod response;

use async_trait::async_trait;
pub use client::{ProviderConfig, ProviderKind};
pub use demo::DemoProvider;
pub use gemini::GeminiProvider;
pub use github::GitHubModelsProvider;
pub use ollama::OllamaProvider;
pub use response::{ProviderError, ProviderResponse, TokenUsage};

/// Trait for text generation - allows for different backends
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send one prompt with a system prompt and return the generated text
    async fn generate(
        &self,
        prompt: &str,
        system_prompt: &str,
    ) -> Result<ProviderResponse, ProviderError>;

    /// Short backend name for logs and reports
    fn name(&self) -> &str;
}

#[async_trait]
impl<P: LlmProvider + ?Sized> LlmProvider for Box<P> {
    async fn generate(
        &self,
        prompt: &str,
        system_prompt: &str,
    ) -> Result<ProviderResponse, ProviderError> {
        (**self).generate(prompt, system_prompt).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Build the provider selected by `config.kind`
///
/// Hosted backends fail here when no API key is configured.
pub fn create_provider(config: &ProviderConfig) -> Result<Box<dyn LlmProvider>, ProviderError> {
    let provider: Box<dyn LlmProvider> = match config.kind {
        ProviderKind::Ollama => Box::new(OllamaProvider::new(config)?),
        ProviderKind::Github => Box::new(GitHubModelsProvider::new(config)?),
        ProviderKind::Gemini => Box::new(GeminiProvider::new(config)?),
        ProviderKind::Demo => Box::new(DemoProvider::new()),
    };
    Ok(provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_provider_by_kind() {
        let ollama = create_provider(&ProviderConfig::new(ProviderKind::Ollama)).unwrap();
        assert_eq!(ollama.name(), "ollama");

        let demo = create_provider(&ProviderConfig::new(ProviderKind::Demo)).unwrap();
        assert_eq!(demo.name(), "demo");

        let gemini = create_provider(
            &ProviderConfig::new(ProviderKind::Gemini).with_api_key("k"),
        )
        .unwrap();
        assert_eq!(gemini.name(), "gemini");
    }

    #[test]
    fn test_create_hosted_provider_without_key_fails() {
        let err = create_provider(&ProviderConfig::new(ProviderKind::Github)).err();
        assert!(matches!(err, Some(ProviderError::MissingCredentials { .. })));
    }
}
