//! Provider client configuration

use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported LLM backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Local Ollama daemon
    Ollama,
    /// GitHub Models (OpenAI-compatible chat completions)
    Github,
    /// Google Gemini
    Gemini,
    /// Offline canned responses
    Demo,
}

impl ProviderKind {
    /// Whether this backend is a hosted API that needs a key
    pub fn requires_api_key(&self) -> bool {
        matches!(self, ProviderKind::Github | ProviderKind::Gemini)
    }

    /// Default request timeout in seconds
    pub fn default_timeout_secs(&self) -> u64 {
        match self {
            ProviderKind::Gemini => 30,
            _ => 120,
        }
    }

    /// Environment variable conventionally holding this provider's key
    pub fn key_env_var(&self) -> Option<&'static str> {
        match self {
            ProviderKind::Github => Some("GITHUB_TOKEN"),
            ProviderKind::Gemini => Some("GEMINI_API_KEY"),
            _ => None,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProviderKind::Ollama => "ollama",
            ProviderKind::Github => "github",
            ProviderKind::Gemini => "gemini",
            ProviderKind::Demo => "demo",
        };
        f.write_str(name)
    }
}

/// Configuration for a provider client
#[derive(Clone)]
pub struct ProviderConfig {
    pub kind: ProviderKind,

    /// Model name passed to the backend
    pub model: String,

    /// API key for hosted backends
    pub api_key: Option<String>,

    /// Overrides the backend's default endpoint
    pub api_url: Option<String>,

    pub temperature: f32,

    pub max_tokens: u32,

    /// Timeout for requests in seconds
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: ProviderKind::Ollama,
            model: "llama3.2:latest".to_string(),
            api_key: None,
            api_url: None,
            temperature: 0.2,
            max_tokens: 4000,
            timeout_secs: ProviderKind::Ollama.default_timeout_secs(),
        }
    }
}

impl ProviderConfig {
    pub fn new(kind: ProviderKind) -> Self {
        Self {
            kind,
            timeout_secs: kind.default_timeout_secs(),
            ..Self::default()
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = Some(api_url.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

// Keep keys out of logs.
impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("kind", &self.kind)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_url", &self.api_url)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_config_builder() {
        let config = ProviderConfig::new(ProviderKind::Github)
            .with_model("openai/gpt-4.1")
            .with_api_key("secret")
            .with_api_url("http://localhost:8080")
            .with_temperature(0.7)
            .with_max_tokens(1000)
            .with_timeout(600);

        assert_eq!(config.kind, ProviderKind::Github);
        assert_eq!(config.model, "openai/gpt-4.1");
        assert_eq!(config.api_key.as_deref(), Some("secret"));
        assert_eq!(config.api_url.as_deref(), Some("http://localhost:8080"));
        assert_eq!(config.max_tokens, 1000);
        assert_eq!(config.timeout_secs, 600);
    }

    #[test]
    fn test_default_timeouts_per_provider() {
        assert_eq!(ProviderConfig::new(ProviderKind::Ollama).timeout_secs, 120);
        assert_eq!(ProviderConfig::new(ProviderKind::Gemini).timeout_secs, 30);
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = ProviderConfig::new(ProviderKind::Gemini).with_api_key("top-secret");
        let printed = format!("{:?}", config);
        assert!(!printed.contains("top-secret"));
        assert!(printed.contains("<redacted>"));
    }

    #[test]
    fn test_provider_kind_parses_lowercase() {
        let kind: ProviderKind = serde_yaml::from_str("gemini").unwrap();
        assert_eq!(kind, ProviderKind::Gemini);
        assert!(kind.requires_api_key());
        assert!(!ProviderKind::Ollama.requires_api_key());
    }
}
