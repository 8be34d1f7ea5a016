//! Google Gemini `generateContent` client

use crate::provider::{
    LlmProvider, ProviderConfig, ProviderError, ProviderKind, ProviderResponse, TokenUsage,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, error};

pub const DEFAULT_GEMINI_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash-latest:generateContent";

const TOP_P: f32 = 0.8;
const TOP_K: u32 = 10;

pub struct GeminiProvider {
    api_url: String,
    api_key: String,
    temperature: f32,
    max_tokens: u32,
    timeout_secs: u64,
    http_client: Client,
}

impl GeminiProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ProviderError::MissingCredentials {
                provider: ProviderKind::Gemini.to_string(),
            })?;

        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ProviderError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_url: config
                .api_url
                .clone()
                .unwrap_or_else(|| DEFAULT_GEMINI_URL.to_string()),
            api_key,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout_secs: config.timeout_secs,
            http_client,
        })
    }
}

impl fmt::Debug for GeminiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiProvider")
            .field("api_url", &self.api_url)
            .finish()
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    async fn generate(
        &self,
        prompt: &str,
        system_prompt: &str,
    ) -> Result<ProviderResponse, ProviderError> {
        let full_prompt = if system_prompt.is_empty() {
            prompt.to_string()
        } else {
            format!("{}\n\n{}", system_prompt, prompt)
        };

        let request = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart { text: full_prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_tokens,
                top_p: TOP_P,
                top_k: TOP_K,
            },
        };

        debug!("Sending request to Gemini: prompt_length={}", prompt.len());

        let response = self
            .http_client
            .post(&self.api_url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                // The request URL carries the key.
                let e = e.without_url();
                error!("Error calling Gemini API: {}", e);
                ProviderError::from_reqwest(e, self.timeout_secs)
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            error!("Gemini API returned error status {}: {}", status, body);
            return Err(ProviderError::Api { status, body });
        }

        let body: GeminiResponse = response.json().await.map_err(|e| {
            ProviderError::InvalidResponse(format!("JSON parse error: {}", e.without_url()))
        })?;

        let text = body
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or_else(|| {
                error!("Unexpected Gemini API response format");
                ProviderError::InvalidResponse("Unexpected API response format".to_string())
            })?;

        let mut result = ProviderResponse::new(text);
        if let Some(usage) = body.usage_metadata {
            result = result.with_usage(TokenUsage::new(
                usage.prompt_token_count,
                usage.candidates_token_count,
            ));
        }
        Ok(result)
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
    top_p: f32,
    top_k: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_api_key() {
        let result = GeminiProvider::new(&ProviderConfig::new(ProviderKind::Gemini));
        assert!(matches!(result, Err(ProviderError::MissingCredentials { .. })));
    }

    #[test]
    fn test_request_uses_camel_case() {
        let request = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: "hello".to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.2,
                max_output_tokens: 4000,
                top_p: TOP_P,
                top_k: TOP_K,
            },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hello");
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 4000);
        assert_eq!(json["generationConfig"]["topK"], 10);
    }

    #[test]
    fn test_response_without_candidates_parses() {
        let parsed: GeminiResponse = serde_json::from_str(r#"{"promptFeedback": {}}"#).unwrap();
        assert!(parsed.candidates.is_empty());
    }
}
