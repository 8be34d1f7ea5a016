//! Ollama HTTP client for local inference

use crate::provider::{LlmProvider, ProviderConfig, ProviderError, ProviderResponse, TokenUsage};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434/api/generate";

/// Client for the Ollama `/api/generate` endpoint
#[derive(Debug)]
pub struct OllamaProvider {
    api_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    timeout_secs: u64,
    http_client: Client,
}

impl OllamaProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ProviderError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_url: config
                .api_url
                .clone()
                .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string()),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout_secs: config.timeout_secs,
            http_client,
        })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Probe `/api/tags` on the same host to see whether the daemon is up
    pub async fn health_check(&self) -> bool {
        let tags_url = match self.api_url.find("/api/") {
            Some(idx) => format!("{}/api/tags", &self.api_url[..idx]),
            None => format!("{}/api/tags", self.api_url.trim_end_matches('/')),
        };

        debug!("Checking Ollama health at {}", tags_url);

        match self.http_client.get(&tags_url).send().await {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                warn!("Ollama health check failed with status: {}", response.status());
                false
            }
            Err(e) => {
                warn!("Cannot reach Ollama at {}: {}", tags_url, e);
                false
            }
        }
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    async fn generate(
        &self,
        prompt: &str,
        system_prompt: &str,
    ) -> Result<ProviderResponse, ProviderError> {
        let request = OllamaRequest {
            model: &self.model,
            prompt: format!("{}\n\n{}", system_prompt, prompt),
            stream: false,
            options: OllamaOptions {
                temperature: self.temperature,
                num_predict: self.max_tokens,
            },
        };

        debug!(
            "Sending request to Ollama: model={}, prompt_length={}",
            self.model,
            request.prompt.len()
        );

        let start = Instant::now();
        let response = self
            .http_client
            .post(&self.api_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("Error calling Ollama API: {}", e);
                ProviderError::from_reqwest(e, self.timeout_secs)
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            error!("Ollama API returned error status {}: {}", status, body);
            return Err(ProviderError::Api { status, body });
        }

        let body: OllamaResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("JSON parse error: {}", e)))?;

        info!(
            "Ollama generation completed in {:.2}s (model={})",
            start.elapsed().as_secs_f64(),
            self.model
        );

        let mut result = ProviderResponse::new(body.response);
        if let (Some(prompt_tokens), Some(eval_tokens)) =
            (body.prompt_eval_count, body.eval_count)
        {
            result = result.with_usage(TokenUsage::new(prompt_tokens, eval_tokens));
        }
        Ok(result)
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

#[derive(Debug, Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    #[serde(default)]
    response: String,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}
