//! HTTP provider tests against a mock server

use serde_json::json;
use testgen::provider::{
    GeminiProvider, GitHubModelsProvider, LlmProvider, OllamaProvider, ProviderConfig,
    ProviderError, ProviderKind,
};
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(kind: ProviderKind, server: &MockServer, endpoint: &str) -> ProviderConfig {
    ProviderConfig::new(kind)
        .with_api_url(format!("{}{}", server.uri(), endpoint))
        .with_temperature(0.5)
        .with_max_tokens(512)
}

#[tokio::test]
async fn test_ollama_sends_combined_prompt_and_parses_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(json!({
            "model": "llama3.2:latest",
            "prompt": "You are a tester\n\nWrite tests",
            "stream": false,
            "options": { "temperature": 0.5, "num_predict": 512 }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": "TEST(A, B) {}",
            "done": true,
            "prompt_eval_count": 12,
            "eval_count": 30
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider =
        OllamaProvider::new(&config(ProviderKind::Ollama, &server, "/api/generate")).unwrap();
    let response = provider.generate("Write tests", "You are a tester").await.unwrap();

    assert_eq!(response.content, "TEST(A, B) {}");
    let usage = response.usage.unwrap();
    assert_eq!(usage.prompt_tokens, 12);
    assert_eq!(usage.completion_tokens, 30);
    assert_eq!(usage.total_tokens, 42);
}

#[tokio::test]
async fn test_ollama_health_check() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "models": [] })))
        .mount(&server)
        .await;

    let provider =
        OllamaProvider::new(&config(ProviderKind::Ollama, &server, "/api/generate")).unwrap();
    assert!(provider.health_check().await);

    let down = OllamaProvider::new(
        &ProviderConfig::new(ProviderKind::Ollama).with_api_url("http://127.0.0.1:9/api/generate"),
    )
    .unwrap();
    assert!(!down.health_check().await);
}

#[tokio::test]
async fn test_ollama_http_error_is_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(404).set_body_string("model not found"))
        .mount(&server)
        .await;

    let provider =
        OllamaProvider::new(&config(ProviderKind::Ollama, &server, "/api/generate")).unwrap();
    let err = provider.generate("p", "s").await.unwrap_err();

    match err {
        ProviderError::Api { status, body } => {
            assert_eq!(status, 404);
            assert_eq!(body, "model not found");
        }
        other => panic!("expected API error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_github_sends_bearer_token_and_chat_messages() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/inference/chat/completions"))
        .and(header("authorization", "Bearer ghp_test"))
        .and(body_partial_json(json!({
            "model": "gpt-4o-mini",
            "messages": [
                { "role": "system", "content": "You are a tester" },
                { "role": "user", "content": "Write tests" }
            ],
            "temperature": 0.5,
            "max_tokens": 512
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "role": "assistant", "content": "TEST(G, H) {}" } }],
            "usage": { "prompt_tokens": 20, "completion_tokens": 8, "total_tokens": 28 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = GitHubModelsProvider::new(
        &config(ProviderKind::Github, &server, "/inference/chat/completions")
            .with_model("gpt-4o-mini")
            .with_api_key("ghp_test"),
    )
    .unwrap();
    let response = provider.generate("Write tests", "You are a tester").await.unwrap();

    assert_eq!(response.content, "TEST(G, H) {}");
    assert_eq!(response.usage.unwrap().total_tokens, 28);
}

#[tokio::test]
async fn test_github_without_choices_is_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
        .mount(&server)
        .await;

    let provider = GitHubModelsProvider::new(
        &config(ProviderKind::Github, &server, "/chat").with_api_key("ghp_test"),
    )
    .unwrap();
    let err = provider.generate("p", "s").await.unwrap_err();
    assert!(matches!(err, ProviderError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_gemini_sends_key_as_query_and_generation_config() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-1.5-flash-latest:generateContent"))
        .and(query_param("key", "gem-key"))
        .and(body_partial_json(json!({
            "contents": [{ "parts": [{ "text": "You are a tester\n\nWrite tests" }] }],
            "generationConfig": {
                "temperature": 0.5,
                "maxOutputTokens": 512,
                "topK": 10
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": { "parts": [{ "text": "TEST(Gem, Ini) {}" }], "role": "model" }
            }],
            "usageMetadata": {
                "promptTokenCount": 7,
                "candidatesTokenCount": 3,
                "totalTokenCount": 10
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = GeminiProvider::new(
        &config(
            ProviderKind::Gemini,
            &server,
            "/v1beta/models/gemini-1.5-flash-latest:generateContent",
        )
        .with_api_key("gem-key"),
    )
    .unwrap();
    let response = provider.generate("Write tests", "You are a tester").await.unwrap();

    assert_eq!(response.content, "TEST(Gem, Ini) {}");
    assert_eq!(response.usage.unwrap().total_tokens, 10);
}

#[tokio::test]
async fn test_gemini_without_candidates_is_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "promptFeedback": {} })))
        .mount(&server)
        .await;

    let provider = GeminiProvider::new(
        &config(ProviderKind::Gemini, &server, "/generate").with_api_key("gem-key"),
    )
    .unwrap();
    let err = provider.generate("p", "s").await.unwrap_err();

    match err {
        ProviderError::InvalidResponse(message) => {
            assert_eq!(message, "Unexpected API response format")
        }
        other => panic!("expected invalid response, got {:?}", other),
    }
}

#[tokio::test]
async fn test_gemini_error_body_does_not_leak_key_in_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(403).set_body_string("API key not valid"))
        .mount(&server)
        .await;

    let provider = GeminiProvider::new(
        &config(ProviderKind::Gemini, &server, "/generate").with_api_key("secret-key"),
    )
    .unwrap();
    let err = provider.generate("p", "s").await.unwrap_err();

    assert!(matches!(err, ProviderError::Api { status: 403, .. }));
    assert!(!err.to_string().contains("secret-key"));
}

#[test]
fn test_hosted_providers_require_a_key() {
    let github =
        GitHubModelsProvider::new(&ProviderConfig::new(ProviderKind::Github).with_api_key("  "));
    assert!(matches!(github, Err(ProviderError::MissingCredentials { .. })));

    let gemini = GeminiProvider::new(&ProviderConfig::new(ProviderKind::Gemini));
    assert!(matches!(gemini, Err(ProviderError::MissingCredentials { .. })));
}
