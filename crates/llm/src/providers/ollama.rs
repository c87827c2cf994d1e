//! Ollama LLM provider implementation.
//!
//! Talks to a local Ollama server through `POST /api/generate`.
//! Ollama API: https://github.com/ollama/ollama/blob/main/docs/api.md

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use pizzarag_core::retry::backoff_delay;
use pizzarag_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Default Ollama endpoint.
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

const GENERATE_ENDPOINT: &str = "/api/generate";

/// Default attempts per completion request
const DEFAULT_MAX_RETRIES: u32 = 3;

/// Ollama API request format.
#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    stream: bool,
    #[serde(skip_serializing_if = "OllamaOptions::is_empty")]
    options: OllamaOptions,
}

/// Sampling options, nested under `options` in the Ollama request.
#[derive(Debug, Default, Serialize)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

impl OllamaOptions {
    fn is_empty(&self) -> bool {
        self.temperature.is_none() && self.top_p.is_none() && self.num_predict.is_none()
    }
}

/// Ollama API response format.
#[derive(Debug, Deserialize)]
struct OllamaResponse {
    model: String,
    response: String,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

/// Error body returned by Ollama on failure.
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
}

/// Outcome of a single failed attempt.
#[derive(Debug)]
enum AttemptError {
    /// Connection problems, timeouts and 5xx responses
    Transient(String),
    /// 4xx responses and undecodable bodies; retrying cannot help
    Fatal(String),
}

/// Ollama LLM client.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    /// Base URL for Ollama API
    base_url: String,

    /// HTTP client
    client: reqwest::Client,

    /// Attempts per request
    max_retries: u32,
}

impl OllamaClient {
    /// Create a new Ollama client with default settings.
    ///
    /// Default URL: http://localhost:11434
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_OLLAMA_URL)
    }

    /// Create a new Ollama client with a custom base URL.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: normalize_base_url(base_url.into()),
            client: reqwest::Client::new(),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Create a client with a request timeout and retry budget.
    pub fn with_settings(
        base_url: impl Into<String>,
        timeout: Duration,
        max_retries: u32,
    ) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                AppError::Config(format!("Failed to create HTTP client for Ollama: {}", e))
            })?;

        Ok(Self {
            base_url: normalize_base_url(base_url.into()),
            client,
            max_retries: max_retries.max(1),
        })
    }

    /// Base URL this client talks to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Convert LlmRequest to Ollama format.
    fn to_ollama_request(&self, request: &LlmRequest) -> OllamaRequest {
        OllamaRequest {
            model: request.model.clone(),
            prompt: request.prompt.clone(),
            system: request.system.clone(),
            stream: false,
            options: OllamaOptions {
                temperature: request.temperature,
                top_p: request.top_p,
                num_predict: request.max_tokens,
            },
        }
    }

    /// Convert Ollama response to LlmResponse.
    fn convert_response(&self, response: OllamaResponse) -> LlmResponse {
        let usage = LlmUsage::new(
            response.prompt_eval_count.unwrap_or(0),
            response.eval_count.unwrap_or(0),
        );

        LlmResponse {
            content: response.response,
            model: response.model,
            usage,
        }
    }

    /// Single completion attempt (no retries).
    async fn complete_once(&self, body: &OllamaRequest) -> Result<OllamaResponse, AttemptError> {
        let url = format!("{}{}", self.base_url, GENERATE_ENDPOINT);

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                AttemptError::Transient(format!("Failed to send request to Ollama: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let detail = serde_json::from_str::<ErrorResponse>(&error_text)
                .map(|e| e.error)
                .unwrap_or(error_text);
            let message = format!("Ollama API error ({}): {}", status, detail);

            return Err(if status.is_server_error() {
                AttemptError::Transient(message)
            } else {
                AttemptError::Fatal(message)
            });
        }

        response
            .json()
            .await
            .map_err(|e| AttemptError::Fatal(format!("Failed to parse Ollama response: {}", e)))
    }
}

impl Default for OllamaClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl LlmClient for OllamaClient {
    fn provider_name(&self) -> &str {
        "ollama"
    }

    #[instrument(skip(self, request), fields(model = %request.model, prompt_len = request.prompt.len()))]
    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        debug!("Sending completion request to Ollama at {}", self.base_url);

        let body = self.to_ollama_request(request);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.complete_once(&body).await {
                Ok(response) => {
                    debug!(
                        "Received completion from Ollama ({} chars)",
                        response.response.len()
                    );
                    return Ok(self.convert_response(response));
                }
                Err(AttemptError::Fatal(message)) => return Err(AppError::Generation(message)),
                Err(AttemptError::Transient(message)) => {
                    if attempt >= self.max_retries {
                        return Err(AppError::Generation(message));
                    }
                    let backoff = backoff_delay(attempt);
                    warn!(
                        "Completion failed (attempt {}/{}), retrying in {:?}: {}",
                        attempt, self.max_retries, backoff, message
                    );
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }
}

fn normalize_base_url(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_ollama_client_creation() {
        let client = OllamaClient::new();
        assert_eq!(client.provider_name(), "ollama");
        assert_eq!(client.base_url(), "http://localhost:11434");
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let client = OllamaClient::with_base_url("http://ollama:11434/");
        assert_eq!(client.base_url(), "http://ollama:11434");
    }

    #[test]
    fn test_ollama_request_conversion() {
        let client = OllamaClient::new();
        let request = LlmRequest::new("Hello", "llama3.2")
            .with_temperature(0.2)
            .with_top_p(0.95)
            .with_max_tokens(100);

        let ollama_req = client.to_ollama_request(&request);
        assert_eq!(ollama_req.model, "llama3.2");
        assert_eq!(ollama_req.prompt, "Hello");
        assert!(!ollama_req.stream);
        assert_eq!(ollama_req.options.temperature, Some(0.2));
        assert_eq!(ollama_req.options.top_p, Some(0.95));
        assert_eq!(ollama_req.options.num_predict, Some(100));
    }

    #[test]
    fn test_sampling_options_are_nested() {
        let client = OllamaClient::new();
        let request = LlmRequest::new("Hello", "llama3.2").with_temperature(0.5);

        let json = serde_json::to_value(client.to_ollama_request(&request)).unwrap();
        assert_eq!(json["options"]["temperature"], 0.5);
        assert!(json.get("temperature").is_none());

        let bare = serde_json::to_value(client.to_ollama_request(&LlmRequest::new("Hi", "m")))
            .unwrap();
        assert!(bare.get("options").is_none());
    }

    #[tokio::test]
    async fn test_complete_returns_raw_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .and(body_partial_json(serde_json::json!({
                "model": "llama3.2",
                "stream": false,
                "options": { "top_p": 0.95 }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "model": "llama3.2",
                "response": "  The crust is crispy.\n",
                "done": true,
                "prompt_eval_count": 40,
                "eval_count": 6
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = OllamaClient::with_base_url(server.uri());
        let request = LlmRequest::new("How is the crust?", "llama3.2").with_top_p(0.95);
        let response = client.complete(&request).await.unwrap();

        assert_eq!(response.content, "  The crust is crispy.\n");
        assert_eq!(response.usage.total_tokens, 46);
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_json(serde_json::json!({ "error": "model 'nope' not found" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client =
            OllamaClient::with_settings(server.uri(), Duration::from_secs(5), 3).unwrap();
        let err = client
            .complete(&LlmRequest::new("Hi", "nope"))
            .await
            .unwrap_err();

        match err {
            AppError::Generation(msg) => assert!(msg.contains("model 'nope' not found")),
            other => panic!("Expected generation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_server_error_is_retried_then_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(503).set_body_string("loading model"))
            .expect(2)
            .mount(&server)
            .await;

        let client =
            OllamaClient::with_settings(server.uri(), Duration::from_secs(5), 2).unwrap();
        let result = client.complete(&LlmRequest::new("Hi", "llama3.2")).await;

        assert!(matches!(result, Err(AppError::Generation(_))));
    }

    #[tokio::test]
    async fn test_unreachable_server() {
        let client = OllamaClient::with_settings(
            "http://127.0.0.1:9",
            Duration::from_millis(500),
            1,
        )
        .unwrap();
        let result = client.complete(&LlmRequest::new("Hi", "llama3.2")).await;
        assert!(matches!(result, Err(AppError::Generation(_))));
    }
}
