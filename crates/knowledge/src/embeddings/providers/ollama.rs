//! Ollama Embedding Provider
//!
//! Semantic embeddings from a local Ollama server (`mxbai-embed-large` by default).
//!
//! # Features
//! - Local-first, no API costs
//! - One request per text; Ollama has no batch endpoint for this API
//! - Retry with exponential backoff on transient failures
//!
//! # Example
//! ```no_run
//! use pizzarag_knowledge::embeddings::EmbeddingProvider;
//! use pizzarag_knowledge::embeddings::providers::OllamaProvider;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let provider = OllamaProvider::new("mxbai-embed-large");
//! let embedding = provider.embed("Great cheese pizza").await?;
//! println!("{} dimensions", embedding.len());
//! # Ok(())
//! # }
//! ```

use crate::embeddings::EmbeddingProvider;
use async_trait::async_trait;
use pizzarag_core::retry::backoff_delay;
use pizzarag_core::{AppError, AppResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, instrument, warn};

/// Ollama API endpoint for embeddings
const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
const EMBEDDING_ENDPOINT: &str = "/api/embeddings";

/// Default attempts per embedding request
const DEFAULT_MAX_RETRIES: u32 = 3;

/// Request timeout in seconds
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Ollama embedding provider using local API
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    /// HTTP client for API requests
    client: Client,
    /// Ollama API base URL
    base_url: String,
    /// Model name (e.g., "mxbai-embed-large")
    model: String,
    /// Attempts per text
    max_retries: u32,
}

/// Request payload for Ollama embeddings API
#[derive(Debug, Clone, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

/// Response from Ollama embeddings API
#[derive(Debug, Clone, Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

/// Error response from Ollama API
#[derive(Debug, Clone, Deserialize)]
struct ErrorResponse {
    error: String,
}

/// Outcome of a single failed attempt.
#[derive(Debug)]
enum AttemptError {
    Transient(String),
    Fatal(String),
}

impl OllamaProvider {
    /// Create a provider for `model` against the default local server.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()
                .unwrap_or_default(),
            base_url: DEFAULT_OLLAMA_URL.to_string(),
            model: model.into(),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Create a provider with explicit endpoint, timeout and retry budget.
    pub fn with_settings(
        base_url: &str,
        model: impl Into<String>,
        timeout: Duration,
        max_retries: u32,
    ) -> AppResult<Self> {
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            AppError::Config(format!("Failed to create HTTP client for Ollama: {}", e))
        })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.into(),
            max_retries: max_retries.max(1),
        })
    }

    /// Embed single text with retry logic
    #[instrument(skip(self, text), fields(text_len = text.len(), model = %self.model))]
    async fn embed_with_retries(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.embed_single(text).await {
                Ok(embedding) => return Ok(embedding),
                Err(AttemptError::Fatal(message)) => return Err(AppError::Embedding(message)),
                Err(AttemptError::Transient(message)) => {
                    if attempt >= self.max_retries {
                        return Err(AppError::Embedding(message));
                    }
                    let backoff = backoff_delay(attempt);
                    warn!(
                        "Embedding failed (attempt {}/{}), retrying in {:?}: {}",
                        attempt, self.max_retries, backoff, message
                    );
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }

    /// Embed single text (no retries)
    async fn embed_single(&self, text: &str) -> Result<Vec<f32>, AttemptError> {
        let url = format!("{}{}", self.base_url, EMBEDDING_ENDPOINT);

        let request = EmbeddingRequest {
            model: &self.model,
            prompt: text,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
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

        let body: EmbeddingResponse = response.json().await.map_err(|e| {
            AttemptError::Fatal(format!("Failed to parse Ollama response: {}", e))
        })?;

        if body.embedding.is_empty() {
            return Err(AttemptError::Fatal(format!(
                "Ollama model '{}' returned an empty embedding",
                self.model
            )));
        }

        Ok(body.embedding)
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaProvider {
    fn provider_name(&self) -> &str {
        "ollama"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    /// Verify Ollama is reachable and the model can embed.
    #[instrument(skip(self), fields(model = %self.model))]
    async fn verify_connection(&self) -> AppResult<()> {
        debug!("Verifying Ollama connection at {}", self.base_url);

        match self.embed_with_retries("test connection").await {
            Ok(_) => {
                debug!("Ollama connection verified, model '{}' ready", self.model);
                Ok(())
            }
            Err(e) => {
                error!("Failed to connect to Ollama: {}", e);
                Err(AppError::Embedding(format!(
                    "Ollama not available at {}. Ensure Ollama is running and model '{}' is installed. Run: ollama pull {}",
                    self.base_url, self.model, self.model
                )))
            }
        }
    }

    #[instrument(skip(self, text), fields(text_len = text.len(), provider = "ollama", model = %self.model))]
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(AppError::Embedding("Cannot embed empty text".to_string()));
        }

        self.embed_with_retries(text).await
    }
}
