//! Embedding provider trait and factory.

use super::providers::{OllamaProvider, TrigramProvider, DEFAULT_TRIGRAM_DIMENSIONS};
use pizzarag_core::{AppConfig, AppError, AppResult};
use std::sync::Arc;
use std::time::Duration;

/// Trait for embedding providers.
///
/// The same provider and model must embed both the indexed reviews and the
/// queries run against them.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Get provider name (e.g., "ollama", "trigram")
    fn provider_name(&self) -> &str;

    /// Get model identifier, recorded next to the vectors it produced
    fn model_name(&self) -> &str;

    /// Check the provider can embed before any indexing starts.
    async fn verify_connection(&self) -> AppResult<()> {
        Ok(())
    }

    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>>;

    /// Generate embeddings for several texts, in input order.
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }
}

/// Create an embedding provider based on configuration.
pub fn create_provider(config: &AppConfig) -> AppResult<Arc<dyn EmbeddingProvider>> {
    match config.embedding_provider.to_lowercase().as_str() {
        "ollama" => {
            let provider = OllamaProvider::with_settings(
                &config.base_url,
                &config.embedding_model,
                Duration::from_secs(config.timeout_secs),
                config.max_retries,
            )?;
            Ok(Arc::new(provider))
        }

        "trigram" => Ok(Arc::new(TrigramProvider::new(DEFAULT_TRIGRAM_DIMENSIONS))),

        _ => Err(AppError::Config(format!(
            "Unknown embedding provider: '{}'. Supported providers: ollama, trigram",
            config.embedding_provider
        ))),
    }
}
