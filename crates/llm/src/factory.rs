//! LLM provider factory.
//!
//! Resolves the configured provider name into a concrete `LlmClient`.

use crate::client::LlmClient;
use crate::providers::OllamaClient;
use pizzarag_core::{AppConfig, AppError, AppResult};
use std::sync::Arc;
use std::time::Duration;

/// Create an LLM client for the configured generative provider.
///
/// # Errors
/// Returns `AppError::Config` if the provider is unknown or the HTTP
/// client cannot be built.
pub fn create_client(config: &AppConfig) -> AppResult<Arc<dyn LlmClient>> {
    match config.provider.to_lowercase().as_str() {
        "ollama" => {
            let client = OllamaClient::with_settings(
                &config.base_url,
                Duration::from_secs(config.timeout_secs),
                config.max_retries,
            )?;
            tracing::debug!("Created Ollama client for {}", client.base_url());
            Ok(Arc::new(client))
        }
        other => Err(AppError::Config(format!("Unknown provider: {}", other))),
    }
}
