//! LLM integration crate for pizzarag.
//!
//! Provides a provider-agnostic abstraction for generative models behind
//! the `LlmClient` trait, with Ollama as the local-first implementation.
//!
//! # Example
//! ```no_run
//! use pizzarag_llm::{LlmClient, LlmRequest, providers::OllamaClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::new();
//! let request = LlmRequest::new("Is the pizza good?", "llama3.2")
//!     .with_temperature(0.2)
//!     .with_top_p(0.95);
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;

// Re-export main types
pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::create_client;
pub use providers::OllamaClient;
