//! Embedding providers for review text and queries.

pub mod provider;
pub mod providers;

pub use provider::{create_provider, EmbeddingProvider};
