//! RAG (Retrieval-Augmented Generation) answering over restaurant reviews.

pub mod generate;
pub mod pipeline;

pub use generate::{format_reviews, AnswerGenerator};
pub use pipeline::RagPipeline;

use crate::types::Interaction;
use pizzarag_core::AppResult;

/// Anything that can turn a question into an answered interaction.
#[async_trait::async_trait]
pub trait QuestionAnswerer: Send + Sync {
    async fn answer(&self, question: &str) -> AppResult<Interaction>;
}
