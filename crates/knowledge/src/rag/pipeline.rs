//! Question answering over an indexed review collection.

use super::generate::AnswerGenerator;
use super::QuestionAnswerer;
use crate::retriever::Retriever;
use crate::types::Interaction;
use crate::vector_index::VectorIndex;
use async_trait::async_trait;
use pizzarag_core::AppResult;

/// Retrieval followed by generation, over one index.
pub struct RagPipeline<I: VectorIndex> {
    index: I,
    retriever: Retriever,
    generator: AnswerGenerator,
    top_k: usize,
}

impl<I: VectorIndex> RagPipeline<I> {
    pub fn new(index: I, retriever: Retriever, generator: AnswerGenerator, top_k: usize) -> Self {
        Self {
            index,
            retriever,
            generator,
            top_k,
        }
    }

    pub fn index(&self) -> &I {
        &self.index
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }
}

#[async_trait]
impl<I: VectorIndex> QuestionAnswerer for RagPipeline<I> {
    async fn answer(&self, question: &str) -> AppResult<Interaction> {
        let retrieved = self
            .retriever
            .retrieve(&self.index, question, self.top_k)
            .await?;

        tracing::info!(
            "Answering with {} retrieved reviews (best score {:.3})",
            retrieved.len(),
            retrieved.first().map(|r| r.score).unwrap_or(0.0)
        );

        let answer = self.generator.generate(question, &retrieved).await?;

        Ok(Interaction {
            question: question.to_string(),
            retrieved,
            answer,
        })
    }
}
