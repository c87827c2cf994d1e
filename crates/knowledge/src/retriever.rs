//! Query-time retrieval of the reviews closest to a question.

use crate::embeddings::EmbeddingProvider;
use crate::types::ScoredEntry;
use crate::vector_index::VectorIndex;
use pizzarag_core::{AppError, AppResult};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Embeds queries with the indexing provider and searches an index.
#[derive(Debug, Clone)]
pub struct Retriever {
    provider: Arc<dyn EmbeddingProvider>,
}

impl Retriever {
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self { provider }
    }

    /// Return up to `k` entries ranked by similarity to `query`.
    ///
    /// An empty index yields an empty list. Every failure surfaces as
    /// `AppError::Retrieval`.
    #[instrument(skip(self, index), fields(collection = %index.collection()))]
    pub async fn retrieve(
        &self,
        index: &dyn VectorIndex,
        query: &str,
        k: usize,
    ) -> AppResult<Vec<ScoredEntry>> {
        if k == 0 {
            return Err(AppError::Retrieval("k must be at least 1".to_string()));
        }
        if query.trim().is_empty() {
            return Err(AppError::Retrieval("Query cannot be empty".to_string()));
        }

        if index.count().map_err(into_retrieval)? == 0 {
            debug!("Collection '{}' is empty", index.collection());
            return Ok(Vec::new());
        }

        if let Some(model) = index.embedding_model().map_err(into_retrieval)? {
            if model != self.provider.model_name() {
                return Err(AppError::Retrieval(format!(
                    "Collection '{}' was indexed with '{}' but queries use '{}'; reindex first",
                    index.collection(),
                    model,
                    self.provider.model_name()
                )));
            }
        }

        let embedding = self.provider.embed(query).await.map_err(into_retrieval)?;
        let results = index.query(&embedding, k).map_err(into_retrieval)?;

        debug!("Retrieved {} reviews", results.len());
        Ok(results)
    }
}

fn into_retrieval(err: AppError) -> AppError {
    match err {
        AppError::Retrieval(_) => err,
        other => AppError::Retrieval(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::providers::TrigramProvider;
    use crate::index::SqliteIndex;
    use crate::indexer::Indexer;
    use crate::types::ReviewRecord;

    fn record(id: usize, text: &str) -> ReviewRecord {
        ReviewRecord {
            id: id.to_string(),
            text: text.to_string(),
            rating: 5.0,
            date: "2024-01-01".to_string(),
        }
    }

    async fn indexed(records: &[ReviewRecord]) -> (SqliteIndex, Arc<dyn EmbeddingProvider>) {
        let provider: Arc<dyn EmbeddingProvider> = Arc::new(TrigramProvider::new(256));
        let mut index = SqliteIndex::open_in_memory("reviews").unwrap();
        Indexer::new(provider.clone())
            .index(&mut index, records)
            .await
            .unwrap();
        (index, provider)
    }

    #[tokio::test]
    async fn test_single_record_is_found() {
        let (index, provider) = indexed(&[record(0, "Great cheese pizza with crispy crust")]).await;

        let results = Retriever::new(provider)
            .retrieve(&index, "cheese pizza", 5)
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].entry.id, "0");
    }

    #[tokio::test]
    async fn test_empty_index_returns_nothing() {
        let provider: Arc<dyn EmbeddingProvider> = Arc::new(TrigramProvider::new(256));
        let index = SqliteIndex::open_in_memory("reviews").unwrap();

        let results = Retriever::new(provider)
            .retrieve(&index, "anything", 5)
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_record_text_ranks_itself_first() {
        let records = vec![
            record(0, "Great cheese pizza with crispy crust"),
            record(1, "Service was slow and the waiter forgot our drinks"),
            record(2, "Pepperoni was greasy but the garlic knots were excellent"),
        ];
        let (index, provider) = indexed(&records).await;
        let retriever = Retriever::new(provider);

        for r in &records {
            let results = retriever.retrieve(&index, &r.text, 3).await.unwrap();
            assert_eq!(results[0].entry.id, r.id);
            assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
        }
    }

    #[tokio::test]
    async fn test_k_bounds_result_count() {
        let records: Vec<_> = (0..8)
            .map(|i| record(i, &format!("pizza review number {}", i)))
            .collect();
        let (index, provider) = indexed(&records).await;
        let retriever = Retriever::new(provider);

        assert_eq!(retriever.retrieve(&index, "pizza", 5).await.unwrap().len(), 5);
        assert_eq!(retriever.retrieve(&index, "pizza", 20).await.unwrap().len(), 8);
    }

    #[tokio::test]
    async fn test_zero_k_is_rejected() {
        let (index, provider) = indexed(&[record(0, "pizza")]).await;
        let result = Retriever::new(provider).retrieve(&index, "pizza", 0).await;
        assert!(matches!(result, Err(AppError::Retrieval(_))));
    }

    #[tokio::test]
    async fn test_model_mismatch_is_rejected() {
        let (mut index, _) = indexed(&[record(0, "pizza")]).await;
        index.set_embedding_model("mxbai-embed-large").unwrap();

        let provider: Arc<dyn EmbeddingProvider> = Arc::new(TrigramProvider::new(256));
        let err = Retriever::new(provider)
            .retrieve(&index, "pizza", 5)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("reindex"));
    }
}
