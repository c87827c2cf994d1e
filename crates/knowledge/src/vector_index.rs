//! Vector index abstraction for review entries.
//!
//! Defines a trait for backend-agnostic vector storage and retrieval.

use crate::types::{CollectionStats, IndexEntry, ScoredEntry};
use pizzarag_core::AppResult;

/// Trait for vector index backends.
///
/// An index holds one named collection. Implementations must support:
/// - Upserting entries keyed by id
/// - Top-k cosine similarity search
/// - Recording which embedding model produced the stored vectors
/// - Resetting the collection
pub trait VectorIndex: Send + Sync {
    /// Name of the collection this index serves.
    fn collection(&self) -> &str;

    /// Insert or replace an entry. Re-upserting an id never duplicates it.
    fn upsert(&mut self, entry: &IndexEntry) -> AppResult<()>;

    /// Return the `k` entries most similar to `embedding`.
    ///
    /// Results are ordered by descending score; equal scores keep ascending id order.
    fn query(&self, embedding: &[f32], k: usize) -> AppResult<Vec<ScoredEntry>>;

    /// All entries in id order.
    fn get_all(&self) -> AppResult<Vec<IndexEntry>>;

    /// Number of stored entries.
    fn count(&self) -> AppResult<usize>;

    /// Remove every entry and forget the recorded model.
    fn reset(&mut self) -> AppResult<()>;

    /// Embedding model that produced the stored vectors, if recorded.
    fn embedding_model(&self) -> AppResult<Option<String>>;

    /// Record the embedding model used for this collection.
    fn set_embedding_model(&mut self, model: &str) -> AppResult<()>;

    /// Collection summary.
    fn stats(&self) -> AppResult<CollectionStats>;
}

/// Order ids by length, then lexically within equal length.
///
/// Unpadded numeric row ids therefore sort by value.
pub(crate) fn id_order(a: &str, b: &str) -> std::cmp::Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// Cosine similarity between two vectors of equal length.
pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}
