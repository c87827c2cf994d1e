//! Review knowledge base for pizzarag.
//!
//! Loads restaurant reviews, embeds them into a local SQLite vector index,
//! and answers questions with retrieval-augmented generation.
//!
//! # Example
//! ```no_run
//! use pizzarag_core::AppConfig;
//! use pizzarag_knowledge::{bootstrap, embeddings::create_provider, QuestionAnswerer};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::load(None)?;
//! let provider = create_provider(&config)?;
//! let (index, report) = bootstrap(&config, provider.clone()).await?;
//! println!("{} reviews indexed", report.entries);
//!
//! let llm = pizzarag_llm::create_client(&config)?;
//! let pipeline = pizzarag_knowledge::build_pipeline(&config, index, provider, llm)?;
//! let interaction = pipeline.answer("How is the crust?").await?;
//! println!("{}", interaction.answer);
//! # Ok(())
//! # }
//! ```

pub mod embeddings;
pub mod index;
pub mod indexer;
pub mod loader;
pub mod rag;
pub mod retriever;
pub mod types;
pub mod vector_index;


// Re-export commonly used types
pub use embeddings::EmbeddingProvider;
pub use index::SqliteIndex;
pub use indexer::Indexer;
pub use loader::{load_reviews, read_reviews};
pub use rag::{AnswerGenerator, QuestionAnswerer, RagPipeline};
pub use retriever::Retriever;
pub use types::{
    CollectionStats, IndexEntry, IndexFailure, IndexReport, Interaction, ReviewMetadata,
    ReviewRecord, ScoredEntry,
};
pub use vector_index::VectorIndex;

use pizzarag_core::{AppConfig, AppResult};
use pizzarag_llm::LlmClient;
use std::sync::Arc;
use std::time::Instant;

/// Load the configured review file and bring the index up to date.
///
/// Returns the opened index together with the indexing report. Records that
/// failed to embed are listed in the report rather than aborting the run, but
/// an unreachable embedding provider fails before the index is touched.
pub async fn bootstrap(
    config: &AppConfig,
    provider: Arc<dyn EmbeddingProvider>,
) -> AppResult<(SqliteIndex, IndexReport)> {
    let start = Instant::now();

    let records = load_reviews(&config.data_path)?;
    provider.verify_connection().await?;
    let mut index = SqliteIndex::open(&config.index_path, &config.collection)?;

    let report = Indexer::new(provider)
        .sync(&mut index, &records, config.reindex)
        .await?;

    tracing::info!(
        "Index ready: {} entries in '{}' ({} indexed, {} failed) in {:?}",
        report.entries,
        config.collection,
        report.indexed,
        report.failures.len(),
        start.elapsed()
    );

    Ok((index, report))
}

/// Assemble the answering pipeline over an already prepared index.
pub fn build_pipeline<I: VectorIndex>(
    config: &AppConfig,
    index: I,
    provider: Arc<dyn EmbeddingProvider>,
    llm: Arc<dyn LlmClient>,
) -> AppResult<RagPipeline<I>> {
    let generator = AnswerGenerator::from_config(llm, config)?;
    Ok(RagPipeline::new(
        index,
        Retriever::new(provider),
        generator,
        config.top_k,
    ))
}
