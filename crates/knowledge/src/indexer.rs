//! Review indexing: embed each record and upsert it into a vector index.

use crate::embeddings::EmbeddingProvider;
use crate::types::{IndexEntry, IndexFailure, IndexReport, ReviewRecord};
use crate::vector_index::VectorIndex;
use pizzarag_core::{AppResult, ReindexPolicy};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Embeds review records and writes them into an index.
#[derive(Debug, Clone)]
pub struct Indexer {
    provider: Arc<dyn EmbeddingProvider>,
}

impl Indexer {
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self { provider }
    }

    /// Bring `index` up to date with `records` according to `policy`.
    pub async fn sync(
        &self,
        index: &mut dyn VectorIndex,
        records: &[ReviewRecord],
        policy: ReindexPolicy,
    ) -> AppResult<IndexReport> {
        match policy {
            ReindexPolicy::IfEmpty => {
                let entries = index.count()?;
                if entries > 0 && self.model_matches(index)? {
                    info!(
                        "Collection '{}' already holds {} entries, skipping indexing",
                        index.collection(),
                        entries
                    );
                    return Ok(IndexReport {
                        skipped: true,
                        entries,
                        ..Default::default()
                    });
                }
            }
            ReindexPolicy::Rebuild => {
                info!("Rebuilding collection '{}'", index.collection());
                index.reset()?;
            }
            ReindexPolicy::Upsert => {}
        }

        self.index(index, records).await
    }

    /// Embed and upsert every record.
    ///
    /// A record that fails is reported and skipped; the rest are still indexed.
    /// A collection built with a different embedding model is reset first.
    pub async fn index(
        &self,
        index: &mut dyn VectorIndex,
        records: &[ReviewRecord],
    ) -> AppResult<IndexReport> {
        if !self.model_matches(index)? {
            warn!(
                "Collection '{}' was built with a different embedding model, resetting",
                index.collection()
            );
            index.reset()?;
        }
        index.set_embedding_model(self.provider.model_name())?;

        info!(
            "Indexing {} reviews into '{}' using {} ({})",
            records.len(),
            index.collection(),
            self.provider.provider_name(),
            self.provider.model_name()
        );

        let mut report = IndexReport::default();

        for record in records {
            match self.index_record(index, record).await {
                Ok(()) => {
                    report.indexed += 1;
                    debug!("Indexed review {}", record.id);
                }
                Err(e) => {
                    warn!("Failed to index review {}: {}", record.id, e);
                    report.failures.push(IndexFailure {
                        id: record.id.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        report.entries = index.count()?;

        info!(
            "Indexed {}/{} reviews ({} failed, {} entries in collection)",
            report.indexed,
            records.len(),
            report.failures.len(),
            report.entries
        );

        Ok(report)
    }

    async fn index_record(
        &self,
        index: &mut dyn VectorIndex,
        record: &ReviewRecord,
    ) -> AppResult<()> {
        let embedding = self.provider.embed(&record.text).await?;
        index.upsert(&IndexEntry::from_record(record, embedding))
    }

    fn model_matches(&self, index: &dyn VectorIndex) -> AppResult<bool> {
        Ok(match index.embedding_model()? {
            Some(model) => model == self.provider.model_name(),
            None => true,
        })
    }
}
