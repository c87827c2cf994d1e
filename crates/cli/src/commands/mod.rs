//! Command handlers for the pizzarag CLI.
//!
//! This module organizes all CLI commands into separate submodules.

pub mod ask;
pub mod chat;
pub mod eval;
pub mod index;
pub mod stats;

// Re-export command types for convenience
pub use ask::AskCommand;
pub use chat::ChatCommand;
pub use eval::EvalCommand;
pub use index::IndexCommand;
pub use stats::StatsCommand;

use pizzarag_core::{AppConfig, AppResult};
use pizzarag_knowledge::embeddings::create_provider;
use pizzarag_knowledge::{bootstrap, build_pipeline, IndexReport, RagPipeline, SqliteIndex};

/// Load reviews, update the index, and assemble the answering pipeline.
///
/// Fails when nothing could be indexed; partial failures are only logged.
pub(crate) async fn open_pipeline(config: &AppConfig) -> AppResult<RagPipeline<SqliteIndex>> {
    let provider = create_provider(config)?;
    let (index, report) = bootstrap(config, provider.clone()).await?;
    let report = check_report(report)?;

    tracing::debug!("Pipeline ready over {} entries", report.entries);

    let llm = pizzarag_llm::create_client(config)?;
    build_pipeline(config, index, provider, llm)
}

fn check_report(report: IndexReport) -> AppResult<IndexReport> {
    if report.is_complete() {
        return Ok(report);
    }
    if report.entries == 0 {
        return report.into_result();
    }

    if let Some(first) = report.failures.first() {
        tracing::warn!(
            "{} reviews could not be indexed (first: review {}: {}); continuing with {} entries",
            report.failures.len(),
            first.id,
            first.reason,
            report.entries
        );
    }
    Ok(report)
}
