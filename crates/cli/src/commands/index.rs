//! Index command handler.
//!
//! Loads the review file and brings the vector index up to date.

use clap::Args;
use pizzarag_core::{AppConfig, AppResult};
use pizzarag_knowledge::bootstrap;
use pizzarag_knowledge::embeddings::create_provider;

/// Load the review file and update the index
#[derive(Args, Debug)]
pub struct IndexCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IndexCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing index command");

        let provider = create_provider(config)?;
        let (_index, report) = bootstrap(config, provider).await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else if report.skipped {
            println!(
                "Collection '{}' already holds {} entries; skipped (policy: {})",
                config.collection, report.entries, config.reindex
            );
        } else {
            println!(
                "Indexed {} reviews into '{}' ({} entries, {} failed)",
                report.indexed,
                config.collection,
                report.entries,
                report.failures.len()
            );
            for failure in &report.failures {
                eprintln!("  review {}: {}", failure.id, failure.reason);
            }
        }

        report.into_result().map(|_| ())
    }
}
