//! Stats command handler.
//!
//! Shows what the index currently holds, without reindexing.

use clap::Args;
use pizzarag_core::{AppConfig, AppResult};
use pizzarag_knowledge::{SqliteIndex, VectorIndex};

/// Show index statistics
#[derive(Args, Debug)]
pub struct StatsCommand {
    /// Also show the first stored entry
    #[arg(long)]
    pub sample: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing stats command");
        tracing::debug!("Stats options: {:?}", self);

        let index = SqliteIndex::open(&config.index_path, &config.collection)?;
        let stats = index.stats()?;
        let sample = if self.sample {
            index.get_all()?.into_iter().next()
        } else {
            None
        };

        if self.json {
            let output = serde_json::json!({
                "stats": stats,
                "sample": sample,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
            return Ok(());
        }

        println!("Collection:      {}", stats.collection);
        println!("Entries:         {}", stats.entries);
        println!(
            "Embedding model: {}",
            stats.embedding_model.as_deref().unwrap_or("-")
        );
        println!(
            "Dimensions:      {}",
            stats
                .dimensions
                .map(|d| d.to_string())
                .unwrap_or_else(|| "-".to_string())
        );
        println!(
            "Updated:         {}",
            stats
                .updated_at
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "never".to_string())
        );

        if self.sample {
            match sample {
                Some(entry) => {
                    println!();
                    println!("Sample entry {}:", entry.id);
                    println!("  text:     {}", entry.text);
                    println!(
                        "  metadata: rating {}, date {}",
                        entry.metadata.rating, entry.metadata.date
                    );
                }
                None => println!("\nNo entries stored."),
            }
        }

        Ok(())
    }
}
