//! Ask command handler.
//!
//! Answers one question and exits.

use crate::trace::TraceLog;
use clap::Args;
use pizzarag_core::{AppConfig, AppError, AppResult};
use pizzarag_knowledge::{Interaction, QuestionAnswerer};

/// Answer a single question
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    #[arg(required = true, num_args = 1..)]
    pub question: Vec<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");
        tracing::debug!("Ask command options: {:?}", self);

        let question = self.question.join(" ");
        if question.trim().is_empty() {
            return Err(AppError::Config("No question provided".to_string()));
        }

        let pipeline = super::open_pipeline(config).await?;
        let interaction = pipeline.answer(question.trim()).await?;

        if let Some(trace) = TraceLog::from_config(config) {
            if let Err(e) = trace.append(&interaction) {
                tracing::warn!("Failed to write trace log {:?}: {}", trace.path(), e);
            }
        }

        if self.json {
            println!("{}", render_json(&interaction, &config.model)?);
        } else {
            println!("{}", interaction.answer);
        }

        Ok(())
    }
}

fn render_json(interaction: &Interaction, model: &str) -> AppResult<String> {
    let retrieved: Vec<_> = interaction
        .retrieved
        .iter()
        .map(|r| {
            serde_json::json!({
                "id": r.entry.id,
                "score": r.score,
                "rating": r.entry.metadata.rating,
                "date": r.entry.metadata.date,
            })
        })
        .collect();

    let output = serde_json::json!({
        "question": interaction.question,
        "answer": interaction.answer,
        "model": model,
        "retrieved": retrieved,
    });

    Ok(serde_json::to_string_pretty(&output)?)
}
