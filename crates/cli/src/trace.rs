//! Append-only plain-text record of answered questions.

use pizzarag_core::{AppConfig, AppResult};
use pizzarag_knowledge::Interaction;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Trace file writer.
#[derive(Debug, Clone)]
pub struct TraceLog {
    path: PathBuf,
    excerpt_chars: usize,
}

impl TraceLog {
    pub fn new(path: impl Into<PathBuf>, excerpt_chars: usize) -> Self {
        Self {
            path: path.into(),
            excerpt_chars,
        }
    }

    /// Trace log for `config`, or `None` when tracing is disabled.
    pub fn from_config(config: &AppConfig) -> Option<Self> {
        config
            .trace_log
            .as_ref()
            .map(|path| Self::new(path, config.trace_excerpt_chars))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one interaction.
    pub fn append(&self, interaction: &Interaction) -> AppResult<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(self.render(interaction).as_bytes())?;
        Ok(())
    }

    fn render(&self, interaction: &Interaction) -> String {
        let mut record = format!("QUESTION: {}\nRETRIEVED:\n", interaction.question);
        for scored in &interaction.retrieved {
            let excerpt: String = scored.entry.text.chars().take(self.excerpt_chars).collect();
            record.push_str(&format!("- {}...\n", excerpt));
        }
        record.push_str(&format!("ANSWER: {}\n\n", interaction.answer));
        record
    }
}
