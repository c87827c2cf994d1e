//! Chat command handler.
//!
//! Runs the interactive question loop on stdin/stdout.

use crate::session::Session;
use crate::trace::TraceLog;
use clap::Args;
use pizzarag_core::{AppConfig, AppResult};

/// Interactive question loop
#[derive(Args, Debug, Default)]
pub struct ChatCommand {}

impl ChatCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing chat command");

        let pipeline = super::open_pipeline(config).await?;
        let trace = TraceLog::from_config(config);
        if let Some(trace) = &trace {
            tracing::debug!("Tracing interactions to {:?}", trace.path());
        }

        let stdin = std::io::stdin();
        let stdout = std::io::stdout();
        Session::new(&pipeline, trace)
            .run(stdin.lock(), stdout.lock())
            .await?;

        Ok(())
    }
}
