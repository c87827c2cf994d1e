//! pizzarag CLI
//!
//! Main entry point for the pizzarag command-line tool.
//! Answers questions about a pizza restaurant from its customer reviews
//! using a local embedding index and a local model served by Ollama.

mod commands;
mod session;
mod trace;

use anyhow::Context;
use clap::{Parser, Subcommand};
use commands::{AskCommand, ChatCommand, EvalCommand, IndexCommand, StatsCommand};
use pizzarag_core::config::{AppConfig, ConfigOverrides};
use pizzarag_core::{logging, ReindexPolicy};
use std::path::PathBuf;

/// pizzarag - ask questions about a pizza restaurant's reviews
#[derive(Parser, Debug)]
#[command(name = "pizzarag")]
#[command(about = "Question answering over restaurant reviews with local RAG", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to config file (default: ./pizzarag.yaml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Review CSV file
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    /// SQLite index file
    #[arg(long, global = true)]
    index_path: Option<PathBuf>,

    /// Collection name inside the index
    #[arg(long, global = true)]
    collection: Option<String>,

    /// Reindex policy at startup (upsert, if-empty, rebuild)
    #[arg(long, global = true)]
    reindex: Option<ReindexPolicy>,

    /// Ollama base URL
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Generation model identifier
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Embedding provider (ollama, trigram)
    #[arg(long, global = true)]
    embedding_provider: Option<String>,

    /// Embedding model identifier
    #[arg(long, global = true)]
    embed_model: Option<String>,

    /// Number of reviews retrieved per question
    #[arg(short = 'k', long, global = true)]
    top_k: Option<usize>,

    /// Sampling temperature (0.0-2.0)
    #[arg(long, global = true)]
    temperature: Option<f32>,

    /// Nucleus sampling threshold (0.0-1.0]
    #[arg(long, global = true)]
    top_p: Option<f32>,

    /// Trace log file
    #[arg(long, global = true, conflicts_with = "no_trace")]
    trace_log: Option<PathBuf>,

    /// Disable the trace log
    #[arg(long, global = true)]
    no_trace: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            config_file: self.config.clone(),
            data_path: self.data.clone(),
            index_path: self.index_path.clone(),
            collection: self.collection.clone(),
            reindex: self.reindex,
            base_url: self.base_url.clone(),
            model: self.model.clone(),
            embedding_provider: self.embedding_provider.clone(),
            embedding_model: self.embed_model.clone(),
            top_k: self.top_k,
            temperature: self.temperature,
            top_p: self.top_p,
            trace_log: self.trace_log.clone(),
            no_trace: self.no_trace,
            log_level: self.log_level.clone(),
            verbose: self.verbose,
            no_color: self.no_color,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Interactive question loop (default)
    Chat(ChatCommand),

    /// Answer a single question
    Ask(AskCommand),

    /// Load the review file and update the index
    Index(IndexCommand),

    /// Show index statistics
    Stats(StatsCommand),

    /// Run keyword checks against generated answers
    Eval(EvalCommand),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    // Defaults, then config file, then environment, then flags
    let config = AppConfig::load(cli.config.as_deref())
        .context("Failed to load configuration")?
        .with_overrides(cli.overrides());
    config.validate().context("Invalid configuration")?;

    logging::init_logging(config.log_level.as_deref(), config.no_color)?;

    tracing::info!("pizzarag starting");
    tracing::debug!("Data: {:?}", config.data_path);
    tracing::debug!(
        "Index: {:?} (collection '{}')",
        config.index_path,
        config.collection
    );
    tracing::debug!(
        "Models: {} / {} via {}",
        config.model,
        config.embedding_model,
        config.embedding_provider
    );

    let command = cli
        .command
        .unwrap_or(Commands::Chat(ChatCommand::default()));

    // Emit command span
    let command_name = match &command {
        Commands::Chat(_) => "chat",
        Commands::Ask(_) => "ask",
        Commands::Index(_) => "index",
        Commands::Stats(_) => "stats",
        Commands::Eval(_) => "eval",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    let result = match command {
        Commands::Chat(cmd) => cmd.execute(&config).await,
        Commands::Ask(cmd) => cmd.execute(&config).await,
        Commands::Index(cmd) => cmd.execute(&config).await,
        Commands::Stats(cmd) => cmd.execute(&config).await,
        Commands::Eval(cmd) => cmd.execute(&config).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    Ok(result?)
}
