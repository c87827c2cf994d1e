//! Configuration management for pizzarag.
//!
//! Configuration is merged from four layers, later layers winning:
//! 1. Built-in defaults
//! 2. YAML config file (`pizzarag.yaml` or `PIZZARAG_CONFIG`)
//! 3. Environment variables
//! 4. Command-line flags (`ConfigOverrides`)
//!
//! There is exactly one set of defaults; every component reads its
//! settings from the resulting `AppConfig`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{AppError, AppResult};

/// Default config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "pizzarag.yaml";

/// Shortest trace excerpt allowed; retrieved snippets keep at least this many characters.
pub const MIN_TRACE_EXCERPT_CHARS: usize = 200;

/// Most attempts allowed per Ollama request.
pub const MAX_RETRIES_LIMIT: u32 = 10;

const KNOWN_LLM_PROVIDERS: [&str; 1] = ["ollama"];
const KNOWN_EMBEDDING_PROVIDERS: [&str; 2] = ["ollama", "trigram"];

/// What to do with an existing collection when the service starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReindexPolicy {
    /// Upsert every record on each start; stable ids keep this idempotent.
    #[default]
    Upsert,
    /// Only index when the collection holds no entries.
    IfEmpty,
    /// Drop the collection and index from scratch.
    Rebuild,
}

impl ReindexPolicy {
    /// Canonical name used in config files and flags.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Upsert => "upsert",
            Self::IfEmpty => "if-empty",
            Self::Rebuild => "rebuild",
        }
    }
}

impl FromStr for ReindexPolicy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "upsert" | "always" => Ok(Self::Upsert),
            "if-empty" | "if_empty" => Ok(Self::IfEmpty),
            "rebuild" => Ok(Self::Rebuild),
            other => Err(AppError::Config(format!(
                "Unknown reindex policy: {}. Supported: upsert, if-empty, rebuild",
                other
            ))),
        }
    }
}

impl fmt::Display for ReindexPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Config file that was merged, if any
    pub config_file: Option<PathBuf>,

    /// CSV file with `Title, Review, Rating, Date` columns
    pub data_path: PathBuf,

    /// SQLite file backing the vector index
    pub index_path: PathBuf,

    /// Collection name inside the index
    pub collection: String,

    /// What to do with an existing collection at startup
    pub reindex: ReindexPolicy,

    /// Base URL of the Ollama server
    pub base_url: String,

    /// HTTP request timeout in seconds
    pub timeout_secs: u64,

    /// Attempts per HTTP call before giving up
    pub max_retries: u32,

    /// Generative model provider
    pub provider: String,

    /// Generative model identifier
    pub model: String,

    /// Sampling temperature for generation
    pub temperature: f32,

    /// Nucleus sampling threshold for generation
    pub top_p: f32,

    /// Optional YAML prompt definition replacing the built-in template
    pub prompt_file: Option<PathBuf>,

    /// Embedding provider ("ollama" or the offline "trigram" hasher)
    pub embedding_provider: String,

    /// Embedding model identifier
    pub embedding_model: String,

    /// Number of reviews retrieved per question
    pub top_k: usize,

    /// Append-only interaction log; `None` disables tracing
    pub trace_log: Option<PathBuf>,

    /// Characters of each retrieved review kept in the trace log
    pub trace_excerpt_chars: usize,

    /// Log filter override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config_file: None,
            data_path: PathBuf::from("data/realistic_restaurant_reviews.csv"),
            index_path: PathBuf::from("vector_db/reviews.sqlite"),
            collection: "restaurant_reviews".to_string(),
            reindex: ReindexPolicy::default(),
            base_url: "http://localhost:11434".to_string(),
            timeout_secs: 120,
            max_retries: 3,
            provider: "ollama".to_string(),
            model: "llama3.2".to_string(),
            temperature: 0.2,
            top_p: 0.95,
            prompt_file: None,
            embedding_provider: "ollama".to_string(),
            embedding_model: "mxbai-embed-large".to_string(),
            top_k: 5,
            trace_log: Some(PathBuf::from("rag_log.txt")),
            trace_excerpt_chars: MIN_TRACE_EXCERPT_CHARS,
            log_level: None,
            verbose: false,
            no_color: false,
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    data: Option<DataSection>,
    index: Option<IndexSection>,
    ollama: Option<OllamaSection>,
    generation: Option<GenerationSection>,
    embedding: Option<EmbeddingSection>,
    retrieval: Option<RetrievalSection>,
    trace: Option<TraceSection>,
    logging: Option<LoggingSection>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct DataSection {
    path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct IndexSection {
    path: Option<PathBuf>,
    collection: Option<String>,
    reindex: Option<ReindexPolicy>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OllamaSection {
    base_url: Option<String>,
    timeout_secs: Option<u64>,
    max_retries: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerationSection {
    provider: Option<String>,
    model: Option<String>,
    temperature: Option<f32>,
    top_p: Option<f32>,
    prompt_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct EmbeddingSection {
    provider: Option<String>,
    model: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RetrievalSection {
    top_k: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TraceSection {
    enabled: Option<bool>,
    path: Option<PathBuf>,
    excerpt_chars: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct LoggingSection {
    level: Option<String>,
    color: Option<bool>,
}

/// Command-line overrides, applied last.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_file: Option<PathBuf>,
    pub data_path: Option<PathBuf>,
    pub index_path: Option<PathBuf>,
    pub collection: Option<String>,
    pub reindex: Option<ReindexPolicy>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub embedding_provider: Option<String>,
    pub embedding_model: Option<String>,
    pub top_k: Option<usize>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub trace_log: Option<PathBuf>,
    pub no_trace: bool,
    pub log_level: Option<String>,
    pub verbose: bool,
    pub no_color: bool,
}

impl AppConfig {
    /// Load configuration from the config file and process environment.
    ///
    /// Environment variables:
    /// - `PIZZARAG_CONFIG`: Path to config file
    /// - `PIZZARAG_DATA`: Review CSV path
    /// - `PIZZARAG_INDEX_PATH`: Vector index file
    /// - `PIZZARAG_COLLECTION`: Collection name
    /// - `PIZZARAG_REINDEX`: Reindex policy
    /// - `OLLAMA_BASE_URL`: Ollama server URL
    /// - `PIZZARAG_PROVIDER`: Generative provider
    /// - `PIZZARAG_MODEL`: Generative model
    /// - `PIZZARAG_EMBEDDING_PROVIDER`: Embedding provider
    /// - `PIZZARAG_EMBED_MODEL`: Embedding model
    /// - `PIZZARAG_TOP_K`: Reviews retrieved per question
    /// - `PIZZARAG_TRACE_LOG`: Interaction log path
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use pizzarag_core::config::AppConfig;
    ///
    /// let config = AppConfig::load(None).expect("Failed to load config");
    /// println!("Index: {:?}", config.index_path);
    /// ```
    pub fn load(config_file: Option<&Path>) -> AppResult<Self> {
        Self::load_with(config_file, |key| std::env::var(key).ok())
    }

    /// Load configuration using an injectable environment lookup.
    pub fn load_with<F>(config_file: Option<&Path>, env: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        let explicit = config_file
            .map(Path::to_path_buf)
            .or_else(|| env("PIZZARAG_CONFIG").map(PathBuf::from));

        match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(AppError::Config(format!(
                        "Config file does not exist: {:?}",
                        path
                    )));
                }
                config.merge_yaml(&path)?;
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    config.merge_yaml(&default_path)?;
                }
            }
        }

        config.merge_env(env)?;

        Ok(config)
    }

    /// Merge a YAML configuration file into this config.
    fn merge_yaml(&mut self, path: &Path) -> AppResult<()> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        self.apply_file(file);
        self.config_file = Some(path.to_path_buf());

        tracing::debug!("Merged config file {:?}", path);
        Ok(())
    }

    fn apply_file(&mut self, file: ConfigFile) {
        if let Some(data) = file.data {
            if let Some(path) = data.path {
                self.data_path = path;
            }
        }

        if let Some(index) = file.index {
            if let Some(path) = index.path {
                self.index_path = path;
            }
            if let Some(collection) = index.collection {
                self.collection = collection;
            }
            if let Some(reindex) = index.reindex {
                self.reindex = reindex;
            }
        }

        if let Some(ollama) = file.ollama {
            if let Some(base_url) = ollama.base_url {
                self.base_url = base_url;
            }
            if let Some(timeout) = ollama.timeout_secs {
                self.timeout_secs = timeout;
            }
            if let Some(retries) = ollama.max_retries {
                self.max_retries = retries;
            }
        }

        if let Some(generation) = file.generation {
            if let Some(provider) = generation.provider {
                self.provider = provider;
            }
            if let Some(model) = generation.model {
                self.model = model;
            }
            if let Some(temperature) = generation.temperature {
                self.temperature = temperature;
            }
            if let Some(top_p) = generation.top_p {
                self.top_p = top_p;
            }
            if generation.prompt_file.is_some() {
                self.prompt_file = generation.prompt_file;
            }
        }

        if let Some(embedding) = file.embedding {
            if let Some(provider) = embedding.provider {
                self.embedding_provider = provider;
            }
            if let Some(model) = embedding.model {
                self.embedding_model = model;
            }
        }

        if let Some(retrieval) = file.retrieval {
            if let Some(top_k) = retrieval.top_k {
                self.top_k = top_k;
            }
        }

        if let Some(trace) = file.trace {
            if let Some(path) = trace.path {
                self.trace_log = Some(path);
            }
            if trace.enabled == Some(false) {
                self.trace_log = None;
            }
            if let Some(chars) = trace.excerpt_chars {
                self.trace_excerpt_chars = chars;
            }
        }

        if let Some(logging) = file.logging {
            if let Some(level) = logging.level {
                self.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                self.no_color = !color;
            }
        }
    }

    /// Environment variables override YAML config.
    fn merge_env<F>(&mut self, env: F) -> AppResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = env("PIZZARAG_DATA") {
            self.data_path = PathBuf::from(path);
        }
        if let Some(path) = env("PIZZARAG_INDEX_PATH") {
            self.index_path = PathBuf::from(path);
        }
        if let Some(collection) = env("PIZZARAG_COLLECTION") {
            self.collection = collection;
        }
        if let Some(policy) = env("PIZZARAG_REINDEX") {
            self.reindex = policy.parse()?;
        }
        if let Some(base_url) = env("OLLAMA_BASE_URL") {
            self.base_url = base_url;
        }
        if let Some(provider) = env("PIZZARAG_PROVIDER") {
            self.provider = provider;
        }
        if let Some(model) = env("PIZZARAG_MODEL") {
            self.model = model;
        }
        if let Some(provider) = env("PIZZARAG_EMBEDDING_PROVIDER") {
            self.embedding_provider = provider;
        }
        if let Some(model) = env("PIZZARAG_EMBED_MODEL") {
            self.embedding_model = model;
        }
        if let Some(top_k) = env("PIZZARAG_TOP_K") {
            self.top_k = top_k.trim().parse().map_err(|e| {
                AppError::Config(format!("Invalid PIZZARAG_TOP_K '{}': {}", top_k, e))
            })?;
        }
        if let Some(path) = env("PIZZARAG_TRACE_LOG") {
            self.trace_log = if path.trim().is_empty() {
                None
            } else {
                Some(PathBuf::from(path))
            };
        }
        if let Some(level) = env("RUST_LOG") {
            self.log_level = Some(level);
        }
        if env("NO_COLOR").is_some() {
            self.no_color = true;
        }

        Ok(())
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// Flags take precedence over environment variables and the config file.
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(path) = overrides.config_file {
            self.config_file = Some(path);
        }
        if let Some(path) = overrides.data_path {
            self.data_path = path;
        }
        if let Some(path) = overrides.index_path {
            self.index_path = path;
        }
        if let Some(collection) = overrides.collection {
            self.collection = collection;
        }
        if let Some(reindex) = overrides.reindex {
            self.reindex = reindex;
        }
        if let Some(base_url) = overrides.base_url {
            self.base_url = base_url;
        }
        if let Some(model) = overrides.model {
            self.model = model;
        }
        if let Some(provider) = overrides.embedding_provider {
            self.embedding_provider = provider;
        }
        if let Some(model) = overrides.embedding_model {
            self.embedding_model = model;
        }
        if let Some(top_k) = overrides.top_k {
            self.top_k = top_k;
        }
        if let Some(temperature) = overrides.temperature {
            self.temperature = temperature;
        }
        if let Some(top_p) = overrides.top_p {
            self.top_p = top_p;
        }
        if let Some(path) = overrides.trace_log {
            self.trace_log = Some(path);
        }
        if overrides.no_trace {
            self.trace_log = None;
        }
        if let Some(level) = overrides.log_level {
            self.log_level = Some(level);
        }

        if overrides.verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if overrides.no_color {
            self.no_color = true;
        }

        self
    }

    /// Validate the merged configuration.
    pub fn validate(&self) -> AppResult<()> {
        if !KNOWN_LLM_PROVIDERS.contains(&self.provider.to_lowercase().as_str()) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                self.provider,
                KNOWN_LLM_PROVIDERS.join(", ")
            )));
        }

        if !KNOWN_EMBEDDING_PROVIDERS
            .contains(&self.embedding_provider.to_lowercase().as_str())
        {
            return Err(AppError::Config(format!(
                "Unknown embedding provider: {}. Supported: {}",
                self.embedding_provider,
                KNOWN_EMBEDDING_PROVIDERS.join(", ")
            )));
        }

        if self.top_k == 0 {
            return Err(AppError::Config("top_k must be at least 1".to_string()));
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(AppError::Config(format!(
                "temperature must be within 0.0-2.0, got {}",
                self.temperature
            )));
        }

        if !(self.top_p > 0.0 && self.top_p <= 1.0) {
            return Err(AppError::Config(format!(
                "top_p must be within (0.0, 1.0], got {}",
                self.top_p
            )));
        }

        if self.max_retries == 0 || self.max_retries > MAX_RETRIES_LIMIT {
            return Err(AppError::Config(format!(
                "max_retries must be within 1-{}, got {}",
                MAX_RETRIES_LIMIT, self.max_retries
            )));
        }

        if self.collection.trim().is_empty() {
            return Err(AppError::Config(
                "collection name cannot be empty".to_string(),
            ));
        }

        if self.trace_excerpt_chars < MIN_TRACE_EXCERPT_CHARS {
            return Err(AppError::Config(format!(
                "trace excerpt must keep at least {} characters, got {}",
                MIN_TRACE_EXCERPT_CHARS, self.trace_excerpt_chars
            )));
        }

        Ok(())
    }
}
