//! Error types for pizzarag.
//!
//! A single error enum covers every failure category in the pipeline:
//! loading reviews, embedding, index storage, retrieval, generation,
//! prompt rendering and configuration.

use thiserror::Error;

/// Unified error type for pizzarag.
///
/// All fallible functions return `Result<T, AppError>`.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Review file missing, unreadable or malformed
    #[error("Data load error: {0}")]
    DataLoad(String),

    /// Embedding provider failures (transport, bad response)
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Vector index storage failures
    #[error("Index error: {0}")]
    Index(String),

    /// One or more records could not be indexed
    #[error("Indexing error: record '{id}' failed ({failed} failed, {indexed} indexed): {reason}")]
    Indexing {
        /// Id of the first record that failed
        id: String,
        /// Reason reported for that record
        reason: String,
        /// Total number of failed records
        failed: usize,
        /// Number of records written successfully
        indexed: usize,
    },

    /// Invalid retrieval request or backend failure during retrieval
    #[error("Retrieval error: {0}")]
    Retrieval(String),

    /// Generative model unreachable or returned an error
    #[error("Generation error: {0}")]
    Generation(String),

    /// Prompt template errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
