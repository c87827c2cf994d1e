//! pizzarag core library
//!
//! Foundational utilities shared by every pizzarag crate:
//! - Error handling (`AppError`, `AppResult`)
//! - Logging infrastructure
//! - Configuration management
//! - Retry backoff

pub mod config;
pub mod error;
pub mod logging;
pub mod retry;

// Re-export commonly used types
pub use config::{AppConfig, ReindexPolicy};
pub use error::{AppError, AppResult};
