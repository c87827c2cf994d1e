//! Prompt system for pizzarag.
//!
//! - One built-in restaurant prompt (`PromptDefinition::restaurant_default`)
//! - Optional YAML override files
//! - Strict Handlebars rendering

pub mod builder;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::build_prompt;
pub use loader::{load_prompt, resolve_prompt};
pub use types::{
    BuiltPrompt, BuiltPromptMetadata, PromptDefinition, QUESTION_VAR, RESTAURANT_TEMPLATE,
    REVIEWS_VAR,
};
