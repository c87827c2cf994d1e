//! Prompt types for pizzarag.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Variable holding the user's question.
pub const QUESTION_VAR: &str = "question";

/// Variable holding the concatenated review texts.
pub const REVIEWS_VAR: &str = "reviews";

/// The one prompt template the answer generator uses unless a prompt file overrides it.
pub const RESTAURANT_TEMPLATE: &str = "\
You are an expert in answering questions about a pizza restaurant

Here is the question to answer: {{question}}

Here are some relevant reviews: {{reviews}}
";

/// A prompt definition, either built in or loaded from YAML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptDefinition {
    /// Unique prompt identifier
    pub id: String,

    /// Human-readable title
    pub title: String,

    /// API version for schema evolution
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Creator identifier
    #[serde(rename = "createdBy", default)]
    pub created_by: String,

    /// Optional system message sent alongside the rendered template
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    /// Template string with Handlebars syntax
    pub template: String,
}

impl PromptDefinition {
    /// The built-in restaurant review prompt.
    pub fn restaurant_default() -> Self {
        Self {
            id: "restaurant.reviews.default".to_string(),
            title: "Pizza restaurant review expert".to_string(),
            api_version: "1.0".to_string(),
            created_by: "pizzarag".to_string(),
            system: None,
            template: RESTAURANT_TEMPLATE.to_string(),
        }
    }
}

impl Default for PromptDefinition {
    fn default() -> Self {
        Self::restaurant_default()
    }
}

/// A fully built prompt ready for LLM execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltPrompt {
    /// System message (optional)
    pub system: Option<String>,

    /// User message (required)
    pub user: String,

    /// Metadata about the built prompt
    pub metadata: BuiltPromptMetadata,
}

/// Metadata about a built prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltPromptMetadata {
    /// Source prompt ID
    #[serde(rename = "sourcePromptId")]
    pub source_prompt_id: String,

    /// Template variables that were resolved
    #[serde(rename = "resolvedVariables")]
    pub resolved_variables: HashMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_definition_deserialization() {
        let yaml = r#"
id: restaurant.terse
title: Terse answers
apiVersion: "1.0"
system: Answer in one sentence.
template: "Q: {{question}}\nReviews: {{reviews}}"
"#;

        let def: PromptDefinition = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(def.id, "restaurant.terse");
        assert_eq!(def.created_by, "");
        assert_eq!(def.system.as_deref(), Some("Answer in one sentence."));
    }

    #[test]
    fn test_default_template_asks_question_before_reviews() {
        let def = PromptDefinition::default();
        let question = def.template.find("{{question}}").unwrap();
        let reviews = def.template.find("{{reviews}}").unwrap();
        assert!(question < reviews);
    }
}
