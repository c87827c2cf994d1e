//! Answer generation from a question and its retrieved reviews.

use crate::types::ScoredEntry;
use pizzarag_core::{AppConfig, AppError, AppResult};
use pizzarag_llm::{LlmClient, LlmRequest};
use pizzarag_prompt::{build_prompt, resolve_prompt, PromptDefinition, QUESTION_VAR, REVIEWS_VAR};
use std::collections::HashMap;
use std::sync::Arc;

/// Separator placed between review texts in the prompt.
const REVIEW_SEPARATOR: &str = "\n\n";

/// Renders the restaurant prompt and asks the model for an answer.
#[derive(Clone)]
pub struct AnswerGenerator {
    client: Arc<dyn LlmClient>,
    prompt: PromptDefinition,
    model: String,
    temperature: f32,
    top_p: f32,
}

impl AnswerGenerator {
    /// Generator with the built-in prompt and default sampling.
    pub fn new(client: Arc<dyn LlmClient>, model: impl Into<String>) -> Self {
        let defaults = AppConfig::default();
        Self {
            client,
            prompt: PromptDefinition::restaurant_default(),
            model: model.into(),
            temperature: defaults.temperature,
            top_p: defaults.top_p,
        }
    }

    /// Generator configured from `config`, loading its prompt override if set.
    pub fn from_config(client: Arc<dyn LlmClient>, config: &AppConfig) -> AppResult<Self> {
        let prompt = resolve_prompt(config.prompt_file.as_deref())?;
        Ok(Self::new(client, &config.model)
            .with_prompt(prompt)
            .with_sampling(config.temperature, config.top_p))
    }

    pub fn with_prompt(mut self, prompt: PromptDefinition) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn with_sampling(mut self, temperature: f32, top_p: f32) -> Self {
        self.temperature = temperature;
        self.top_p = top_p;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Produce an answer grounded on `context`.
    ///
    /// The model's text is returned unmodified. An empty `context` still
    /// produces a prompt; the model is left to say it has no reviews.
    pub async fn generate(&self, question: &str, context: &[ScoredEntry]) -> AppResult<String> {
        let mut variables = HashMap::new();
        variables.insert(QUESTION_VAR.to_string(), question.to_string());
        variables.insert(REVIEWS_VAR.to_string(), format_reviews(context));

        let built = build_prompt(&self.prompt, variables)?;

        let mut request = LlmRequest::new(built.user, &self.model)
            .with_temperature(self.temperature)
            .with_top_p(self.top_p);
        if let Some(system) = built.system {
            request = request.with_system(system);
        }

        tracing::debug!(
            "Generating answer with {} ({} reviews in context)",
            self.model,
            context.len()
        );

        let response = self.client.complete(&request).await.map_err(|e| match e {
            AppError::Generation(_) => e,
            other => AppError::Generation(other.to_string()),
        })?;

        Ok(response.content)
    }
}

/// Review texts in rank order, separated by blank lines.
pub fn format_reviews(context: &[ScoredEntry]) -> String {
    context
        .iter()
        .map(|scored| scored.entry.text.as_str())
        .collect::<Vec<_>>()
        .join(REVIEW_SEPARATOR)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::types::{IndexEntry, ReviewMetadata};
    use async_trait::async_trait;
    use pizzarag_llm::{LlmResponse, LlmUsage};
    use std::sync::Mutex;

    /// Records every request and answers with a fixed reply.
    pub(crate) struct RecordingClient {
        pub reply: Result<String, String>,
        pub requests: Mutex<Vec<LlmRequest>>,
    }

    impl RecordingClient {
        pub fn replying(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn failing(message: &str) -> Self {
            Self {
                reply: Err(message.to_string()),
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LlmClient for RecordingClient {
        fn provider_name(&self) -> &str {
            "recording"
        }

        async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
            self.requests.lock().unwrap().push(request.clone());
            match &self.reply {
                Ok(content) => Ok(LlmResponse {
                    content: content.clone(),
                    model: request.model.clone(),
                    usage: LlmUsage::new(0, 0),
                }),
                Err(message) => Err(AppError::Other(message.clone())),
            }
        }
    }

    fn scored(id: &str, text: &str, score: f32) -> ScoredEntry {
        ScoredEntry {
            entry: IndexEntry {
                id: id.to_string(),
                embedding: vec![],
                metadata: ReviewMetadata {
                    rating: 5.0,
                    date: "2024-01-01".to_string(),
                },
                text: text.to_string(),
            },
            score,
        }
    }

    #[tokio::test]
    async fn test_prompt_carries_question_and_reviews() {
        let client = Arc::new(RecordingClient::replying("People love the cheese pizza."));
        let generator = AnswerGenerator::new(client.clone(), "llama3.2");

        let context = vec![
            scored("0", "Great cheese pizza", 0.9),
            scored("1", "Crust was soggy", 0.5),
        ];
        let answer = generator
            .generate("What about the cheese pizza?", &context)
            .await
            .unwrap();

        assert_eq!(answer, "People love the cheese pizza.");

        let requests = client.requests.lock().unwrap();
        let request = &requests[0];
        assert_eq!(request.model, "llama3.2");
        assert_eq!(request.temperature, Some(0.2));
        assert_eq!(request.top_p, Some(0.95));
        assert!(request.prompt.contains("What about the cheese pizza?"));
        assert!(request
            .prompt
            .contains("Great cheese pizza\n\nCrust was soggy"));
    }

    #[tokio::test]
    async fn test_service_question_with_stub_model() {
        let client = Arc::new(RecordingClient::replying(
            "Guests describe the staff as friendly.",
        ));
        let generator = AnswerGenerator::new(client, "llama3.2");

        let answer = generator
            .generate(
                "How's the service?",
                &[scored("2", "Friendly staff, quick refills", 0.7)],
            )
            .await
            .unwrap();
        assert!(!answer.is_empty());
    }

    #[tokio::test]
    async fn test_empty_context_still_generates() {
        let client = Arc::new(RecordingClient::replying("No reviews mention that."));
        let generator = AnswerGenerator::new(client.clone(), "llama3.2");

        let answer = generator.generate("Do they deliver?", &[]).await.unwrap();
        assert_eq!(answer, "No reviews mention that.");
        assert_eq!(client.requests.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_client_failure_is_generation_error() {
        let generator =
            AnswerGenerator::new(Arc::new(RecordingClient::failing("refused")), "llama3.2");

        let result = generator.generate("Is it open late?", &[]).await;
        assert!(matches!(result, Err(AppError::Generation(_))));
    }

    #[tokio::test]
    async fn test_custom_prompt_and_sampling() {
        let client = Arc::new(RecordingClient::replying("ok"));
        let prompt = PromptDefinition {
            id: "terse".to_string(),
            template: "Q: {{question}}\nR: {{reviews}}".to_string(),
            system: Some("Answer in one sentence.".to_string()),
            ..PromptDefinition::restaurant_default()
        };
        let generator = AnswerGenerator::new(client.clone(), "llama3.2")
            .with_prompt(prompt)
            .with_sampling(0.7, 0.5);

        generator
            .generate("Parking?", &[scored("3", "Easy parking", 0.4)])
            .await
            .unwrap();

        let requests = client.requests.lock().unwrap();
        assert_eq!(requests[0].prompt, "Q: Parking?\nR: Easy parking");
        assert_eq!(requests[0].system.as_deref(), Some("Answer in one sentence."));
        assert_eq!(requests[0].temperature, Some(0.7));
    }
}
