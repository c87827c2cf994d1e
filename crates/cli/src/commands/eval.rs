//! Eval command handler.
//!
//! Asks a fixed set of questions and reports whether expected keywords
//! appear in each answer.

use clap::Args;
use pizzarag_core::{AppConfig, AppError, AppResult};
use pizzarag_knowledge::QuestionAnswerer;
use serde::Deserialize;
use std::io::Write;
use std::path::{Path, PathBuf};

/// One question and the keywords its answer should mention.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvalCase {
    pub question: String,
    pub expected_keywords: Vec<String>,
}

/// Run keyword checks against generated answers
#[derive(Args, Debug)]
pub struct EvalCommand {
    /// YAML file with a list of `{question, expectedKeywords}` cases
    #[arg(long)]
    pub cases: Option<PathBuf>,
}

impl EvalCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing eval command");

        let cases = match &self.cases {
            Some(path) => load_cases(path)?,
            None => builtin_cases(),
        };

        let pipeline = super::open_pipeline(config).await?;
        let stdout = std::io::stdout();
        run_cases(&pipeline, &cases, stdout.lock()).await?;

        Ok(())
    }
}

/// Cases used when no file is given.
pub fn builtin_cases() -> Vec<EvalCase> {
    vec![
        EvalCase {
            question: "What do people think of the cheese pizza?".to_string(),
            expected_keywords: vec!["cheese".to_string(), "crust".to_string()],
        },
        EvalCase {
            question: "How’s the service quality?".to_string(),
            expected_keywords: vec![
                "friendly".to_string(),
                "slow".to_string(),
                "attentive".to_string(),
            ],
        },
    ]
}

fn load_cases(path: &Path) -> AppResult<Vec<EvalCase>> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("Failed to read eval cases {:?}: {}", path, e)))?;
    let cases: Vec<EvalCase> = serde_yaml::from_str(&contents)?;
    if cases.is_empty() {
        return Err(AppError::Config(format!("No eval cases in {:?}", path)));
    }
    Ok(cases)
}

/// Case-sensitive substring check for each keyword.
pub fn keyword_hits<'a>(answer: &str, keywords: &'a [String]) -> Vec<(&'a str, bool)> {
    keywords
        .iter()
        .map(|k| (k.as_str(), answer.contains(k.as_str())))
        .collect()
}

/// Ask every case and print the keyword report. A failed question is reported and skipped.
async fn run_cases<W: Write>(
    answerer: &dyn QuestionAnswerer,
    cases: &[EvalCase],
    mut output: W,
) -> AppResult<usize> {
    let mut hits = 0;

    for case in cases {
        match answerer.answer(&case.question).await {
            Ok(interaction) => {
                writeln!(output, "Q: {}\nA: {}\n", case.question, interaction.answer)?;
                for (keyword, found) in keyword_hits(&interaction.answer, &case.expected_keywords)
                {
                    writeln!(output, "✓ {} in output: {}", keyword, found)?;
                    hits += usize::from(found);
                }
            }
            Err(e) => {
                writeln!(output, "Q: {}\nError: {}", case.question, e)?;
            }
        }
        writeln!(output, "\n---\n")?;
    }

    Ok(hits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pizzarag_knowledge::Interaction;
    use tempfile::TempDir;

    struct CannedAnswerer;

    #[async_trait]
    impl QuestionAnswerer for CannedAnswerer {
        async fn answer(&self, question: &str) -> AppResult<Interaction> {
            if question.contains("service") {
                return Err(AppError::Generation("model unreachable".to_string()));
            }
            Ok(Interaction {
                question: question.to_string(),
                retrieved: vec![],
                answer: "The cheese is great but the crust is thin.".to_string(),
            })
        }
    }

    #[test]
    fn test_keyword_hits_are_case_sensitive() {
        let keywords = vec!["cheese".to_string(), "Crust".to_string()];
        let hits = keyword_hits("cheese and crust", &keywords);
        assert_eq!(hits, vec![("cheese", true), ("Crust", false)]);
    }

    #[tokio::test]
    async fn test_report_format() {
        let mut output = Vec::new();
        let hits = run_cases(&CannedAnswerer, &builtin_cases(), &mut output)
            .await
            .unwrap();
        let text = String::from_utf8(output).unwrap();

        assert_eq!(hits, 2);
        assert!(text.contains("✓ cheese in output: true"));
        assert!(text.contains("✓ crust in output: true"));
        assert!(text.contains("Error: "));
        assert_eq!(text.matches("---").count(), 2);
    }

    #[test]
    fn test_load_cases_from_yaml() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("cases.yaml");
        std::fs::write(
            &path,
            "- question: Is there parking?\n  expectedKeywords: [parking, lot]\n",
        )
        .unwrap();

        let cases = load_cases(&path).unwrap();
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].expected_keywords, vec!["parking", "lot"]);
    }

    #[test]
    fn test_empty_case_file_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("cases.yaml");
        std::fs::write(&path, "[]\n").unwrap();
        assert!(load_cases(&path).is_err());
    }
}
