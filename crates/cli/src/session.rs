//! Interactive question loop.

use crate::trace::TraceLog;
use pizzarag_core::AppResult;
use pizzarag_knowledge::QuestionAnswerer;
use std::io::{BufRead, Write};

const SEPARATOR: &str = "-------------------------------";
const PROMPT: &str = "Ask your question (q to quit): ";
const QUIT: &str = "q";

/// Counts for one session.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    pub answered: usize,
    pub failed: usize,
}

/// Reads questions line by line and prints answers until `q` or end of input.
pub struct Session<'a> {
    answerer: &'a dyn QuestionAnswerer,
    trace: Option<TraceLog>,
}

impl<'a> Session<'a> {
    pub fn new(answerer: &'a dyn QuestionAnswerer, trace: Option<TraceLog>) -> Self {
        Self { answerer, trace }
    }

    /// Run the loop. Only I/O errors on `input`/`output` end it early.
    pub async fn run<R: BufRead, W: Write>(
        &self,
        mut input: R,
        mut output: W,
    ) -> AppResult<SessionSummary> {
        let mut summary = SessionSummary::default();
        let mut line = String::new();

        loop {
            write!(output, "\n\n{}\n{}", SEPARATOR, PROMPT)?;
            output.flush()?;

            line.clear();
            if input.read_line(&mut line)? == 0 {
                tracing::debug!("End of input, leaving session");
                break;
            }

            let question = line.trim_end_matches(['\r', '\n']);
            if question == QUIT {
                break;
            }
            if question.trim().is_empty() {
                continue;
            }

            writeln!(output, "\n")?;

            match self.answerer.answer(question).await {
                Ok(interaction) => {
                    writeln!(output, "{}", interaction.answer)?;
                    summary.answered += 1;

                    if let Some(trace) = &self.trace {
                        if let Err(e) = trace.append(&interaction) {
                            tracing::warn!(
                                "Failed to write trace log {:?}: {}",
                                trace.path(),
                                e
                            );
                        }
                    }
                }
                Err(e) => {
                    tracing::debug!("Question failed: {:?}", e);
                    writeln!(output, "Error: {}", e)?;
                    summary.failed += 1;
                }
            }
        }

        tracing::info!(
            "Session ended: {} answered, {} failed",
            summary.answered,
            summary.failed
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pizzarag_core::AppError;
    use pizzarag_knowledge::Interaction;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Echoes the question back, failing on questions containing "fail".
    #[derive(Default)]
    struct EchoAnswerer {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl QuestionAnswerer for EchoAnswerer {
        async fn answer(&self, question: &str) -> AppResult<Interaction> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if question.contains("fail") {
                return Err(AppError::Generation("model unreachable".to_string()));
            }
            Ok(Interaction {
                question: question.to_string(),
                retrieved: vec![],
                answer: format!("answer to {}", question),
            })
        }
    }

    async fn run(answerer: &EchoAnswerer, input: &str, trace: Option<TraceLog>) -> (SessionSummary, String) {
        let mut output = Vec::new();
        let summary = Session::new(answerer, trace)
            .run(input.as_bytes(), &mut output)
            .await
            .unwrap();
        (summary, String::from_utf8(output).unwrap())
    }

    #[tokio::test]
    async fn test_quit_makes_no_calls() {
        let answerer = EchoAnswerer::default();
        let (summary, output) = run(&answerer, "q\n", None).await;

        assert_eq!(answerer.calls.load(Ordering::SeqCst), 0);
        assert_eq!(summary, SessionSummary::default());
        assert!(output.contains(PROMPT));
    }

    #[tokio::test]
    async fn test_answers_until_quit() {
        let answerer = EchoAnswerer::default();
        let (summary, output) = run(&answerer, "cheese?\nservice?\nq\nignored\n", None).await;

        assert_eq!(answerer.calls.load(Ordering::SeqCst), 2);
        assert_eq!(summary.answered, 2);
        assert!(output.contains("answer to cheese?"));
        assert!(output.contains("answer to service?"));
        assert!(!output.contains("ignored"));
    }

    #[tokio::test]
    async fn test_eof_ends_session() {
        let answerer = EchoAnswerer::default();
        let (summary, output) = run(&answerer, "crust?", None).await;

        assert_eq!(summary.answered, 1);
        assert_eq!(output.matches(SEPARATOR).count(), 2);
    }

    #[tokio::test]
    async fn test_quit_token_must_match_exactly() {
        let answerer = EchoAnswerer::default();
        let (summary, output) = run(&answerer, " q 
q
", None).await;

        assert_eq!(answerer.calls.load(Ordering::SeqCst), 1);
        assert_eq!(summary.answered, 1);
        assert!(output.contains("answer to  q "));
    }

    #[tokio::test]
    async fn test_blank_lines_are_skipped() {
        let answerer = EchoAnswerer::default();
        run(&answerer, "\n   \nq\n", None).await;
        assert_eq!(answerer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_errors_are_shown_and_loop_continues() {
        let answerer = EchoAnswerer::default();
        let (summary, output) = run(&answerer, "please fail\nstill here?\nq\n", None).await;

        assert!(output.contains("Error: "));
        assert!(output.contains("model unreachable"));
        assert!(output.contains("answer to still here?"));
        assert_eq!(summary, SessionSummary { answered: 1, failed: 1 });
    }

    #[tokio::test]
    async fn test_successful_answers_are_traced() {
        let temp = TempDir::new().unwrap();
        let trace = TraceLog::new(temp.path().join("rag_log.txt"), 200);
        let answerer = EchoAnswerer::default();

        run(&answerer, "crust?\nplease fail\nq\n", Some(trace.clone())).await;

        let contents = std::fs::read_to_string(trace.path()).unwrap();
        assert_eq!(contents.matches("QUESTION:").count(), 1);
        assert!(contents.contains("ANSWER: answer to crust?"));
    }

    #[tokio::test]
    async fn test_trace_failure_does_not_fail_interaction() {
        let temp = TempDir::new().unwrap();
        let trace = TraceLog::new(temp.path().join("missing").join("rag_log.txt"), 200);
        let answerer = EchoAnswerer::default();

        let (summary, output) = run(&answerer, "crust?\nq\n", Some(trace)).await;

        assert_eq!(summary.answered, 1);
        assert!(output.contains("answer to crust?"));
    }
}
