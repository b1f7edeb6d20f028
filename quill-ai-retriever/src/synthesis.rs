//! Grounding-prompt assembly and answer generation.
//!
//! The synthesizer builds one deterministic prompt per question: a fixed
//! instruction preamble, one labeled block per retrieved context item in the
//! order given, then the question. Generation failures become an
//! [`AnswerOutcome::GenerationError`] value instead of an error return, so a
//! single failed completion never aborts a batch job evaluating many
//! questions.

use crate::retrieval::retriever::{RetrievalResult, RetrievedContext};
use quill_ai_llm::provider::{ChatMessage, ChatProvider};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// The outcome of one answer generation: either the model's answer or a
/// recorded failure, tagged so batch outputs stay machine-readable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "text", rename_all = "snake_case")]
pub enum AnswerOutcome {
    Answer(String),
    GenerationError(String),
}

impl AnswerOutcome {
    /// The answer or error text, whichever this outcome holds.
    pub fn text(&self) -> &str {
        match self {
            Self::Answer(text) | Self::GenerationError(text) => text,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::GenerationError(_))
    }
}

/// One answered question with its grounding contexts, for persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedAnswer {
    pub question: String,
    pub answer: AnswerOutcome,
    pub contexts: Vec<RetrievedContext>,
}

/// Build the grounding prompt for one question.
///
/// Context blocks appear in the order given, each labeled with its
/// provenance; an unknown page (sentinel -1) renders as `?`.
pub fn build_prompt(question: &str, contexts: &[RetrievedContext]) -> String {
    let context_blocks = contexts
        .iter()
        .map(|ctx| {
            let page = if ctx.page >= 1 {
                ctx.page.to_string()
            } else {
                "?".to_string()
            };
            format!(
                "[From {} > {} (Page {page}):]\n{}",
                ctx.source, ctx.section, ctx.context
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "You are a helpful assistant designed to answer policy-related questions using only the provided context.\n\
         Answer clearly, concisely, and accurately based on the sources.\n\
         If multiple answers seem to contradict, mention that.\n\
         \n\nContext:\n{context_blocks}\n\nQuestion: {question}\nAnswer:"
    )
}

/// Generates answers from retrieved context via the chat collaborator.
pub struct AnswerSynthesizer {
    chat: Arc<dyn ChatProvider>,
}

impl AnswerSynthesizer {
    pub fn new(chat: Arc<dyn ChatProvider>) -> Self {
        Self { chat }
    }

    /// Send one grounding prompt and return the trimmed response, or a
    /// recorded generation failure.
    pub async fn generate(&self, prompt: &str) -> AnswerOutcome {
        match self.chat.complete(&[ChatMessage::user(prompt)]).await {
            Ok(text) => AnswerOutcome::Answer(text.trim().to_string()),
            Err(e) => {
                tracing::error!("Answer generation failed: {e}");
                AnswerOutcome::GenerationError(format!("Error generating answer: {e}"))
            }
        }
    }

    /// Answer one retrieval result.
    pub async fn answer(&self, result: &RetrievalResult) -> GeneratedAnswer {
        let prompt = build_prompt(&result.question, &result.retrieved_context);
        let answer = self.generate(&prompt).await;
        GeneratedAnswer {
            question: result.question.clone(),
            answer,
            contexts: result.retrieved_context.clone(),
        }
    }

    /// Answer a whole batch of retrieval results; failed generations are
    /// recorded in place and the batch keeps progressing.
    pub async fn answer_all(&self, results: &[RetrievalResult]) -> Vec<GeneratedAnswer> {
        let mut answers = Vec::with_capacity(results.len());
        for result in results {
            answers.push(self.answer(result).await);
        }
        answers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use quill_ai_llm::LlmError;

    fn context(source: &str, section: &str, page: i64, text: &str) -> RetrievedContext {
        RetrievedContext {
            score: 0.5,
            context: text.to_string(),
            source: source.to_string(),
            section: section.to_string(),
            page,
        }
    }

    struct EchoChat;

    #[async_trait]
    impl ChatProvider for EchoChat {
        async fn complete(&self, messages: &[ChatMessage]) -> quill_ai_llm::Result<String> {
            Ok(format!("echo: {} chars", messages[0].content.len()))
        }
    }

    struct FailingChat;

    #[async_trait]
    impl ChatProvider for FailingChat {
        async fn complete(&self, _messages: &[ChatMessage]) -> quill_ai_llm::Result<String> {
            Err(LlmError::malformed_response("no choices in chat response"))
        }
    }

    #[test]
    fn test_build_prompt_shape() {
        let contexts = vec![
            context("manual_a", "Approvals", 3, "Expenses need sign-off."),
            context("manual_b", "General", -1, "Orphan paragraph."),
        ];
        let prompt = build_prompt("Who approves expenses?", &contexts);

        assert!(prompt.starts_with("You are a helpful assistant"));
        assert!(prompt.contains("[From manual_a > Approvals (Page 3):]\nExpenses need sign-off."));
        // Unknown pages render as "?".
        assert!(prompt.contains("[From manual_b > General (Page ?):]\nOrphan paragraph."));
        assert!(prompt.ends_with("Question: Who approves expenses?\nAnswer:"));

        // Context order is preserved.
        let a = prompt.find("manual_a").unwrap();
        let b = prompt.find("manual_b").unwrap();
        assert!(a < b);
    }

    #[test]
    fn test_build_prompt_is_deterministic() {
        let contexts = vec![context("doc", "Topic", 1, "Body.")];
        let first = build_prompt("Q?", &contexts);
        let second = build_prompt("Q?", &contexts);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_generation_failure_is_a_value() {
        let synthesizer = AnswerSynthesizer::new(Arc::new(FailingChat));
        let outcome = synthesizer.generate("prompt").await;
        assert!(outcome.is_error());
        assert!(outcome.text().starts_with("Error generating answer:"));
    }

    #[tokio::test]
    async fn test_batch_keeps_progressing_past_failures() {
        let results = vec![
            RetrievalResult {
                question: "first?".to_string(),
                retrieved_context: vec![context("doc", "A", 1, "text")],
            },
            RetrievalResult {
                question: "second?".to_string(),
                retrieved_context: vec![],
            },
        ];

        let failing = AnswerSynthesizer::new(Arc::new(FailingChat));
        let answers = failing.answer_all(&results).await;
        assert_eq!(answers.len(), 2);
        assert!(answers.iter().all(|a| a.answer.is_error()));

        let echo = AnswerSynthesizer::new(Arc::new(EchoChat));
        let answers = echo.answer_all(&results).await;
        assert_eq!(answers.len(), 2);
        assert!(answers.iter().all(|a| !a.answer.is_error()));
        assert_eq!(answers[0].question, "first?");
        assert_eq!(answers[0].contexts.len(), 1);
    }

    #[test]
    fn test_answer_outcome_serialization() {
        let ok = AnswerOutcome::Answer("Two signatures are required.".to_string());
        let json = serde_json::to_value(&ok).unwrap();
        assert_eq!(json["status"], "answer");
        assert_eq!(json["text"], "Two signatures are required.");

        let err = AnswerOutcome::GenerationError("Error generating answer: timeout".to_string());
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["status"], "generation_error");

        let back: AnswerOutcome = serde_json::from_value(json).unwrap();
        assert!(back.is_error());
    }
}
