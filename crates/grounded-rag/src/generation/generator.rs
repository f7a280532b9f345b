//! Grounded answer generation

use std::sync::Arc;
use std::time::Duration;

use crate::error::Error;
use crate::providers::LlmProvider;
use crate::types::Chunk;

use super::prompt::{PromptBuilder, GENERATION_ERROR_PREFIX, NO_CONTEXT_MESSAGE};

/// Which branch generation took
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    /// No chunks were supplied
    NoContext,
    /// At least one chunk lacked a source; the listing was returned instead of an LLM answer
    IncompleteGrounding(String),
    /// The completion service answered
    Answered(String),
    /// The completion service failed or timed out; carries the user-facing message
    Failed(String),
}

impl GenerationOutcome {
    /// Text handed back to the caller
    pub fn into_text(self) -> String {
        match self {
            Self::NoContext => NO_CONTEXT_MESSAGE.to_string(),
            Self::IncompleteGrounding(text) | Self::Answered(text) | Self::Failed(text) => text,
        }
    }
}

/// Produces answers that only cite attributable context
pub struct AnswerGenerator {
    llm: Arc<dyn LlmProvider>,
    timeout: Duration,
}

impl AnswerGenerator {
    /// Create a generator with a ceiling on each completion call
    pub fn new(llm: Arc<dyn LlmProvider>, timeout: Duration) -> Self {
        Self { llm, timeout }
    }

    /// Answer `query` from `chunks`; never fails, errors become the answer text
    pub async fn generate(&self, query: &str, chunks: &[Chunk]) -> String {
        self.generate_outcome(query, chunks).await.into_text()
    }

    /// Like [`generate`](Self::generate) but reports which branch was taken
    pub async fn generate_outcome(&self, query: &str, chunks: &[Chunk]) -> GenerationOutcome {
        if chunks.is_empty() {
            return GenerationOutcome::NoContext;
        }

        if !chunks.iter().all(|c| c.metadata.has_source()) {
            tracing::warn!(
                "{} of {} chunks have no source, returning documents without generation",
                chunks.iter().filter(|c| !c.metadata.has_source()).count(),
                chunks.len()
            );
            return GenerationOutcome::IncompleteGrounding(
                PromptBuilder::build_unattributed_listing(chunks),
            );
        }

        let context = PromptBuilder::build_context(chunks);
        let prompt = PromptBuilder::build_rag_prompt(query, &context);

        let result = match tokio::time::timeout(self.timeout, self.llm.complete(&prompt)).await {
            Ok(result) => result,
            Err(_) => Err(Error::llm(format!(
                "completion timed out after {}s",
                self.timeout.as_secs()
            ))),
        };

        match result {
            Ok(answer) => GenerationOutcome::Answered(answer),
            Err(e) => {
                tracing::error!("Generation with {} failed: {}", self.llm.name(), e);
                GenerationOutcome::Failed(format!("{}{}", GENERATION_ERROR_PREFIX, e))
            }
        }
    }
}
