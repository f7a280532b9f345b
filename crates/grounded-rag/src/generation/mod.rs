//! Answer generation: prompt templates, Ollama client, grounding policy

mod generator;
pub mod ollama;
pub mod prompt;

pub use generator::{AnswerGenerator, GenerationOutcome};
pub use ollama::OllamaClient;
pub use prompt::PromptBuilder;
