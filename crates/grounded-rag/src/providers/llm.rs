//! LLM provider trait for text completion

use async_trait::async_trait;
use crate::error::Result;

/// Trait for a text-completion service
///
/// Failures are expected (network, model load) and must be treated as
/// recoverable by callers.
///
/// Implementations:
/// - `OllamaLlm`: Local Ollama server (mistral, llama3, phi3, etc.)
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Complete a fully rendered prompt
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// Check if the provider is healthy and available
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;

    /// Get the model being used
    fn model(&self) -> &str;
}
