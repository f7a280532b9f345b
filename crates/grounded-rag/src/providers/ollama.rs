//! Ollama-based providers for embeddings and completion
//!
//! Both wrap one shared `OllamaClient`.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::Result;
use crate::generation::OllamaClient;

use super::embedding::{normalize, EmbeddingProvider};
use super::llm::LlmProvider;

/// Ollama embedding provider using nomic-embed-text or similar models
pub struct OllamaEmbedder {
    client: Arc<OllamaClient>,
    dimensions: usize,
}

impl OllamaEmbedder {
    /// Create from existing OllamaClient
    pub fn from_client(client: Arc<OllamaClient>, dimensions: usize) -> Self {
        Self { client, dimensions }
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        // Ollama returns raw vectors; cosine search expects unit length
        let mut embedding = self.client.embed(text).await?;
        normalize(&mut embedding);
        Ok(embedding)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn health_check(&self) -> Result<bool> {
        self.client.health_check().await
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

/// Ollama LLM provider for answer generation
pub struct OllamaLlm {
    client: Arc<OllamaClient>,
}

impl OllamaLlm {
    /// Create from existing OllamaClient
    pub fn from_client(client: Arc<OllamaClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl LlmProvider for OllamaLlm {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.client.generate(prompt).await
    }

    async fn health_check(&self) -> Result<bool> {
        self.client.health_check().await
    }

    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        self.client.generate_model()
    }
}
