//! Ollama HTTP client for completion and embeddings with retry logic

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;

use crate::config::LlmConfig;
use crate::error::{Error, Result};

/// Ollama API client with automatic retry
pub struct OllamaClient {
    /// HTTP client
    client: Client,
    /// Configuration
    config: LlmConfig,
}

#[derive(Serialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Serialize)]
struct EmbedRequest {
    model: String,
    prompt: String,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

impl OllamaClient {
    /// Create a new Ollama client with retry support
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(5)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    /// Model used for `/api/generate`
    pub fn generate_model(&self) -> &str {
        &self.config.generate_model
    }

    /// Retry a request with exponential backoff
    async fn retry_request<F, Fut, T>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let max_retries = self.config.max_retries;
        let mut last_error = None;

        for attempt in 0..=max_retries {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    last_error = Some(e);
                    if attempt < max_retries {
                        let delay = Duration::from_secs(2u64.pow(attempt));
                        tracing::warn!(
                            "Request failed (attempt {}/{}), retrying in {:?}",
                            attempt + 1,
                            max_retries + 1,
                            delay
                        );
                        sleep(delay).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| Error::Llm("Unknown error".to_string())))
    }

    /// Check if Ollama is available
    pub async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/api/tags", self.config.base_url);

        match self.client.get(&url).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    /// Generate an embedding using Ollama with retry
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/api/embeddings", self.config.base_url);
        let model = self.config.embed_model.clone();

        self.retry_request(|| {
            let request = EmbedRequest {
                model: model.clone(),
                prompt: text.to_string(),
            };
            let url = url.as_str();

            async move {
                let response = self
                    .client
                    .post(url)
                    .json(&request)
                    .send()
                    .await
                    .map_err(|e| Error::embedding(format!("Embedding request failed: {}", e)))?;

                if !response.status().is_success() {
                    return Err(Error::embedding(format!(
                        "Embedding failed: HTTP {}",
                        response.status()
                    )));
                }

                let embed_response: EmbedResponse = response.json().await.map_err(|e| {
                    Error::embedding(format!("Failed to parse embedding response: {}", e))
                })?;

                Ok(embed_response.embedding)
            }
        })
        .await
    }

    /// Complete a rendered prompt (non-streaming) with retry logic
    pub async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/api/generate", self.config.base_url);
        let model = self.config.generate_model.clone();
        let temperature = self.config.temperature;

        tracing::info!("Generating answer with model: {}", model);

        self.retry_request(|| {
            let request = GenerateRequest {
                model: model.clone(),
                prompt: prompt.to_string(),
                stream: false,
                options: GenerateOptions { temperature },
            };
            let url = url.as_str();

            async move {
                let response = self
                    .client
                    .post(url)
                    .json(&request)
                    .send()
                    .await
                    .map_err(|e| Error::llm(format!("Generation request failed: {}", e)))?;

                if !response.status().is_success() {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    return Err(Error::llm(format!(
                        "Generation failed: HTTP {} - {}",
                        status, body
                    )));
                }

                let generate_response: GenerateResponse = response.json().await.map_err(|e| {
                    Error::llm(format!("Failed to parse generation response: {}", e))
                })?;

                Ok(generate_response.response)
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_request_shape() {
        let request = GenerateRequest {
            model: "mistral".to_string(),
            prompt: "Answer:".to_string(),
            stream: false,
            options: GenerateOptions { temperature: 0.0 },
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["model"], "mistral");
        assert_eq!(value["stream"], false);
        assert_eq!(value["options"]["temperature"], 0.0);
    }

    #[tokio::test]
    async fn test_health_check_reports_unreachable_server() {
        let config = LlmConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout_secs: 1,
            ..LlmConfig::default()
        };
        let client = OllamaClient::new(&config).unwrap();
        assert!(!client.health_check().await.unwrap());
    }
}
