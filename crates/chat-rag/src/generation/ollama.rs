//! Ollama API client for embeddings and completions with retry logic

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{Error, Result};

use super::retry::{Failure, RetryPolicy};

/// Sampling options passed to `/api/generate`
#[derive(Debug, Clone, Copy, Serialize)]
pub struct GenerateOptions {
    pub temperature: f32,
    pub top_p: f32,
    /// Maximum tokens to generate
    pub num_predict: u32,
}

/// Ollama API client with automatic retry
pub struct OllamaClient {
    client: Client,
    base_url: String,
    retry: RetryPolicy,
}

#[derive(Serialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    stream: bool,
    options: GenerateOptions,
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
    /// Create a new Ollama client
    pub fn new(base_url: impl Into<String>, timeout: Duration, retry: RetryPolicy) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(5)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            retry,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check if Ollama is reachable
    pub async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/api/tags", self.base_url);

        match self.client.get(&url).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    /// Generate an embedding with retry
    pub async fn embed(&self, model: &str, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/api/embeddings", self.base_url);
        let model = model.to_string();
        let text = text.to_string();

        self.retry
            .run("Ollama embedding request", || {
                let client = self.client.clone();
                let url = url.clone();
                let request = EmbedRequest {
                    model: model.clone(),
                    prompt: text.clone(),
                };

                async move {
                    let response = client
                        .post(&url)
                        .json(&request)
                        .send()
                        .await
                        .map_err(|e| Error::embedding(format!("Embedding request failed: {}", e)))?;

                    let status = response.status();
                    if !status.is_success() {
                        return Err(Failure::from_status(
                            status,
                            Error::embedding(format!("Embedding failed: HTTP {}", status)),
                        ));
                    }

                    let embed_response: EmbedResponse = response.json().await.map_err(|e| {
                        Error::embedding(format!("Failed to parse embedding response: {}", e))
                    })?;

                    Ok(embed_response.embedding)
                }
            })
            .await
    }

    /// Generate a completion with retry
    pub async fn generate(
        &self,
        model: &str,
        prompt: &str,
        options: GenerateOptions,
    ) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);

        let model = model.to_string();
        let prompt = prompt.to_string();

        tracing::info!("Generating answer with Ollama model: {}", model);

        self.retry
            .run("Ollama generation request", || {
                let client = self.client.clone();
                let url = url.clone();
                let request = GenerateRequest {
                    model: model.clone(),
                    prompt: prompt.clone(),
                    stream: false,
                    options,
                };

                async move {
                    let response = client
                        .post(&url)
                        .json(&request)
                        .send()
                        .await
                        .map_err(|e| Error::generation(format!("Generation request failed: {}", e)))?;

                    if !response.status().is_success() {
                        let status = response.status();
                        let body = response.text().await.unwrap_or_default();
                        return Err(Failure::from_status(
                            status,
                            Error::generation(format!("Generation failed: HTTP {} - {}", status, body)),
                        ));
                    }

                    let generate_response: GenerateResponse = response.json().await.map_err(|e| {
                        Error::generation(format!("Failed to parse generation response: {}", e))
                    })?;

                    Ok(generate_response.response.trim().to_string())
                }
            })
            .await
    }
}
