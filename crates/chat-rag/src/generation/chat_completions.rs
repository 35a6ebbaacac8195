//! Client for hosted OpenAI-compatible chat-completions APIs (Groq by default)

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{Error, Result};

use super::prompt::PromptMessage;
use super::retry::{Failure, RetryPolicy};

/// Sampling parameters for a chat completion
#[derive(Debug, Clone, Copy)]
pub struct CompletionParams {
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
}

/// Chat-completions client with automatic retry
pub struct ChatCompletionsClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    retry: RetryPolicy,
}

#[derive(Serialize)]
struct CompletionRequest {
    model: String,
    messages: Vec<PromptMessage>,
    temperature: f32,
    top_p: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl ChatCompletionsClient {
    /// Create a new client
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
            retry,
        })
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Check that the API answers the model listing with our key
    pub async fn health_check(&self) -> Result<bool> {
        let Some(api_key) = &self.api_key else {
            return Ok(false);
        };

        let url = format!("{}/models", self.base_url);
        match self.client.get(&url).bearer_auth(api_key).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    /// Request a completion for `messages`, returning the first choice's text
    pub async fn complete(
        &self,
        model: &str,
        messages: &[PromptMessage],
        params: CompletionParams,
    ) -> Result<String> {
        let api_key = self.api_key.clone().ok_or_else(|| {
            Error::generation("No API key configured for the chat completions API (AI_CHATBOT_API_KEY)")
        })?;
        let url = format!("{}/chat/completions", self.base_url);
        let model = model.to_string();
        let messages = messages.to_vec();

        tracing::info!(
            "Requesting chat completion from {} ({} messages)",
            model,
            messages.len()
        );

        self.retry
            .run("Chat completion request", || {
                let client = self.client.clone();
                let url = url.clone();
                let api_key = api_key.clone();
                let request = CompletionRequest {
                    model: model.clone(),
                    messages: messages.clone(),
                    temperature: params.temperature,
                    top_p: params.top_p,
                    max_tokens: params.max_tokens,
                };

                async move {
                    let response = client
                        .post(&url)
                        .bearer_auth(&api_key)
                        .json(&request)
                        .send()
                        .await
                        .map_err(|e| Error::generation(format!("Completion request failed: {}", e)))?;

                    if !response.status().is_success() {
                        let status = response.status();
                        let body = response.text().await.unwrap_or_default();
                        return Err(Failure::from_status(
                            status,
                            Error::generation(format!("Completion failed: HTTP {} - {}", status, body)),
                        ));
                    }

                    let completion: CompletionResponse = response.json().await.map_err(|e| {
                        Error::generation(format!("Failed to parse completion response: {}", e))
                    })?;

                    completion
                        .choices
                        .into_iter()
                        .next()
                        .and_then(|choice| choice.message.content)
                        .map(|content| content.trim().to_string())
                        .filter(|content| !content.is_empty())
                        .ok_or_else(|| {
                            Failure::from(Error::generation("No response choices returned from API"))
                        })
                }
            })
            .await
    }
}
