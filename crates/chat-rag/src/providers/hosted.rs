//! Hosted LLM provider over an OpenAI-compatible chat-completions API

use async_trait::async_trait;
use std::time::Duration;

use crate::config::LlmConfig;
use crate::error::Result;
use crate::generation::{ChatCompletionsClient, CompletionParams, Prompt, RetryPolicy};

use super::llm::LlmProvider;

/// Chat-completions LLM provider (Groq by default)
pub struct HostedLlm {
    client: ChatCompletionsClient,
    model: String,
    params: CompletionParams,
}

impl HostedLlm {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = ChatCompletionsClient::new(
            config.base_url.clone(),
            config.api_key.clone(),
            Duration::from_secs(config.timeout_secs),
            RetryPolicy::new(config.max_retries),
        )?;

        if !client.has_api_key() {
            tracing::warn!("AI_CHATBOT_API_KEY is not set; chat replies will use the fallback text");
        }

        Ok(Self {
            client,
            model: config.model.clone(),
            params: CompletionParams {
                temperature: config.temperature,
                top_p: config.top_p,
                max_tokens: config.max_tokens,
            },
        })
    }
}

#[async_trait]
impl LlmProvider for HostedLlm {
    async fn generate(&self, prompt: &Prompt) -> Result<String> {
        self.client
            .complete(&self.model, prompt.messages(), self.params)
            .await
    }

    async fn health_check(&self) -> Result<bool> {
        self.client.health_check().await
    }

    fn name(&self) -> &str {
        "hosted"
    }

    fn model(&self) -> &str {
        &self.model
    }
}
