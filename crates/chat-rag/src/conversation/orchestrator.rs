//! Retrieval-augmented chat orchestration

use std::sync::Arc;
use std::time::Duration;

use crate::config::RagConfig;
use crate::error::{Error, Result};
use crate::generation::{KnowledgeContext, Prompt, PromptBuilder};
use crate::providers::{LlmProvider, VectorSearchResult};
use crate::retrieval::{KnowledgeBase, Retriever};
use crate::types::{AssistantReply, ChatMode, ReplyError, SourceRef};

use super::store::ConversationStore;

/// Reply text used whenever generation fails
pub const FALLBACK_REPLY: &str =
    "I apologize, but I'm having trouble processing your question right now. Please try again.";

/// Runs one chat exchange: retrieve, assemble, generate, persist
pub struct ChatOrchestrator {
    retriever: Retriever,
    knowledge_base: Arc<KnowledgeBase>,
    llm: Arc<dyn LlmProvider>,
    conversations: Arc<ConversationStore>,
    top_k: usize,
    similarity_threshold: f32,
    history_limit: usize,
    generation_timeout: Duration,
}

impl ChatOrchestrator {
    pub fn new(
        config: &RagConfig,
        retriever: Retriever,
        knowledge_base: Arc<KnowledgeBase>,
        llm: Arc<dyn LlmProvider>,
        conversations: Arc<ConversationStore>,
    ) -> Self {
        Self {
            retriever,
            knowledge_base,
            llm,
            conversations,
            top_k: config.retrieval.top_k,
            similarity_threshold: config.retrieval.similarity_threshold,
            history_limit: config.conversation.history_limit,
            generation_timeout: config.llm.generation_timeout(),
        }
    }

    /// Override the overall generation bound
    pub fn with_generation_timeout(mut self, timeout: Duration) -> Self {
        self.generation_timeout = timeout;
        self
    }

    pub fn conversations(&self) -> &Arc<ConversationStore> {
        &self.conversations
    }

    /// Answer a user message within a session and record the exchange.
    ///
    /// Only an empty message is an error. Retrieval problems fall back to
    /// plain chat and generation problems produce the fallback reply.
    pub async fn answer(
        &self,
        session_id: &str,
        user_text: &str,
        mode: ChatMode,
    ) -> Result<AssistantReply> {
        let user_text = validate_message(user_text)?;

        let retrieved = self.retrieve(user_text, mode == ChatMode::Rag).await;
        let history = self.conversations.history(session_id, self.history_limit);
        let prompt = PromptBuilder::build(&history, context_of(retrieved.as_deref()), user_text);

        let reply = self.generate(&prompt, retrieved.as_deref()).await;

        // No await between generation and the two appends
        self.conversations
            .append_exchange(session_id, user_text, &reply.text);

        tracing::info!(
            "Answered session {} (retrieval: {}, sources: {}, degraded: {})",
            session_id,
            reply.used_retrieval,
            reply.source_chunks.len(),
            reply.is_degraded()
        );
        Ok(reply)
    }

    /// Answer without session history and without recording anything
    pub async fn preview(&self, user_text: &str, use_context: bool) -> Result<AssistantReply> {
        let user_text = validate_message(user_text)?;

        let retrieved = self.retrieve(user_text, use_context).await;
        let prompt = PromptBuilder::build(&[], context_of(retrieved.as_deref()), user_text);
        Ok(self.generate(&prompt, retrieved.as_deref()).await)
    }

    /// `None` when retrieval was skipped or failed
    async fn retrieve(&self, user_text: &str, wanted: bool) -> Option<Vec<VectorSearchResult>> {
        if !wanted {
            return None;
        }
        if self.knowledge_base.stats().document_count == 0 {
            tracing::debug!("Knowledge base is empty, answering without retrieval");
            return None;
        }

        match self
            .retriever
            .retrieve(user_text, self.top_k, self.similarity_threshold)
            .await
        {
            Ok(results) => Some(results),
            Err(e) => {
                tracing::warn!("Retrieval failed, answering without context: {}", e);
                None
            }
        }
    }

    async fn generate(
        &self,
        prompt: &Prompt,
        retrieved: Option<&[VectorSearchResult]>,
    ) -> AssistantReply {
        let results = retrieved.unwrap_or_default();
        let source_chunks: Vec<SourceRef> = results
            .iter()
            .map(|r| SourceRef::from_chunk(&r.chunk, r.similarity))
            .collect();

        let outcome = match tokio::time::timeout(self.generation_timeout, self.llm.generate(prompt)).await {
            Ok(Ok(text)) if !text.trim().is_empty() => Ok(text.trim().to_string()),
            Ok(Ok(_)) => Err(Error::generation("empty reply")),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(Error::generation(format!(
                "no reply within {}s",
                self.generation_timeout.as_secs_f32()
            ))),
        };

        match outcome {
            Ok(text) => AssistantReply {
                text,
                used_retrieval: !results.is_empty(),
                source_chunks,
                error: None,
            },
            Err(e) => {
                tracing::error!("Generation with {} ({}) failed: {}", self.llm.name(), self.llm.model(), e);
                AssistantReply {
                    text: FALLBACK_REPLY.to_string(),
                    used_retrieval: !results.is_empty(),
                    source_chunks,
                    error: Some(ReplyError {
                        kind: "generation_error".to_string(),
                        message: e.to_string(),
                    }),
                }
            }
        }
    }
}

fn validate_message(text: &str) -> Result<&str> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(Error::validation("Message cannot be empty"));
    }
    Ok(trimmed)
}

fn context_of(retrieved: Option<&[VectorSearchResult]>) -> KnowledgeContext<'_> {
    match retrieved {
        None => KnowledgeContext::Disabled,
        Some([]) => KnowledgeContext::NothingRelevant,
        Some(results) => KnowledgeContext::Retrieved(results),
    }
}
