//! Prompt assembly for tutor chat, with optional knowledge-base context

use serde::Serialize;

use crate::providers::vector_store::VectorSearchResult;
use crate::types::{ConversationTurn, Role};

const PERSONA: &str = r#"Your personality:
- Encouraging and supportive
- Patient and understanding
- Clear in explanations
- Enthusiastic about learning
- Ask follow-up questions to ensure understanding

Your teaching approach:
- Use examples and analogies
- Encourage critical thinking
- Adapt language to student's level
- Make learning engaging and fun
- Be positive and motivating

IMPORTANT FORMATTING: Always format your responses using Markdown syntax:
- Use **bold** for important terms or emphasis
- Use *italics* for subtle emphasis
- Use bullet points with * for lists
- Use numbered lists when showing steps
- Use `code` formatting for technical terms
- Use proper headings with # when needed
- Use > for quotes or important notes

Keep responses conversational, helpful, and educational."#;

const FIRST_INTERACTION: &str = r#"You are AI Chatbot, an intelligent AI tutor. This is your FIRST interaction with this student.

For this FIRST message only, introduce yourself briefly as "Hi there! I'm AI Chatbot, your friendly AI tutor" and then proceed to help with their question."#;

const FOLLOW_UP: &str = r#"You are AI Chatbot, an AI tutor continuing an ongoing conversation with a student.

DO NOT introduce yourself again - you've already met this student.
Simply continue the conversation naturally and helpfully."#;

const GROUNDING_RULES: &str = r#"Use the context from the knowledge base below to help answer the student's question.

If the context provides relevant information, incorporate it into your response naturally and cite it (e.g., "According to the document..."). If the context doesn't contain relevant information for the question, respond based on your general knowledge but mention that you're drawing from general knowledge rather than the knowledge base."#;

const NOTHING_RELEVANT: &str = r#"No relevant context found in the knowledge base.

Provide a helpful response based on your general knowledge. Mention that you're drawing from general knowledge since the specific information isn't in the current knowledge base."#;

/// What the knowledge base contributed to this prompt
#[derive(Debug, Clone, Copy)]
pub enum KnowledgeContext<'a> {
    /// Retrieval was not attempted
    Disabled,
    /// Retrieval ran but nothing passed the threshold
    NothingRelevant,
    /// Chunks to ground the answer in, best first
    Retrieved(&'a [VectorSearchResult]),
}

/// Role of a prompt message, serialized the way chat-completion APIs expect
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PromptRole {
    System,
    User,
    Assistant,
}

impl From<Role> for PromptRole {
    fn from(role: Role) -> Self {
        match role {
            Role::User => PromptRole::User,
            Role::Assistant => PromptRole::Assistant,
        }
    }
}

/// One message of an assembled prompt
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PromptMessage {
    pub role: PromptRole,
    pub content: String,
}

impl PromptMessage {
    fn new(role: PromptRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// An assembled prompt: system instruction, prior turns, then the user's message
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    messages: Vec<PromptMessage>,
}

impl Prompt {
    /// Messages in order, for chat-completion style APIs
    pub fn messages(&self) -> &[PromptMessage] {
        &self.messages
    }

    /// System instruction text
    pub fn system(&self) -> &str {
        self.messages
            .first()
            .filter(|m| m.role == PromptRole::System)
            .map(|m| m.content.as_str())
            .unwrap_or_default()
    }

    /// Flatten into a single completion prompt
    pub fn render(&self) -> String {
        let mut out = String::new();
        let mut history = Vec::new();
        let (current, earlier) = match self.messages.split_last() {
            Some((last, rest)) => (Some(last), rest),
            None => (None, &self.messages[..]),
        };

        for message in earlier {
            match message.role {
                PromptRole::System => {
                    out.push_str(&message.content);
                    out.push_str("\n\n");
                }
                PromptRole::User => history.push(format!("Student: {}", message.content)),
                PromptRole::Assistant => history.push(format!("AI Chatbot: {}", message.content)),
            }
        }

        if !history.is_empty() {
            out.push_str("Previous Conversation:\n");
            out.push_str(&history.join("\n"));
            out.push_str("\n\n");
        }

        if let Some(current) = current {
            out.push_str("Student's Question: ");
            out.push_str(&current.content);
            out.push_str("\n\n");
        }

        out.push_str("Answer:");
        out
    }
}

/// Prompt builder for tutor chat
pub struct PromptBuilder;

impl PromptBuilder {
    /// System instruction; the first-interaction variant introduces the tutor
    pub fn system_instruction(first_interaction: bool) -> String {
        let opening = if first_interaction {
            FIRST_INTERACTION
        } else {
            FOLLOW_UP
        };
        format!("{}\n\n{}", opening, PERSONA)
    }

    /// Format retrieved chunks with their source attribution
    pub fn build_context(results: &[VectorSearchResult]) -> String {
        results
            .iter()
            .enumerate()
            .map(|(i, result)| {
                format!(
                    "[Document {} - {}]:\n{}\n",
                    i + 1,
                    result.chunk.source.format_citation(),
                    result.chunk.text.trim()
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Assemble the full prompt.
    ///
    /// `history` is expected to already be limited to the turns that should be shown.
    pub fn build(
        history: &[ConversationTurn],
        context: KnowledgeContext<'_>,
        user_text: &str,
    ) -> Prompt {
        let first_interaction = !history.iter().any(|t| t.role == Role::Assistant);
        let mut system = Self::system_instruction(first_interaction);

        match context {
            KnowledgeContext::Disabled => {}
            KnowledgeContext::NothingRelevant => {
                system.push_str("\n\n");
                system.push_str(NOTHING_RELEVANT);
            }
            KnowledgeContext::Retrieved(results) if results.is_empty() => {
                system.push_str("\n\n");
                system.push_str(NOTHING_RELEVANT);
            }
            KnowledgeContext::Retrieved(results) => {
                system.push_str("\n\n");
                system.push_str(GROUNDING_RULES);
                system.push_str("\n\nContext from Knowledge Base:\n");
                system.push_str(&Self::build_context(results));
            }
        }

        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(PromptMessage::new(PromptRole::System, system));
        messages.extend(
            history
                .iter()
                .map(|turn| PromptMessage::new(turn.role.into(), turn.text.clone())),
        );
        messages.push(PromptMessage::new(PromptRole::User, user_text));

        Prompt { messages }
    }
}
