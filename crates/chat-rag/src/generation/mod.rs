//! Answer generation: prompt assembly and generator API clients

pub mod chat_completions;
pub mod ollama;
pub mod prompt;
pub mod retry;

pub use chat_completions::{ChatCompletionsClient, CompletionParams};
pub use ollama::{GenerateOptions, OllamaClient};
pub use prompt::{KnowledgeContext, Prompt, PromptBuilder, PromptMessage, PromptRole};
pub use retry::RetryPolicy;
