//! Knowledge base and similarity retrieval

mod knowledge_base;
mod retriever;

pub use knowledge_base::KnowledgeBase;
pub use retriever::Retriever;
