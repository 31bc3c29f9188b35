//! Domain-knowledge retrieval implementations for ArchMentor.

pub mod in_memory;
pub mod seed;

pub use in_memory::InMemoryKnowledgeBase;
pub use seed::seed_corpus;
