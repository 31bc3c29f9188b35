//! Knowledge retrieval trait — ranked architectural knowledge with citations.
//!
//! Consumed only by the domain-knowledge capability. Corpus construction
//! and vector indexing live outside the routing engine.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::capability::Citation;
use crate::error::KnowledgeError;
use crate::state::DesignPhase;

/// A single knowledge item returned by a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeItem {
    /// Unique ID for this item
    pub id: String,

    /// Short title, used in citations
    pub title: String,

    /// The knowledge statement itself
    pub content: String,

    /// Where the statement comes from (book, standard, precedent)
    pub source: String,

    /// Tags for categorization (topics, building types)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    /// Phases this item is most useful in (empty = any)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub phases: Vec<DesignPhase>,

    /// Relevance score (set by query operations)
    #[serde(default)]
    pub score: f32,
}

impl KnowledgeItem {
    pub fn citation(&self) -> Citation {
        Citation {
            id: self.id.clone(),
            title: self.title.clone(),
            source: self.source.clone(),
        }
    }
}

/// Filters narrowing a knowledge query.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KnowledgeFilters {
    /// Keep only items carrying at least one of these tags
    #[serde(default)]
    pub tags: Vec<String>,

    /// Prefer items relevant to this phase
    #[serde(default)]
    pub phase: Option<DesignPhase>,

    /// Maximum number of results
    #[serde(default = "default_limit")]
    pub limit: usize,

    /// Minimum relevance score threshold
    #[serde(default)]
    pub min_score: f32,
}

fn default_limit() -> usize {
    3
}

/// The knowledge retrieval collaborator.
#[async_trait]
pub trait KnowledgeSource: Send + Sync {
    /// The name of this source (e.g., "in_memory").
    fn name(&self) -> &str;

    /// Return items ranked by relevance, best first.
    async fn query(
        &self,
        text: &str,
        filters: &KnowledgeFilters,
    ) -> std::result::Result<Vec<KnowledgeItem>, KnowledgeError>;

    /// Number of items available.
    async fn count(&self) -> std::result::Result<usize, KnowledgeError>;
}
