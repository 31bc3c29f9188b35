//! In-memory knowledge base — keyword-ranked retrieval over a small corpus.
//!
//! Useful for tests and for running without an external vector store.

use archmentor_core::error::KnowledgeError;
use archmentor_core::knowledge::{KnowledgeFilters, KnowledgeItem, KnowledgeSource};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;

const STOPWORDS: &[&str] = &[
    "the", "and", "for", "with", "that", "this", "what", "how", "are", "can", "should", "use",
    "about", "from", "into", "your", "you", "does", "why", "when", "which", "will", "would",
    "could", "have", "has", "tell", "just", "give", "need", "want", "there", "their", "them",
];

/// Extra weight for items tied to the active design phase.
const PHASE_BONUS: f32 = 0.25;

/// A knowledge base that keeps its items in a Vec.
pub struct InMemoryKnowledgeBase {
    items: Arc<RwLock<Vec<KnowledgeItem>>>,
}

/// On-disk corpus format.
#[derive(Debug, Deserialize)]
struct CorpusFile {
    #[serde(default)]
    items: Vec<KnowledgeItem>,
}

impl InMemoryKnowledgeBase {
    pub fn new() -> Self {
        Self {
            items: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn with_items(items: Vec<KnowledgeItem>) -> Self {
        Self {
            items: Arc::new(RwLock::new(items)),
        }
    }

    /// A knowledge base preloaded with the built-in corpus.
    pub fn seeded() -> Self {
        Self::with_items(crate::seed::seed_corpus())
    }

    /// Add an item, replacing any existing item with the same id.
    pub async fn insert(&self, item: KnowledgeItem) {
        let mut items = self.items.write().await;
        items.retain(|i| i.id != item.id);
        items.push(item);
    }

    /// Merge items from a TOML corpus file (`[[items]]` tables).
    pub async fn load_toml(&self, path: &Path) -> Result<usize, KnowledgeError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| KnowledgeError::CorpusLoad(format!("{}: {e}", path.display())))?;
        let corpus: CorpusFile = toml::from_str(&content)
            .map_err(|e| KnowledgeError::CorpusLoad(format!("{}: {e}", path.display())))?;

        let loaded = corpus.items.len();
        for item in corpus.items {
            self.insert(item).await;
        }
        tracing::info!(path = %path.display(), loaded, "Knowledge corpus loaded");
        Ok(loaded)
    }
}

impl Default for InMemoryKnowledgeBase {
    fn default() -> Self {
        Self::new()
    }
}

/// Lowercased content words of at least three letters.
fn terms(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() >= 3)
        .map(|w| w.to_lowercase())
        .filter(|w| !STOPWORDS.contains(&w.as_str()))
        .map(|w| w.trim_end_matches('s').to_string())
        .collect()
}

fn score(query_terms: &BTreeSet<String>, item: &KnowledgeItem) -> f32 {
    if query_terms.is_empty() {
        return 0.0;
    }
    let mut haystack = terms(&item.title);
    haystack.extend(terms(&item.content));
    for tag in &item.tags {
        haystack.extend(terms(tag));
    }
    let hits = query_terms.intersection(&haystack).count();
    hits as f32 / query_terms.len() as f32
}

#[async_trait]
impl KnowledgeSource for InMemoryKnowledgeBase {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn query(
        &self,
        text: &str,
        filters: &KnowledgeFilters,
    ) -> Result<Vec<KnowledgeItem>, KnowledgeError> {
        let items = self.items.read().await;
        let query_terms = terms(text);

        let mut results: Vec<KnowledgeItem> = items
            .iter()
            .filter(|item| {
                filters.tags.is_empty() || filters.tags.iter().any(|t| item.tags.contains(t))
            })
            .filter_map(|item| {
                let base = score(&query_terms, item);
                if base <= 0.0 {
                    return None;
                }
                let bonus = match filters.phase {
                    Some(phase) if item.phases.contains(&phase) => PHASE_BONUS,
                    _ => 0.0,
                };
                let mut hit = item.clone();
                hit.score = base + bonus;
                Some(hit)
            })
            .filter(|item| item.score >= filters.min_score)
            .collect();

        // Ties broken by id so identical queries rank identically.
        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        results.truncate(filters.limit);

        Ok(results)
    }

    async fn count(&self) -> Result<usize, KnowledgeError> {
        Ok(self.items.read().await.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use archmentor_core::state::DesignPhase;

    fn item(id: &str, title: &str, content: &str, phases: Vec<DesignPhase>) -> KnowledgeItem {
        KnowledgeItem {
            id: id.into(),
            title: title.into(),
            content: content.into(),
            source: "test".into(),
            tags: vec![],
            phases,
            score: 0.0,
        }
    }

    fn filters(limit: usize) -> KnowledgeFilters {
        KnowledgeFilters {
            limit,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn query_ranks_by_overlap() {
        let kb = InMemoryKnowledgeBase::with_items(vec![
            item("a", "Timber", "Cross-laminated timber panels store carbon", vec![]),
            item("b", "Concrete", "Concrete has high thermal mass", vec![]),
        ]);
        let results = kb.query("Is timber good for carbon?", &filters(5)).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "a");
        assert!(results[0].score > 0.0);
    }

    #[tokio::test]
    async fn phase_bonus_breaks_ties() {
        let kb = InMemoryKnowledgeBase::with_items(vec![
            item("a", "Daylight", "Daylight depth rule", vec![]),
            item("b", "Daylight", "Daylight depth rule", vec![DesignPhase::Ideation]),
        ]);
        let f = KnowledgeFilters {
            phase: Some(DesignPhase::Ideation),
            limit: 5,
            ..Default::default()
        };
        let results = kb.query("daylight depth", &f).await.unwrap();
        assert_eq!(results[0].id, "b");
    }

    #[tokio::test]
    async fn insert_replaces_same_id() {
        let kb = InMemoryKnowledgeBase::new();
        kb.insert(item("a", "One", "first", vec![])).await;
        kb.insert(item("a", "One", "second", vec![])).await;
        assert_eq!(kb.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn load_toml_corpus() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corpus.toml");
        std::fs::write(
            &path,
            r#"
[[items]]
id = "acoustics-1"
title = "Reverberation"
content = "Hard parallel surfaces lengthen reverberation time in halls."
source = "Acoustics primer"
tags = ["acoustics"]
"#,
        )
        .unwrap();

        let kb = InMemoryKnowledgeBase::new();
        assert_eq!(kb.load_toml(&path).await.unwrap(), 1);
        let results = kb.query("reverberation in halls", &filters(3)).await.unwrap();
        assert_eq!(results[0].citation().title, "Reverberation");
    }

    #[tokio::test]
    async fn missing_corpus_is_an_error() {
        let kb = InMemoryKnowledgeBase::new();
        let err = kb.load_toml(Path::new("/nonexistent/corpus.toml")).await;
        assert!(matches!(err, Err(KnowledgeError::CorpusLoad(_))));
    }

    #[tokio::test]
    async fn seeded_base_answers_material_questions() {
        let kb = InMemoryKnowledgeBase::seeded();
        assert!(kb.count().await.unwrap() >= 8);
        let results = kb.query("which materials for a facade", &filters(3)).await.unwrap();
        assert!(!results.is_empty());
    }
}
