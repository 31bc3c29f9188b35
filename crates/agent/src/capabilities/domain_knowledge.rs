//! Domain knowledge capability — cited facts from the knowledge source.

use archmentor_core::capability::{Capability, CapabilityInput, ContributionPayload};
use archmentor_core::error::CapabilityError;
use archmentor_core::knowledge::{KnowledgeFilters, KnowledgeSource};
use archmentor_core::metrics::MetricHints;
use archmentor_core::plan::CapabilityRole;
use archmentor_core::route::Route;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use super::focus;

/// Answers with ranked, cited statements from a [`KnowledgeSource`].
pub struct DomainKnowledgeCapability {
    source: Arc<dyn KnowledgeSource>,
    max_results: usize,
}

impl DomainKnowledgeCapability {
    pub fn new(source: Arc<dyn KnowledgeSource>, max_results: usize) -> Self {
        Self {
            source,
            max_results: max_results.max(1),
        }
    }
}

#[async_trait]
impl Capability for DomainKnowledgeCapability {
    fn role(&self) -> CapabilityRole {
        CapabilityRole::DomainKnowledge
    }

    async fn produce(
        &self,
        input: &CapabilityInput<'_>,
    ) -> Result<ContributionPayload, CapabilityError> {
        let topic = focus(input);
        let query = format!("{} {topic}", input.user_text);
        let filters = KnowledgeFilters {
            phase: Some(input.state.phase),
            limit: self.max_results,
            ..Default::default()
        };

        let items = self
            .source
            .query(&query, &filters)
            .await
            .map_err(|e| CapabilityError::Failed {
                capability: self.role().as_str().to_string(),
                reason: e.to_string(),
            })?;
        debug!(source = self.source.name(), hits = items.len(), "Knowledge retrieved");

        if items.is_empty() {
            return Ok(ContributionPayload::text(format!(
                "I have no close reference on {topic}, so a precedent study of your own would be the best source here."
            ))
            .with_lens(input.lens));
        }

        let text = items
            .iter()
            .map(|item| item.content.trim().to_string())
            .collect::<Vec<_>>()
            .join(" ");
        let citations = items.iter().map(|item| item.citation()).collect();
        let hints = MetricHints {
            knowledge_integration: Some((40.0 + 20.0 * items.len() as f64).min(100.0)),
            ..Default::default()
        };

        let mut payload = ContributionPayload::text(text)
            .with_citations(citations)
            .with_lens(input.lens)
            .with_hints(hints);
        if input.route == Route::KnowledgeOnly {
            payload = payload.with_question(format!(
                "How might this change the way you approach {topic} in your own project?"
            ));
        }
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{FailingKnowledge, Fixture};
    use archmentor_knowledge::InMemoryKnowledgeBase;

    #[tokio::test]
    async fn cites_what_it_retrieves() {
        let capability = DomainKnowledgeCapability::new(Arc::new(InMemoryKnowledgeBase::seeded()), 2);
        let fixture = Fixture::new("What are the tradeoffs of timber versus concrete?");
        let payload = capability
            .produce(&fixture.input(Route::KnowledgeOnly))
            .await
            .unwrap();
        assert!(!payload.citations.is_empty());
        assert!(payload.citations.len() <= 2);
        assert_eq!(payload.questions.len(), 1);
        assert!(payload.hints.knowledge_integration.is_some());
    }

    #[tokio::test]
    async fn empty_corpus_still_answers() {
        let capability = DomainKnowledgeCapability::new(Arc::new(InMemoryKnowledgeBase::new()), 3);
        let fixture = Fixture::new("What is a parti?");
        let payload = capability
            .produce(&fixture.input(Route::FoundationalBuilding))
            .await
            .unwrap();
        assert!(payload.citations.is_empty());
        assert!(!payload.text.is_empty());
        assert!(payload.questions.is_empty());
    }

    #[tokio::test]
    async fn source_errors_become_capability_failures() {
        let capability = DomainKnowledgeCapability::new(Arc::new(FailingKnowledge), 3);
        let fixture = Fixture::new("What is a parti?");
        let err = capability
            .produce(&fixture.input(Route::KnowledgeOnly))
            .await
            .unwrap_err();
        assert!(matches!(err, CapabilityError::Failed { .. }));
    }
}
