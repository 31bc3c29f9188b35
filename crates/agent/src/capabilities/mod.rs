//! Built-in capabilities.
//!
//! Each capability is deterministic and template-based. They read the
//! classification, the draft state and any upstream contributions, and
//! adapt their wording to the route and, in multi-lens plans, to the lens
//! they were assigned.

mod analysis;
mod cognitive_enhancement;
mod context;
mod domain_knowledge;
mod socratic;

pub use analysis::AnalysisCapability;
pub use cognitive_enhancement::CognitiveEnhancementCapability;
pub use context::ContextCapability;
pub use domain_knowledge::DomainKnowledgeCapability;
pub use socratic::SocraticCapability;

use archmentor_core::capability::{CapabilityInput, CapabilityRegistry};
use archmentor_core::knowledge::KnowledgeSource;
use archmentor_core::vision::VisualAnalyzer;
use std::sync::Arc;

/// A registry with all five built-in capabilities.
pub fn default_registry(
    knowledge: Arc<dyn KnowledgeSource>,
    vision: Option<Arc<dyn VisualAnalyzer>>,
    max_results: usize,
) -> CapabilityRegistry {
    let mut context = ContextCapability::new();
    if let Some(vision) = vision {
        context = context.with_vision(vision);
    }

    CapabilityRegistry::new()
        .with(Arc::new(context))
        .with(Arc::new(AnalysisCapability::new()))
        .with(Arc::new(DomainKnowledgeCapability::new(knowledge, max_results)))
        .with(Arc::new(SocraticCapability::new()))
        .with(Arc::new(CognitiveEnhancementCapability::new()))
}

/// What the turn is about: this turn's topic, the session topic, or the
/// design in general.
pub(crate) fn focus(input: &CapabilityInput<'_>) -> String {
    input
        .classification
        .features
        .topic
        .clone()
        .or_else(|| input.state.current_topic.clone())
        .unwrap_or_else(|| "your design".to_string())
}
