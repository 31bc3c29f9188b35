//! Shared fixtures and scripted collaborators for unit tests.

use archmentor_core::capability::{
    AgentContribution, Capability, CapabilityInput, CapabilityRegistry, ContributionPayload,
};
use archmentor_core::classification::ClassificationResult;
use archmentor_core::error::{CapabilityError, KnowledgeError};
use archmentor_core::knowledge::{KnowledgeFilters, KnowledgeItem, KnowledgeSource};
use archmentor_core::plan::{CapabilityRole, Lens};
use archmentor_core::route::Route;
use archmentor_core::state::ConversationState;
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::classifier::{ContextClassifier, RuleClassifier};

/// Owned inputs for building a [`CapabilityInput`].
pub struct Fixture {
    pub text: String,
    pub image: Option<String>,
    pub state: ConversationState,
    pub classification: ClassificationResult,
    pub upstream: Vec<AgentContribution>,
}

impl Fixture {
    pub fn new(text: &str) -> Self {
        let state = ConversationState::new("fixture", 10);
        let classification = RuleClassifier::new().classify(text, &state);
        Self {
            text: text.to_string(),
            image: None,
            state,
            classification,
            upstream: Vec::new(),
        }
    }

    pub fn with_image(mut self, image: &str) -> Self {
        self.image = Some(image.to_string());
        self
    }

    pub fn input(&self, route: Route) -> CapabilityInput<'_> {
        CapabilityInput {
            user_text: &self.text,
            image_ref: self.image.as_deref(),
            classification: &self.classification,
            state: &self.state,
            route,
            lens: None,
            upstream: &self.upstream,
        }
    }

    pub fn input_with_lens(&self, route: Route, lens: Lens) -> CapabilityInput<'_> {
        CapabilityInput {
            lens: Some(lens),
            ..self.input(route)
        }
    }
}

/// Returns the same payload every call and counts its invocations.
pub struct ScriptedCapability {
    role: CapabilityRole,
    payload: ContributionPayload,
    pub calls: AtomicUsize,
}

impl ScriptedCapability {
    pub fn new(role: CapabilityRole, payload: ContributionPayload) -> Self {
        Self {
            role,
            payload,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn text(role: CapabilityRole, text: &str) -> Self {
        Self::new(role, ContributionPayload::text(text))
    }
}

#[async_trait]
impl Capability for ScriptedCapability {
    fn role(&self) -> CapabilityRole {
        self.role
    }

    async fn produce(
        &self,
        _input: &CapabilityInput<'_>,
    ) -> Result<ContributionPayload, CapabilityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.payload.clone())
    }
}

/// Sleeps before answering, for timeout and cancellation tests.
pub struct SlowCapability {
    pub role: CapabilityRole,
    pub delay: Duration,
}

#[async_trait]
impl Capability for SlowCapability {
    fn role(&self) -> CapabilityRole {
        self.role
    }

    async fn produce(
        &self,
        _input: &CapabilityInput<'_>,
    ) -> Result<ContributionPayload, CapabilityError> {
        tokio::time::sleep(self.delay).await;
        Ok(ContributionPayload::text("This arrived late."))
    }
}

/// Always fails.
pub struct FailingCapability(pub CapabilityRole);

#[async_trait]
impl Capability for FailingCapability {
    fn role(&self) -> CapabilityRole {
        self.0
    }

    async fn produce(
        &self,
        _input: &CapabilityInput<'_>,
    ) -> Result<ContributionPayload, CapabilityError> {
        Err(CapabilityError::Failed {
            capability: self.0.as_str().to_string(),
            reason: "scripted failure".into(),
        })
    }
}

/// A knowledge source that is always down.
pub struct FailingKnowledge;

#[async_trait]
impl KnowledgeSource for FailingKnowledge {
    fn name(&self) -> &str {
        "failing"
    }

    async fn query(
        &self,
        _text: &str,
        _filters: &KnowledgeFilters,
    ) -> Result<Vec<KnowledgeItem>, KnowledgeError> {
        Err(KnowledgeError::Unavailable("scripted outage".into()))
    }

    async fn count(&self) -> Result<usize, KnowledgeError> {
        Err(KnowledgeError::Unavailable("scripted outage".into()))
    }
}

/// A registry of scripted capabilities, one per role, each answering with
/// one sentence and, for socratic, one question.
pub fn scripted_registry() -> CapabilityRegistry {
    let mut registry = CapabilityRegistry::new();
    for role in CapabilityRole::ALL {
        let mut payload = ContributionPayload::text(format!("The {} view is clear.", role.as_str()));
        if role == CapabilityRole::Socratic {
            payload = payload.with_question("What would you try first?");
        }
        registry.register(Arc::new(ScriptedCapability::new(role, payload)));
    }
    registry
}
