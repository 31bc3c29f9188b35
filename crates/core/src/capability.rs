//! Capability trait — the abstraction over specialist contributors.
//!
//! Each capability (context, analysis, domain knowledge, socratic,
//! cognitive enhancement) implements [`Capability`] and is registered in a
//! [`CapabilityRegistry`]. The pipeline invokes them according to the
//! coordination plan and hands their contributions to the synthesizer.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::classification::ClassificationResult;
use crate::error::CapabilityError;
use crate::metrics::MetricHints;
use crate::plan::{CapabilityRole, Lens};
use crate::route::Route;
use crate::state::ConversationState;

/// A source backing a statement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Citation {
    pub id: String,
    pub title: String,
    pub source: String,
}

/// What a capability produced for one turn.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContributionPayload {
    /// Declarative statements, one or more sentences.
    pub text: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub questions: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub citations: Vec<Citation>,

    /// Guided prompts for cognitive interventions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub challenge_prompts: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lens: Option<Lens>,

    #[serde(default)]
    pub hints: MetricHints,
}

impl ContributionPayload {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_question(mut self, question: impl Into<String>) -> Self {
        self.questions.push(question.into());
        self
    }

    pub fn with_citations(mut self, citations: Vec<Citation>) -> Self {
        self.citations = citations;
        self
    }

    pub fn with_prompts(mut self, prompts: Vec<String>) -> Self {
        self.challenge_prompts = prompts;
        self
    }

    pub fn with_lens(mut self, lens: Option<Lens>) -> Self {
        self.lens = lens;
        self
    }

    pub fn with_hints(mut self, hints: MetricHints) -> Self {
        self.hints = hints;
        self
    }
}

/// The structured output of one capability call, successful or not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentContribution {
    pub capability_id: String,
    pub role: CapabilityRole,
    /// Conflict-resolution rank; lower wins.
    pub rank: u8,
    pub payload: ContributionPayload,
    pub latency_ms: u64,
    pub succeeded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AgentContribution {
    pub fn success(role: CapabilityRole, payload: ContributionPayload, latency_ms: u64) -> Self {
        Self {
            capability_id: role.as_str().to_string(),
            role,
            rank: role.priority(),
            payload,
            latency_ms,
            succeeded: true,
            error: None,
        }
    }

    pub fn failure(role: CapabilityRole, error: &CapabilityError, latency_ms: u64) -> Self {
        Self {
            capability_id: role.as_str().to_string(),
            role,
            rank: role.priority(),
            payload: ContributionPayload::default(),
            latency_ms,
            succeeded: false,
            error: Some(error.to_string()),
        }
    }
}

/// Everything a capability may read while producing its contribution.
pub struct CapabilityInput<'a> {
    pub user_text: &'a str,
    pub image_ref: Option<&'a str>,
    pub classification: &'a ClassificationResult,
    pub state: &'a ConversationState,
    pub route: Route,
    pub lens: Option<Lens>,
    /// Contributions from earlier stages of the plan.
    pub upstream: &'a [AgentContribution],
}

impl<'a> CapabilityInput<'a> {
    /// The successful upstream contribution for `role`, if any.
    pub fn upstream(&self, role: CapabilityRole) -> Option<&'a AgentContribution> {
        self.upstream
            .iter()
            .find(|c| c.role == role && c.succeeded)
    }
}

/// The core Capability trait.
#[async_trait]
pub trait Capability: Send + Sync {
    /// Which of the five roles this capability fills.
    fn role(&self) -> CapabilityRole;

    /// Produce this capability's contribution for the turn.
    async fn produce(
        &self,
        input: &CapabilityInput<'_>,
    ) -> std::result::Result<ContributionPayload, CapabilityError>;
}

/// A registry of available capabilities, at most one per role.
#[derive(Clone, Default)]
pub struct CapabilityRegistry {
    capabilities: HashMap<CapabilityRole, Arc<dyn Capability>>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a capability. Replaces any existing capability with the same role.
    pub fn register(&mut self, capability: Arc<dyn Capability>) {
        self.capabilities.insert(capability.role(), capability);
    }

    pub fn with(mut self, capability: Arc<dyn Capability>) -> Self {
        self.register(capability);
        self
    }

    pub fn get(&self, role: CapabilityRole) -> Option<Arc<dyn Capability>> {
        self.capabilities.get(&role).cloned()
    }

    pub fn contains(&self, role: CapabilityRole) -> bool {
        self.capabilities.contains_key(&role)
    }

    /// Registered roles in canonical order.
    pub fn roles(&self) -> Vec<CapabilityRole> {
        CapabilityRole::ALL
            .into_iter()
            .filter(|r| self.capabilities.contains_key(r))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }
}
