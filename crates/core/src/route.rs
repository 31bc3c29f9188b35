//! Interaction routes and the response type each one commits to.

use serde::{Deserialize, Serialize};

use crate::plan::CoordinationPlan;

/// The fourteen interaction routes the routing engine can select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Route {
    ProgressiveOpening,
    CognitiveIntervention,
    CognitiveChallenge,
    SupportiveScaffolding,
    TopicTransition,
    FoundationalBuilding,
    SocraticClarification,
    SocraticExploration,
    BalancedGuidance,
    KnowledgeWithChallenge,
    KnowledgeOnly,
    MultiAgentComprehensive,
    Fallback,
    Error,
}

impl Route {
    pub const ALL: [Route; 14] = [
        Route::ProgressiveOpening,
        Route::CognitiveIntervention,
        Route::CognitiveChallenge,
        Route::SupportiveScaffolding,
        Route::TopicTransition,
        Route::FoundationalBuilding,
        Route::SocraticClarification,
        Route::SocraticExploration,
        Route::BalancedGuidance,
        Route::KnowledgeWithChallenge,
        Route::KnowledgeOnly,
        Route::MultiAgentComprehensive,
        Route::Fallback,
        Route::Error,
    ];

    /// The single response type this route commits to.
    pub fn response_type(&self) -> ResponseType {
        match self {
            Route::ProgressiveOpening
            | Route::SocraticExploration
            | Route::SocraticClarification
            | Route::SupportiveScaffolding
            | Route::FoundationalBuilding => ResponseType::SocraticPrimary,
            Route::KnowledgeOnly | Route::KnowledgeWithChallenge => ResponseType::KnowledgeSupport,
            Route::CognitiveIntervention | Route::CognitiveChallenge => {
                ResponseType::CognitiveIntervention
            }
            Route::MultiAgentComprehensive
            | Route::BalancedGuidance
            | Route::TopicTransition
            | Route::Error
            | Route::Fallback => ResponseType::Synthesis,
        }
    }

    /// ERROR and FALLBACK produce a degraded synthesis.
    pub fn is_degraded(&self) -> bool {
        matches!(self, Route::Error | Route::Fallback)
    }

    /// Routes that provide temporary structured support.
    pub fn is_scaffolding(&self) -> bool {
        matches!(
            self,
            Route::SupportiveScaffolding | Route::FoundationalBuilding
        )
    }

    /// Routes recorded in the intervention history.
    pub fn is_intervention(&self) -> bool {
        matches!(
            self,
            Route::CognitiveIntervention
                | Route::CognitiveChallenge
                | Route::SupportiveScaffolding
                | Route::FoundationalBuilding
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Route::ProgressiveOpening => "PROGRESSIVE_OPENING",
            Route::CognitiveIntervention => "COGNITIVE_INTERVENTION",
            Route::CognitiveChallenge => "COGNITIVE_CHALLENGE",
            Route::SupportiveScaffolding => "SUPPORTIVE_SCAFFOLDING",
            Route::TopicTransition => "TOPIC_TRANSITION",
            Route::FoundationalBuilding => "FOUNDATIONAL_BUILDING",
            Route::SocraticClarification => "SOCRATIC_CLARIFICATION",
            Route::SocraticExploration => "SOCRATIC_EXPLORATION",
            Route::BalancedGuidance => "BALANCED_GUIDANCE",
            Route::KnowledgeWithChallenge => "KNOWLEDGE_WITH_CHALLENGE",
            Route::KnowledgeOnly => "KNOWLEDGE_ONLY",
            Route::MultiAgentComprehensive => "MULTI_AGENT_COMPREHENSIVE",
            Route::Fallback => "FALLBACK",
            Route::Error => "ERROR",
        }
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The shape of reply a route promises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    SocraticPrimary,
    KnowledgeSupport,
    CognitiveIntervention,
    Synthesis,
}

impl ResponseType {
    pub const ALL: [ResponseType; 4] = [
        ResponseType::SocraticPrimary,
        ResponseType::KnowledgeSupport,
        ResponseType::CognitiveIntervention,
        ResponseType::Synthesis,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseType::SocraticPrimary => "socratic_primary",
            ResponseType::KnowledgeSupport => "knowledge_support",
            ResponseType::CognitiveIntervention => "cognitive_intervention",
            ResponseType::Synthesis => "synthesis",
        }
    }
}

impl std::fmt::Display for ResponseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The routing engine's output for one turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub route: Route,
    pub response_type: ResponseType,
    pub coordination_plan: CoordinationPlan,
    pub decision_confidence: f64,
    /// 1-based index of the priority rule that fired.
    pub matched_rule: u8,
    pub reason: String,
}
