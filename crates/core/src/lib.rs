//! # ArchMentor Core
//!
//! Domain types, traits, and error definitions for the ArchMentor
//! conversational routing engine. It has no HTTP, CLI or storage
//! dependencies and defines the domain model every other crate builds on.
//!
//! ## Design Philosophy
//!
//! Collaborators (capabilities, knowledge retrieval, visual analysis) are
//! traits here; implementations live in their respective crates. Signals
//! are closed enums so routing code matches on them exhaustively.

pub mod capability;
pub mod classification;
pub mod error;
pub mod event;
pub mod knowledge;
pub mod message;
pub mod metrics;
pub mod plan;
pub mod response;
pub mod route;
pub mod state;
pub mod trend;
pub mod vision;

// Re-export key types at crate root for ergonomics
pub use capability::{
    AgentContribution, Capability, CapabilityInput, CapabilityRegistry, Citation,
    ContributionPayload,
};
pub use classification::{
    ClassificationResult, ConfidenceAssessment, DomainTypeGuess, IntentClarity, InteractionType,
    Level, OffloadingRisk, TurnFeatures,
};
pub use error::{Error, Result};
pub use event::{DomainEvent, EventBus};
pub use knowledge::{KnowledgeFilters, KnowledgeItem, KnowledgeSource};
pub use message::{Message, Role};
pub use metrics::{MetricHints, MetricKind, MetricTrend, MetricsSnapshot};
pub use plan::{CapabilityRole, CoordinationPlan, CoordinationStyle, Lens, PlanStep};
pub use response::{PhaseAnalysis, ResponseMetadata, SynthesizedResponse, TurnRequest, TurnResponse};
pub use route::{ResponseType, Route, RoutingDecision};
pub use state::{
    CognitiveFlag, ConversationState, DesignPhase, InterventionRecord, MetricsWindow,
    PhaseEvidence, RouteRecord, SkillLevel, TurnRecord,
};
pub use trend::{DepthPattern, EngagementTrend, OffloadingTrend, TrendSignals};
pub use vision::{VisualAnalyzer, VisualObservations};
