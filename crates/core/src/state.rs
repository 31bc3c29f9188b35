//! Per-session conversation state.
//!
//! A [`ConversationState`] is owned by exactly one session task and mutated
//! only by that session's turn pipeline. Nothing in here is global.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};

use crate::classification::{ClassificationResult, InteractionType, Level, OffloadingRisk};
use crate::message::{Message, Role};
use crate::metrics::MetricsSnapshot;
use crate::route::Route;

/// The four design phases a student moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DesignPhase {
    #[default]
    Discovery,
    Ideation,
    Visualization,
    Materialization,
}

impl DesignPhase {
    pub const ALL: [DesignPhase; 4] = [
        DesignPhase::Discovery,
        DesignPhase::Ideation,
        DesignPhase::Visualization,
        DesignPhase::Materialization,
    ];

    pub fn index(&self) -> usize {
        match self {
            DesignPhase::Discovery => 0,
            DesignPhase::Ideation => 1,
            DesignPhase::Visualization => 2,
            DesignPhase::Materialization => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DesignPhase::Discovery => "discovery",
            DesignPhase::Ideation => "ideation",
            DesignPhase::Visualization => "visualization",
            DesignPhase::Materialization => "materialization",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillLevel {
    Beginner,
    #[default]
    Intermediate,
    Advanced,
}

/// Standardized cognitive tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CognitiveFlag {
    CognitiveOffloadingDetected,
    ScaffoldingProvided,
    SocraticQuestioning,
    EngagementChallenge,
    OverconfidenceChallenged,
    EngagementDeclineDetected,
    DeepThinkingObserved,
    ShallowThinkingObserved,
    KnowledgeChallenge,
    TopicTransition,
    ConfusionSupported,
    ReflectionCheckpoint,
    LensSelectionOffered,
    CapabilityDegraded,
}

impl CognitiveFlag {
    pub fn as_str(&self) -> &'static str {
        match self {
            CognitiveFlag::CognitiveOffloadingDetected => "cognitive_offloading_detected",
            CognitiveFlag::ScaffoldingProvided => "scaffolding_provided",
            CognitiveFlag::SocraticQuestioning => "socratic_questioning",
            CognitiveFlag::EngagementChallenge => "engagement_challenge",
            CognitiveFlag::OverconfidenceChallenged => "overconfidence_challenged",
            CognitiveFlag::EngagementDeclineDetected => "engagement_decline_detected",
            CognitiveFlag::DeepThinkingObserved => "deep_thinking_observed",
            CognitiveFlag::ShallowThinkingObserved => "shallow_thinking_observed",
            CognitiveFlag::KnowledgeChallenge => "knowledge_challenge",
            CognitiveFlag::TopicTransition => "topic_transition",
            CognitiveFlag::ConfusionSupported => "confusion_supported",
            CognitiveFlag::ReflectionCheckpoint => "reflection_checkpoint",
            CognitiveFlag::LensSelectionOffered => "lens_selection_offered",
            CognitiveFlag::CapabilityDegraded => "capability_degraded",
        }
    }
}

/// Append-only record of a routed turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteRecord {
    pub turn: u32,
    pub route: Route,
    /// Understanding level at the time of routing.
    pub understanding: Level,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterventionRecord {
    pub turn: u32,
    pub route: Route,
    pub flags: Vec<CognitiveFlag>,
    pub timestamp: DateTime<Utc>,
}

/// Per-turn feature vector kept in the rolling window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnRecord {
    pub turn: u32,
    pub interaction_type: InteractionType,
    pub understanding: Level,
    pub engagement_score: f64,
    pub offloading_risk: OffloadingRisk,
    pub logical_connections: f64,
    pub concept_integration: f64,
    pub question_sophistication: f64,
    /// Filled in by the metrics engine at the end of the turn.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<MetricsSnapshot>,
}

impl TurnRecord {
    pub fn from_classification(turn: u32, c: &ClassificationResult) -> Self {
        Self {
            turn,
            interaction_type: c.interaction_type,
            understanding: c.understanding_level,
            engagement_score: c.features.engagement_score,
            offloading_risk: c.offloading_risk,
            logical_connections: c.features.logical_connections,
            concept_integration: c.features.concept_integration,
            question_sophistication: c.features.question_sophistication,
            metrics: None,
        }
    }
}

/// Bounded rolling buffer of per-turn records; the oldest record is evicted first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsWindow {
    capacity: usize,
    records: VecDeque<TurnRecord>,
}

impl MetricsWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            records: VecDeque::with_capacity(capacity.max(1)),
        }
    }

    pub fn push(&mut self, record: TurnRecord) {
        while self.records.len() >= self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records oldest first.
    pub fn records(&self) -> impl DoubleEndedIterator<Item = &TurnRecord> + ExactSizeIterator {
        self.records.iter()
    }

    /// The most recent `n` records, oldest first.
    pub fn recent(&self, n: usize) -> Vec<&TurnRecord> {
        let skip = self.records.len().saturating_sub(n);
        self.records.iter().skip(skip).collect()
    }

    pub fn latest(&self) -> Option<&TurnRecord> {
        self.records.back()
    }

    pub fn latest_mut(&mut self) -> Option<&mut TurnRecord> {
        self.records.back_mut()
    }

    /// Metric snapshots in the window, oldest first.
    pub fn snapshots(&self) -> Vec<MetricsSnapshot> {
        self.records.iter().filter_map(|r| r.metrics).collect()
    }
}

/// Accumulated cue counts per design phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PhaseEvidence {
    pub counts: [u32; 4],
}

impl PhaseEvidence {
    pub fn add(&mut self, phase: DesignPhase, n: u32) {
        self.counts[phase.index()] = self.counts[phase.index()].saturating_add(n);
    }

    pub fn get(&self, phase: DesignPhase) -> u32 {
        self.counts[phase.index()]
    }

    pub fn total(&self) -> u32 {
        self.counts.iter().sum()
    }
}

/// Everything the pipeline knows about one session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationState {
    pub session_id: String,
    pub message_history: Vec<Message>,
    pub current_topic: Option<String>,
    pub topic_history: Vec<String>,
    route_history: Vec<RouteRecord>,
    pub detected_domain_type: Option<String>,
    pub domain_type_confidence: f64,
    pub phase: DesignPhase,
    pub phase_evidence: PhaseEvidence,
    pub skill_level: SkillLevel,
    /// Rolling 0..1 calibration of the student's self-confidence.
    pub confidence_level: f64,
    pub cognitive_flags: BTreeSet<CognitiveFlag>,
    pub intervention_history: Vec<InterventionRecord>,
    pub metrics_window: MetricsWindow,
    pub created_at: DateTime<Utc>,
}

impl ConversationState {
    pub fn new(session_id: impl Into<String>, window_capacity: usize) -> Self {
        Self {
            session_id: session_id.into(),
            message_history: Vec::new(),
            current_topic: None,
            topic_history: Vec::new(),
            route_history: Vec::new(),
            detected_domain_type: None,
            domain_type_confidence: 0.0,
            phase: DesignPhase::default(),
            phase_evidence: PhaseEvidence::default(),
            skill_level: SkillLevel::default(),
            confidence_level: 0.5,
            cognitive_flags: BTreeSet::new(),
            intervention_history: Vec::new(),
            metrics_window: MetricsWindow::new(window_capacity),
            created_at: Utc::now(),
        }
    }

    /// Number of user turns already in the history.
    pub fn user_turns(&self) -> u32 {
        self.message_history
            .iter()
            .filter(|m| m.role == Role::User)
            .count() as u32
    }

    /// User messages, oldest first.
    pub fn user_messages(&self) -> impl Iterator<Item = &Message> {
        self.message_history.iter().filter(|m| m.role == Role::User)
    }

    pub fn push_message(&mut self, message: Message) {
        self.message_history.push(message);
    }

    pub fn route_history(&self) -> &[RouteRecord] {
        &self.route_history
    }

    /// Append a routed turn. The history is never rewritten.
    pub fn record_route(&mut self, record: RouteRecord) {
        self.route_history.push(record);
    }

    pub fn last_route(&self) -> Option<Route> {
        self.route_history.last().map(|r| r.route)
    }

    /// Switch the active topic, keeping the history ordered and free of repeats in a row.
    pub fn set_topic(&mut self, topic: &str) {
        if self.current_topic.as_deref() == Some(topic) {
            return;
        }
        self.current_topic = Some(topic.to_string());
        if self.topic_history.last().map(String::as_str) != Some(topic) {
            self.topic_history.push(topic.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(turn: u32) -> TurnRecord {
        TurnRecord::from_classification(turn, &ClassificationResult::unparseable())
    }

    #[test]
    fn window_evicts_oldest() {
        let mut window = MetricsWindow::new(3);
        for turn in 1..=5 {
            window.push(record(turn));
        }
        assert_eq!(window.len(), 3);
        let turns: Vec<u32> = window.records().map(|r| r.turn).collect();
        assert_eq!(turns, vec![3, 4, 5]);
        assert_eq!(window.recent(2).len(), 2);
        assert_eq!(window.recent(2)[0].turn, 4);
    }

    #[test]
    fn route_history_is_append_only() {
        let mut state = ConversationState::new("s", 10);
        for (i, route) in [Route::ProgressiveOpening, Route::BalancedGuidance].iter().enumerate() {
            state.record_route(RouteRecord {
                turn: i as u32 + 1,
                route: *route,
                understanding: Level::Medium,
                timestamp: Utc::now(),
            });
        }
        assert_eq!(state.route_history().len(), 2);
        assert_eq!(state.route_history()[0].route, Route::ProgressiveOpening);
        assert_eq!(state.last_route(), Some(Route::BalancedGuidance));
    }

    #[test]
    fn topic_history_tracks_changes() {
        let mut state = ConversationState::new("s", 10);
        state.set_topic("materials");
        state.set_topic("materials");
        state.set_topic("lighting");
        assert_eq!(state.topic_history, vec!["materials", "lighting"]);
        assert_eq!(state.current_topic.as_deref(), Some("lighting"));
    }

    #[test]
    fn user_turns_counts_only_user_messages() {
        let mut state = ConversationState::new("s", 10);
        state.push_message(Message::user("a"));
        state.push_message(Message::assistant("b"));
        state.push_message(Message::user("c"));
        assert_eq!(state.user_turns(), 2);
    }

    #[test]
    fn flag_names_are_snake_case() {
        let json = serde_json::to_string(&CognitiveFlag::CognitiveOffloadingDetected).unwrap();
        assert_eq!(json, format!("\"{}\"", CognitiveFlag::CognitiveOffloadingDetected.as_str()));
    }
}
