//! The turn pipeline.
//!
//! One call to [`TurnPipeline::run_turn`] takes a user turn through every
//! stage:
//!
//! ```text
//! classify ─▶ track ─▶ route ─▶ plan ─▶ execute ─▶ synthesize ─▶ metrics ─▶ commit
//! ```
//!
//! The pipeline never mutates the caller's state. It works on a draft and
//! hands the draft back as `next_state` once the turn completed; the session
//! task swaps it in. A turn that is dropped mid-flight therefore leaves no
//! trace, and a turn that ends on the ERROR route returns no draft at all.

use archmentor_config::{AppConfig, RoutingConfig, TrackerConfig};
use archmentor_contracts::Violation;
use archmentor_core::capability::{AgentContribution, CapabilityRegistry};
use archmentor_core::classification::ClassificationResult;
use archmentor_core::error::{Error, Result};
use archmentor_core::event::{DomainEvent, EventBus};
use archmentor_core::message::Message;
use archmentor_core::metrics::MetricsSnapshot;
use archmentor_core::response::{SynthesizedResponse, TurnRequest};
use archmentor_core::route::{Route, RoutingDecision};
use archmentor_core::state::{ConversationState, InterventionRecord, RouteRecord};
use archmentor_core::trend::TrendSignals;
use archmentor_telemetry::{MetricsEngine, MetricsInput};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::classifier::{ContextClassifier, RuleClassifier};
use crate::executor::{ExecutionRequest, Executor};
use crate::routing::{self, RoutingContext};
use crate::synthesizer::{SynthesisInput, Synthesizer};
use crate::{flags, phase, tracker};

/// Everything one turn produced.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub response: SynthesizedResponse,
    pub decision: RoutingDecision,
    pub classification: ClassificationResult,
    pub trends: TrendSignals,
    pub contributions: Vec<AgentContribution>,
    pub violations: Vec<Violation>,
    pub metrics: Option<MetricsSnapshot>,
    /// The committed state, or `None` when the turn was recovered and the
    /// previous state stays in force.
    pub next_state: Option<ConversationState>,
    pub latency_ms: u64,
}

impl TurnOutcome {
    pub fn recovered(&self) -> bool {
        self.next_state.is_none()
    }
}

/// A dry run of classification and routing, without calling capabilities.
#[derive(Debug, Clone, Serialize)]
pub struct Explanation {
    pub classification: ClassificationResult,
    pub trends: TrendSignals,
    pub context: RoutingContext,
    pub decision: RoutingDecision,
}

pub struct TurnPipeline {
    classifier: Arc<dyn ContextClassifier>,
    executor: Executor,
    synthesizer: Synthesizer,
    metrics: MetricsEngine,
    events: Arc<EventBus>,
    tracker: TrackerConfig,
    routing: RoutingConfig,
    reflection_interval: u32,
}

impl TurnPipeline {
    pub fn new(
        classifier: Arc<dyn ContextClassifier>,
        executor: Executor,
        synthesizer: Synthesizer,
        metrics: MetricsEngine,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            classifier,
            executor,
            synthesizer,
            metrics,
            events,
            tracker: TrackerConfig::default(),
            routing: RoutingConfig::default(),
            reflection_interval: 0,
        }
    }

    /// Build a pipeline around `registry` with every threshold taken from
    /// the configuration.
    pub fn from_config(
        config: &AppConfig,
        registry: CapabilityRegistry,
        events: Arc<EventBus>,
    ) -> Result<Self> {
        let synthesizer = Synthesizer::from_config(&config.synthesis).map_err(|e| Error::Config {
            message: e.to_string(),
        })?;
        let metrics = MetricsEngine::new(config.metrics.trend_min_points, config.metrics.trend_tolerance)
            .map_err(|e| Error::Config {
                message: e.to_string(),
            })?;
        let executor = Executor::new(
            registry,
            Duration::from_secs(config.runtime.capability_timeout_secs),
        );

        Ok(Self::new(
            Arc::new(RuleClassifier::from_config(&config.classifier)),
            executor,
            synthesizer,
            metrics,
            events,
        )
        .with_tracker_config(config.tracker.clone())
        .with_routing_config(config.routing.clone())
        .with_reflection_interval(config.synthesis.reflection_interval))
    }

    pub fn with_tracker_config(mut self, tracker: TrackerConfig) -> Self {
        self.tracker = tracker;
        self
    }

    pub fn with_routing_config(mut self, routing: RoutingConfig) -> Self {
        self.routing = routing;
        self
    }

    /// Every `interval`th turn becomes a reflection checkpoint (0 disables).
    pub fn with_reflection_interval(mut self, interval: u32) -> Self {
        self.reflection_interval = interval;
        self
    }

    pub fn window_capacity(&self) -> usize {
        self.tracker.window_capacity
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub fn metrics_engine(&self) -> &MetricsEngine {
        &self.metrics
    }

    pub fn synthesizer(&self) -> &Synthesizer {
        &self.synthesizer
    }

    /// Classify, track and route `user_text` against `state` without
    /// executing anything.
    pub fn explain(&self, state: &ConversationState, user_text: &str) -> Explanation {
        let classification = self.classifier.classify(user_text, state);
        let context =
            RoutingContext::derive(state, &classification, self.executor.registry(), &self.routing);

        let mut draft = state.clone();
        draft.push_message(Message::user(user_text));
        let trends = tracker::update_and_assess(&mut draft, &classification, &self.tracker);
        let decision = routing::route(
            &classification,
            &trends,
            &context,
            self.routing.medium_understanding,
        );

        Explanation {
            classification,
            trends,
            context,
            decision,
        }
    }

    /// Run one turn against the committed `state`.
    pub async fn run_turn(&self, state: &ConversationState, request: &TurnRequest) -> TurnOutcome {
        let started = Instant::now();
        let session_id = state.session_id.as_str();

        let classification = self.classifier.classify(&request.user_text, state);
        let context =
            RoutingContext::derive(state, &classification, self.executor.registry(), &self.routing);

        let mut draft = state.clone();
        draft.push_message(
            Message::user(&request.user_text)
                .with_image(request.image_ref.clone())
                .with_timestamp(request.timestamp),
        );
        let trends = tracker::update_and_assess(&mut draft, &classification, &self.tracker);
        let decision = routing::route(
            &classification,
            &trends,
            &context,
            self.routing.medium_understanding,
        );
        debug!(
            session_id,
            interaction = classification.interaction_type.as_str(),
            route = %decision.route,
            rule = decision.matched_rule,
            reason = %decision.reason,
            "Turn routed"
        );

        if decision.route == Route::Error {
            return self.recover(state, decision, classification, trends, Vec::new(), started);
        }

        let execution = ExecutionRequest {
            user_text: &request.user_text,
            image_ref: request.image_ref.as_deref(),
            classification: &classification,
            state: &draft,
            route: decision.route,
        };
        let contributions = self
            .executor
            .execute(&decision.coordination_plan, &execution)
            .await;

        for failed in contributions.iter().filter(|c| !c.succeeded) {
            self.events.publish(DomainEvent::CapabilityFailed {
                session_id: session_id.to_string(),
                capability: failed.capability_id.clone(),
                error: failed.error.clone().unwrap_or_default(),
                timestamp: Utc::now(),
            });
        }

        if !contributions.is_empty() && contributions.iter().all(|c| !c.succeeded) {
            let decision = RoutingDecision {
                route: Route::Error,
                response_type: Route::Error.response_type(),
                reason: "every capability failed".to_string(),
                ..decision
            };
            return self.recover(state, decision, classification, trends, contributions, started);
        }

        let turn = draft.user_turns();
        let checkpoint = classification.features.reflection_requested
            || (self.reflection_interval > 0 && turn % self.reflection_interval == 0);
        let turn_flags = flags::derive(
            decision.route,
            &classification,
            &trends,
            &contributions,
            checkpoint,
        );

        let synthesis = self.synthesizer.synthesize(&SynthesisInput {
            route: decision.route,
            plan: &decision.coordination_plan,
            contributions: &contributions,
            flags: &turn_flags,
            phase: phase::analyze(&draft),
            decision_confidence: decision.decision_confidence,
            checkpoint,
        });

        if !synthesis.violations.is_empty() {
            warn!(
                session_id,
                response_type = %synthesis.response.response_type,
                violations = synthesis.violations.len(),
                "Response repaired to meet its contract"
            );
            self.events.publish(DomainEvent::ContractRepaired {
                session_id: session_id.to_string(),
                response_type: synthesis.response.response_type,
                violations: synthesis.violations.iter().map(|v| v.to_string()).collect(),
                timestamp: Utc::now(),
            });
        }

        let response = synthesis.response;
        let snapshot = self.metrics.compute(&MetricsInput {
            classification: &classification,
            route: decision.route,
            response_text: &response.text,
            contributions: &contributions,
            sources: response.metadata.sources.len(),
            phase: &response.metadata.phase_analysis,
            previous: state.metrics_window.latest(),
            previous_route: state.last_route(),
            depth_weights: self.tracker.depth_weights.as_tuple(),
        });

        let now = Utc::now();
        if let Some(record) = draft.metrics_window.latest_mut() {
            record.metrics = Some(snapshot);
        }
        draft.record_route(RouteRecord {
            turn,
            route: decision.route,
            understanding: classification.understanding_level,
            timestamp: now,
        });
        draft.cognitive_flags.extend(turn_flags.iter().copied());
        if decision.route.is_intervention() {
            draft.intervention_history.push(InterventionRecord {
                turn,
                route: decision.route,
                flags: turn_flags.iter().copied().collect(),
                timestamp: now,
            });
        }
        draft.push_message(Message::assistant(&response.text));

        let latency_ms = started.elapsed().as_millis() as u64;
        self.events.publish(DomainEvent::TurnCompleted {
            session_id: session_id.to_string(),
            turn,
            route: decision.route,
            response_type: response.response_type,
            agents_used: response.metadata.agents_used.clone(),
            cognitive_flags: response.metadata.cognitive_flags.clone(),
            metrics: snapshot,
            latency_ms,
            timestamp: now,
        });
        info!(
            session_id,
            turn,
            route = %decision.route,
            response_type = %response.response_type,
            agents = response.metadata.agents_used.len(),
            latency_ms,
            "Turn completed"
        );

        TurnOutcome {
            response,
            decision,
            classification,
            trends,
            contributions,
            violations: synthesis.violations,
            metrics: Some(snapshot),
            next_state: Some(draft),
            latency_ms,
        }
    }

    fn recover(
        &self,
        state: &ConversationState,
        decision: RoutingDecision,
        classification: ClassificationResult,
        trends: TrendSignals,
        contributions: Vec<AgentContribution>,
        started: Instant,
    ) -> TurnOutcome {
        warn!(
            session_id = %state.session_id,
            reason = %decision.reason,
            "Turn recovered with a scripted reply; state left unchanged"
        );
        self.events.publish(DomainEvent::TurnRecovered {
            session_id: state.session_id.clone(),
            reason: decision.reason.clone(),
            timestamp: Utc::now(),
        });

        TurnOutcome {
            response: self.synthesizer.recovery(phase::analyze(state)),
            decision,
            classification,
            trends,
            contributions,
            violations: Vec::new(),
            metrics: None,
            next_state: None,
            latency_ms: started.elapsed().as_millis() as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::default_registry;
    use crate::test_helpers::{FailingCapability, SlowCapability, scripted_registry};
    use archmentor_contracts::text::{self, ResponseParts};
    use archmentor_core::plan::CapabilityRole;
    use archmentor_core::response::ResponseMetadata;
    use archmentor_core::route::ResponseType;
    use archmentor_core::state::CognitiveFlag;
    use archmentor_knowledge::InMemoryKnowledgeBase;

    fn pipeline_with(registry: CapabilityRegistry) -> TurnPipeline {
        TurnPipeline::from_config(&AppConfig::default(), registry, Arc::new(EventBus::new(64))).unwrap()
    }

    fn pipeline() -> TurnPipeline {
        let knowledge = Arc::new(InMemoryKnowledgeBase::seeded());
        pipeline_with(default_registry(knowledge, None, 3))
    }

    async fn turn(p: &TurnPipeline, state: &mut ConversationState, text: &str) -> TurnOutcome {
        let outcome = p.run_turn(state, &TurnRequest::new(&state.session_id, text)).await;
        if let Some(next) = outcome.next_state.clone() {
            *state = next;
        }
        outcome
    }

    fn limit(response_type: ResponseType) -> usize {
        match response_type {
            ResponseType::SocraticPrimary => 130,
            ResponseType::KnowledgeSupport => 150,
            ResponseType::CognitiveIntervention => 160,
            ResponseType::Synthesis => 140,
        }
    }

    #[tokio::test]
    async fn first_message_opens_progressively() {
        let p = pipeline();
        let mut state = ConversationState::new("s-open", 10);
        let outcome = turn(&p, &mut state, "Just tell me what materials to use").await;

        assert_eq!(outcome.decision.route, Route::ProgressiveOpening);
        assert_eq!(outcome.decision.matched_rule, 2);
        assert!(outcome.response.text.trim_end().ends_with('?'));
        assert_eq!(state.message_history.len(), 2);
        assert_eq!(state.route_history().len(), 1);
    }

    #[tokio::test]
    async fn repeated_offloading_is_intercepted() {
        let p = pipeline();
        let mut state = ConversationState::new("s-a", 10);
        turn(&p, &mut state, "I'm designing a small library for a riverside town").await;
        for _ in 0..3 {
            turn(&p, &mut state, "Can you just give me the materials?").await;
        }
        let outcome = turn(&p, &mut state, "Just tell me what materials to use").await;

        assert_eq!(outcome.decision.route, Route::CognitiveIntervention);
        assert_eq!(outcome.response.response_type, ResponseType::CognitiveIntervention);
        assert!(
            outcome
                .response
                .metadata
                .cognitive_flags
                .contains(&CognitiveFlag::CognitiveOffloadingDetected)
        );
        let parts = ResponseParts::parse(&outcome.response.text);
        assert!((2..=3).contains(&parts.prompts.len()));
        assert!(text::is_choice_question(parts.questions.last().unwrap()));
        assert!(!state.intervention_history.is_empty());
    }

    #[tokio::test]
    async fn informed_knowledge_request_is_challenged() {
        let p = pipeline();
        let mut state = ConversationState::new("s-c", 10);
        turn(&p, &mut state, "I'm designing a museum on a tight urban site").await;
        let outcome = turn(
            &p,
            &mut state,
            "How does cross-laminated timber compare with concrete for thermal mass in a museum, since daylight and acoustics matter?",
        )
        .await;

        assert_eq!(outcome.decision.route, Route::KnowledgeWithChallenge);
        assert_eq!(outcome.response.response_type, ResponseType::KnowledgeSupport);
        assert!(outcome.response.metadata.agents_used.contains(&"domain_knowledge".to_string()));
        assert!(!outcome.response.metadata.sources.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn timed_out_capability_is_left_out() {
        let registry = scripted_registry().with(Arc::new(SlowCapability {
            role: CapabilityRole::DomainKnowledge,
            delay: Duration::from_secs(120),
        }));
        let p = pipeline_with(registry);
        let mut state = ConversationState::new("s-d", 10);
        turn(&p, &mut state, "I'm designing a school").await;
        let outcome = turn(&p, &mut state, "I'm confused about daylight in the classrooms").await;

        assert!(!outcome.recovered());
        assert!(!outcome.response.metadata.agents_used.contains(&"domain_knowledge".to_string()));
        assert!(outcome.response.text.contains("could not be completed"));
        assert!(
            outcome
                .response
                .metadata
                .cognitive_flags
                .contains(&CognitiveFlag::CapabilityDegraded)
        );
    }

    #[tokio::test]
    async fn empty_registry_recovers_without_touching_state() {
        let p = pipeline_with(CapabilityRegistry::new());
        let state = ConversationState::new("s-err", 10);
        let outcome = p.run_turn(&state, &TurnRequest::new("s-err", "hello")).await;

        assert!(outcome.recovered());
        assert_eq!(outcome.decision.route, Route::Error);
        assert_eq!(outcome.response.metadata.routing_path, Route::Error);
        assert!(state.message_history.is_empty());
    }

    #[tokio::test]
    async fn total_capability_failure_escalates_to_error() {
        let mut registry = CapabilityRegistry::new();
        for role in CapabilityRole::ALL {
            registry.register(Arc::new(FailingCapability(role)));
        }
        let p = pipeline_with(registry);
        let mut state = ConversationState::new("s-fail", 10);
        let before = state.message_history.len();
        let outcome = turn(&p, &mut state, "Hello, I'm starting a housing project").await;

        assert!(outcome.recovered());
        assert_eq!(outcome.response.metadata.routing_path, Route::Error);
        assert_eq!(state.message_history.len(), before);
    }

    #[tokio::test]
    async fn every_reply_respects_its_contract() {
        let p = pipeline();
        let mut state = ConversationState::new("s-contract", 10);
        let inputs = [
            "I'm designing a community library by the river",
            "I'm confused about how the circulation should work",
            "What is thermal mass?",
            "What if the entrance faced the park instead of the street, so the reading room gets morning light?",
            "Could you give me feedback on my section and how the structure, daylight and circulation connect?",
            "ok",
            "Let's talk about something else, maybe the landscape",
        ];
        for input in inputs {
            let outcome = turn(&p, &mut state, input).await;
            let response = &outcome.response;
            let value = serde_json::to_value(&response.metadata).unwrap();
            assert!(ResponseMetadata::missing_keys(&value).is_empty(), "{input}");
            assert!(
                text::word_count(&response.text) <= limit(response.response_type),
                "{input}: {} words",
                text::word_count(&response.text)
            );
            assert_eq!(response.response_type, outcome.decision.route.response_type());
            assert_eq!(response.metadata.routing_path, outcome.decision.route);
        }
        assert_eq!(state.user_turns(), inputs.len() as u32);
        assert_eq!(state.route_history().len(), inputs.len());
        assert!(state.metrics_window.latest().unwrap().metrics.is_some());
    }

    #[tokio::test]
    async fn identical_sessions_route_identically() {
        let p = pipeline();
        let mut a = ConversationState::new("same", 10);
        let mut b = ConversationState::new("same", 10);
        for input in ["I'm designing a gallery", "What is a clerestory?", "I'm not sure about the roof"] {
            let x = turn(&p, &mut a, input).await;
            let y = turn(&p, &mut b, input).await;
            assert_eq!(x.decision, y.decision);
            assert_eq!(x.response.text, y.response.text);
        }
    }

    #[tokio::test]
    async fn turn_events_reach_subscribers() {
        let p = pipeline();
        let mut rx = p.events().subscribe();
        let mut state = ConversationState::new("s-events", 10);
        turn(&p, &mut state, "I'm designing a pavilion").await;

        let mut completed = None;
        while let Ok(event) = rx.try_recv() {
            if let DomainEvent::TurnCompleted { turn, route, .. } = event.as_ref() {
                completed = Some((*turn, *route));
            }
        }
        assert_eq!(completed, Some((1, Route::ProgressiveOpening)));
    }

    #[tokio::test]
    async fn reflection_interval_adds_checkpoints() {
        let p = pipeline().with_reflection_interval(2);
        let mut state = ConversationState::new("s-reflect", 10);
        turn(&p, &mut state, "I'm designing a library").await;
        let outcome = turn(&p, &mut state, "What is thermal mass?").await;

        assert!(
            outcome
                .response
                .metadata
                .cognitive_flags
                .contains(&CognitiveFlag::ReflectionCheckpoint)
        );
        assert!(outcome.response.text.contains("take a moment"));
    }

    #[test]
    fn explain_does_not_execute() {
        let p = pipeline();
        let state = ConversationState::new("s-explain", 10);
        let explanation = p.explain(&state, "Just tell me what materials to use");
        assert!(explanation.context.is_first_message);
        assert_eq!(explanation.decision.route, Route::ProgressiveOpening);
        assert!(state.message_history.is_empty());
    }
}
