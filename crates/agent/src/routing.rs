//! Routing engine.
//!
//! [`route`] is a pure function of the classification, the trend signals
//! and a small [`RoutingContext`]. Rules are evaluated in priority order
//! and the first match wins:
//!
//! | # | Condition                                              | Route                      |
//! |---|--------------------------------------------------------|----------------------------|
//! | 1 | no usable capability                                   | ERROR                      |
//! | 2 | first message of the session                           | PROGRESSIVE_OPENING        |
//! | 3 | high offloading risk or increasing offloading trend    | COGNITIVE_INTERVENTION     |
//! | 4 | low engagement, engagement decline, overconfidence     | COGNITIVE_CHALLENGE        |
//! | 5 | confusion                                              | SUPPORTIVE_SCAFFOLDING     |
//! | 6 | topic change                                           | TOPIC_TRANSITION           |
//! | 7 | low understanding                                      | FOUNDATIONAL / SCAFFOLDING |
//! | 8 | grounded medium understanding                          | CLARIFICATION / BALANCED   |
//! | 9 | high understanding                                     | by depth and intent        |
//! |10 | pure knowledge request                                 | KNOWLEDGE_ONLY             |
//! |11 | unclear intent                                         | FALLBACK                   |
//! |12 | anything else                                          | BALANCED_GUIDANCE          |

use archmentor_config::{MediumUnderstandingOrder, RoutingConfig};
use archmentor_core::capability::CapabilityRegistry;
use archmentor_core::classification::{
    ClassificationResult, ConfidenceAssessment, IntentClarity, InteractionType, Level,
    OffloadingRisk,
};
use archmentor_core::plan::CapabilityRole;
use archmentor_core::route::{Route, RoutingDecision};
use archmentor_core::state::ConversationState;
use archmentor_core::trend::{DepthPattern, EngagementTrend, OffloadingTrend, TrendSignals};
use serde::{Deserialize, Serialize};

use crate::planner;

/// Session facts the rules need beyond the classification and trends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingContext {
    pub is_first_message: bool,
    pub system_failure: bool,
    /// The user lacks a basic concept, or low understanding keeps recurring.
    pub repeated_gap: bool,
    /// Recent scaffolding did not raise understanding.
    pub scaffolding_ineffective: bool,
}

impl RoutingContext {
    /// Derive the context from the committed state before this turn.
    pub fn derive(
        state: &ConversationState,
        classification: &ClassificationResult,
        registry: &CapabilityRegistry,
        config: &RoutingConfig,
    ) -> Self {
        let prior_low = state
            .metrics_window
            .records()
            .filter(|r| r.understanding == Level::Low)
            .count();

        let history = state.route_history();
        let lookback = history.len().saturating_sub(config.scaffolding_lookback);
        let scaffolding_ineffective = history[lookback..].iter().any(|r| {
            r.route.is_scaffolding() && r.understanding >= classification.understanding_level
        });

        Self {
            is_first_message: state.user_turns() == 0,
            system_failure: registry.is_empty() || !registry.contains(CapabilityRole::Context),
            repeated_gap: classification.features.fundamental_gap
                || prior_low >= config.repeated_gap_threshold,
            scaffolding_ineffective,
        }
    }
}

struct Selection {
    rule: u8,
    route: Route,
    reason: &'static str,
    confidence: f64,
}

fn select(
    c: &ClassificationResult,
    trends: &TrendSignals,
    ctx: &RoutingContext,
    order: MediumUnderstandingOrder,
) -> Selection {
    let pick = |rule, route, reason, confidence| Selection {
        rule,
        route,
        reason,
        confidence,
    };

    if ctx.system_failure {
        return pick(1, Route::Error, "no capability available", 1.0);
    }
    if ctx.is_first_message {
        return pick(2, Route::ProgressiveOpening, "first message of the session", 1.0);
    }

    let high_risk = c.offloading_risk == OffloadingRisk::High;
    if high_risk || trends.offloading_trend == OffloadingTrend::Increasing {
        let reason = if high_risk {
            "high offloading risk"
        } else {
            "offloading trend increasing"
        };
        return pick(3, Route::CognitiveIntervention, reason, if high_risk { 0.9 } else { 0.75 });
    }

    if c.engagement_level == Level::Low {
        return pick(4, Route::CognitiveChallenge, "low engagement", 0.8);
    }
    if trends.engagement_decline == EngagementTrend::Detected {
        return pick(4, Route::CognitiveChallenge, "engagement declining", 0.8);
    }
    if c.confidence_assessment == ConfidenceAssessment::Overconfident {
        return pick(4, Route::CognitiveChallenge, "overconfidence", 0.8);
    }

    if c.has_confusion_signal() {
        return pick(5, Route::SupportiveScaffolding, "confusion expressed", 0.85);
    }
    if c.interaction_type == InteractionType::TopicChange {
        return pick(6, Route::TopicTransition, "topic change requested", 0.8);
    }

    // Medium is also the conservative default for unreadable input, so it
    // only routes when text evidence backs it.
    match c.understanding_level {
        Level::Low => {
            return if ctx.repeated_gap {
                pick(7, Route::FoundationalBuilding, "fundamental or repeated gap", 0.75)
            } else {
                pick(7, Route::SupportiveScaffolding, "low understanding", 0.75)
            };
        }
        Level::Medium if c.features.understanding_grounded => {
            let clarify = match order {
                MediumUnderstandingOrder::ScaffoldingGated => ctx.scaffolding_ineffective,
                MediumUnderstandingOrder::ClarificationFirst => c.engagement_level != Level::High,
            };
            return if clarify {
                pick(8, Route::SocraticClarification, "medium understanding needs clarification", 0.7)
            } else {
                pick(8, Route::BalancedGuidance, "medium understanding", 0.7)
            };
        }
        Level::High => {
            if trends.depth_thinking_pattern == DepthPattern::Shallow
                || c.interaction_type == InteractionType::KnowledgeRequest
            {
                return pick(9, Route::KnowledgeWithChallenge, "high understanding seeking knowledge", 0.8);
            }
            if c.interaction_type == InteractionType::DesignExploration
                && c.engagement_level == Level::High
            {
                return pick(9, Route::SocraticExploration, "engaged design exploration", 0.8);
            }
            if c.interaction_type == InteractionType::FeedbackRequest {
                return pick(9, Route::MultiAgentComprehensive, "feedback on a developed design", 0.8);
            }
            return pick(9, Route::BalancedGuidance, "high understanding", 0.7);
        }
        _ => {}
    }

    if c.interaction_type == InteractionType::KnowledgeRequest && c.features.pure_knowledge {
        return pick(10, Route::KnowledgeOnly, "pure knowledge request", 0.85);
    }
    if c.intent_clarity == IntentClarity::Low {
        return pick(11, Route::Fallback, "intent unclear", 0.4);
    }
    pick(12, Route::BalancedGuidance, "default", 0.5)
}

/// Route one turn. Pure: identical inputs give identical decisions.
pub fn route(
    classification: &ClassificationResult,
    trends: &TrendSignals,
    ctx: &RoutingContext,
    order: MediumUnderstandingOrder,
) -> RoutingDecision {
    let selection = select(classification, trends, ctx, order);

    let mut decision_confidence = selection.confidence;
    if classification.intent_clarity == IntentClarity::Low && !matches!(selection.rule, 1 | 2 | 11) {
        decision_confidence *= 0.8;
    }

    RoutingDecision {
        route: selection.route,
        response_type: selection.route.response_type(),
        coordination_plan: planner::plan(selection.route),
        decision_confidence,
        matched_rule: selection.rule,
        reason: selection.reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use archmentor_core::message::Message;
    use archmentor_core::state::RouteRecord;
    use chrono::Utc;

    const ORDER: MediumUnderstandingOrder = MediumUnderstandingOrder::ScaffoldingGated;

    fn ongoing() -> RoutingContext {
        RoutingContext::default()
    }

    fn grounded(level: Level, interaction: InteractionType) -> ClassificationResult {
        let mut c = ClassificationResult::unparseable();
        c.intent_clarity = IntentClarity::High;
        c.understanding_level = level;
        c.interaction_type = interaction;
        c.features.understanding_grounded = true;
        c
    }

    fn route_of(c: &ClassificationResult, trends: &TrendSignals, ctx: &RoutingContext) -> Route {
        route(c, trends, ctx, ORDER).route
    }

    #[test]
    fn system_failure_beats_everything() {
        let ctx = RoutingContext {
            system_failure: true,
            is_first_message: true,
            ..ongoing()
        };
        let decision = route(&ClassificationResult::unparseable(), &TrendSignals::default(), &ctx, ORDER);
        assert_eq!(decision.route, Route::Error);
        assert_eq!(decision.matched_rule, 1);
    }

    #[test]
    fn first_message_opens_progressively() {
        let mut c = grounded(Level::Low, InteractionType::OffloadingAttempt);
        c.offloading_risk = OffloadingRisk::High;
        let ctx = RoutingContext {
            is_first_message: true,
            ..ongoing()
        };
        let decision = route(&c, &TrendSignals::default(), &ctx, ORDER);
        assert_eq!(decision.route, Route::ProgressiveOpening);
        assert_eq!(decision.matched_rule, 2);
    }

    #[test]
    fn offloading_risk_or_trend_intervenes() {
        let mut c = grounded(Level::High, InteractionType::OffloadingAttempt);
        c.offloading_risk = OffloadingRisk::High;
        assert_eq!(route_of(&c, &TrendSignals::default(), &ongoing()), Route::CognitiveIntervention);

        c.offloading_risk = OffloadingRisk::None;
        let trends = TrendSignals {
            offloading_trend: OffloadingTrend::Increasing,
            ..TrendSignals::default()
        };
        assert_eq!(route_of(&c, &trends, &ongoing()), Route::CognitiveIntervention);
    }

    #[test]
    fn disengagement_is_challenged() {
        let mut c = grounded(Level::Medium, InteractionType::DesignExploration);
        c.engagement_level = Level::Low;
        assert_eq!(route_of(&c, &TrendSignals::default(), &ongoing()), Route::CognitiveChallenge);

        c.engagement_level = Level::Medium;
        c.confidence_assessment = ConfidenceAssessment::Overconfident;
        assert_eq!(route_of(&c, &TrendSignals::default(), &ongoing()), Route::CognitiveChallenge);

        c.confidence_assessment = ConfidenceAssessment::Calibrated;
        let declining = TrendSignals {
            engagement_decline: EngagementTrend::Detected,
            ..TrendSignals::default()
        };
        assert_eq!(route_of(&c, &declining, &ongoing()), Route::CognitiveChallenge);
    }

    #[test]
    fn confusion_scaffolds_before_topic_change() {
        let mut c = grounded(Level::Low, InteractionType::TopicChange);
        c.features.confusion_detected = true;
        assert_eq!(route_of(&c, &TrendSignals::default(), &ongoing()), Route::SupportiveScaffolding);

        c.features.confusion_detected = false;
        assert_eq!(route_of(&c, &TrendSignals::default(), &ongoing()), Route::TopicTransition);
    }

    #[test]
    fn low_understanding_splits_on_gap() {
        let c = grounded(Level::Low, InteractionType::KnowledgeRequest);
        assert_eq!(route_of(&c, &TrendSignals::default(), &ongoing()), Route::SupportiveScaffolding);
        let ctx = RoutingContext {
            repeated_gap: true,
            ..ongoing()
        };
        assert_eq!(route_of(&c, &TrendSignals::default(), &ctx), Route::FoundationalBuilding);
    }

    #[test]
    fn medium_understanding_checks_scaffolding_effect() {
        let c = grounded(Level::Medium, InteractionType::DesignExploration);
        assert_eq!(route_of(&c, &TrendSignals::default(), &ongoing()), Route::BalancedGuidance);
        let ctx = RoutingContext {
            scaffolding_ineffective: true,
            ..ongoing()
        };
        assert_eq!(route_of(&c, &TrendSignals::default(), &ctx), Route::SocraticClarification);
    }

    #[test]
    fn clarification_first_variant() {
        let mut c = grounded(Level::Medium, InteractionType::DesignExploration);
        let order = MediumUnderstandingOrder::ClarificationFirst;
        let trends = TrendSignals::default();
        assert_eq!(route(&c, &trends, &ongoing(), order).route, Route::SocraticClarification);
        c.engagement_level = Level::High;
        assert_eq!(route(&c, &trends, &ongoing(), order).route, Route::BalancedGuidance);
    }

    #[test]
    fn high_understanding_branches() {
        let trends = TrendSignals::default();
        let knowledge = grounded(Level::High, InteractionType::KnowledgeRequest);
        assert_eq!(route_of(&knowledge, &trends, &ongoing()), Route::KnowledgeWithChallenge);

        let mut exploring = grounded(Level::High, InteractionType::DesignExploration);
        exploring.engagement_level = Level::High;
        assert_eq!(route_of(&exploring, &trends, &ongoing()), Route::SocraticExploration);

        let shallow = TrendSignals {
            depth_thinking_pattern: DepthPattern::Shallow,
            ..TrendSignals::default()
        };
        assert_eq!(route_of(&exploring, &shallow, &ongoing()), Route::KnowledgeWithChallenge);

        let feedback = grounded(Level::High, InteractionType::FeedbackRequest);
        assert_eq!(route_of(&feedback, &trends, &ongoing()), Route::MultiAgentComprehensive);

        let other = grounded(Level::High, InteractionType::Ambiguous);
        assert_eq!(route_of(&other, &trends, &ongoing()), Route::BalancedGuidance);
    }

    #[test]
    fn ungrounded_medium_falls_through() {
        let mut c = ClassificationResult::unparseable();
        c.interaction_type = InteractionType::KnowledgeRequest;
        c.intent_clarity = IntentClarity::High;
        c.features.pure_knowledge = true;
        assert_eq!(route_of(&c, &TrendSignals::default(), &ongoing()), Route::KnowledgeOnly);

        let unclear = ClassificationResult::unparseable();
        let decision = route(&unclear, &TrendSignals::default(), &ongoing(), ORDER);
        assert_eq!(decision.route, Route::Fallback);
        assert_eq!(decision.matched_rule, 11);

        c.features.pure_knowledge = false;
        let decision = route(&c, &TrendSignals::default(), &ongoing(), ORDER);
        assert_eq!(decision.route, Route::BalancedGuidance);
        assert_eq!(decision.matched_rule, 12);
    }

    #[test]
    fn low_and_high_understanding_route_without_grounding() {
        let mut informed = ClassificationResult::unparseable();
        informed.interaction_type = InteractionType::KnowledgeRequest;
        informed.understanding_level = Level::High;
        informed.intent_clarity = IntentClarity::High;
        let decision = route(&informed, &TrendSignals::default(), &ongoing(), ORDER);
        assert_eq!(decision.route, Route::KnowledgeWithChallenge);
        assert_eq!(decision.matched_rule, 9);

        let mut struggling = ClassificationResult::unparseable();
        struggling.interaction_type = InteractionType::DesignExploration;
        struggling.understanding_level = Level::Low;
        struggling.intent_clarity = IntentClarity::High;
        let decision = route(&struggling, &TrendSignals::default(), &ongoing(), ORDER);
        assert_eq!(decision.route, Route::SupportiveScaffolding);
        assert_eq!(decision.matched_rule, 7);
    }

    #[test]
    fn routing_is_deterministic() {
        let c = grounded(Level::High, InteractionType::FeedbackRequest);
        let trends = TrendSignals::default();
        let a = route(&c, &trends, &ongoing(), ORDER);
        let b = route(&c, &trends, &ongoing(), ORDER);
        assert_eq!(a, b);
        assert_eq!(a.response_type, a.route.response_type());
    }

    #[test]
    fn context_derivation_reads_history() {
        let registry = CapabilityRegistry::new();
        let config = RoutingConfig::default();
        let mut state = ConversationState::new("s", 10);
        let c = grounded(Level::Medium, InteractionType::DesignExploration);

        let ctx = RoutingContext::derive(&state, &c, &registry, &config);
        assert!(ctx.is_first_message);
        assert!(ctx.system_failure);
        assert!(!ctx.scaffolding_ineffective);

        state.push_message(Message::user("hi"));
        state.record_route(RouteRecord {
            turn: 1,
            route: Route::SupportiveScaffolding,
            understanding: Level::Medium,
            timestamp: Utc::now(),
        });
        let ctx = RoutingContext::derive(&state, &c, &registry, &config);
        assert!(!ctx.is_first_message);
        assert!(ctx.scaffolding_ineffective);

        let improved = grounded(Level::High, InteractionType::DesignExploration);
        let ctx = RoutingContext::derive(&state, &improved, &registry, &config);
        assert!(!ctx.scaffolding_ineffective);
    }
}
