//! Cognitive flags for a turn, derived from the route, classification and
//! trends.

use archmentor_core::capability::AgentContribution;
use archmentor_core::classification::{ClassificationResult, ConfidenceAssessment};
use archmentor_core::route::{ResponseType, Route};
use archmentor_core::state::CognitiveFlag;
use archmentor_core::trend::{DepthPattern, EngagementTrend, TrendSignals};
use std::collections::BTreeSet;

/// Flags raised by one turn.
pub fn derive(
    route: Route,
    classification: &ClassificationResult,
    trends: &TrendSignals,
    contributions: &[AgentContribution],
    checkpoint: bool,
) -> BTreeSet<CognitiveFlag> {
    let mut flags = BTreeSet::new();

    match route {
        Route::CognitiveIntervention => {
            flags.insert(CognitiveFlag::CognitiveOffloadingDetected);
        }
        Route::CognitiveChallenge => {
            flags.insert(CognitiveFlag::EngagementChallenge);
            if classification.confidence_assessment == ConfidenceAssessment::Overconfident {
                flags.insert(CognitiveFlag::OverconfidenceChallenged);
            }
            if trends.engagement_decline == EngagementTrend::Detected {
                flags.insert(CognitiveFlag::EngagementDeclineDetected);
            }
        }
        Route::SupportiveScaffolding | Route::FoundationalBuilding => {
            flags.insert(CognitiveFlag::ScaffoldingProvided);
            if classification.has_confusion_signal() {
                flags.insert(CognitiveFlag::ConfusionSupported);
            }
        }
        Route::KnowledgeWithChallenge => {
            flags.insert(CognitiveFlag::KnowledgeChallenge);
        }
        Route::TopicTransition => {
            flags.insert(CognitiveFlag::TopicTransition);
        }
        Route::MultiAgentComprehensive => {
            flags.insert(CognitiveFlag::LensSelectionOffered);
        }
        _ => {}
    }

    if route.response_type() == ResponseType::SocraticPrimary {
        flags.insert(CognitiveFlag::SocraticQuestioning);
    }

    match trends.depth_thinking_pattern {
        DepthPattern::Deep => {
            flags.insert(CognitiveFlag::DeepThinkingObserved);
        }
        DepthPattern::Shallow => {
            flags.insert(CognitiveFlag::ShallowThinkingObserved);
        }
        DepthPattern::Moderate => {}
    }

    if checkpoint {
        flags.insert(CognitiveFlag::ReflectionCheckpoint);
    }
    if contributions.iter().any(|c| !c.succeeded) {
        flags.insert(CognitiveFlag::CapabilityDegraded);
    }

    flags
}

#[cfg(test)]
mod tests {
    use super::*;
    use archmentor_core::capability::ContributionPayload;
    use archmentor_core::error::CapabilityError;
    use archmentor_core::plan::CapabilityRole;

    fn classification() -> ClassificationResult {
        ClassificationResult::unparseable()
    }

    #[test]
    fn intervention_flags_offloading() {
        let flags = derive(
            Route::CognitiveIntervention,
            &classification(),
            &TrendSignals::default(),
            &[],
            false,
        );
        assert_eq!(
            flags.into_iter().collect::<Vec<_>>(),
            vec![CognitiveFlag::CognitiveOffloadingDetected]
        );
    }

    #[test]
    fn challenge_records_its_trigger() {
        let mut c = classification();
        c.confidence_assessment = ConfidenceAssessment::Overconfident;
        let trends = TrendSignals {
            engagement_decline: EngagementTrend::Detected,
            ..Default::default()
        };
        let flags = derive(Route::CognitiveChallenge, &c, &trends, &[], false);
        assert!(flags.contains(&CognitiveFlag::EngagementChallenge));
        assert!(flags.contains(&CognitiveFlag::OverconfidenceChallenged));
        assert!(flags.contains(&CognitiveFlag::EngagementDeclineDetected));
    }

    #[test]
    fn scaffolding_is_socratic_and_marks_depth() {
        let trends = TrendSignals {
            depth_thinking_pattern: DepthPattern::Shallow,
            ..Default::default()
        };
        let flags = derive(Route::FoundationalBuilding, &classification(), &trends, &[], true);
        assert!(flags.contains(&CognitiveFlag::ScaffoldingProvided));
        assert!(flags.contains(&CognitiveFlag::SocraticQuestioning));
        assert!(flags.contains(&CognitiveFlag::ShallowThinkingObserved));
        assert!(flags.contains(&CognitiveFlag::ReflectionCheckpoint));
    }

    #[test]
    fn failed_contribution_marks_degraded() {
        let error = CapabilityError::Failed {
            capability: "analysis".into(),
            reason: "down".into(),
        };
        let contributions = vec![
            AgentContribution::success(CapabilityRole::Context, ContributionPayload::text(""), 1),
            AgentContribution::failure(CapabilityRole::Analysis, &error, 1),
        ];
        let flags = derive(
            Route::BalancedGuidance,
            &classification(),
            &TrendSignals::default(),
            &contributions,
            false,
        );
        assert!(flags.contains(&CognitiveFlag::CapabilityDegraded));
        assert!(!flags.contains(&CognitiveFlag::SocraticQuestioning));
    }
}
