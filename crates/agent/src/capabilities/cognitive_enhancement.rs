//! Cognitive enhancement capability — guided prompts that turn a request for answers back into reasoning.

use archmentor_core::capability::{Capability, CapabilityInput, ContributionPayload};
use archmentor_core::classification::ConfidenceAssessment;
use archmentor_core::error::CapabilityError;
use archmentor_core::metrics::MetricHints;
use archmentor_core::plan::{CapabilityRole, Lens};
use archmentor_core::route::Route;
use async_trait::async_trait;

use super::focus;

/// Guided prompts per topic for offloading interventions.
const TOPIC_PROMPTS: &[(&str, [&str; 3])] = &[
    (
        "materials",
        [
            "List two materials you are considering and one reason for each.",
            "Note how each material would age on your site and in your climate.",
            "Decide which quality matters most to you: warmth, durability or cost.",
        ],
    ),
    (
        "lighting",
        [
            "Mark where the sun is at the times the building is used most.",
            "Pick the one room where daylight matters most and say why.",
            "Sketch how light would enter that room through the day.",
        ],
    ),
    (
        "structure",
        [
            "Sketch the largest span your scheme needs.",
            "Name two structural systems that could cover it.",
            "Note what each system would mean for the spaces below.",
        ],
    ),
    (
        "circulation",
        [
            "Trace the route a first-time visitor takes from the street.",
            "Mark the points where that visitor has to make a decision.",
            "Note which spaces they pass and which they never see.",
        ],
    ),
];

const GENERAL_PROMPTS: [&str; 3] = [
    "Write down two options you could take from here.",
    "Name one thing each option does for the people using the building.",
    "Note one constraint of your site or brief that rules an option out.",
];

const CHALLENGE_PROMPTS: [&str; 3] = [
    "Name one situation where your approach would fail.",
    "Describe what a critic of this idea would say first.",
    "Identify one assumption you have not checked yet.",
];

/// Protects the student's own thinking: interrupts offloading, challenges
/// untested certainty, and questions received knowledge.
#[derive(Debug, Clone, Copy, Default)]
pub struct CognitiveEnhancementCapability;

impl CognitiveEnhancementCapability {
    pub fn new() -> Self {
        Self
    }

    fn prompts_for(topic: &str) -> Vec<String> {
        TOPIC_PROMPTS
            .iter()
            .find(|(name, _)| *name == topic)
            .map_or(GENERAL_PROMPTS, |(_, prompts)| *prompts)
            .iter()
            .map(|p| p.to_string())
            .collect()
    }
}

#[async_trait]
impl Capability for CognitiveEnhancementCapability {
    fn role(&self) -> CapabilityRole {
        CapabilityRole::CognitiveEnhancement
    }

    async fn produce(
        &self,
        input: &CapabilityInput<'_>,
    ) -> Result<ContributionPayload, CapabilityError> {
        let topic = focus(input);

        if input.lens == Some(Lens::Critical) {
            return Ok(ContributionPayload::text(
                "One assumption worth questioning is whether every part of the brief is really fixed.",
            )
            .with_lens(input.lens));
        }

        let payload = match input.route {
            Route::CognitiveIntervention => ContributionPayload::text(
                "I can tell you want a direct answer, and you will get more from reaching it yourself. Let's work it out in small steps.",
            )
            .with_prompts(Self::prompts_for(&topic))
            .with_question("Which step would you like to start with, the first or the second?")
            .with_hints(MetricHints {
                offloading_prevention: Some(85.0),
                ..Default::default()
            }),
            Route::CognitiveChallenge => {
                let opener = if input.classification.confidence_assessment
                    == ConfidenceAssessment::Overconfident
                {
                    "Confidence is useful, but a strong idea should survive being tested."
                } else {
                    "Let's put some pressure on this idea before building on it."
                };
                ContributionPayload::text(opener)
                    .with_prompts(CHALLENGE_PROMPTS.iter().map(|p| p.to_string()).collect())
                    .with_question(
                        "Which challenge do you want to take on first, the failure case or the critic's view?",
                    )
                    .with_hints(MetricHints {
                        offloading_prevention: Some(75.0),
                        ..Default::default()
                    })
            }
            Route::KnowledgeWithChallenge => ContributionPayload::text(
                "Before you adopt this, check how it fits your own site and brief.",
            )
            .with_question(format!(
                "What would you need to verify before applying this to {topic}?"
            ))
            .with_hints(MetricHints {
                offloading_prevention: Some(70.0),
                ..Default::default()
            }),
            _ => ContributionPayload::text(
                "Try stating the reasoning behind your next decision before you make it.",
            ),
        };

        Ok(payload.with_lens(input.lens))
    }
}
