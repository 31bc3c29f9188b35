//! Socratic capability — the guiding questions that close most replies.

use archmentor_core::capability::{Capability, CapabilityInput, ContributionPayload};
use archmentor_core::classification::ConfidenceAssessment;
use archmentor_core::error::CapabilityError;
use archmentor_core::plan::{CapabilityRole, Lens};
use archmentor_core::route::Route;
use async_trait::async_trait;

use super::focus;

/// Leads with questions instead of answers.
#[derive(Debug, Clone, Copy, Default)]
pub struct SocraticCapability;

impl SocraticCapability {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Capability for SocraticCapability {
    fn role(&self) -> CapabilityRole {
        CapabilityRole::Socratic
    }

    async fn produce(
        &self,
        input: &CapabilityInput<'_>,
    ) -> Result<ContributionPayload, CapabilityError> {
        let topic = focus(input);
        let has_reference = input.upstream(CapabilityRole::DomainKnowledge).is_some();

        if input.lens == Some(Lens::Experiential) {
            return Ok(ContributionPayload::text(
                "From a visitor's point of view, the experience of arriving and finding the way matters as much as any single room.",
            )
            .with_lens(input.lens));
        }

        let (statement, question) = match input.route {
            Route::ProgressiveOpening => (
                "Welcome to the studio. Before we get into solutions, I would like to understand your project.".to_string(),
                match input.state.current_topic.as_deref() {
                    Some(t) => format!("What draws you to {t} as a starting point, and who will use the building?"),
                    None => "What are you designing, and who will use it?".to_string(),
                },
            ),
            Route::SocraticExploration => (
                "That direction opens up real possibilities.".to_string(),
                format!("What would change in {topic} if you pushed that idea further?"),
            ),
            Route::SocraticClarification => (
                "Let's pin this down one piece at a time.".to_string(),
                format!("Which part of {topic} feels least clear to you right now?"),
            ),
            Route::SupportiveScaffolding => (
                "That is a common sticking point, so let's break it into smaller steps.".to_string(),
                if has_reference {
                    "Looking at the reference above, which idea connects most directly to your project?".to_string()
                } else {
                    format!("What do you already know about {topic}, even roughly?")
                },
            ),
            Route::FoundationalBuilding => (
                "Let's build this up from the basics.".to_string(),
                if has_reference {
                    format!("How would you explain {topic} in your own words, using the reference above?")
                } else {
                    format!("How would you describe {topic} to someone outside architecture?")
                },
            ),
            Route::TopicTransition => (
                "Moving to a new topic is fine, and it helps to connect it to what you have already decided.".to_string(),
                match input.state.topic_history.iter().rev().nth(1) {
                    Some(previous) => format!("How does {topic} relate to the decisions you made about {previous}?"),
                    None => format!("What do you want {topic} to achieve in your project?"),
                },
            ),
            Route::CognitiveChallenge => (
                "Let's slow down and examine this.".to_string(),
                if input.classification.confidence_assessment == ConfidenceAssessment::Overconfident {
                    "What evidence would convince you that a different approach works better?".to_string()
                } else {
                    format!("What about {topic} surprised you most so far?")
                },
            ),
            Route::Fallback => (
                "I want to be sure I understand what you are after.".to_string(),
                "Could you tell me more about what you are working on or what you would like to explore?".to_string(),
            ),
            _ => (
                String::new(),
                format!("Which of these considerations matters most for {topic}?"),
            ),
        };

        Ok(ContributionPayload::text(statement)
            .with_question(question)
            .with_lens(input.lens))
    }
}
