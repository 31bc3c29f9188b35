//! Context capability — frames the turn around the project and any attached drawing.

use archmentor_core::capability::{Capability, CapabilityInput, ContributionPayload};
use archmentor_core::error::CapabilityError;
use archmentor_core::plan::{CapabilityRole, Lens};
use archmentor_core::route::Route;
use archmentor_core::vision::VisualAnalyzer;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

/// Frames the turn: attached sketches, the building type, the site.
///
/// Runs first in every plan. Its text is often empty; downstream steps
/// depend on it for ordering.
#[derive(Default)]
pub struct ContextCapability {
    vision: Option<Arc<dyn VisualAnalyzer>>,
}

impl ContextCapability {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_vision(mut self, vision: Arc<dyn VisualAnalyzer>) -> Self {
        self.vision = Some(vision);
        self
    }
}

#[async_trait]
impl Capability for ContextCapability {
    fn role(&self) -> CapabilityRole {
        CapabilityRole::Context
    }

    async fn produce(
        &self,
        input: &CapabilityInput<'_>,
    ) -> Result<ContributionPayload, CapabilityError> {
        let mut sentences = Vec::new();

        if let (Some(image), Some(vision)) = (input.image_ref, &self.vision) {
            match vision.analyze(image).await {
                Ok(seen) => {
                    let drawing = seen.drawing_type.as_deref().unwrap_or("drawing");
                    match seen.observations.first() {
                        Some(first) => sentences.push(format!("In your {drawing}, {first}")),
                        None => sentences.push(format!("I have your {drawing} in front of me.")),
                    }
                    debug!(analyzer = vision.name(), confidence = seen.confidence, "Image analyzed");
                }
                Err(e) => warn!(analyzer = vision.name(), error = %e, "Image analysis failed"),
            }
        }

        if input.route == Route::ProgressiveOpening {
            if let Some(domain) = &input.state.detected_domain_type {
                sentences.push(format!(
                    "A {domain} is a rich project to think through from the start."
                ));
            }
        }

        if input.lens == Some(Lens::Contextual) {
            let place = input
                .state
                .detected_domain_type
                .as_deref()
                .unwrap_or("building");
            sentences.push(format!(
                "Seen from the site, the first question is how the {place} meets its surroundings and the people arriving."
            ));
        }

        Ok(ContributionPayload::text(sentences.join(" ")).with_lens(input.lens))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::Fixture;
    use crate::vision::ReferenceVisualAnalyzer;

    #[tokio::test]
    async fn plain_turn_has_no_text() {
        let fixture = Fixture::new("How do I start?");
        let payload = ContextCapability::new()
            .produce(&fixture.input(Route::BalancedGuidance))
            .await
            .unwrap();
        assert!(payload.text.is_empty());
    }

    #[tokio::test]
    async fn sketch_observations_are_described() {
        let fixture = Fixture::new("Here is my plan").with_image("sketches/ground-floor-plan.png");
        let capability = ContextCapability::new().with_vision(Arc::new(ReferenceVisualAnalyzer));
        let payload = capability
            .produce(&fixture.input(Route::BalancedGuidance))
            .await
            .unwrap();
        assert!(payload.text.contains("floor plan"), "{}", payload.text);
    }

    #[tokio::test]
    async fn contextual_lens_frames_the_site() {
        let mut fixture = Fixture::new("Thoughts on my museum?");
        fixture.state.detected_domain_type = Some("museum".into());
        let payload = ContextCapability::new()
            .produce(&fixture.input_with_lens(Route::MultiAgentComprehensive, Lens::Contextual))
            .await
            .unwrap();
        assert!(payload.text.contains("museum"));
        assert_eq!(payload.lens, Some(Lens::Contextual));
    }
}
