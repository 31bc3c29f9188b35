//! Analysis capability — the structure of the reasoning and where the project stands.

use archmentor_core::capability::{Capability, CapabilityInput, ContributionPayload};
use archmentor_core::error::CapabilityError;
use archmentor_core::plan::{CapabilityRole, Lens};
use archmentor_core::state::DesignPhase;
use async_trait::async_trait;

use super::focus;

/// Reads the structure of the student's reasoning and where the project
/// stands.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnalysisCapability;

impl AnalysisCapability {
    pub fn new() -> Self {
        Self
    }
}

fn phase_focus(phase: DesignPhase) -> &'static str {
    match phase {
        DesignPhase::Discovery => "understanding the people and the site",
        DesignPhase::Ideation => "comparing genuinely different concepts",
        DesignPhase::Visualization => "testing the idea in drawings",
        DesignPhase::Materialization => "how the building is actually made",
    }
}

#[async_trait]
impl Capability for AnalysisCapability {
    fn role(&self) -> CapabilityRole {
        CapabilityRole::Analysis
    }

    async fn produce(
        &self,
        input: &CapabilityInput<'_>,
    ) -> Result<ContributionPayload, CapabilityError> {
        let features = &input.classification.features;
        let mut sentences = Vec::new();

        if input.lens == Some(Lens::Spatial) {
            sentences.push(
                "Spatially, the key test is whether the sequence of spaces supports how people will move and gather."
                    .to_string(),
            );
        }

        let reasoning = if features.logical_connections >= 0.67 {
            "Your reasoning already links causes to consequences, which gives the scheme a clear logic."
        } else if features.logical_connections > 0.0 {
            "You connect some of your decisions, and making every link explicit would strengthen the scheme."
        } else {
            "The decisions are stated, but the reasons that connect them are not yet visible."
        };
        sentences.push(reasoning.to_string());

        if features.concept_integration >= 0.5 {
            sentences.push(format!(
                "You are weighing {} together with other concerns, which is where strong projects are made.",
                focus(input)
            ));
        }

        let phase = input.state.phase;
        sentences.push(format!(
            "In the {} phase, the priority is {}.",
            phase.as_str(),
            phase_focus(phase)
        ));

        Ok(ContributionPayload::text(sentences.join(" ")).with_lens(input.lens))
    }
}
