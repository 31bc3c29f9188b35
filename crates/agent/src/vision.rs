//! A visual analyzer that works from the image reference alone.
//!
//! Pixel analysis is out of scope; this analyzer infers the drawing type
//! from the file name so the context capability has something to frame.

use archmentor_core::error::VisualError;
use archmentor_core::vision::{VisualAnalyzer, VisualObservations};
use async_trait::async_trait;

const DRAWING_TYPES: &[(&str, &str, &str)] = &[
    (
        "section",
        "section",
        "the relationship between floor levels and ceiling heights is what reads first.",
    ),
    (
        "elevation",
        "elevation",
        "the rhythm of openings sets the character of the facade.",
    ),
    (
        "site",
        "site plan",
        "the building's footprint and its approach from the street carry the argument.",
    ),
    (
        "plan",
        "floor plan",
        "the arrangement of rooms and the routes between them are the main story.",
    ),
    (
        "perspective",
        "perspective",
        "the view suggests how a visitor will first experience the space.",
    ),
    (
        "render",
        "perspective",
        "the view suggests how a visitor will first experience the space.",
    ),
    (
        "axo",
        "axonometric",
        "the massing and how the volumes stack are easy to read.",
    ),
    (
        "model",
        "model photo",
        "the overall massing and its proportions come through clearly.",
    ),
];

#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceVisualAnalyzer;

#[async_trait]
impl VisualAnalyzer for ReferenceVisualAnalyzer {
    fn name(&self) -> &str {
        "reference"
    }

    async fn analyze(&self, image_ref: &str) -> Result<VisualObservations, VisualError> {
        let reference = image_ref.trim();
        if reference.is_empty() {
            return Err(VisualError::NotFound("empty image reference".into()));
        }

        let lower = reference.to_lowercase();
        let (drawing, observation) = DRAWING_TYPES
            .iter()
            .find(|(cue, _, _)| lower.contains(cue))
            .map(|(_, drawing, observation)| (*drawing, *observation))
            .unwrap_or(("sketch", "the main idea is visible, though the details are still open."));

        Ok(VisualObservations {
            drawing_type: Some(drawing.to_string()),
            observations: vec![observation.to_string()],
            confidence: 0.4,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn drawing_type_from_reference() {
        let seen = ReferenceVisualAnalyzer
            .analyze("uploads/Long-Section_v2.jpg")
            .await
            .unwrap();
        assert_eq!(seen.drawing_type.as_deref(), Some("section"));
        assert_eq!(seen.observations.len(), 1);
    }

    #[tokio::test]
    async fn unknown_reference_is_a_sketch() {
        let seen = ReferenceVisualAnalyzer.analyze("img_0042.png").await.unwrap();
        assert_eq!(seen.drawing_type.as_deref(), Some("sketch"));
    }

    #[tokio::test]
    async fn empty_reference_is_an_error() {
        assert!(ReferenceVisualAnalyzer.analyze("  ").await.is_err());
    }
}
