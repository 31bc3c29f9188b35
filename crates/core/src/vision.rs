//! Visual analyzer trait — structured observations about an attached sketch.
//!
//! Pixel-level analysis is a collaborator concern; the context capability
//! only consumes the resulting observations.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::VisualError;

/// What the analyzer saw in an image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VisualObservations {
    /// Drawing type, e.g. "floor plan", "section", "perspective sketch".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drawing_type: Option<String>,

    /// Short observation sentences.
    #[serde(default)]
    pub observations: Vec<String>,

    /// 0..1 confidence in the observations.
    #[serde(default)]
    pub confidence: f64,
}

#[async_trait]
pub trait VisualAnalyzer: Send + Sync {
    fn name(&self) -> &str;

    async fn analyze(&self, image_ref: &str) -> std::result::Result<VisualObservations, VisualError>;
}
