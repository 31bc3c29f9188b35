//! Turn request / response value objects and the response metadata block.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::capability::Citation;
use crate::route::{ResponseType, Route};
use crate::state::{CognitiveFlag, DesignPhase};

/// A user turn arriving from the UI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnRequest {
    pub session_id: String,
    pub user_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_ref: Option<String>,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl TurnRequest {
    pub fn new(session_id: impl Into<String>, user_text: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            user_text: user_text.into(),
            image_ref: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_image(mut self, image_ref: impl Into<String>) -> Self {
        self.image_ref = Some(image_ref.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseAnalysis {
    pub phase: DesignPhase,
    pub confidence: f64,
    pub progression_score: f64,
}

impl Default for PhaseAnalysis {
    fn default() -> Self {
        Self {
            phase: DesignPhase::Discovery,
            confidence: 0.0,
            progression_score: 0.0,
        }
    }
}

/// The seven-key metadata block every response carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseMetadata {
    pub routing_path: Route,
    /// Capabilities that contributed, in plan order.
    pub agents_used: Vec<String>,
    pub response_type: ResponseType,
    pub cognitive_flags: Vec<CognitiveFlag>,
    pub sources: Vec<Citation>,
    pub phase_analysis: PhaseAnalysis,
    pub confidence_score: f64,
}

impl ResponseMetadata {
    pub const REQUIRED_KEYS: [&'static str; 7] = [
        "routing_path",
        "agents_used",
        "response_type",
        "cognitive_flags",
        "sources",
        "phase_analysis",
        "confidence_score",
    ];

    /// Required keys absent from a serialized metadata object.
    pub fn missing_keys(value: &serde_json::Value) -> Vec<&'static str> {
        Self::REQUIRED_KEYS
            .iter()
            .copied()
            .filter(|key| value.get(*key).is_none_or(|v| v.is_null()))
            .collect()
    }
}

/// The synthesizer's final output for a turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesizedResponse {
    pub text: String,
    pub response_type: ResponseType,
    pub metadata: ResponseMetadata,
}

/// What the UI receives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnResponse {
    pub session_id: String,
    pub text: String,
    pub metadata: ResponseMetadata,
}

impl TurnResponse {
    pub fn from_synthesized(session_id: impl Into<String>, response: SynthesizedResponse) -> Self {
        Self {
            session_id: session_id.into(),
            text: response.text,
            metadata: response.metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata() -> ResponseMetadata {
        ResponseMetadata {
            routing_path: Route::BalancedGuidance,
            agents_used: vec!["context".into()],
            response_type: ResponseType::Synthesis,
            cognitive_flags: vec![],
            sources: vec![],
            phase_analysis: PhaseAnalysis::default(),
            confidence_score: 0.5,
        }
    }

    #[test]
    fn serialized_metadata_has_all_keys() {
        let value = serde_json::to_value(metadata()).unwrap();
        assert!(ResponseMetadata::missing_keys(&value).is_empty());
        assert_eq!(value["routing_path"], "BALANCED_GUIDANCE");
        assert_eq!(value["phase_analysis"]["phase"], "discovery");
    }

    #[test]
    fn missing_keys_detected() {
        let mut value = serde_json::to_value(metadata()).unwrap();
        value.as_object_mut().unwrap().remove("sources");
        assert_eq!(ResponseMetadata::missing_keys(&value), vec!["sources"]);
    }

    #[test]
    fn turn_request_defaults_timestamp() {
        let req: TurnRequest =
            serde_json::from_str(r#"{"session_id":"s","user_text":"hi"}"#).unwrap();
        assert!(req.image_ref.is_none());
        assert_eq!(req.user_text, "hi");
    }
}
