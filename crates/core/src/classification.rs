//! Per-turn classification of the user's pedagogical and cognitive signals.
//!
//! A [`ClassificationResult`] is produced once per turn and never mutated.
//! Every signal is a closed enum so the routing engine can match on it
//! exhaustively.

use serde::{Deserialize, Serialize};

use crate::state::DesignPhase;

/// What the user is trying to do in this turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionType {
    KnowledgeRequest,
    FeedbackRequest,
    DesignExploration,
    ConfusionExpression,
    OffloadingAttempt,
    TopicChange,
    Ambiguous,
}

impl InteractionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::KnowledgeRequest => "knowledge_request",
            Self::FeedbackRequest => "feedback_request",
            Self::DesignExploration => "design_exploration",
            Self::ConfusionExpression => "confusion_expression",
            Self::OffloadingAttempt => "offloading_attempt",
            Self::TopicChange => "topic_change",
            Self::Ambiguous => "ambiguous",
        }
    }
}

/// Three-step ordinal scale used for understanding and engagement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Low,
    Medium,
    High,
}

impl Level {
    /// Representative numeric score for the level.
    pub fn score(&self) -> f64 {
        match self {
            Self::Low => 0.2,
            Self::Medium => 0.5,
            Self::High => 0.8,
        }
    }

    /// Bucket a [0,1] score into a level.
    pub fn from_score(score: f64, low_below: f64, high_above: f64) -> Self {
        if score < low_below {
            Self::Low
        } else if score > high_above {
            Self::High
        } else {
            Self::Medium
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceAssessment {
    Overconfident,
    Calibrated,
    Underconfident,
}

impl ConfidenceAssessment {
    /// Calibration score used for the rolling confidence level.
    pub fn calibration(&self) -> f64 {
        match self {
            Self::Overconfident => 0.3,
            Self::Calibrated => 1.0,
            Self::Underconfident => 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OffloadingRisk {
    None,
    Moderate,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentClarity {
    Low,
    High,
}

/// Numeric and boolean features extracted alongside the categorical signals.
///
/// Ratios are normalized to `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnFeatures {
    pub engagement_score: f64,
    pub logical_connections: f64,
    pub concept_integration: f64,
    pub question_sophistication: f64,
    pub confusion_detected: bool,
    /// The user lacks a basic concept rather than a detail.
    pub fundamental_gap: bool,
    /// The understanding level rests on textual evidence rather than a default.
    pub understanding_grounded: bool,
    /// A knowledge question with no reference to the user's own project.
    pub pure_knowledge: bool,
    pub reflection_requested: bool,
    pub metacognitive_cues: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain_type: Option<DomainTypeGuess>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub phase_cues: Vec<(DesignPhase, u32)>,
}

impl Default for TurnFeatures {
    fn default() -> Self {
        Self {
            engagement_score: Level::Medium.score(),
            logical_connections: 0.0,
            concept_integration: 0.0,
            question_sophistication: 0.0,
            confusion_detected: false,
            fundamental_gap: false,
            understanding_grounded: false,
            pure_knowledge: false,
            reflection_requested: false,
            metacognitive_cues: 0,
            topic: None,
            domain_type: None,
            phase_cues: Vec::new(),
        }
    }
}

/// A building-type guess such as "museum" or "library".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainTypeGuess {
    pub name: String,
    pub confidence: f64,
}

/// The structured classification of one user turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub interaction_type: InteractionType,
    pub understanding_level: Level,
    pub engagement_level: Level,
    pub confidence_assessment: ConfidenceAssessment,
    pub offloading_risk: OffloadingRisk,
    pub intent_clarity: IntentClarity,
    #[serde(default)]
    pub features: TurnFeatures,
}

impl ClassificationResult {
    /// The conservative result returned when input cannot be interpreted.
    pub fn unparseable() -> Self {
        Self {
            interaction_type: InteractionType::Ambiguous,
            understanding_level: Level::Medium,
            engagement_level: Level::Medium,
            confidence_assessment: ConfidenceAssessment::Calibrated,
            offloading_risk: OffloadingRisk::None,
            intent_clarity: IntentClarity::Low,
            features: TurnFeatures::default(),
        }
    }

    /// Weighted depth-of-thinking score for this turn.
    pub fn depth_score(&self, weights: (f64, f64, f64)) -> f64 {
        let f = &self.features;
        weights.0 * f.logical_connections
            + weights.1 * f.concept_integration
            + weights.2 * f.question_sophistication
    }

    pub fn has_confusion_signal(&self) -> bool {
        self.features.confusion_detected
            || self.interaction_type == InteractionType::ConfusionExpression
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unparseable_is_conservative() {
        let c = ClassificationResult::unparseable();
        assert_eq!(c.intent_clarity, IntentClarity::Low);
        assert_eq!(c.understanding_level, Level::Medium);
        assert_eq!(c.engagement_level, Level::Medium);
        assert_eq!(c.offloading_risk, OffloadingRisk::None);
        assert!(!c.features.understanding_grounded);
    }

    #[test]
    fn level_bucketing() {
        assert_eq!(Level::from_score(0.1, 0.35, 0.65), Level::Low);
        assert_eq!(Level::from_score(0.35, 0.35, 0.65), Level::Medium);
        assert_eq!(Level::from_score(0.66, 0.35, 0.65), Level::High);
    }

    #[test]
    fn serializes_snake_case() {
        let json = serde_json::to_string(&InteractionType::OffloadingAttempt).unwrap();
        assert_eq!(json, "\"offloading_attempt\"");
    }
}
