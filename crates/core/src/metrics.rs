//! Cognitive metric value types shared between the pipeline and the metrics engine.

use serde::{Deserialize, Serialize};

/// The six core cognitive metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    /// Cognitive-offloading prevention
    Cop,
    /// Deep-thinking engagement
    Dte,
    /// Scaffolding effectiveness
    Se,
    /// Knowledge integration
    Ki,
    /// Learning progression
    Lp,
    /// Metacognitive awareness
    Ma,
}

impl MetricKind {
    pub const ALL: [MetricKind; 6] = [
        MetricKind::Cop,
        MetricKind::Dte,
        MetricKind::Se,
        MetricKind::Ki,
        MetricKind::Lp,
        MetricKind::Ma,
    ];
}

/// One turn's metric values, each on a 0–100 scale.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub cop: f64,
    pub dte: f64,
    pub se: f64,
    pub ki: f64,
    pub lp: f64,
    pub ma: f64,
}

impl MetricsSnapshot {
    pub fn get(&self, kind: MetricKind) -> f64 {
        match kind {
            MetricKind::Cop => self.cop,
            MetricKind::Dte => self.dte,
            MetricKind::Se => self.se,
            MetricKind::Ki => self.ki,
            MetricKind::Lp => self.lp,
            MetricKind::Ma => self.ma,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricTrend {
    Improving,
    Stable,
    Declining,
}

/// Metric values a capability can report directly.
///
/// When a hint is absent the metrics engine falls back to its scoring policy.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MetricHints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offloading_prevention: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scaffolding_effectiveness: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub knowledge_integration: Option<f64>,
}
