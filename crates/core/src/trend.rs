//! Trend signals derived from a session's rolling window.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OffloadingTrend {
    Low,
    Moderate,
    Increasing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EngagementTrend {
    Stable,
    Detected,
    InsufficientData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DepthPattern {
    Shallow,
    Moderate,
    Deep,
}

/// The tracker's assessment, the only history the router sees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendSignals {
    pub offloading_trend: OffloadingTrend,
    pub engagement_decline: EngagementTrend,
    pub depth_thinking_pattern: DepthPattern,
    /// Average weighted depth score behind `depth_thinking_pattern`.
    pub depth_score: f64,
    /// Number of records in the window when assessed.
    pub window_len: usize,
}

impl Default for TrendSignals {
    fn default() -> Self {
        Self {
            offloading_trend: OffloadingTrend::Low,
            engagement_decline: EngagementTrend::InsufficientData,
            depth_thinking_pattern: DepthPattern::Moderate,
            depth_score: 0.5,
            window_len: 0,
        }
    }
}
