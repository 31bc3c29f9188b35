//! Cognitive state tracker.
//!
//! Runs once per turn against the pipeline's draft state: appends the
//! turn's record to the rolling window, refreshes the surrounding session
//! model (topic, building type, skill, confidence, phase) and reports the
//! trend signals the router consumes.

use archmentor_config::TrackerConfig;
use archmentor_core::classification::{ClassificationResult, OffloadingRisk};
use archmentor_core::state::{ConversationState, MetricsWindow, SkillLevel, TurnRecord};
use archmentor_core::trend::{DepthPattern, EngagementTrend, OffloadingTrend, TrendSignals};
use tracing::debug;

use crate::phase;

/// Float tolerance for the engagement-decline comparison.
const DECLINE_EPSILON: f64 = 1e-9;

/// Weight of the newest turn in the rolling confidence level.
const CONFIDENCE_SMOOTHING: f64 = 0.3;

/// Update the draft state with this turn and assess the window.
pub fn update_and_assess(
    state: &mut ConversationState,
    classification: &ClassificationResult,
    config: &TrackerConfig,
) -> TrendSignals {
    let turn = state.user_turns().max(1);
    state
        .metrics_window
        .push(TurnRecord::from_classification(turn, classification));

    let features = &classification.features;
    if let Some(topic) = &features.topic {
        state.set_topic(topic);
    }

    if let Some(guess) = &features.domain_type {
        if state.detected_domain_type.as_deref() == Some(guess.name.as_str()) {
            state.domain_type_confidence =
                (state.domain_type_confidence.max(guess.confidence) + 0.05).min(1.0);
        } else if guess.confidence > state.domain_type_confidence {
            state.detected_domain_type = Some(guess.name.clone());
            state.domain_type_confidence = guess.confidence;
        }
    }

    state.skill_level = skill_level(&state.metrics_window);
    state.confidence_level = (1.0 - CONFIDENCE_SMOOTHING) * state.confidence_level
        + CONFIDENCE_SMOOTHING * classification.confidence_assessment.calibration();

    phase::observe(state, classification);

    let signals = assess(&state.metrics_window, config);
    debug!(
        session_id = %state.session_id,
        turn,
        offloading = ?signals.offloading_trend,
        engagement = ?signals.engagement_decline,
        depth = ?signals.depth_thinking_pattern,
        "Trends assessed"
    );
    signals
}

/// Trend signals over a window, without touching any state.
pub fn assess(window: &MetricsWindow, config: &TrackerConfig) -> TrendSignals {
    let offloading_count = window
        .records()
        .filter(|r| r.offloading_risk != OffloadingRisk::None)
        .count();
    let offloading_trend = if offloading_count > config.offloading_increasing_above {
        OffloadingTrend::Increasing
    } else if offloading_count > config.offloading_moderate_above {
        OffloadingTrend::Moderate
    } else {
        OffloadingTrend::Low
    };

    let (depth_thinking_pattern, depth_score) = depth(window, config);

    TrendSignals {
        offloading_trend,
        engagement_decline: engagement_decline(window, config),
        depth_thinking_pattern,
        depth_score,
        window_len: window.len(),
    }
}

fn engagement_decline(window: &MetricsWindow, config: &TrackerConfig) -> EngagementTrend {
    let half = config.decline_window;
    if half == 0 || window.len() < 2 * half {
        return EngagementTrend::InsufficientData;
    }

    let latest = window.recent(2 * half);
    let (prior, recent) = latest.split_at(half);
    let mean = |records: &[&TurnRecord]| {
        records.iter().map(|r| r.engagement_score).sum::<f64>() / records.len() as f64
    };

    if mean(recent) < mean(prior) - config.decline_gap - DECLINE_EPSILON {
        EngagementTrend::Detected
    } else {
        EngagementTrend::Stable
    }
}

fn depth(window: &MetricsWindow, config: &TrackerConfig) -> (DepthPattern, f64) {
    let records = window.recent(config.depth_window);
    if records.is_empty() {
        return (DepthPattern::Moderate, TrendSignals::default().depth_score);
    }

    let w = config.depth_weights.as_tuple();
    let score = records
        .iter()
        .map(|r| {
            w.0 * r.logical_connections + w.1 * r.concept_integration + w.2 * r.question_sophistication
        })
        .sum::<f64>()
        / records.len() as f64;

    let pattern = if score < config.shallow_below {
        DepthPattern::Shallow
    } else if score > config.deep_above {
        DepthPattern::Deep
    } else {
        DepthPattern::Moderate
    };
    (pattern, score)
}

fn skill_level(window: &MetricsWindow) -> SkillLevel {
    if window.is_empty() {
        return SkillLevel::default();
    }
    let mean = window.records().map(|r| r.understanding.score()).sum::<f64>() / window.len() as f64;
    if mean < 0.35 {
        SkillLevel::Beginner
    } else if mean > 0.65 {
        SkillLevel::Advanced
    } else {
        SkillLevel::Intermediate
    }
}
