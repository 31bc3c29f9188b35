//! Metrics engine — scores each committed turn on the six cognitive
//! metrics and derives per-metric trends over the rolling window.
//!
//! Capability hints take precedence. Without them every metric falls back
//! to a fixed scoring policy:
//!
//! | Metric | Fallback |
//! |--------|----------|
//! | COP | 75 with a prevention indicator, 60 if the reply asks a question, else 30 |
//! | DTE | 80 × depth score + 20 × engagement score |
//! | SE  | understanding × 100, ±15 when the previous turn was scaffolded |
//! | KI  | 70 × concept integration, +30 when the reply cites sources |
//! | LP  | 60 × phase progression + 50 × understanding |
//! | MA  | 60 × metacognitive cues (capped at 3) / 3 + 40 × calibration |

use crate::TelemetryError;
use crate::model::{MetricTrends, MetricsInput};
use archmentor_core::capability::AgentContribution;
use archmentor_core::metrics::{MetricHints, MetricKind, MetricTrend, MetricsSnapshot};
use archmentor_core::route::Route;
use archmentor_core::state::MetricsWindow;

/// Adjustment applied to SE when the turn after scaffolding moved understanding.
const SCAFFOLDING_DELTA: f64 = 15.0;

/// Metacognitive cue count that earns the full MA cue score.
const MA_CUE_CAP: u32 = 3;

/// Computes metric snapshots and trends.
#[derive(Debug, Clone)]
pub struct MetricsEngine {
    trend_min_points: usize,
    trend_tolerance: f64,
}

impl Default for MetricsEngine {
    fn default() -> Self {
        Self {
            trend_min_points: 4,
            trend_tolerance: 5.0,
        }
    }
}

impl MetricsEngine {
    pub fn new(trend_min_points: usize, trend_tolerance: f64) -> Result<Self, TelemetryError> {
        if trend_min_points < 2 {
            return Err(TelemetryError::InvalidSettings(
                "trend_min_points must be at least 2".into(),
            ));
        }
        if !trend_tolerance.is_finite() || trend_tolerance < 0.0 {
            return Err(TelemetryError::InvalidSettings(
                "trend_tolerance must be a non-negative number".into(),
            ));
        }
        Ok(Self {
            trend_min_points,
            trend_tolerance,
        })
    }

    /// Score one turn. Every value lands in 0–100.
    pub fn compute(&self, input: &MetricsInput<'_>) -> MetricsSnapshot {
        let hints = merged_hints(input.contributions);
        let c = input.classification;
        let f = &c.features;

        let cop = hints
            .offloading_prevention
            .unwrap_or_else(|| fallback_cop(input));

        let dte = 80.0 * c.depth_score(input.depth_weights) + 20.0 * f.engagement_score;

        let se = hints.scaffolding_effectiveness.unwrap_or_else(|| {
            let base = c.understanding_level.score() * 100.0;
            match (input.previous_route, input.previous) {
                (Some(route), Some(prev)) if route.is_scaffolding() => {
                    if c.understanding_level > prev.understanding {
                        base + SCAFFOLDING_DELTA
                    } else if c.understanding_level < prev.understanding {
                        base - SCAFFOLDING_DELTA
                    } else {
                        base
                    }
                }
                _ => base,
            }
        });

        let ki = hints.knowledge_integration.unwrap_or_else(|| {
            let cited = if input.sources > 0 { 30.0 } else { 0.0 };
            70.0 * f.concept_integration + cited
        });

        let lp = 60.0 * input.phase.progression_score + 50.0 * c.understanding_level.score();

        let cues = f.metacognitive_cues.min(MA_CUE_CAP) as f64 / MA_CUE_CAP as f64;
        let ma = 60.0 * cues + 40.0 * c.confidence_assessment.calibration();

        MetricsSnapshot {
            cop: clamp(cop),
            dte: clamp(dte),
            se: clamp(se),
            ki: clamp(ki),
            lp: clamp(lp),
            ma: clamp(ma),
        }
    }

    /// Per-metric trend: mean of the second half of the snapshots against
    /// the first half. Fewer than the minimum points reads as stable.
    pub fn trends(&self, snapshots: &[MetricsSnapshot]) -> MetricTrends {
        let n = snapshots.len();
        if n < self.trend_min_points {
            return MetricTrends::all_stable(n);
        }

        let half = n / 2;
        let (first, second) = (&snapshots[..half], &snapshots[n - half..]);
        let trends = MetricKind::ALL
            .iter()
            .map(|kind| {
                let delta = mean(second, *kind) - mean(first, *kind);
                let trend = if delta > self.trend_tolerance {
                    MetricTrend::Improving
                } else if delta < -self.trend_tolerance {
                    MetricTrend::Declining
                } else {
                    MetricTrend::Stable
                };
                (*kind, trend)
            })
            .collect();

        MetricTrends { trends, points: n }
    }

    /// Trends over the snapshots recorded in a session's window.
    pub fn window_trends(&self, window: &MetricsWindow) -> MetricTrends {
        self.trends(&window.snapshots())
    }
}

/// Mean of every metric across snapshots, `None` for an empty slice.
pub fn average(snapshots: &[MetricsSnapshot]) -> Option<MetricsSnapshot> {
    if snapshots.is_empty() {
        return None;
    }
    Some(MetricsSnapshot {
        cop: mean(snapshots, MetricKind::Cop),
        dte: mean(snapshots, MetricKind::Dte),
        se: mean(snapshots, MetricKind::Se),
        ki: mean(snapshots, MetricKind::Ki),
        lp: mean(snapshots, MetricKind::Lp),
        ma: mean(snapshots, MetricKind::Ma),
    })
}

fn mean(snapshots: &[MetricsSnapshot], kind: MetricKind) -> f64 {
    if snapshots.is_empty() {
        return 0.0;
    }
    snapshots.iter().map(|s| s.get(kind)).sum::<f64>() / snapshots.len() as f64
}

fn clamp(v: f64) -> f64 {
    if v.is_finite() { v.clamp(0.0, 100.0) } else { 0.0 }
}

/// First hint per field across successful contributions, in rank order.
fn merged_hints(contributions: &[AgentContribution]) -> MetricHints {
    let mut ranked: Vec<&AgentContribution> =
        contributions.iter().filter(|c| c.succeeded).collect();
    ranked.sort_by_key(|c| c.rank);

    let mut hints = MetricHints::default();
    for c in ranked {
        let h = &c.payload.hints;
        hints.offloading_prevention = hints.offloading_prevention.or(h.offloading_prevention);
        hints.scaffolding_effectiveness =
            hints.scaffolding_effectiveness.or(h.scaffolding_effectiveness);
        hints.knowledge_integration = hints.knowledge_integration.or(h.knowledge_integration);
    }
    hints
}

fn fallback_cop(input: &MetricsInput<'_>) -> f64 {
    let prevention = matches!(
        input.route,
        Route::CognitiveIntervention | Route::CognitiveChallenge
    ) || input
        .contributions
        .iter()
        .any(|c| c.succeeded && !c.payload.challenge_prompts.is_empty());

    if prevention {
        75.0
    } else if input.response_text.contains('?') {
        60.0
    } else {
        30.0
    }
}
