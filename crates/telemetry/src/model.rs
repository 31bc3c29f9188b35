//! Data model for metric inputs, metric trends, interaction records and
//! aggregate statistics.

use archmentor_core::capability::AgentContribution;
use archmentor_core::classification::ClassificationResult;
use archmentor_core::metrics::{MetricKind, MetricTrend, MetricsSnapshot};
use archmentor_core::response::PhaseAnalysis;
use archmentor_core::route::{ResponseType, Route};
use archmentor_core::state::{CognitiveFlag, TurnRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

// ── Metric inputs ─────────────────────────────────────────────────────────

/// Everything the metrics engine reads for one turn.
#[derive(Debug, Clone, Copy)]
pub struct MetricsInput<'a> {
    pub classification: &'a ClassificationResult,
    pub route: Route,
    /// The final reply text.
    pub response_text: &'a str,
    pub contributions: &'a [AgentContribution],
    /// Number of citations the reply carried.
    pub sources: usize,
    pub phase: &'a PhaseAnalysis,
    /// The previous turn's record, if any.
    pub previous: Option<&'a TurnRecord>,
    /// The previous turn's route, if any.
    pub previous_route: Option<Route>,
    /// Weights for logical connections, concept integration and question
    /// sophistication.
    pub depth_weights: (f64, f64, f64),
}

/// Per-metric trend over the metrics window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricTrends {
    pub trends: BTreeMap<MetricKind, MetricTrend>,
    /// Number of snapshots the trends were computed from.
    pub points: usize,
}

impl MetricTrends {
    pub fn all_stable(points: usize) -> Self {
        Self {
            trends: MetricKind::ALL
                .iter()
                .map(|k| (*k, MetricTrend::Stable))
                .collect(),
            points,
        }
    }

    pub fn get(&self, kind: MetricKind) -> MetricTrend {
        self.trends.get(&kind).copied().unwrap_or(MetricTrend::Stable)
    }
}

// ── Interaction records ───────────────────────────────────────────────────

/// One committed turn as seen by the recorder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub id: String,
    pub session_id: String,
    pub turn: u32,
    pub route: Route,
    pub response_type: ResponseType,
    pub agents_used: Vec<String>,
    pub cognitive_flags: Vec<CognitiveFlag>,
    pub metrics: MetricsSnapshot,
    pub latency_ms: u64,
    pub timestamp: DateTime<Utc>,
}

impl InteractionRecord {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        session_id: impl Into<String>,
        turn: u32,
        route: Route,
        response_type: ResponseType,
        agents_used: Vec<String>,
        cognitive_flags: Vec<CognitiveFlag>,
        metrics: MetricsSnapshot,
        latency_ms: u64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            session_id: session_id.into(),
            turn,
            route,
            response_type,
            agents_used,
            cognitive_flags,
            metrics,
            latency_ms,
            timestamp,
        }
    }
}

// ── Aggregated views ──────────────────────────────────────────────────────

/// Aggregate statistics across all sessions (for the /v1/stats endpoint).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InteractionStats {
    pub turns: u64,
    pub sessions_started: u64,
    pub sessions_ended: u64,
    pub session_resets: u64,
    /// Turns answered with the scripted recovery reply.
    pub recoveries: u64,
    /// Replies repaired by the contract engine.
    pub contract_repairs: u64,
    /// Turn count per route name.
    pub routes: BTreeMap<String, u64>,
    /// Turn count per response type.
    pub response_types: BTreeMap<String, u64>,
    /// Failure count per capability id.
    pub capability_failures: BTreeMap<String, u64>,
    /// Raised count per cognitive flag.
    pub flags: BTreeMap<String, u64>,
    pub avg_latency_ms: f64,
    /// Mean of every recorded snapshot, if any turn completed.
    pub avg_metrics: Option<MetricsSnapshot>,
}
