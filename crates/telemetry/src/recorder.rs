//! Interaction recorder — subscribes to the event bus off the critical
//! path, keeps bounded per-turn records and aggregate statistics.

use crate::engine::average;
use crate::model::{InteractionRecord, InteractionStats};
use archmentor_core::event::{DomainEvent, EventBus};
use archmentor_core::metrics::MetricsSnapshot;
use std::collections::VecDeque;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Default number of interaction records kept in memory.
pub const DEFAULT_RECORD_CAPACITY: usize = 5_000;

/// Thread-safe via `RwLock`. Fed by [`InteractionRecorder::spawn`] or by
/// calling [`InteractionRecorder::record`] directly.
pub struct InteractionRecorder {
    capacity: usize,
    records: RwLock<VecDeque<InteractionRecord>>,
    totals: RwLock<RunningTotals>,
}

#[derive(Debug, Default)]
struct RunningTotals {
    stats: InteractionStats,
    latency_sum_ms: u64,
    metric_sums: MetricsSnapshot,
}

impl InteractionRecorder {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            records: RwLock::new(VecDeque::new()),
            totals: RwLock::new(RunningTotals::default()),
        }
    }

    /// Consume events from the bus until it closes.
    pub fn spawn(self: &Arc<Self>, bus: &EventBus) -> JoinHandle<()> {
        let mut rx = bus.subscribe();
        let recorder = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => recorder.record(&event),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Interaction recorder lagged; events dropped");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            debug!("Interaction recorder stopped");
        })
    }

    /// Fold one event into the records and statistics.
    pub fn record(&self, event: &DomainEvent) {
        let mut guard = self.totals.write().unwrap_or_else(PoisonError::into_inner);
        let totals = &mut *guard;
        let stats = &mut totals.stats;

        match event {
            DomainEvent::SessionStarted { .. } => stats.sessions_started += 1,
            DomainEvent::SessionEnded { .. } => stats.sessions_ended += 1,
            DomainEvent::SessionReset { .. } => stats.session_resets += 1,
            DomainEvent::TurnRecovered { .. } => stats.recoveries += 1,
            DomainEvent::ContractRepaired { .. } => stats.contract_repairs += 1,
            DomainEvent::CapabilityFailed { capability, .. } => {
                *stats.capability_failures.entry(capability.clone()).or_default() += 1;
            }
            DomainEvent::TurnCompleted {
                session_id,
                turn,
                route,
                response_type,
                agents_used,
                cognitive_flags,
                metrics,
                latency_ms,
                timestamp,
            } => {
                stats.turns += 1;
                *stats.routes.entry(route.as_str().to_string()).or_default() += 1;
                *stats
                    .response_types
                    .entry(response_type.as_str().to_string())
                    .or_default() += 1;
                for flag in cognitive_flags {
                    *stats.flags.entry(flag.as_str().to_string()).or_default() += 1;
                }

                totals.latency_sum_ms += latency_ms;
                let sums = &mut totals.metric_sums;
                sums.cop += metrics.cop;
                sums.dte += metrics.dte;
                sums.se += metrics.se;
                sums.ki += metrics.ki;
                sums.lp += metrics.lp;
                sums.ma += metrics.ma;

                let record = InteractionRecord::new(
                    session_id.clone(),
                    *turn,
                    *route,
                    *response_type,
                    agents_used.clone(),
                    cognitive_flags.clone(),
                    *metrics,
                    *latency_ms,
                    *timestamp,
                );
                let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
                if records.len() >= self.capacity {
                    records.pop_front();
                }
                records.push_back(record);
            }
        }
    }

    /// Aggregate statistics so far.
    pub fn stats(&self) -> InteractionStats {
        let totals = self.totals.read().unwrap_or_else(PoisonError::into_inner);
        let mut stats = totals.stats.clone();
        if stats.turns > 0 {
            let n = stats.turns as f64;
            stats.avg_latency_ms = totals.latency_sum_ms as f64 / n;
            let s = &totals.metric_sums;
            stats.avg_metrics = Some(MetricsSnapshot {
                cop: s.cop / n,
                dte: s.dte / n,
                se: s.se / n,
                ki: s.ki / n,
                lp: s.lp / n,
                ma: s.ma / n,
            });
        }
        stats
    }

    /// Most recent records first.
    pub fn recent(&self, limit: usize) -> Vec<InteractionRecord> {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        records.iter().rev().take(limit).cloned().collect()
    }

    /// Records for one session, oldest first.
    pub fn for_session(&self, session_id: &str) -> Vec<InteractionRecord> {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        records
            .iter()
            .filter(|r| r.session_id == session_id)
            .cloned()
            .collect()
    }

    /// Mean metrics over one session's recorded turns.
    pub fn session_average(&self, session_id: &str) -> Option<MetricsSnapshot> {
        let snapshots: Vec<MetricsSnapshot> =
            self.for_session(session_id).iter().map(|r| r.metrics).collect();
        average(&snapshots)
    }

    pub fn len(&self) -> usize {
        self.records.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InteractionRecorder {
    fn default() -> Self {
        Self::new(DEFAULT_RECORD_CAPACITY)
    }
}
