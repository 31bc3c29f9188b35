//! Design-phase detection.
//!
//! Phase cues accumulate per session. The active phase only ever advances,
//! and the progression score never decreases.

use archmentor_core::classification::ClassificationResult;
use archmentor_core::response::PhaseAnalysis;
use archmentor_core::state::{ConversationState, DesignPhase};

/// Cue count at which a phase counts as fully explored.
const PHASE_SATURATION: u32 = 6;

/// Fold this turn's phase cues into the state and return the new analysis.
pub fn observe(state: &mut ConversationState, classification: &ClassificationResult) -> PhaseAnalysis {
    for (phase, n) in &classification.features.phase_cues {
        state.phase_evidence.add(*phase, *n);
    }

    let evidence = state.phase_evidence;
    let current = state.phase;
    let leader = DesignPhase::ALL
        .into_iter()
        .max_by_key(|p| (evidence.get(*p), p.index()))
        .unwrap_or(current);

    if leader > current && evidence.get(leader) >= evidence.get(current) {
        state.phase = leader;
    }

    analyze(state)
}

/// Read-only phase analysis of the current state.
pub fn analyze(state: &ConversationState) -> PhaseAnalysis {
    let evidence = state.phase_evidence;
    let phase = state.phase;
    let total = evidence.total();
    let at_phase = evidence.get(phase);

    let confidence = if total == 0 {
        0.0
    } else {
        at_phase as f64 / total as f64
    };
    let within = at_phase.min(PHASE_SATURATION) as f64 / PHASE_SATURATION as f64;
    let progression_score = ((phase.index() as f64 + within) / DesignPhase::ALL.len() as f64).min(1.0);

    PhaseAnalysis {
        phase,
        confidence,
        progression_score,
    }
}
