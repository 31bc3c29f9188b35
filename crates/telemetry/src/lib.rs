//! Cognitive metrics and interaction recording for ArchMentor.
//!
//! The [`MetricsEngine`] scores every committed turn on six cognitive
//! metrics (COP, DTE, SE, KI, LP, MA) and derives per-metric trends over a
//! session's rolling window. The [`InteractionRecorder`] listens on the
//! event bus and keeps bounded per-turn records plus aggregate statistics.

pub mod engine;
pub mod model;
pub mod recorder;

pub use engine::{MetricsEngine, average};
pub use model::{InteractionRecord, InteractionStats, MetricTrends, MetricsInput};
pub use recorder::InteractionRecorder;

/// Errors from the telemetry subsystem.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("invalid metrics settings: {0}")]
    InvalidSettings(String),
}
