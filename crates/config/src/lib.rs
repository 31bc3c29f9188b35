//! Configuration loading, validation, and management for ArchMentor.
//!
//! Loads configuration from `~/.archmentor/config.toml` with environment
//! variable overrides. Every routing threshold lives here rather than in
//! code, and all settings are validated at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.archmentor/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Context classifier thresholds
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Cognitive state tracker window and trend thresholds
    #[serde(default)]
    pub tracker: TrackerConfig,

    /// Routing engine options
    #[serde(default)]
    pub routing: RoutingConfig,

    /// Response synthesis contract
    #[serde(default)]
    pub synthesis: SynthesisConfig,

    /// Metrics engine options
    #[serde(default)]
    pub metrics: MetricsConfig,

    /// Runtime configuration
    #[serde(default)]
    pub runtime: RuntimeConfig,

    /// Gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Knowledge base configuration
    #[serde(default)]
    pub knowledge: KnowledgeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Engagement scores below this are "low"
    #[serde(default = "default_engagement_low")]
    pub engagement_low_below: f64,

    /// Engagement scores above this are "high"
    #[serde(default = "default_engagement_high")]
    pub engagement_high_above: f64,

    /// A mild offloading request is HIGH risk once this many risky turns
    /// are already in the rolling window
    #[serde(default = "default_offloading_repeat")]
    pub offloading_repeat_at: usize,
}

fn default_engagement_low() -> f64 {
    0.35
}
fn default_engagement_high() -> f64 {
    0.65
}
fn default_offloading_repeat() -> usize {
    1
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            engagement_low_below: default_engagement_low(),
            engagement_high_above: default_engagement_high(),
            offloading_repeat_at: default_offloading_repeat(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Rolling window capacity (turns)
    #[serde(default = "default_window_capacity")]
    pub window_capacity: usize,

    /// Size of each half compared for engagement decline
    #[serde(default = "default_half_window")]
    pub decline_window: usize,

    /// Drop in mean engagement that counts as a decline
    #[serde(default = "default_decline_gap")]
    pub decline_gap: f64,

    /// Turns averaged for the depth-of-thinking pattern
    #[serde(default = "default_half_window")]
    pub depth_window: usize,

    #[serde(default)]
    pub depth_weights: DepthWeights,

    /// Average depth below this is SHALLOW
    #[serde(default = "default_shallow_below")]
    pub shallow_below: f64,

    /// Average depth above this is DEEP
    #[serde(default = "default_deep_above")]
    pub deep_above: f64,

    /// More risky turns than this in the window is MODERATE
    #[serde(default = "default_offloading_moderate")]
    pub offloading_moderate_above: usize,

    /// More risky turns than this in the window is INCREASING
    #[serde(default = "default_offloading_increasing")]
    pub offloading_increasing_above: usize,
}

fn default_window_capacity() -> usize {
    10
}
fn default_half_window() -> usize {
    5
}
fn default_decline_gap() -> f64 {
    0.3
}
fn default_shallow_below() -> f64 {
    0.3
}
fn default_deep_above() -> f64 {
    0.7
}
fn default_offloading_moderate() -> usize {
    3
}
fn default_offloading_increasing() -> usize {
    6
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            window_capacity: default_window_capacity(),
            decline_window: default_half_window(),
            decline_gap: default_decline_gap(),
            depth_window: default_half_window(),
            depth_weights: DepthWeights::default(),
            shallow_below: default_shallow_below(),
            deep_above: default_deep_above(),
            offloading_moderate_above: default_offloading_moderate(),
            offloading_increasing_above: default_offloading_increasing(),
        }
    }
}

/// Weights of the depth-of-thinking terms; they should sum to 1.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DepthWeights {
    pub logical_connections: f64,
    pub concept_integration: f64,
    pub question_sophistication: f64,
}

impl DepthWeights {
    pub fn as_tuple(&self) -> (f64, f64, f64) {
        (
            self.logical_connections,
            self.concept_integration,
            self.question_sophistication,
        )
    }
}

impl Default for DepthWeights {
    fn default() -> Self {
        Self {
            logical_connections: 0.4,
            concept_integration: 0.3,
            question_sophistication: 0.3,
        }
    }
}

/// Rule order for grounded medium-understanding turns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediumUnderstandingOrder {
    /// SOCRATIC_CLARIFICATION only when earlier scaffolding did not help,
    /// otherwise BALANCED_GUIDANCE
    #[default]
    ScaffoldingGated,
    /// SOCRATIC_CLARIFICATION unless engagement is high
    ClarificationFirst,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Prior low-understanding turns in the window that make a gap "repeated"
    #[serde(default = "default_repeated_gap")]
    pub repeated_gap_threshold: usize,

    /// How many recent routes are searched for earlier scaffolding
    #[serde(default = "default_scaffolding_lookback")]
    pub scaffolding_lookback: usize,

    #[serde(default)]
    pub medium_understanding: MediumUnderstandingOrder,
}

fn default_repeated_gap() -> usize {
    2
}
fn default_scaffolding_lookback() -> usize {
    3
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            repeated_gap_threshold: default_repeated_gap(),
            scaffolding_lookback: default_scaffolding_lookback(),
            medium_understanding: MediumUnderstandingOrder::default(),
        }
    }
}

/// Word ceiling per response type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WordLimits {
    #[serde(default = "default_socratic_limit")]
    pub socratic_primary: usize,
    #[serde(default = "default_knowledge_limit")]
    pub knowledge_support: usize,
    #[serde(default = "default_intervention_limit")]
    pub cognitive_intervention: usize,
    #[serde(default = "default_synthesis_limit")]
    pub synthesis: usize,
}

fn default_socratic_limit() -> usize {
    130
}
fn default_knowledge_limit() -> usize {
    150
}
fn default_intervention_limit() -> usize {
    160
}
fn default_synthesis_limit() -> usize {
    140
}

impl Default for WordLimits {
    fn default() -> Self {
        Self {
            socratic_primary: default_socratic_limit(),
            knowledge_support: default_knowledge_limit(),
            cognitive_intervention: default_intervention_limit(),
            synthesis: default_synthesis_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisConfig {
    #[serde(default)]
    pub word_limits: WordLimits,

    /// Maximum closing questions on question-led responses
    #[serde(default = "default_max_questions")]
    pub max_questions: usize,

    /// Every Nth turn is a reflection checkpoint (0 = only on request)
    #[serde(default)]
    pub reflection_interval: u32,

    /// Token-set similarity at which two statements count as duplicates
    #[serde(default = "default_dedupe_similarity")]
    pub dedupe_similarity: f64,

    /// Optional TOML file whose contracts replace the built-in ones per
    /// response type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contracts_path: Option<String>,
}

fn default_max_questions() -> usize {
    2
}
fn default_dedupe_similarity() -> f64 {
    0.8
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            word_limits: WordLimits::default(),
            max_questions: default_max_questions(),
            reflection_interval: 0,
            dedupe_similarity: default_dedupe_similarity(),
            contracts_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Minimum snapshots before a trend other than "stable" is reported
    #[serde(default = "default_trend_min_points")]
    pub trend_min_points: usize,

    /// Half-to-half change (metric points) still treated as stable
    #[serde(default = "default_trend_tolerance")]
    pub trend_tolerance: f64,
}

fn default_trend_min_points() -> usize {
    4
}
fn default_trend_tolerance() -> f64 {
    5.0
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            trend_min_points: default_trend_min_points(),
            trend_tolerance: default_trend_tolerance(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Per-capability call timeout
    #[serde(default = "default_capability_timeout")]
    pub capability_timeout_secs: u64,

    /// Queued commands per session task
    #[serde(default = "default_session_channel")]
    pub session_channel_capacity: usize,

    /// Domain event buffer
    #[serde(default = "default_event_bus")]
    pub event_bus_capacity: usize,

    /// Maximum concurrent sessions
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

fn default_capability_timeout() -> u64 {
    30
}
fn default_session_channel() -> usize {
    32
}
fn default_event_bus() -> usize {
    256
}
fn default_max_sessions() -> usize {
    1_000
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            capability_timeout_secs: default_capability_timeout(),
            session_channel_capacity: default_session_channel(),
            event_bus_capacity: default_event_bus(),
            max_sessions: default_max_sessions(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,
}

fn default_port() -> u16 {
    42618
}
fn default_host() -> String {
    "127.0.0.1".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeConfig {
    /// Optional TOML corpus merged into the knowledge base
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corpus_path: Option<String>,

    /// Include the built-in seed corpus
    #[serde(default = "default_true")]
    pub seed_defaults: bool,

    /// Items retrieved per query
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

fn default_true() -> bool {
    true
}
fn default_max_results() -> usize {
    3
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            corpus_path: None,
            seed_defaults: true,
            max_results: default_max_results(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.archmentor/config.toml).
    ///
    /// Environment overrides (highest priority):
    /// - `ARCHMENTOR_CAPABILITY_TIMEOUT_SECS`
    /// - `ARCHMENTOR_GATEWAY_PORT`
    /// - `ARCHMENTOR_KNOWLEDGE_CORPUS`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(secs) = std::env::var("ARCHMENTOR_CAPABILITY_TIMEOUT_SECS") {
            self.runtime.capability_timeout_secs = secs.parse().map_err(|_| {
                ConfigError::ValidationError(format!(
                    "ARCHMENTOR_CAPABILITY_TIMEOUT_SECS must be an integer, got '{secs}'"
                ))
            })?;
        }

        if let Ok(port) = std::env::var("ARCHMENTOR_GATEWAY_PORT") {
            self.gateway.port = port.parse().map_err(|_| {
                ConfigError::ValidationError(format!(
                    "ARCHMENTOR_GATEWAY_PORT must be a port number, got '{port}'"
                ))
            })?;
        }

        if let Ok(corpus) = std::env::var("ARCHMENTOR_KNOWLEDGE_CORPUS") {
            self.knowledge.corpus_path = Some(corpus);
        }

        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".archmentor")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.tracker;
        if t.window_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "tracker.window_capacity must be > 0".into(),
            ));
        }
        if t.decline_window == 0 || t.decline_window * 2 > t.window_capacity {
            return Err(ConfigError::ValidationError(
                "tracker.decline_window must be > 0 and fit twice into window_capacity".into(),
            ));
        }
        if t.depth_window == 0 || t.depth_window > t.window_capacity {
            return Err(ConfigError::ValidationError(
                "tracker.depth_window must be between 1 and window_capacity".into(),
            ));
        }
        if !(0.0..=1.0).contains(&t.shallow_below)
            || !(0.0..=1.0).contains(&t.deep_above)
            || t.shallow_below >= t.deep_above
        {
            return Err(ConfigError::ValidationError(
                "tracker.shallow_below must be < deep_above, both within [0, 1]".into(),
            ));
        }
        if t.offloading_moderate_above >= t.offloading_increasing_above {
            return Err(ConfigError::ValidationError(
                "tracker.offloading_moderate_above must be < offloading_increasing_above".into(),
            ));
        }
        let w = t.depth_weights;
        let weight_sum = w.logical_connections + w.concept_integration + w.question_sophistication;
        if (weight_sum - 1.0).abs() > 1e-6 {
            return Err(ConfigError::ValidationError(format!(
                "tracker.depth_weights must sum to 1.0, got {weight_sum}"
            )));
        }

        let c = &self.classifier;
        if c.engagement_low_below >= c.engagement_high_above {
            return Err(ConfigError::ValidationError(
                "classifier.engagement_low_below must be < engagement_high_above".into(),
            ));
        }
        if c.offloading_repeat_at == 0 {
            return Err(ConfigError::ValidationError(
                "classifier.offloading_repeat_at must be > 0".into(),
            ));
        }

        let s = &self.synthesis;
        let limits = s.word_limits;
        if [
            limits.socratic_primary,
            limits.knowledge_support,
            limits.cognitive_intervention,
            limits.synthesis,
        ]
        .iter()
        .any(|l| *l < 40)
        {
            return Err(ConfigError::ValidationError(
                "synthesis.word_limits must each allow at least 40 words".into(),
            ));
        }
        if s.max_questions == 0 || s.max_questions > 2 {
            return Err(ConfigError::ValidationError(
                "synthesis.max_questions must be 1 or 2".into(),
            ));
        }
        if !(0.0..=1.0).contains(&s.dedupe_similarity) {
            return Err(ConfigError::ValidationError(
                "synthesis.dedupe_similarity must be within [0, 1]".into(),
            ));
        }

        if self.metrics.trend_min_points < 2 {
            return Err(ConfigError::ValidationError(
                "metrics.trend_min_points must be >= 2".into(),
            ));
        }

        if self.runtime.capability_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "runtime.capability_timeout_secs must be > 0".into(),
            ));
        }
        if self.runtime.session_channel_capacity == 0 || self.runtime.event_bus_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "runtime channel capacities must be > 0".into(),
            ));
        }

        Ok(())
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
