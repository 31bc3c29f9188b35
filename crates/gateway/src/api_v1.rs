//! HTTP API v1 — sessions, turns and interaction statistics.
//!
//! Endpoints:
//!
//! - `POST   /v1/sessions`             — Start a session
//! - `GET    /v1/sessions`             — List active sessions
//! - `GET    /v1/sessions/{id}`        — Session state and metric trends
//! - `DELETE /v1/sessions/{id}`        — End a session
//! - `POST   /v1/sessions/{id}/cancel` — Cancel the turn in flight
//! - `POST   /v1/sessions/{id}/reset`  — Start the session over
//! - `POST   /v1/turns`                — Run one user turn
//! - `GET    /v1/stats`                — Aggregate interaction statistics
//! - `GET    /v1/interactions`         — Recent per-turn interaction records
//! - `GET    /v1/contracts`            — Active contracts and recent repairs
//! - `POST   /v1/contracts/reload`     — Re-read the contract file

use axum::{
    Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use archmentor_agent::{Runtime, SessionManager};
use archmentor_config::SynthesisConfig;
use archmentor_contracts::ContractLogEntry;
use archmentor_core::error::SessionError;
use archmentor_core::metrics::MetricsSnapshot;
use archmentor_core::response::{TurnRequest, TurnResponse};
use archmentor_core::state::ConversationState;
use archmentor_telemetry::{InteractionRecord, InteractionRecorder, InteractionStats, MetricTrends};

/// Default page size for `GET /v1/interactions`.
const DEFAULT_INTERACTION_LIMIT: usize = 50;
/// Upper bound for `GET /v1/interactions?limit=`.
const MAX_INTERACTION_LIMIT: usize = 1_000;
/// Repairs listed by `GET /v1/contracts`.
const RECENT_REPAIRS: usize = 20;

// ── State ─────────────────────────────────────────────────────────────────

/// Shared state for the v1 API.
pub struct ApiV1State {
    pub sessions: Arc<SessionManager>,
    pub recorder: Arc<InteractionRecorder>,
    /// Source of the contract file path for reloads.
    pub synthesis: SynthesisConfig,
    pub start_time: chrono::DateTime<chrono::Utc>,
}

impl ApiV1State {
    pub fn from_runtime(runtime: &Runtime) -> Self {
        Self {
            sessions: Arc::clone(runtime.sessions()),
            recorder: Arc::clone(runtime.recorder()),
            synthesis: runtime.config().synthesis.clone(),
            start_time: chrono::Utc::now(),
        }
    }
}

pub type SharedApiState = Arc<ApiV1State>;

/// Build the v1 router (mounted under `/v1`).
pub fn v1_router(state: SharedApiState) -> Router {
    Router::new()
        .route("/sessions", post(create_session_handler).get(list_sessions_handler))
        .route(
            "/sessions/{id}",
            get(get_session_handler).delete(delete_session_handler),
        )
        .route("/sessions/{id}/cancel", post(cancel_session_handler))
        .route("/sessions/{id}/reset", post(reset_session_handler))
        .route("/turns", post(turn_handler))
        .route("/stats", get(stats_handler))
        .route("/interactions", get(interactions_handler))
        .route("/contracts", get(contracts_handler))
        .route("/contracts/reload", post(reload_contracts_handler))
        .with_state(state)
}

// ── Errors ────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn session_error(e: SessionError) -> ApiError {
    let status = match &e {
        SessionError::NotFound(_) => StatusCode::NOT_FOUND,
        SessionError::AlreadyExists(_) | SessionError::Cancelled(_) => StatusCode::CONFLICT,
        SessionError::Closed(_) => StatusCode::GONE,
        SessionError::LimitReached(_) => StatusCode::SERVICE_UNAVAILABLE,
    };
    (
        status,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
}

// ── Sessions ──────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct CreateSessionRequest {
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateSessionResponse {
    pub session_id: String,
    pub created_at: String,
}

async fn create_session_handler(
    State(state): State<SharedApiState>,
    body: Option<Json<CreateSessionRequest>>,
) -> Result<(StatusCode, Json<CreateSessionResponse>), ApiError> {
    let request = body.map(|Json(b)| b).unwrap_or_default();
    let handle = state
        .sessions
        .create(request.session_id)
        .await
        .map_err(session_error)?;
    info!(session_id = %handle.id(), "Session created");

    Ok((
        StatusCode::CREATED,
        Json(CreateSessionResponse {
            session_id: handle.id().to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
        }),
    ))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionListResponse {
    pub sessions: Vec<String>,
}

async fn list_sessions_handler(State(state): State<SharedApiState>) -> Json<SessionListResponse> {
    Json(SessionListResponse {
        sessions: state.sessions.list().await,
    })
}

#[derive(Debug, Serialize)]
pub struct SessionDetailResponse {
    pub session_id: String,
    pub turns: u32,
    pub metric_trends: MetricTrends,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_metrics: Option<MetricsSnapshot>,
    pub state: ConversationState,
}

async fn get_session_handler(
    State(state): State<SharedApiState>,
    Path(id): Path<String>,
) -> Result<Json<SessionDetailResponse>, ApiError> {
    let snapshot = state.sessions.snapshot(&id).await.map_err(session_error)?;
    let metric_trends = state
        .sessions
        .pipeline()
        .metrics_engine()
        .window_trends(&snapshot.metrics_window);

    Ok(Json(SessionDetailResponse {
        session_id: id.clone(),
        turns: snapshot.user_turns(),
        metric_trends,
        average_metrics: state.recorder.session_average(&id),
        state: snapshot,
    }))
}

async fn delete_session_handler(
    State(state): State<SharedApiState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.sessions.close(&id).await.map_err(session_error)?;
    info!(session_id = %id, "Session closed");
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionActionResponse {
    pub session_id: String,
    pub status: String,
}

async fn cancel_session_handler(
    State(state): State<SharedApiState>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<SessionActionResponse>), ApiError> {
    state.sessions.cancel(&id).await.map_err(session_error)?;
    Ok((
        StatusCode::ACCEPTED,
        Json(SessionActionResponse {
            session_id: id,
            status: "cancel_requested".into(),
        }),
    ))
}

async fn reset_session_handler(
    State(state): State<SharedApiState>,
    Path(id): Path<String>,
) -> Result<Json<SessionActionResponse>, ApiError> {
    state.sessions.reset(&id).await.map_err(session_error)?;
    Ok(Json(SessionActionResponse {
        session_id: id,
        status: "reset".into(),
    }))
}

// ── Turns ─────────────────────────────────────────────────────────────────

async fn turn_handler(
    State(state): State<SharedApiState>,
    Json(request): Json<TurnRequest>,
) -> Result<Json<TurnResponse>, ApiError> {
    if request.session_id.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "session_id must not be empty".into(),
            }),
        ));
    }

    let session_id = request.session_id.clone();
    match state.sessions.turn(request).await {
        Ok(response) => Ok(Json(response)),
        Err(e) => {
            warn!(session_id = %session_id, error = %e, "Turn not completed");
            Err(session_error(e))
        }
    }
}

// ── Statistics ────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct StatsResponse {
    pub active_sessions: usize,
    pub uptime_secs: i64,
    #[serde(flatten)]
    pub interactions: InteractionStats,
}

async fn stats_handler(State(state): State<SharedApiState>) -> Json<StatsResponse> {
    Json(StatsResponse {
        active_sessions: state.sessions.len().await,
        uptime_secs: (chrono::Utc::now() - state.start_time).num_seconds(),
        interactions: state.recorder.stats(),
    })
}

#[derive(Debug, Default, Deserialize)]
pub struct InteractionQuery {
    pub limit: Option<usize>,
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InteractionListResponse {
    pub interactions: Vec<InteractionRecord>,
    pub total: usize,
}

async fn interactions_handler(
    State(state): State<SharedApiState>,
    Query(query): Query<InteractionQuery>,
) -> Json<InteractionListResponse> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_INTERACTION_LIMIT)
        .min(MAX_INTERACTION_LIMIT);

    let interactions = match &query.session_id {
        Some(id) => {
            let mut records = state.recorder.for_session(id);
            let skip = records.len().saturating_sub(limit);
            records.drain(..skip);
            records
        }
        None => state.recorder.recent(limit),
    };

    Json(InteractionListResponse {
        total: interactions.len(),
        interactions,
    })
}

// ── Contracts ─────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct ContractSummaryResponse {
    pub active_contracts: usize,
    pub repairs_logged: usize,
    pub recent_repairs: Vec<ContractLogEntry>,
}

async fn contracts_handler(State(state): State<SharedApiState>) -> Json<ContractSummaryResponse> {
    let engine = state.sessions.pipeline().synthesizer().contracts();
    let mut log = engine.log();
    let repairs_logged = log.len();
    log.drain(..repairs_logged.saturating_sub(RECENT_REPAIRS));
    Json(ContractSummaryResponse {
        active_contracts: engine.active_count(),
        repairs_logged,
        recent_repairs: log,
    })
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ContractReloadResponse {
    pub active_contracts: usize,
}

async fn reload_contracts_handler(
    State(state): State<SharedApiState>,
) -> Result<Json<ContractReloadResponse>, ApiError> {
    let synthesizer = state.sessions.pipeline().synthesizer();
    match synthesizer.reload_contracts(&state.synthesis) {
        Ok(active_contracts) => Ok(Json(ContractReloadResponse { active_contracts })),
        Err(e) => {
            warn!(error = %e, "Contract reload rejected");
            Err((
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            ))
        }
    }
}
