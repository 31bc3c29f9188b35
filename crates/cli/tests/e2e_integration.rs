//! End-to-end integration tests for the ArchMentor tutoring runtime.
//!
//! These tests drive whole conversations through the runtime, the session
//! actors and the HTTP gateway, from user text to the delivered reply and
//! its metadata.

use std::time::Duration;

use archmentor_agent::Runtime;
use archmentor_config::AppConfig;
use archmentor_core::knowledge::KnowledgeSource;
use archmentor_core::response::{ResponseMetadata, TurnRequest, TurnResponse};
use archmentor_core::route::{ResponseType, Route};
use archmentor_core::state::CognitiveFlag;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use std::sync::Arc;
use tower::ServiceExt;

// ── Helpers ──────────────────────────────────────────────────────────────

async fn runtime() -> Runtime {
    Runtime::build(AppConfig::default()).await.unwrap()
}

async fn say(runtime: &Runtime, session: &str, text: &str) -> TurnResponse {
    runtime
        .sessions()
        .turn(TurnRequest::new(session, text))
        .await
        .unwrap()
}

fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

fn last_question(text: &str) -> Option<&str> {
    text.lines().map(str::trim).filter(|l| l.ends_with('?')).last()
}

async fn wait_for_turns(runtime: &Runtime, turns: u64) {
    for _ in 0..100 {
        if runtime.recorder().stats().turns >= turns {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

// ═════════════════════════════════════════════════════════════════════════
// Conversation scenarios
// ═════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn e2e_opening_message_gets_progressive_opening() {
    let rt = runtime().await;
    let reply = say(&rt, "open", "I'm designing a community library by the river").await;

    assert_eq!(reply.metadata.routing_path, Route::ProgressiveOpening);
    assert_eq!(reply.metadata.response_type, ResponseType::SocraticPrimary);
    assert!(reply.text.trim_end().ends_with('?'));
    assert!(word_count(&reply.text) <= 130);
    rt.shutdown().await;
}

#[tokio::test]
async fn e2e_repeated_offloading_triggers_intervention() {
    let rt = runtime().await;
    say(&rt, "offload", "I'm designing a small library for a riverside town").await;
    for _ in 0..3 {
        say(&rt, "offload", "Can you just give me the materials?").await;
    }
    let reply = say(&rt, "offload", "Just tell me what materials to use").await;

    assert_eq!(reply.metadata.routing_path, Route::CognitiveIntervention);
    assert_eq!(reply.metadata.response_type, ResponseType::CognitiveIntervention);
    assert!(
        reply
            .metadata
            .cognitive_flags
            .contains(&CognitiveFlag::CognitiveOffloadingDetected)
    );
    assert!(word_count(&reply.text) <= 160);
    assert!(last_question(&reply.text).is_some());

    let state = rt.sessions().snapshot("offload").await.unwrap();
    assert!(!state.intervention_history.is_empty());
    assert_eq!(state.user_turns(), 5);
    rt.shutdown().await;
}

#[tokio::test]
async fn e2e_informed_question_gets_knowledge_with_sources() {
    let rt = runtime().await;
    say(&rt, "museum", "I'm designing a museum on a tight urban site").await;
    let reply = say(
        &rt,
        "museum",
        "How does cross-laminated timber compare with concrete for thermal mass in a museum, since daylight and acoustics matter?",
    )
    .await;

    assert_eq!(reply.metadata.routing_path, Route::KnowledgeWithChallenge);
    assert_eq!(reply.metadata.response_type, ResponseType::KnowledgeSupport);
    assert!(!reply.metadata.sources.is_empty());
    assert!(reply.metadata.agents_used.iter().any(|a| a == "domain_knowledge"));
    assert!(word_count(&reply.text) <= 150);
    rt.shutdown().await;
}

#[tokio::test]
async fn e2e_metadata_always_carries_every_key() {
    let rt = runtime().await;
    let inputs = [
        "I'm designing a pavilion in a park",
        "I'm confused about the roof",
        "What is a clerestory?",
        "ok",
        "What if the pavilion opened fully to the south lawn in summer?",
    ];
    for input in inputs {
        let reply = say(&rt, "keys", input).await;
        let value = serde_json::to_value(&reply.metadata).unwrap();
        assert!(ResponseMetadata::missing_keys(&value).is_empty(), "{input}");
        assert_eq!(reply.metadata.response_type, reply.metadata.routing_path.response_type());
        assert!((0.0..=1.0).contains(&reply.metadata.confidence_score));
    }
    rt.shutdown().await;
}

#[tokio::test]
async fn e2e_sessions_are_isolated() {
    let rt = runtime().await;
    say(&rt, "alpha", "I'm designing a school").await;
    say(&rt, "alpha", "What is cross ventilation?").await;
    let fresh = say(&rt, "beta", "I'm designing a school").await;

    assert_eq!(fresh.metadata.routing_path, Route::ProgressiveOpening);
    assert_eq!(rt.sessions().snapshot("alpha").await.unwrap().user_turns(), 2);
    assert_eq!(rt.sessions().snapshot("beta").await.unwrap().user_turns(), 1);
    assert_eq!(rt.sessions().list().await, vec!["alpha".to_string(), "beta".to_string()]);
    rt.shutdown().await;
}

#[tokio::test]
async fn e2e_reset_starts_the_conversation_over() {
    let rt = runtime().await;
    say(&rt, "again", "I'm designing a housing block").await;
    say(&rt, "again", "What is a deck access plan?").await;
    rt.sessions().reset("again").await.unwrap();

    let reply = say(&rt, "again", "I'm designing a housing block").await;
    assert_eq!(reply.metadata.routing_path, Route::ProgressiveOpening);
    assert_eq!(rt.sessions().snapshot("again").await.unwrap().user_turns(), 1);
    rt.shutdown().await;
}

#[tokio::test]
async fn e2e_turns_are_recorded() {
    let rt = runtime().await;
    say(&rt, "rec", "I'm designing a fire station").await;
    say(&rt, "rec", "What is a drill tower?").await;
    wait_for_turns(&rt, 2).await;

    let stats = rt.recorder().stats();
    assert_eq!(stats.turns, 2);
    assert_eq!(stats.routes.get("PROGRESSIVE_OPENING"), Some(&1));
    rt.shutdown().await;
}

#[tokio::test]
async fn e2e_explain_does_not_advance_the_session() {
    let rt = runtime().await;
    say(&rt, "why", "I'm designing a chapel").await;
    let state = rt.sessions().snapshot("why").await.unwrap();
    let explanation = rt.pipeline().explain(&state, "Just tell me what materials to use");

    assert!(!explanation.context.is_first_message);
    assert_ne!(explanation.decision.route, Route::ProgressiveOpening);
    assert_eq!(rt.sessions().snapshot("why").await.unwrap().user_turns(), 1);
    rt.shutdown().await;
}

// ═════════════════════════════════════════════════════════════════════════
// Configuration
// ═════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn e2e_config_file_adds_corpus_items() {
    let dir = tempfile::tempdir().unwrap();
    let corpus = dir.path().join("corpus.toml");
    std::fs::write(
        &corpus,
        r#"
[[items]]
id = "studio-1"
title = "Rammed earth walls"
content = "Rammed earth walls store heat and need deep overhangs against driving rain."
source = "Studio handbook"
tags = ["materials"]
"#,
    )
    .unwrap();
    let config_path = dir.path().join("config.toml");
    std::fs::write(
        &config_path,
        format!(
            "[knowledge]\ncorpus_path = {:?}\nseed_defaults = false\n\n[gateway]\nport = 4200\n",
            corpus.display().to_string()
        ),
    )
    .unwrap();

    let config = AppConfig::load_from(&config_path).unwrap();
    assert_eq!(config.gateway.port, 4200);

    let rt = Runtime::build(config).await.unwrap();
    assert_eq!(rt.knowledge().count().await.unwrap(), 1);
    rt.shutdown().await;
}

#[test]
fn e2e_invalid_config_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[tracker]\nwindow_capacity = 0\n").unwrap();
    assert!(AppConfig::load_from(&path).is_err());
}

// ═════════════════════════════════════════════════════════════════════════
// Gateway
// ═════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn e2e_gateway_conversation_round_trip() {
    let rt = runtime().await;
    let app = archmentor_gateway::build_router(Arc::new(
        archmentor_gateway::api_v1::ApiV1State::from_runtime(&rt),
    ));

    let created = app
        .clone()
        .oneshot(post_json("/v1/sessions", serde_json::json!({"session_id": "web"})))
        .await
        .unwrap();
    assert_eq!(created.status(), StatusCode::CREATED);

    let reply = app
        .clone()
        .oneshot(post_json(
            "/v1/turns",
            serde_json::json!({"session_id": "web", "user_text": "I'm designing a market hall"}),
        ))
        .await
        .unwrap();
    assert_eq!(reply.status(), StatusCode::OK);
    let body = json_body(reply).await;
    assert_eq!(body["metadata"]["routing_path"], "PROGRESSIVE_OPENING");
    assert!(body["text"].as_str().unwrap().trim_end().ends_with('?'));

    let detail = app
        .clone()
        .oneshot(Request::builder().uri("/v1/sessions/web").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(detail.status(), StatusCode::OK);
    assert_eq!(json_body(detail).await["turns"], 1);

    let deleted = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/v1/sessions/web")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

    let gone = app
        .oneshot(Request::builder().uri("/v1/sessions/web").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(gone.status(), StatusCode::NOT_FOUND);
    rt.shutdown().await;
}

#[tokio::test]
async fn e2e_gateway_stats_follow_turns() {
    let rt = runtime().await;
    let app = archmentor_gateway::build_router(Arc::new(
        archmentor_gateway::api_v1::ApiV1State::from_runtime(&rt),
    ));

    for text in ["I'm designing a bathhouse", "What is a caldarium?"] {
        let response = app
            .clone()
            .oneshot(post_json(
                "/v1/turns",
                serde_json::json!({"session_id": "stats", "user_text": text}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
    wait_for_turns(&rt, 2).await;

    let stats = app
        .clone()
        .oneshot(Request::builder().uri("/v1/stats").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let body = json_body(stats).await;
    assert_eq!(body["turns"], 2);
    assert_eq!(body["active_sessions"], 1);

    let listed = app
        .oneshot(
            Request::builder()
                .uri("/v1/interactions?session_id=stats&limit=1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = json_body(listed).await;
    assert_eq!(body["interactions"].as_array().unwrap().len(), 1);
    rt.shutdown().await;
}
