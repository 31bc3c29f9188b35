//! Wires a complete runtime from configuration: knowledge base, capability
//! registry, turn pipeline, session manager and the interaction recorder.

use archmentor_config::AppConfig;
use archmentor_core::error::Result;
use archmentor_core::event::EventBus;
use archmentor_core::knowledge::KnowledgeSource;
use archmentor_knowledge::InMemoryKnowledgeBase;
use archmentor_telemetry::InteractionRecorder;
use archmentor_telemetry::recorder::DEFAULT_RECORD_CAPACITY;
use std::path::Path;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

use crate::capabilities::default_registry;
use crate::pipeline::TurnPipeline;
use crate::session::SessionManager;
use crate::vision::ReferenceVisualAnalyzer;

pub struct Runtime {
    config: AppConfig,
    events: Arc<EventBus>,
    knowledge: Arc<InMemoryKnowledgeBase>,
    recorder: Arc<InteractionRecorder>,
    sessions: Arc<SessionManager>,
    recorder_task: JoinHandle<()>,
}

impl Runtime {
    /// Build everything `config` describes. Fails if the configured corpus
    /// file cannot be loaded.
    pub async fn build(config: AppConfig) -> Result<Self> {
        let knowledge = Arc::new(if config.knowledge.seed_defaults {
            InMemoryKnowledgeBase::seeded()
        } else {
            InMemoryKnowledgeBase::new()
        });
        if let Some(path) = &config.knowledge.corpus_path {
            knowledge.load_toml(Path::new(path)).await?;
        }

        let events = Arc::new(EventBus::new(config.runtime.event_bus_capacity));
        let recorder = Arc::new(InteractionRecorder::new(DEFAULT_RECORD_CAPACITY));
        let recorder_task = recorder.spawn(&events);

        let registry = default_registry(
            Arc::clone(&knowledge) as Arc<dyn KnowledgeSource>,
            Some(Arc::new(ReferenceVisualAnalyzer)),
            config.knowledge.max_results,
        );
        let pipeline = TurnPipeline::from_config(&config, registry, Arc::clone(&events))?;
        let sessions = Arc::new(SessionManager::new(
            Arc::new(pipeline),
            config.runtime.session_channel_capacity,
            config.runtime.max_sessions,
        ));

        info!(
            knowledge_items = knowledge.count().await?,
            capability_timeout_secs = config.runtime.capability_timeout_secs,
            max_sessions = config.runtime.max_sessions,
            "Runtime ready"
        );

        Ok(Self {
            config,
            events,
            knowledge,
            recorder,
            sessions,
            recorder_task,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub fn knowledge(&self) -> &Arc<InMemoryKnowledgeBase> {
        &self.knowledge
    }

    pub fn recorder(&self) -> &Arc<InteractionRecorder> {
        &self.recorder
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    pub fn pipeline(&self) -> &Arc<TurnPipeline> {
        self.sessions.pipeline()
    }

    /// End all sessions and stop the recorder.
    pub async fn shutdown(self) {
        self.sessions.shutdown().await;
        self.recorder_task.abort();
    }
}
