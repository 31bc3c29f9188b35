//! Session manager.
//!
//! Every session is a tokio task that owns its [`ConversationState`] and
//! processes commands from an mpsc queue, one at a time. Turns within a
//! session are therefore strictly sequential while different sessions run
//! independently. The manager only maps session ids to handles.
//!
//! Cancellation travels on a separate watch channel so it can reach a turn
//! that is already running. The in-flight turn future is dropped; since the
//! pipeline commits its draft only on completion, nothing of the cancelled
//! turn is kept.

use archmentor_core::error::SessionError;
use archmentor_core::event::{DomainEvent, EventBus};
use archmentor_core::response::{TurnRequest, TurnResponse};
use archmentor_core::state::ConversationState;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{RwLock, mpsc, oneshot, watch};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::pipeline::TurnPipeline;

enum SessionCommand {
    Turn {
        request: TurnRequest,
        reply: oneshot::Sender<Result<TurnResponse, SessionError>>,
    },
    Snapshot {
        reply: oneshot::Sender<ConversationState>,
    },
    Reset {
        reply: oneshot::Sender<()>,
    },
    Shutdown,
}

/// A cheap, cloneable handle to one session task.
#[derive(Clone)]
pub struct SessionHandle {
    id: String,
    commands: mpsc::Sender<SessionCommand>,
    cancel: Arc<watch::Sender<u64>>,
}

impl SessionHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Queue a turn and wait for its response.
    pub async fn turn(&self, request: TurnRequest) -> Result<TurnResponse, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::Turn { request, reply }).await?;
        rx.await.map_err(|_| self.closed())?
    }

    /// A copy of the committed state.
    pub async fn snapshot(&self) -> Result<ConversationState, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::Snapshot { reply }).await?;
        rx.await.map_err(|_| self.closed())
    }

    /// Cancel the turn in flight, if any. Queued turns still run.
    pub fn cancel(&self) {
        self.cancel.send_modify(|generation| *generation += 1);
    }

    /// Cancel any turn in flight and start the session over.
    pub async fn reset(&self) -> Result<(), SessionError> {
        self.cancel();
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::Reset { reply }).await?;
        rx.await.map_err(|_| self.closed())
    }

    /// Stop the task after the commands already queued.
    pub async fn shutdown(&self) -> Result<(), SessionError> {
        self.send(SessionCommand::Shutdown).await
    }

    async fn send(&self, command: SessionCommand) -> Result<(), SessionError> {
        self.commands.send(command).await.map_err(|_| self.closed())
    }

    fn closed(&self) -> SessionError {
        SessionError::Closed(self.id.clone())
    }
}

struct SessionTask {
    state: ConversationState,
    pipeline: Arc<TurnPipeline>,
    events: Arc<EventBus>,
    commands: mpsc::Receiver<SessionCommand>,
    cancel: watch::Receiver<u64>,
}

impl SessionTask {
    async fn run(mut self) {
        while let Some(command) = self.commands.recv().await {
            match command {
                SessionCommand::Turn { request, reply } => {
                    let result = self.turn(request).await;
                    // The caller may have given up waiting.
                    let _ = reply.send(result);
                }
                SessionCommand::Snapshot { reply } => {
                    let _ = reply.send(self.state.clone());
                }
                SessionCommand::Reset { reply } => {
                    self.state = ConversationState::new(
                        self.state.session_id.clone(),
                        self.pipeline.window_capacity(),
                    );
                    self.events.publish(DomainEvent::SessionReset {
                        session_id: self.state.session_id.clone(),
                        timestamp: Utc::now(),
                    });
                    info!(session_id = %self.state.session_id, "Session reset");
                    let _ = reply.send(());
                }
                SessionCommand::Shutdown => break,
            }
        }

        let turns = self.state.user_turns();
        self.events.publish(DomainEvent::SessionEnded {
            session_id: self.state.session_id.clone(),
            turns,
            timestamp: Utc::now(),
        });
        info!(session_id = %self.state.session_id, turns, "Session ended");
    }

    async fn turn(&mut self, request: TurnRequest) -> Result<TurnResponse, SessionError> {
        // Cancellations issued before this turn started do not apply to it.
        self.cancel.borrow_and_update();
        let session_id = self.state.session_id.clone();

        let outcome = tokio::select! {
            outcome = self.pipeline.run_turn(&self.state, &request) => outcome,
            _ = cancelled(&mut self.cancel) => {
                warn!(session_id = %session_id, "Turn cancelled");
                return Err(SessionError::Cancelled(session_id));
            }
        };

        if let Some(next) = outcome.next_state {
            self.state = next;
        }
        Ok(TurnResponse::from_synthesized(session_id, outcome.response))
    }
}

/// Resolves when the generation counter moves. Never resolves once the
/// sender is gone.
async fn cancelled(cancel: &mut watch::Receiver<u64>) {
    if cancel.changed().await.is_err() {
        std::future::pending::<()>().await;
    }
}

pub struct SessionManager {
    pipeline: Arc<TurnPipeline>,
    sessions: RwLock<HashMap<String, SessionHandle>>,
    channel_capacity: usize,
    max_sessions: usize,
}

impl SessionManager {
    pub fn new(pipeline: Arc<TurnPipeline>, channel_capacity: usize, max_sessions: usize) -> Self {
        Self {
            pipeline,
            sessions: RwLock::new(HashMap::new()),
            channel_capacity: channel_capacity.max(1),
            max_sessions: max_sessions.max(1),
        }
    }

    pub fn pipeline(&self) -> &Arc<TurnPipeline> {
        &self.pipeline
    }

    /// Start a session task. A missing id gets a fresh UUID.
    pub async fn create(&self, id: Option<String>) -> Result<SessionHandle, SessionError> {
        let id = id.unwrap_or_else(|| Uuid::new_v4().to_string());
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&id) {
            return Err(SessionError::AlreadyExists(id));
        }
        if sessions.len() >= self.max_sessions {
            return Err(SessionError::LimitReached(self.max_sessions));
        }

        let handle = self.spawn(id.clone());
        sessions.insert(id, handle.clone());
        Ok(handle)
    }

    fn spawn(&self, id: String) -> SessionHandle {
        let (commands_tx, commands_rx) = mpsc::channel(self.channel_capacity);
        let (cancel_tx, cancel_rx) = watch::channel(0u64);
        let events = Arc::clone(self.pipeline.events());

        let task = SessionTask {
            state: ConversationState::new(id.clone(), self.pipeline.window_capacity()),
            pipeline: Arc::clone(&self.pipeline),
            events: Arc::clone(&events),
            commands: commands_rx,
            cancel: cancel_rx,
        };
        tokio::spawn(task.run());

        events.publish(DomainEvent::SessionStarted {
            session_id: id.clone(),
            timestamp: Utc::now(),
        });
        debug!(session_id = %id, "Session task started");

        SessionHandle {
            id,
            commands: commands_tx,
            cancel: Arc::new(cancel_tx),
        }
    }

    pub async fn get(&self, id: &str) -> Result<SessionHandle, SessionError> {
        self.sessions
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| SessionError::NotFound(id.to_string()))
    }

    /// Route a turn to its session, starting the session on first use.
    pub async fn turn(&self, request: TurnRequest) -> Result<TurnResponse, SessionError> {
        let handle = match self.get(&request.session_id).await {
            Ok(handle) => handle,
            Err(SessionError::NotFound(_)) => {
                match self.create(Some(request.session_id.clone())).await {
                    Ok(handle) => handle,
                    // Lost a race with a concurrent create.
                    Err(SessionError::AlreadyExists(id)) => self.get(&id).await?,
                    Err(e) => return Err(e),
                }
            }
            Err(e) => return Err(e),
        };
        handle.turn(request).await
    }

    pub async fn snapshot(&self, id: &str) -> Result<ConversationState, SessionError> {
        self.get(id).await?.snapshot().await
    }

    pub async fn cancel(&self, id: &str) -> Result<(), SessionError> {
        self.get(id).await?.cancel();
        Ok(())
    }

    pub async fn reset(&self, id: &str) -> Result<(), SessionError> {
        self.get(id).await?.reset().await
    }

    /// Cancel any turn in flight and end the session.
    pub async fn close(&self, id: &str) -> Result<(), SessionError> {
        let handle = self
            .sessions
            .write()
            .await
            .remove(id)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
        handle.cancel();
        handle.shutdown().await
    }

    /// Session ids, sorted.
    pub async fn list(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// End every session.
    pub async fn shutdown(&self) {
        let handles: Vec<SessionHandle> = self.sessions.write().await.drain().map(|(_, h)| h).collect();
        for handle in handles {
            handle.cancel();
            if let Err(e) = handle.shutdown().await {
                debug!(error = %e, "Session already stopped");
            }
        }
    }
}
