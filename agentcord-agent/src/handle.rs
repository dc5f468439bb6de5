// ABOUTME: AgentHandle is the Send+Sync face of one agent session.
// ABOUTME: A worker task owns the backend; state and events are published over a watch channel.

use crate::config::AgentConfig;
use crate::event::{AgentEvent, HandledStatus, RequestId, SequencedEvent, SystemLevel};
use crate::state::{AgentState, EventCursor, StateSnapshot};
use crate::traits::AgentBackend;
use anyhow::{anyhow, bail, Result};
use futures::StreamExt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Commands sent from AgentHandle to the session worker
#[derive(Debug)]
pub enum Command {
    Input { request_id: RequestId, text: String },
}

struct Shared {
    state: watch::Sender<AgentState>,
    /// Cancelled when the session is shut down; parent of every subscription token
    lifetime: CancellationToken,
    subscribers: AtomicUsize,
    /// Serializes idle-wait + submit across concurrent relay cycles
    turn: tokio::sync::Mutex<()>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

/// Send + Sync handle to a running agent session.
///
/// Cloning is cheap; all clones address the same session.
#[derive(Clone)]
pub struct AgentHandle {
    id: String,
    agent_type: String,
    backend: &'static str,
    config: AgentConfig,
    tx: mpsc::Sender<Command>,
    shared: Arc<Shared>,
}

impl std::fmt::Debug for AgentHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentHandle")
            .field("id", &self.id)
            .field("agent_type", &self.agent_type)
            .field("backend", &self.backend)
            .finish()
    }
}

impl AgentHandle {
    /// Start a worker for `backend` and return a handle to it.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(
        backend: Box<dyn AgentBackend>,
        agent_type: impl Into<String>,
        config: AgentConfig,
    ) -> Self {
        let (tx, rx) = mpsc::channel::<Command>(32);
        let (state, _) = watch::channel(AgentState::new(config.event_log_capacity));
        let shared = Arc::new(Shared {
            state,
            lifetime: CancellationToken::new(),
            subscribers: AtomicUsize::new(0),
            turn: tokio::sync::Mutex::new(()),
            worker: Mutex::new(None),
        });

        let id = uuid::Uuid::new_v4().to_string();
        let backend_name = backend.name();
        let worker = tokio::spawn(run_worker(backend, rx, Arc::clone(&shared), id.clone()));
        *shared.worker.lock().unwrap_or_else(|e| e.into_inner()) = Some(worker);

        Self {
            id,
            agent_type: agent_type.into(),
            backend: backend_name,
            config,
            tx,
            shared,
        }
    }

    /// Unique id of this session
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Agent type this session was spawned as
    pub fn agent_type(&self) -> &str {
        &self.agent_type
    }

    /// Get the backend name
    pub fn backend_name(&self) -> &'static str {
        self.backend
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// False once the session has been shut down
    pub fn is_alive(&self) -> bool {
        !self.shared.lifetime.is_cancelled()
    }

    /// Current state without waiting
    pub fn state(&self) -> StateSnapshot {
        self.shared.state.borrow().snapshot()
    }

    /// Retained events at or after `cursor`
    pub fn events_since(&self, cursor: EventCursor) -> Vec<SequencedEvent> {
        self.shared.state.borrow().events_since(cursor)
    }

    /// Wait until no input is queued or running
    pub async fn wait_for_idle(&self) -> Result<StateSnapshot> {
        let mut rx = self.shared.state.subscribe();
        tokio::select! {
            biased;
            _ = self.shared.lifetime.cancelled() => bail!("Agent {} was shut down", self.id),
            snapshot = async { rx.wait_for(|s| s.is_idle()).await.map(|s| s.snapshot()) } => {
                snapshot.map_err(|_| anyhow!("Agent {} state channel closed", self.id))
            }
        }
    }

    /// Take this session's turn lock.
    ///
    /// Holding it across `wait_for_idle` and `submit_input` keeps two callers
    /// from both observing idle and submitting at once.
    pub async fn lock_turn(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.shared.turn.lock().await
    }

    /// Queue `text` as input and return its correlation token.
    ///
    /// The session is marked busy before this returns.
    pub async fn submit_input(&self, text: &str) -> Result<RequestId> {
        if !self.is_alive() {
            bail!("Agent {} was shut down", self.id);
        }

        // Reserve first so a cancelled caller never leaves the session marked busy
        let permit = match self.tx.reserve().await {
            Ok(permit) => permit,
            Err(_) => bail!("Agent {} worker closed", self.id),
        };

        let request_id = RequestId::new();
        self.shared.state.send_modify(|s| s.begin_input());
        permit.send(Command::Input {
            request_id: request_id.clone(),
            text: text.to_string(),
        });

        tracing::debug!(agent_id = %self.id, request_id = %request_id, "Input submitted");
        Ok(request_id)
    }

    /// Listen to events appended at or after `cursor`
    pub fn subscribe(&self, cursor: EventCursor) -> Subscription {
        self.shared.subscribers.fetch_add(1, Ordering::SeqCst);
        // Pinning changes no visible event, so receivers are not woken
        self.shared.state.send_if_modified(|s| {
            s.pin(cursor);
            false
        });
        Subscription {
            rx: self.shared.state.subscribe(),
            cursor,
            missed: 0,
            token: self.shared.lifetime.child_token(),
            shared: Arc::clone(&self.shared),
            released: false,
        }
    }

    /// Number of subscriptions that have not been released yet
    pub fn subscriber_count(&self) -> usize {
        self.shared.subscribers.load(Ordering::SeqCst)
    }

    /// Stop the worker and close every subscription. Safe to call repeatedly.
    pub async fn shutdown(&self) {
        self.shared.lifetime.cancel();
        let worker = self
            .shared
            .worker
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(worker) = worker {
            if let Err(e) = worker.await {
                tracing::warn!(agent_id = %self.id, error = %e, "Agent worker ended abnormally");
            }
        }
    }
}

/// Cancelable listener on a session's event log.
///
/// Yields batches of events in log order starting at the cursor it was
/// created with. Events at or after its cursor stay in the log until they are
/// yielded. `unsubscribe` is idempotent and also runs on drop.
pub struct Subscription {
    rx: watch::Receiver<AgentState>,
    cursor: EventCursor,
    /// Events evicted before the cursor reached them
    missed: u64,
    token: CancellationToken,
    shared: Arc<Shared>,
    released: bool,
}

impl Subscription {
    /// Position of the next event this subscription will yield
    pub fn cursor(&self) -> EventCursor {
        self.cursor
    }

    /// Events that were gone from the log before this subscription read them.
    ///
    /// Only non-zero for a subscription created at a cursor that had already
    /// been evicted.
    pub fn missed_events(&self) -> u64 {
        self.missed
    }

    pub fn is_active(&self) -> bool {
        !self.released && !self.token.is_cancelled()
    }

    /// Wait for the next batch of events.
    ///
    /// Returns `None` once unsubscribed or when the session shuts down.
    pub async fn next_batch(&mut self) -> Option<Vec<SequencedEvent>> {
        loop {
            if !self.is_active() {
                return None;
            }

            let (batch, missed) = {
                let state = self.rx.borrow_and_update();
                (state.events_since(self.cursor), state.evicted_since(self.cursor))
            };
            if let Some(last) = batch.last() {
                if missed > 0 {
                    tracing::warn!(missed, cursor = self.cursor.position(), "Subscription fell behind the event log");
                    self.missed += missed;
                }
                let next = EventCursor::after(last.seq);
                let previous = std::mem::replace(&mut self.cursor, next);
                self.shared.state.send_if_modified(|s| {
                    s.move_pin(previous, next);
                    false
                });
                return Some(batch);
            }

            tokio::select! {
                biased;
                _ = self.token.cancelled() => return None,
                changed = self.rx.changed() => {
                    if changed.is_err() {
                        return None;
                    }
                }
            }
        }
    }

    pub fn unsubscribe(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.token.cancel();
        let cursor = self.cursor;
        self.shared.state.send_if_modified(|s| {
            s.unpin(cursor);
            false
        });
        self.shared.subscribers.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

async fn run_worker(
    backend: Box<dyn AgentBackend>,
    mut rx: mpsc::Receiver<Command>,
    shared: Arc<Shared>,
    agent_id: String,
) {
    tracing::debug!(agent_id = %agent_id, backend = backend.name(), "Agent worker started");

    loop {
        let command = tokio::select! {
            biased;
            _ = shared.lifetime.cancelled() => break,
            command = rx.recv() => match command {
                Some(command) => command,
                None => break,
            },
        };

        match command {
            Command::Input { request_id, text } => {
                tokio::select! {
                    biased;
                    _ = shared.lifetime.cancelled() => break,
                    _ = run_turn(backend.as_ref(), &shared.state, &request_id, &text) => {}
                }
            }
        }
    }

    tracing::debug!(agent_id = %agent_id, "Agent worker stopped");
}

async fn run_turn(
    backend: &dyn AgentBackend,
    state: &watch::Sender<AgentState>,
    request_id: &RequestId,
    text: &str,
) {
    state.send_modify(|s| {
        s.push(AgentEvent::InputReceived {
            request_id: request_id.clone(),
            message: text.to_string(),
        });
    });

    let status = match backend.run(text).await {
        Ok(mut outputs) => {
            let mut status = HandledStatus::Success;
            while let Some(output) = outputs.next().await {
                match output {
                    Ok(output) => state.send_modify(|s| {
                        s.push(output.into_event());
                    }),
                    Err(e) => {
                        tracing::warn!(request_id = %request_id, error = %e, "Backend failed mid-turn");
                        push_error(state, &e);
                        status = HandledStatus::Error;
                        break;
                    }
                }
            }
            status
        }
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "Backend failed to start turn");
            push_error(state, &e);
            HandledStatus::Error
        }
    };

    state.send_modify(|s| {
        s.push(AgentEvent::InputHandled {
            request_id: request_id.clone(),
            status,
        });
        s.finish_input();
    });
}

fn push_error(state: &watch::Sender<AgentState>, error: &anyhow::Error) {
    let message = format!("{:#}", error);
    state.send_modify(|s| {
        s.push(AgentEvent::OutputSystem {
            level: SystemLevel::Error,
            message,
        });
    });
}
