// ABOUTME: Session registry mapping each chat user to one long-lived agent session.
// ABOUTME: Creation is lazy and single-flight per user; teardown destroys every session once.

use crate::metrics;
use agentcord_agent::{AgentHandle, AgentManager};
use anyhow::{bail, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};

/// One agent session per user id.
///
/// Entries are never evicted; they live until `teardown_all`.
pub struct SessionRegistry {
    manager: Arc<dyn AgentManager>,
    agent_type: String,
    sessions: Mutex<HashMap<String, Arc<Slot>>>,
    closed: AtomicBool,
}

/// A user's session, filled once the spawn finishes
#[derive(Default)]
struct Slot {
    agent: OnceCell<AgentHandle>,
    /// Set by whoever destroys the agent
    reaped: AtomicBool,
}

impl Slot {
    fn claim(&self) -> bool {
        !self.reaped.swap(true, Ordering::SeqCst)
    }
}

impl SessionRegistry {
    /// Registry spawning sessions of `agent_type` through `manager`
    pub fn new(manager: Arc<dyn AgentManager>, agent_type: impl Into<String>) -> Self {
        Self {
            manager,
            agent_type: agent_type.into(),
            sessions: Mutex::new(HashMap::new()),
            closed: AtomicBool::new(false),
        }
    }

    pub fn agent_type(&self) -> &str {
        &self.agent_type
    }

    /// Return the user's session, spawning it on first use.
    ///
    /// Concurrent callers for the same user share one spawn. A failed spawn
    /// leaves no entry behind so the next call retries.
    pub async fn get_or_create(&self, user_id: &str) -> Result<AgentHandle> {
        if self.closed.load(Ordering::SeqCst) {
            bail!("Session registry is shut down");
        }

        let slot = {
            let mut sessions = self.sessions.lock().await;
            // teardown sets the flag before draining, so this sees any drain that already ran
            if self.closed.load(Ordering::SeqCst) {
                bail!("Session registry is shut down");
            }
            Arc::clone(
                sessions
                    .entry(user_id.to_string())
                    .or_default(),
            )
        };

        let result = slot
            .agent
            .get_or_try_init(|| async {
                tracing::info!(user_id = %user_id, agent_type = %self.agent_type, "Creating agent session");
                let agent = self.manager.spawn(&self.agent_type).await?;
                metrics::record_session_spawned(&self.agent_type);
                Ok::<_, anyhow::Error>(agent)
            })
            .await
            .cloned();

        match result {
            Ok(agent) => {
                // teardown may have run while the spawn was in flight
                if self.closed.load(Ordering::SeqCst) {
                    self.remove_slot(user_id, &slot).await;
                    // teardown may already have drained and destroyed it
                    if slot.claim() {
                        self.destroy(user_id, &agent).await;
                    }
                    bail!("Session registry is shut down");
                }
                metrics::set_active_sessions(self.len().await);
                Ok(agent)
            }
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "Failed to create agent session");
                let mut sessions = self.sessions.lock().await;
                if let Some(existing) = sessions.get(user_id) {
                    if Arc::ptr_eq(existing, &slot) && existing.agent.get().is_none() {
                        sessions.remove(user_id);
                    }
                }
                Err(e)
            }
        }
    }

    /// Drop `user_id`'s entry if it is still `slot`
    async fn remove_slot(&self, user_id: &str, slot: &Arc<Slot>) {
        let mut sessions = self.sessions.lock().await;
        if sessions
            .get(user_id)
            .is_some_and(|existing| Arc::ptr_eq(existing, slot))
        {
            sessions.remove(user_id);
        }
    }

    /// The user's session if one has been created
    pub async fn get(&self, user_id: &str) -> Option<AgentHandle> {
        let sessions = self.sessions.lock().await;
        sessions.get(user_id).and_then(|slot| slot.agent.get().cloned())
    }

    /// Number of live sessions
    pub async fn len(&self) -> usize {
        let sessions = self.sessions.lock().await;
        sessions
            .values()
            .filter(|slot| slot.agent.initialized())
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// User ids with a live session, sorted
    pub async fn user_ids(&self) -> Vec<String> {
        let sessions = self.sessions.lock().await;
        let mut ids: Vec<String> = sessions
            .iter()
            .filter(|(_, slot)| slot.agent.initialized())
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Destroy every session exactly once and empty the registry.
    ///
    /// Later calls find nothing to destroy. Further `get_or_create` calls fail.
    pub async fn teardown_all(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        let drained: Vec<(String, Arc<Slot>)> = self.sessions.lock().await.drain().collect();

        // slots still spawning are destroyed by their spawner once it sees `closed`
        let mut failures = 0usize;
        for (user_id, slot) in &drained {
            if let Some(agent) = slot.agent.get() {
                if slot.claim() && !self.destroy(user_id, agent).await {
                    failures += 1;
                }
            }
        }

        metrics::set_active_sessions(0);
        if failures > 0 {
            bail!("Failed to destroy {} agent session(s)", failures);
        }
        if !drained.is_empty() {
            tracing::info!(count = drained.len(), "Destroyed all agent sessions");
        }
        Ok(())
    }

    async fn destroy(&self, user_id: &str, agent: &AgentHandle) -> bool {
        match self.manager.destroy(agent).await {
            Ok(()) => {
                metrics::record_session_destroyed();
                tracing::debug!(user_id = %user_id, agent_id = %agent.id(), "Destroyed agent session");
                true
            }
            Err(e) => {
                tracing::warn!(user_id = %user_id, agent_id = %agent.id(), error = %e, "Failed to destroy agent session");
                metrics::record_error("session_destroy");
                false
            }
        }
    }
}
