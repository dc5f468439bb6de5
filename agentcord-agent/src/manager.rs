// ABOUTME: Agent lifecycle service: spawn sessions by agent type and destroy them.
// ABOUTME: LocalAgentManager builds backends through the AgentRegistry from per-type config.

use crate::config::AgentTypeConfig;
use crate::handle::AgentHandle;
use crate::registry::AgentRegistry;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// Lifecycle collaborator used by the session registry
#[async_trait]
pub trait AgentManager: Send + Sync {
    /// Start a new session of the given agent type
    async fn spawn(&self, agent_type: &str) -> Result<AgentHandle>;

    /// Shut a session down and forget it
    async fn destroy(&self, agent: &AgentHandle) -> Result<()>;
}

/// In-process agent manager
pub struct LocalAgentManager {
    registry: AgentRegistry,
    agent_types: HashMap<String, AgentTypeConfig>,
    live: Mutex<HashMap<String, AgentHandle>>,
}

impl LocalAgentManager {
    pub fn new(registry: AgentRegistry, agent_types: HashMap<String, AgentTypeConfig>) -> Self {
        Self {
            registry,
            agent_types,
            live: Mutex::new(HashMap::new()),
        }
    }

    /// Number of sessions spawned and not yet destroyed
    pub fn live_count(&self) -> usize {
        self.live.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn type_config(&self, agent_type: &str) -> AgentTypeConfig {
        match self.agent_types.get(agent_type) {
            Some(config) => config.clone(),
            None => {
                tracing::warn!(
                    agent_type = %agent_type,
                    "No [agents.{}] section configured, falling back to echo backend",
                    agent_type
                );
                AgentTypeConfig::default()
            }
        }
    }
}

#[async_trait]
impl AgentManager for LocalAgentManager {
    async fn spawn(&self, agent_type: &str) -> Result<AgentHandle> {
        let type_config = self.type_config(agent_type);
        let backend = self
            .registry
            .create(type_config.backend_type(), &type_config.to_json_value())
            .with_context(|| format!("Failed to create backend for agent type '{}'", agent_type))?;

        let handle = AgentHandle::spawn(backend, agent_type, type_config.agent_config());
        tracing::info!(
            agent_id = %handle.id(),
            agent_type = %agent_type,
            backend = handle.backend_name(),
            "Spawned agent"
        );

        self.live
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(handle.id().to_string(), handle.clone());
        Ok(handle)
    }

    async fn destroy(&self, agent: &AgentHandle) -> Result<()> {
        let removed = self
            .live
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(agent.id());
        if removed.is_none() {
            tracing::debug!(agent_id = %agent.id(), "Destroying agent not tracked by this manager");
        }

        agent.shutdown().await;
        tracing::info!(agent_id = %agent.id(), agent_type = %agent.agent_type(), "Destroyed agent");
        Ok(())
    }
}
