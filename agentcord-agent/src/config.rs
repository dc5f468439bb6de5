// ABOUTME: Per-agent-type configuration: backend selection, run deadline and log capacity.
// ABOUTME: Backend-specific keys are flattened and handed to the registry factory as JSON.

use crate::state::DEFAULT_EVENT_LOG_CAPACITY;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Runtime settings attached to every spawned session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgentConfig {
    /// Maximum seconds a single relay cycle may wait for the agent (0 = no limit)
    pub max_run_time_secs: u64,
    /// How many events the session log retains
    pub event_log_capacity: usize,
}

impl AgentConfig {
    /// The run deadline, or `None` when disabled
    pub fn max_run_time(&self) -> Option<Duration> {
        (self.max_run_time_secs > 0).then(|| Duration::from_secs(self.max_run_time_secs))
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_run_time_secs: default_max_run_time_secs(),
            event_log_capacity: DEFAULT_EVENT_LOG_CAPACITY,
        }
    }
}

/// One `[agents.<type>]` table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentTypeConfig {
    /// Backend type: "command", "echo", "mock"
    #[serde(default = "default_backend")]
    pub backend: String,

    #[serde(default = "default_max_run_time_secs")]
    pub max_run_time_secs: u64,

    #[serde(default = "default_event_log_capacity")]
    pub event_log_capacity: usize,

    /// Remaining fields passed to the backend factory
    #[serde(flatten)]
    pub settings: serde_json::Map<String, serde_json::Value>,
}

fn default_backend() -> String {
    "echo".to_string()
}

fn default_max_run_time_secs() -> u64 {
    300 // 5 minutes
}

fn default_event_log_capacity() -> usize {
    DEFAULT_EVENT_LOG_CAPACITY
}

impl Default for AgentTypeConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            max_run_time_secs: default_max_run_time_secs(),
            event_log_capacity: default_event_log_capacity(),
            settings: serde_json::Map::new(),
        }
    }
}

impl AgentTypeConfig {
    pub fn backend_type(&self) -> &str {
        &self.backend
    }

    pub fn agent_config(&self) -> AgentConfig {
        AgentConfig {
            max_run_time_secs: self.max_run_time_secs,
            event_log_capacity: self.event_log_capacity,
        }
    }

    /// Backend settings as a JSON object for the registry
    pub fn to_json_value(&self) -> serde_json::Value {
        serde_json::Value::Object(self.settings.clone())
    }
}
