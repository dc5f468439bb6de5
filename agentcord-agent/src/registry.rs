// ABOUTME: Registry pattern for runtime backend selection.
// ABOUTME: Backends register factories; agent types pick one by name from config.

use crate::traits::AgentBackend;
use anyhow::{anyhow, Result};
use serde_json::Value;
use std::collections::HashMap;

/// Factory function that builds a backend from its JSON settings
pub type BackendFactory = Box<dyn Fn(&Value) -> Result<Box<dyn AgentBackend>> + Send + Sync>;

/// Registry for runtime backend selection
pub struct AgentRegistry {
    factories: HashMap<String, BackendFactory>,
}

impl AgentRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a backend factory by name
    pub fn register<F>(mut self, name: &str, factory: F) -> Self
    where
        F: Fn(&Value) -> Result<Box<dyn AgentBackend>> + Send + Sync + 'static,
    {
        self.factories.insert(name.to_string(), Box::new(factory));
        self
    }

    /// Create a backend by name with the given settings
    pub fn create(&self, name: &str, settings: &Value) -> Result<Box<dyn AgentBackend>> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| anyhow!("Unknown backend: {}", name))?;
        factory(settings)
    }

    /// List available backend names
    pub fn available(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

impl Default for AgentRegistry {
    fn default() -> Self {
        use crate::backends::command::CommandBackend;
        use crate::backends::echo::EchoBackend;
        use crate::backends::mock::MockBackend;

        Self::new()
            .register("echo", EchoBackend::factory())
            .register("command", CommandBackend::factory())
            .register("mock", MockBackend::factory())
    }
}
