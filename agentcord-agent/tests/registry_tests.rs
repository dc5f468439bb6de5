// ABOUTME: Tests for the AgentRegistry and BackendFactory pattern.
// ABOUTME: Validates runtime backend selection and creation.

use agentcord_agent::backends::echo::EchoBackend;
use agentcord_agent::registry::{AgentRegistry, BackendFactory};
use serde_json::json;

#[test]
fn test_registry_creates_echo_backend() {
    let registry = AgentRegistry::default();
    let backend = registry.create("echo", &json!({})).unwrap();
    assert_eq!(backend.name(), "echo");
}

#[test]
fn test_registry_creates_command_backend() {
    let registry = AgentRegistry::default();
    let backend = registry
        .create("command", &json!({"command": "my-agent", "args": ["--stdio"]}))
        .unwrap();
    assert_eq!(backend.name(), "command");
}

#[test]
fn test_command_backend_config_validation() {
    let registry = AgentRegistry::default();
    assert!(registry.create("command", &json!({})).is_err());
    assert!(registry.create("command", &json!({"command": ""})).is_err());
}

#[test]
fn test_registry_lists_available_backends() {
    let registry = AgentRegistry::default();
    assert_eq!(registry.available(), vec!["command", "echo", "mock"]);
}

#[test]
fn test_registry_unknown_backend_errors() {
    let registry = AgentRegistry::default();
    match registry.create("nonexistent", &json!({})) {
        Err(err) => assert!(err.to_string().contains("Unknown backend: nonexistent")),
        Ok(_) => panic!("Expected error for unknown backend"),
    }
}

#[test]
fn test_registry_custom_factory() {
    let factory: BackendFactory = Box::new(|_settings| Ok(Box::new(EchoBackend)));
    let registry = AgentRegistry::new().register("custom", factory);
    let backend = registry.create("custom", &json!({})).unwrap();
    assert_eq!(backend.name(), "echo");
}

#[test]
fn test_registry_is_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<AgentRegistry>();
}
