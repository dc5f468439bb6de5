// ABOUTME: Tests for the mock backend's scripted expectations.
// ABOUTME: Drives the backend directly and through a spawned session.

use agentcord_agent::backends::mock::{MockBackend, MockStep};
use agentcord_agent::{AgentBackend, AgentEvent, AgentOutput, EventCursor, SystemLevel};
use futures::StreamExt;
use std::time::Duration;

async fn outputs(backend: &MockBackend, input: &str) -> Vec<Result<AgentOutput, String>> {
    let stream = backend.run(input).await.unwrap();
    stream
        .map(|item| item.map_err(|e| e.to_string()))
        .collect()
        .await
}

#[tokio::test]
async fn test_mock_backend_returns_configured_chat() {
    let mock = MockBackend::new().on_prompt("hello").respond_chat("Hi there!");
    assert_eq!(
        outputs(&mock, "hello").await,
        vec![Ok(AgentOutput::chat("Hi there!"))]
    );
}

#[tokio::test]
async fn test_mock_backend_matches_by_substring() {
    let mock = MockBackend::new()
        .on_prompt("weather")
        .respond_chat("Sunny");
    assert_eq!(
        outputs(&mock, "what is the weather today?").await,
        vec![Ok(AgentOutput::chat("Sunny"))]
    );
}

#[tokio::test]
async fn test_mock_backend_expectations_are_consumed_in_order() {
    let mock = MockBackend::new()
        .on_prompt("ping")
        .respond_chat("pong 1")
        .on_prompt("ping")
        .respond_chat("pong 2");

    assert_eq!(outputs(&mock, "ping").await, vec![Ok(AgentOutput::chat("pong 1"))]);
    assert_eq!(outputs(&mock, "ping").await, vec![Ok(AgentOutput::chat("pong 2"))]);
}

#[tokio::test]
async fn test_mock_backend_falls_back_past_unmatched_front() {
    let mock = MockBackend::new()
        .on_prompt("first")
        .respond_chat("one")
        .on_prompt("second")
        .respond_chat("two");

    assert_eq!(outputs(&mock, "second").await, vec![Ok(AgentOutput::chat("two"))]);
    assert_eq!(outputs(&mock, "first").await, vec![Ok(AgentOutput::chat("one"))]);
}

#[tokio::test]
async fn test_mock_backend_without_expectation_echoes_notice() {
    let mock = MockBackend::new();
    assert_eq!(
        outputs(&mock, "anything").await,
        vec![Ok(AgentOutput::chat("Mock: no expectation for 'anything'"))]
    );
}

#[tokio::test]
async fn test_mock_backend_scripted_steps() {
    let mock = MockBackend::new().on_prompt("work").respond_with(vec![
        MockStep::Output(AgentOutput::system(SystemLevel::Info, "thinking")),
        MockStep::Delay(Duration::from_millis(5)),
        MockStep::Output(AgentOutput::chat("part one")),
        MockStep::Output(AgentOutput::chat("part two")),
    ]);

    assert_eq!(
        outputs(&mock, "work").await,
        vec![
            Ok(AgentOutput::system(SystemLevel::Info, "thinking")),
            Ok(AgentOutput::chat("part one")),
            Ok(AgentOutput::chat("part two")),
        ]
    );
}

#[tokio::test]
async fn test_mock_backend_error_and_nothing() {
    let mock = MockBackend::new()
        .on_prompt("bad")
        .respond_error("boom")
        .on_prompt("quiet")
        .respond_nothing();

    assert_eq!(outputs(&mock, "bad").await, vec![Err("boom".to_string())]);
    assert!(outputs(&mock, "quiet").await.is_empty());
}

#[tokio::test]
async fn test_mock_backend_records_prompts() {
    let mock = MockBackend::new();
    let log = mock.prompt_log();

    outputs(&mock, "a").await;
    outputs(&mock, "b").await;

    assert_eq!(*log.lock().unwrap(), vec!["a", "b"]);
}

#[tokio::test]
async fn test_mock_session_publishes_system_notice() {
    let handle = MockBackend::new()
        .on_prompt("status")
        .respond_system(SystemLevel::Warning, "disk almost full")
        .into_handle();

    handle.submit_input("status").await.unwrap();
    handle.wait_for_idle().await.unwrap();

    let events: Vec<AgentEvent> = handle
        .events_since(EventCursor::START)
        .into_iter()
        .map(|e| e.event)
        .collect();
    assert!(events.contains(&AgentEvent::OutputSystem {
        level: SystemLevel::Warning,
        message: "disk almost full".to_string(),
    }));
    assert_eq!(handle.backend_name(), "mock");
}
