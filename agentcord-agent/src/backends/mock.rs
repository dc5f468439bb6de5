// ABOUTME: Mock backend for testing - returns pre-configured responses.
// ABOUTME: Allows deterministic tests without spawning real agent processes.
//!
//! # Example
//!
//! ```no_run
//! use agentcord_agent::backends::mock::MockBackend;
//! use agentcord_agent::{AgentEvent, EventCursor};
//!
//! # async fn example() {
//! let handle = MockBackend::new()
//!     .on_prompt("hello")
//!     .respond_chat("Hi there!")
//!     .into_handle();
//!
//! let mut subscription = handle.subscribe(EventCursor::START);
//! handle.submit_input("hello").await.unwrap();
//!
//! let batch = subscription.next_batch().await.unwrap();
//! assert!(batch.iter().any(|e| matches!(&e.event, AgentEvent::OutputChat { content } if content == "Hi there!")));
//! # }
//! ```

use crate::config::AgentConfig;
use crate::event::{AgentOutput, SystemLevel};
use crate::handle::AgentHandle;
use crate::traits::AgentBackend;
use anyhow::{anyhow, Result};
use futures::future::BoxFuture;
use futures::stream::{self, BoxStream, StreamExt};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One scripted step of a mock response
#[derive(Debug, Clone)]
pub enum MockStep {
    /// Emit an output
    Output(AgentOutput),
    /// Sleep before the next step
    Delay(Duration),
    /// End the turn with an error
    Fail(String),
    /// Never finish the turn
    Hang,
}

/// Mock backend for testing
pub struct MockBackend {
    expectations: Arc<Mutex<VecDeque<Expectation>>>,
    prompts: Arc<Mutex<Vec<String>>>,
}

struct Expectation {
    pattern: String,
    steps: Vec<MockStep>,
}

impl MockBackend {
    /// Create a new mock backend with no expectations
    pub fn new() -> Self {
        Self {
            expectations: Arc::new(Mutex::new(VecDeque::new())),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Set up an expectation for a prompt matching the given pattern
    pub fn on_prompt(self, pattern: &str) -> ExpectationBuilder {
        ExpectationBuilder {
            backend: self,
            pattern: pattern.to_string(),
        }
    }

    /// Shared log of every input this backend has received
    pub fn prompt_log(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.prompts)
    }

    /// Spawn a session around this backend with default settings
    pub fn into_handle(self) -> AgentHandle {
        self.into_handle_with(AgentConfig::default())
    }

    pub fn into_handle_with(self, config: AgentConfig) -> AgentHandle {
        AgentHandle::spawn(Box::new(self), "mock", config)
    }

    /// Factory function for the registry
    pub fn factory() -> crate::registry::BackendFactory {
        Box::new(|_settings| Ok(Box::new(MockBackend::new())))
    }

    // Match expectations with FIFO preference: check the front first,
    // fall back to searching the queue if front doesn't match.
    fn take_steps(&self, text: &str) -> Option<Vec<MockStep>> {
        let mut exp = self.expectations.lock().unwrap_or_else(|e| e.into_inner());
        match exp.front() {
            Some(front) if text.contains(&front.pattern) => exp.pop_front().map(|e| e.steps),
            Some(_) => exp
                .iter()
                .position(|e| text.contains(&e.pattern))
                .and_then(|i| exp.remove(i))
                .map(|e| e.steps),
            None => None,
        }
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentBackend for MockBackend {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn run<'a>(
        &'a self,
        input: &'a str,
    ) -> BoxFuture<'a, Result<BoxStream<'a, Result<AgentOutput>>>> {
        Box::pin(async move {
            self.prompts
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(input.to_string());

            let steps = self.take_steps(input).unwrap_or_else(|| {
                vec![MockStep::Output(AgentOutput::chat(format!(
                    "Mock: no expectation for '{}'",
                    input
                )))]
            });

            let outputs = stream::iter(steps)
                .then(|step| async move {
                    match step {
                        MockStep::Output(output) => Some(Ok(output)),
                        MockStep::Delay(duration) => {
                            tokio::time::sleep(duration).await;
                            None
                        }
                        MockStep::Fail(message) => Some(Err(anyhow!(message))),
                        MockStep::Hang => {
                            std::future::pending::<()>().await;
                            None
                        }
                    }
                })
                .filter_map(|item| async move { item })
                .boxed();

            Ok(outputs)
        })
    }
}

/// Builder for setting up mock expectations with a fluent API
pub struct ExpectationBuilder {
    backend: MockBackend,
    pattern: String,
}

impl ExpectationBuilder {
    /// Respond with a scripted list of steps
    pub fn respond_with(self, steps: Vec<MockStep>) -> MockBackend {
        self.backend
            .expectations
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(Expectation {
                pattern: self.pattern,
                steps,
            });
        self.backend
    }

    /// Respond with a single chat output
    pub fn respond_chat(self, text: &str) -> MockBackend {
        self.respond_with(vec![MockStep::Output(AgentOutput::chat(text))])
    }

    /// Respond with a system notice
    pub fn respond_system(self, level: SystemLevel, message: &str) -> MockBackend {
        self.respond_with(vec![MockStep::Output(AgentOutput::system(level, message))])
    }

    /// Produce no output at all
    pub fn respond_nothing(self) -> MockBackend {
        self.respond_with(Vec::new())
    }

    /// Respond with an error
    pub fn respond_error(self, message: &str) -> MockBackend {
        self.respond_with(vec![MockStep::Fail(message.to_string())])
    }

    /// Never finish handling this input
    pub fn hang(self) -> MockBackend {
        self.respond_with(vec![MockStep::Hang])
    }
}
