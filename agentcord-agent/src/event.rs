// ABOUTME: Event types recorded in an agent session's ordered event log.
// ABOUTME: Events are tagged by kind (output.chat, input.handled, ...) and correlated by RequestId.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque correlation token returned when input is submitted to a session.
///
/// The matching `input.handled` event carries the same id, which is how a
/// relay cycle knows its own submission has finished.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    /// Generate a fresh random request id
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RequestId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Severity attached to `output.system` events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SystemLevel {
    Info,
    Warning,
    Error,
}

impl SystemLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for SystemLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a submitted input finished
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandledStatus {
    Success,
    Error,
}

/// Events appended to a session's event log
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum AgentEvent {
    /// The worker picked up a submitted input
    #[serde(rename = "input.received")]
    InputReceived {
        request_id: RequestId,
        message: String,
    },

    /// Conversational output meant for the user
    #[serde(rename = "output.chat")]
    OutputChat { content: String },

    /// Out-of-band notice (warnings, errors, progress)
    #[serde(rename = "output.system")]
    OutputSystem { level: SystemLevel, message: String },

    /// The input identified by `request_id` has been fully processed
    #[serde(rename = "input.handled")]
    InputHandled {
        request_id: RequestId,
        status: HandledStatus,
    },

    /// The session drained its input queue
    #[serde(rename = "idle")]
    Idle,
}

impl AgentEvent {
    /// Wire name of this event kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InputReceived { .. } => "input.received",
            Self::OutputChat { .. } => "output.chat",
            Self::OutputSystem { .. } => "output.system",
            Self::InputHandled { .. } => "input.handled",
            Self::Idle => "idle",
        }
    }

    /// The request this event completes, if it is an `input.handled` event
    pub fn handled_request(&self) -> Option<&RequestId> {
        match self {
            Self::InputHandled { request_id, .. } => Some(request_id),
            _ => None,
        }
    }
}

/// An event together with its position in the session log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequencedEvent {
    pub seq: u64,
    #[serde(flatten)]
    pub event: AgentEvent,
}

/// Output produced by a backend while it handles one input.
///
/// The session worker wraps these into `output.*` events.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentOutput {
    Chat(String),
    System { level: SystemLevel, message: String },
}

impl AgentOutput {
    pub fn chat(content: impl Into<String>) -> Self {
        Self::Chat(content.into())
    }

    pub fn system(level: SystemLevel, message: impl Into<String>) -> Self {
        Self::System {
            level,
            message: message.into(),
        }
    }

    pub fn into_event(self) -> AgentEvent {
        match self {
            Self::Chat(content) => AgentEvent::OutputChat { content },
            Self::System { level, message } => AgentEvent::OutputSystem { level, message },
        }
    }
}
