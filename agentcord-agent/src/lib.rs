// ABOUTME: Agent session model for agentcord: ordered event logs, cursors and subscriptions.
// ABOUTME: Provides the AgentHandle worker, pluggable backends and the lifecycle manager.

pub mod config;
pub mod event;
pub mod handle;
pub mod manager;
pub mod registry;
pub mod state;
pub mod traits;

pub mod backends;

pub use config::{AgentConfig, AgentTypeConfig};
pub use event::{AgentEvent, AgentOutput, HandledStatus, RequestId, SequencedEvent, SystemLevel};
pub use handle::{AgentHandle, Subscription};
pub use manager::{AgentManager, LocalAgentManager};
pub use registry::{AgentRegistry, BackendFactory};
pub use state::{AgentState, EventCursor, StateSnapshot};
pub use traits::AgentBackend;
