// ABOUTME: Platform-agnostic bridge between chat gateways and agent sessions
// ABOUTME: Provides the gateway trait, session registry, relay engine and message pipeline

pub mod config;
pub mod filter;
pub mod metrics;
pub mod orchestrator;
pub mod paths;
pub mod relay;
pub mod session;
pub mod traits;
pub mod utils;

pub use config::{Config, DiscordConfig, LogFormat, LoggingConfig, MetricsConfig};
pub use orchestrator::{BridgeConfig, BridgeService, HandleResult};
pub use relay::{RelayEngine, RelayOutcome};
pub use session::SessionRegistry;
pub use traits::{ChatGateway, ChatUser, EventStream, IncomingMessage, DEFAULT_MAX_MESSAGE_LEN};

// Re-export agentcord-agent types
pub use agentcord_agent::{AgentEvent, AgentHandle, AgentManager, AgentRegistry, LocalAgentManager};
