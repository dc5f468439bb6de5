// ABOUTME: Root library for the agentcord binary
// ABOUTME: Exposes the CLI, logging setup, chat platforms and service wiring

pub mod cli;
pub mod logging;
pub mod platform;
pub mod server;

// Re-export platform-agnostic modules from agentcord-core
pub use agentcord_core::config;
pub use agentcord_core::metrics;
pub use agentcord_core::orchestrator;
pub use agentcord_core::traits;
