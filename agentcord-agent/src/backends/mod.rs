// ABOUTME: Backend implementations (command, echo, mock).
// ABOUTME: Each backend implements the AgentBackend trait.

pub mod command;
pub mod echo;
pub mod mock;
