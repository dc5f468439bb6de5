// ABOUTME: Chat platform implementations for agentcord
// ABOUTME: Re-exports the Discord gateway (feature "discord") and the local console platform

pub mod console;
#[cfg(feature = "discord")]
pub mod discord;

pub use console::ConsolePlatform;
#[cfg(feature = "discord")]
pub use discord::DiscordPlatform;
