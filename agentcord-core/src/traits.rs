// ABOUTME: Chat gateway abstraction: the inbound message model and the ChatGateway trait.
// ABOUTME: Platforms (Discord, console) implement ChatGateway; the bridge only sees these types.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::pin::Pin;
use tokio_stream::Stream;

/// Discord's per-message character limit, also the default for other platforms
pub const DEFAULT_MAX_MESSAGE_LEN: usize = 2000;

// =============================================================================
// User Identity
// =============================================================================

/// Identity of a chat user
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChatUser {
    /// Platform user id (Discord snowflake as a string)
    pub id: String,
    pub display_name: Option<String>,
    /// Bots, including this one, never reach an agent
    pub is_bot: bool,
}

impl ChatUser {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: None,
            is_bot: false,
        }
    }

    pub fn with_name(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: Some(name.into()),
            is_bot: false,
        }
    }

    pub fn bot(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: None,
            is_bot: true,
        }
    }
}

// =============================================================================
// Incoming Message
// =============================================================================

/// Incoming message from a chat platform
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    /// Which platform this message came from (e.g., "discord", "console")
    pub platform_id: String,
    /// The channel this message was sent in; replies go back here
    pub channel_id: String,
    /// Platform message id, used to thread the reply to the original
    pub message_id: String,
    pub sender: ChatUser,
    /// Raw message text, mentions included
    pub body: String,
    /// Whether this is a direct message (1:1 conversation)
    pub is_direct: bool,
    /// Whether the bot user is mentioned in the message
    pub mentions_bot: bool,
    pub received_at: DateTime<Utc>,
}

impl IncomingMessage {
    /// A direct message from `user_id`, as produced by local platforms and tests
    pub fn direct(
        platform_id: impl Into<String>,
        channel_id: impl Into<String>,
        user_id: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            platform_id: platform_id.into(),
            channel_id: channel_id.into(),
            message_id: uuid::Uuid::new_v4().to_string(),
            sender: ChatUser::new(user_id),
            body: body.into(),
            is_direct: true,
            mentions_bot: false,
            received_at: Utc::now(),
        }
    }
}

// =============================================================================
// Chat Gateway
// =============================================================================

/// Boxed stream type for platform events
pub type EventStream = Pin<Box<dyn Stream<Item = IncomingMessage> + Send>>;

/// A connected chat platform.
///
/// The bridge receives messages through `event_stream` and answers through
/// `reply` (threaded to the original message) or `send` (plain channel post).
#[async_trait]
pub trait ChatGateway: Send + Sync {
    /// Establish the platform connection. Called once before `event_stream`.
    async fn connect(&self) -> Result<()> {
        Ok(())
    }

    /// Receive incoming messages as a stream
    async fn event_stream(&self) -> Result<EventStream>;

    /// Reply to a message in its originating conversation
    async fn reply(&self, to: &IncomingMessage, text: &str) -> Result<()>;

    /// Send a message to a channel by ID
    async fn send(&self, channel_id: &str, text: &str) -> Result<()>;

    /// Bot's user ID on this platform (empty until connected)
    fn bot_user_id(&self) -> String;

    /// Platform identifier (e.g., "discord", "console")
    fn platform_id(&self) -> &'static str;

    /// Human-readable platform name used in announcements
    fn display_name(&self) -> &'static str;

    /// Longest message the platform accepts, in characters
    fn max_message_len(&self) -> usize {
        DEFAULT_MAX_MESSAGE_LEN
    }

    /// Check if a user ID is the bot itself
    fn is_self(&self, user_id: &str) -> bool {
        user_id == self.bot_user_id()
    }

    /// Gracefully shut down the platform connection
    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }
}
