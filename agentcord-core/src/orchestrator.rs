// ABOUTME: Bridge service: the per-message pipeline from chat gateway to agent session and back.
// ABOUTME: Filters, authorizes, looks up the user's session and runs one relay cycle per message.

use crate::{
    config::DiscordConfig,
    filter::{
        extract_text, screen_message, Authorizer, Disposition, IgnoreReason, UNAUTHORIZED_REPLY,
    },
    metrics,
    relay::{RelayEngine, RelayOutcome},
    session::SessionRegistry,
    traits::{ChatGateway, IncomingMessage},
};
use agentcord_agent::AgentManager;
use anyhow::Result;
use std::sync::{Arc, Mutex};
use tokio::task::JoinSet;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;

/// Platform-independent settings for the bridge
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Allowed sender ids (empty = allow all)
    pub authorized_user_ids: Vec<String>,
    /// Channel that receives the startup announcement
    pub announce_channel_id: Option<String>,
    /// Agent type spawned for new users
    pub default_agent_type: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self::from(&DiscordConfig::default())
    }
}

impl From<&DiscordConfig> for BridgeConfig {
    fn from(discord: &DiscordConfig) -> Self {
        Self {
            authorized_user_ids: discord.authorized_user_ids.clone(),
            announce_channel_id: discord.channel_id.clone(),
            default_agent_type: discord.default_agent_type.clone(),
        }
    }
}

/// Result of handling a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleResult {
    /// A relay cycle ran against the sender's session
    Relayed(RelayOutcome),
    /// Sender is not on the allow-list; the rejection reply was sent
    Rejected,
    /// Not for us (bot author, not addressed, empty)
    Ignored,
}

/// Connects one chat gateway to per-user agent sessions
pub struct BridgeService {
    gateway: Arc<dyn ChatGateway>,
    sessions: SessionRegistry,
    relay: RelayEngine,
    authorizer: Authorizer,
    config: BridgeConfig,
    tasks: Mutex<JoinSet<()>>,
}

impl BridgeService {
    pub fn new(
        gateway: Arc<dyn ChatGateway>,
        manager: Arc<dyn AgentManager>,
        config: BridgeConfig,
    ) -> Self {
        Self {
            sessions: SessionRegistry::new(manager, config.default_agent_type.clone()),
            relay: RelayEngine::new(Arc::clone(&gateway)),
            authorizer: Authorizer::new(config.authorized_user_ids.iter().cloned()),
            gateway,
            config,
            tasks: Mutex::new(JoinSet::new()),
        }
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Connect the gateway and announce the bot on the configured channel
    pub async fn start(&self) -> Result<()> {
        self.gateway.connect().await?;
        tracing::info!(
            platform = self.gateway.platform_id(),
            bot_user_id = %self.gateway.bot_user_id(),
            "Chat gateway connected"
        );

        if let Some(channel_id) = &self.config.announce_channel_id {
            let announcement = format!("{} bot is online!", self.gateway.display_name());
            if let Err(e) = self.gateway.send(channel_id, &announcement).await {
                tracing::warn!(channel_id = %channel_id, error = %e, "Failed to send startup announcement");
                metrics::record_error("announce");
            }
        }
        Ok(())
    }

    /// Handle an incoming message
    pub async fn handle_message(&self, msg: IncomingMessage) -> Result<HandleResult> {
        metrics::record_message_received(self.gateway.platform_id());

        if let Some(reason) = screen_message(&msg, &self.gateway.bot_user_id()) {
            return Ok(self.ignore(&msg, reason));
        }

        if !self.authorizer.is_authorized(&msg.sender.id) {
            tracing::info!(sender = %msg.sender.id, "Rejected message from unauthorized user");
            metrics::record_message_rejected();
            self.gateway.reply(&msg, UNAUTHORIZED_REPLY).await?;
            return Ok(HandleResult::Rejected);
        }

        let text = match extract_text(&msg) {
            Disposition::Forward(text) => text,
            Disposition::Ignore(reason) => return Ok(self.ignore(&msg, reason)),
        };

        let agent = match self.sessions.get_or_create(&msg.sender.id).await {
            Ok(agent) => agent,
            Err(e) => {
                metrics::record_error("session_spawn");
                let notice = format!("Failed to start agent session: {:#}", e);
                if let Err(reply_err) = self.gateway.reply(&msg, &notice).await {
                    tracing::warn!(error = %reply_err, "Failed to report session error");
                }
                return Err(e);
            }
        };

        tracing::debug!(
            sender = %msg.sender.id,
            channel_id = %msg.channel_id,
            agent_id = %agent.id(),
            "Relaying message to agent"
        );
        let outcome = self.relay.relay(&agent, &msg, &text).await?;
        Ok(HandleResult::Relayed(outcome))
    }

    fn ignore(&self, msg: &IncomingMessage, reason: IgnoreReason) -> HandleResult {
        tracing::trace!(sender = %msg.sender.id, reason = reason.as_str(), "Ignoring message");
        metrics::record_message_ignored(reason.as_str());
        HandleResult::Ignored
    }

    /// Consume the gateway's event stream until `shutdown` fires or the stream ends.
    ///
    /// Every message is handled on its own task; failures are logged, not fatal.
    pub async fn run(self: &Arc<Self>, shutdown: CancellationToken) -> Result<()> {
        let mut events = self.gateway.event_stream().await?;
        tracing::info!(platform = self.gateway.platform_id(), "Listening for messages");

        loop {
            let msg = tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    tracing::info!("Shutdown requested, leaving event loop");
                    break;
                }
                msg = events.next() => match msg {
                    Some(msg) => msg,
                    None => {
                        tracing::info!("Event stream ended");
                        break;
                    }
                },
            };

            let this = Arc::clone(self);
            let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
            // reap finished handlers so the set stays small
            while tasks.try_join_next().is_some() {}
            tasks.spawn(async move {
                let sender = msg.sender.id.clone();
                if let Err(e) = this.handle_message(msg).await {
                    tracing::error!(sender = %sender, error = %format!("{:#}", e), "Failed to handle message");
                    metrics::record_error("handle_message");
                }
            });
        }
        Ok(())
    }

    /// Number of message handlers still running
    pub fn in_flight(&self) -> usize {
        self.tasks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Wait for every in-flight message handler to finish.
    ///
    /// Meant for after `run` returned because the event stream ended.
    pub async fn drain(&self) {
        let mut tasks = std::mem::take(&mut *self.tasks.lock().unwrap_or_else(|e| e.into_inner()));
        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                tracing::warn!(error = %e, "Message handler task failed");
            }
        }
    }

    /// Abort in-flight handlers, destroy every session, then disconnect
    pub async fn stop(&self) -> Result<()> {
        let mut tasks = std::mem::take(&mut *self.tasks.lock().unwrap_or_else(|e| e.into_inner()));
        if !tasks.is_empty() {
            tracing::info!(count = tasks.len(), "Aborting in-flight message handlers");
        }
        tasks.shutdown().await;

        let teardown = self.sessions.teardown_all().await;
        if let Err(e) = &teardown {
            tracing::warn!(error = %e, "Session teardown incomplete");
        }

        self.gateway.shutdown().await?;
        tracing::info!(platform = self.gateway.platform_id(), "Bridge stopped");
        teardown
    }
}
