// ABOUTME: Discord platform implementation backed by serenity's gateway client
// ABOUTME: Forwards guild and DM messages into the bridge and posts replies as threaded messages

use agentcord_core::config::DiscordConfig;
use agentcord_core::traits::{ChatGateway, ChatUser, EventStream, IncomingMessage};
use anyhow::{bail, Context as _, Result};
use chrono::Timelike;
use async_trait::async_trait;
use serenity::all::{
    ChannelId, Client, Context, CreateMessage, EventHandler, GatewayIntents, MessageId,
    ShardManager,
};
use serenity::http::Http;
use serenity::model::channel::Message;
use serenity::model::gateway::Ready;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, OnceCell};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;

/// How long `connect` waits for the gateway's READY event
const READY_TIMEOUT: Duration = Duration::from_secs(30);

/// Buffered incoming messages between serenity and the bridge
const EVENT_BUFFER: usize = 256;

// =============================================================================
// DiscordPlatform
// =============================================================================

/// Live client pieces, present between `connect` and `shutdown`
struct Connection {
    http: Arc<Http>,
    shard_manager: Arc<ShardManager>,
    client_task: JoinHandle<()>,
}

/// Discord platform using serenity's gateway client
pub struct DiscordPlatform {
    token: String,
    /// Bot's user ID, set from the READY event
    bot_user_id: Arc<OnceCell<u64>>,
    events_tx: mpsc::Sender<IncomingMessage>,
    events_rx: Mutex<Option<mpsc::Receiver<IncomingMessage>>>,
    connection: Mutex<Option<Connection>>,
}

impl DiscordPlatform {
    pub fn new(config: &DiscordConfig) -> Result<Self> {
        if config.bot_token.trim().is_empty() {
            bail!("discord.bot_token is required (set in config.toml or DISCORD_BOT_TOKEN env var)");
        }
        let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);
        Ok(Self {
            token: config.bot_token.clone(),
            bot_user_id: Arc::new(OnceCell::new()),
            events_tx,
            events_rx: Mutex::new(Some(events_rx)),
            connection: Mutex::new(None),
        })
    }

    fn http(&self) -> Result<Arc<Http>> {
        self.connection
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(|conn| Arc::clone(&conn.http))
            .context("Discord client is not connected")
    }

    async fn post(&self, channel_id: &str, text: &str, reply_to: Option<&str>) -> Result<()> {
        let http = self.http()?;
        let channel = ChannelId::new(parse_snowflake("channel", channel_id)?);

        let mut builder = CreateMessage::new().content(text);
        if let Some(message_id) = reply_to {
            let message = MessageId::new(parse_snowflake("message", message_id)?);
            builder = builder.reference_message((channel, message));
        }

        channel
            .send_message(&http, builder)
            .await
            .with_context(|| format!("Failed to send Discord message to channel {}", channel_id))?;
        Ok(())
    }
}

#[async_trait]
impl ChatGateway for DiscordPlatform {
    async fn connect(&self) -> Result<()> {
        let intents = GatewayIntents::GUILD_MESSAGES
            | GatewayIntents::DIRECT_MESSAGES
            | GatewayIntents::MESSAGE_CONTENT;

        let (ready_tx, ready_rx) = oneshot::channel();
        let handler = Handler {
            events_tx: self.events_tx.clone(),
            bot_user_id: Arc::clone(&self.bot_user_id),
            ready_tx: Mutex::new(Some(ready_tx)),
        };

        let mut client = Client::builder(&self.token, intents)
            .event_handler(handler)
            .await
            .context("Failed to create Discord client")?;

        let http = client.http.clone();
        let shard_manager = client.shard_manager.clone();
        let mut client_task = tokio::spawn(async move {
            if let Err(e) = client.start().await {
                tracing::error!(error = %e, "Discord client stopped with error");
            }
        });

        let ready = tokio::select! {
            ready = tokio::time::timeout(READY_TIMEOUT, ready_rx) => matches!(ready, Ok(Ok(()))),
            _ = &mut client_task => {
                bail!("Discord client stopped before the gateway became ready");
            }
        };
        if !ready {
            shard_manager.shutdown_all().await;
            client_task.abort();
            bail!("Discord gateway did not become ready within {}s", READY_TIMEOUT.as_secs());
        }

        *self.connection.lock().unwrap_or_else(|e| e.into_inner()) = Some(Connection {
            http,
            shard_manager,
            client_task,
        });
        Ok(())
    }

    async fn event_stream(&self) -> Result<EventStream> {
        let rx = self
            .events_rx
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
            .context("Discord event stream already taken")?;
        Ok(Box::pin(ReceiverStream::new(rx)))
    }

    async fn reply(&self, to: &IncomingMessage, text: &str) -> Result<()> {
        self.post(&to.channel_id, text, Some(&to.message_id)).await
    }

    async fn send(&self, channel_id: &str, text: &str) -> Result<()> {
        self.post(channel_id, text, None).await
    }

    fn bot_user_id(&self) -> String {
        self.bot_user_id
            .get()
            .map(|id| id.to_string())
            .unwrap_or_default()
    }

    fn platform_id(&self) -> &'static str {
        "discord"
    }

    fn display_name(&self) -> &'static str {
        "Discord"
    }

    async fn shutdown(&self) -> Result<()> {
        let connection = self.connection.lock().unwrap_or_else(|e| e.into_inner()).take();
        let Some(connection) = connection else {
            return Ok(());
        };

        connection.shard_manager.shutdown_all().await;
        if let Err(e) = connection.client_task.await {
            tracing::warn!(error = %e, "Discord client task ended abnormally");
        }
        tracing::info!("Discord client disconnected");
        Ok(())
    }
}

// =============================================================================
// Event handler
// =============================================================================

struct Handler {
    events_tx: mpsc::Sender<IncomingMessage>,
    bot_user_id: Arc<OnceCell<u64>>,
    ready_tx: Mutex<Option<oneshot::Sender<()>>>,
}

#[async_trait]
impl EventHandler for Handler {
    async fn message(&self, _ctx: Context, msg: Message) {
        let bot_id = self.bot_user_id.get().copied();
        let incoming = to_incoming(&msg, bot_id);
        if let Err(e) = self.events_tx.send(incoming).await {
            tracing::warn!(error = %e, "Failed to forward Discord message");
        }
    }

    async fn ready(&self, _ctx: Context, ready: Ready) {
        let _ = self.bot_user_id.set(ready.user.id.get());
        tracing::info!(
            user = %ready.user.name,
            user_id = %ready.user.id,
            guilds = ready.guilds.len(),
            "Discord bot connected"
        );

        let ready_tx = self.ready_tx.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(tx) = ready_tx {
            let _ = tx.send(());
        }
    }
}

fn to_incoming(msg: &Message, bot_id: Option<u64>) -> IncomingMessage {
    let ts = msg.timestamp;
    IncomingMessage {
        platform_id: "discord".to_string(),
        channel_id: msg.channel_id.to_string(),
        message_id: msg.id.to_string(),
        sender: ChatUser {
            id: msg.author.id.to_string(),
            display_name: msg
                .author
                .global_name
                .clone()
                .or_else(|| Some(msg.author.name.clone())),
            is_bot: msg.author.bot,
        },
        body: msg.content.clone(),
        is_direct: msg.guild_id.is_none(),
        mentions_bot: bot_id.is_some_and(|id| msg.mentions.iter().any(|u| u.id.get() == id)),
        received_at: chrono::DateTime::from_timestamp(ts.unix_timestamp(), ts.nanosecond())
            .unwrap_or_else(chrono::Utc::now),
    }
}

/// Parse a Discord snowflake id; serenity panics on zero so reject it here
fn parse_snowflake(kind: &str, id: &str) -> Result<u64> {
    match id.parse::<u64>() {
        Ok(0) | Err(_) => bail!("Invalid Discord {} id: {}", kind, id),
        Ok(value) => Ok(value),
    }
}
