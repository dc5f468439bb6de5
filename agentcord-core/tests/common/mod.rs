// ABOUTME: Shared test doubles for agentcord-core integration tests.
// ABOUTME: MockGateway records replies; MockManager spawns scripted mock sessions and counts lifecycle calls.

#![allow(dead_code)]

use agentcord_agent::backends::mock::MockBackend;
use agentcord_agent::{AgentConfig, AgentHandle, AgentManager};
use agentcord_core::traits::{ChatGateway, ChatUser, EventStream, IncomingMessage};
use anyhow::{bail, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

pub const BOT_ID: &str = "900";

/// One message the gateway was asked to deliver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sent {
    pub channel_id: String,
    /// Message replied to, `None` for plain channel posts
    pub reply_to: Option<String>,
    pub text: String,
}

/// Gateway that records everything it sends
pub struct MockGateway {
    sent: Mutex<Vec<Sent>>,
    incoming: Mutex<Option<mpsc::UnboundedReceiver<IncomingMessage>>>,
    fail_replies: AtomicBool,
    max_len: usize,
    pub connects: AtomicUsize,
    pub shutdowns: AtomicUsize,
}

impl MockGateway {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedSender<IncomingMessage>) {
        Self::with_max_len(2000)
    }

    pub fn with_max_len(max_len: usize) -> (Arc<Self>, mpsc::UnboundedSender<IncomingMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let gateway = Arc::new(Self {
            sent: Mutex::new(Vec::new()),
            incoming: Mutex::new(Some(rx)),
            fail_replies: AtomicBool::new(false),
            max_len,
            connects: AtomicUsize::new(0),
            shutdowns: AtomicUsize::new(0),
        });
        (gateway, tx)
    }

    pub fn fail_replies(&self, fail: bool) {
        self.fail_replies.store(fail, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    /// Texts replied to the message with `message_id`
    pub fn replies_to(&self, message_id: &str) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter(|s| s.reply_to.as_deref() == Some(message_id))
            .map(|s| s.text)
            .collect()
    }

    pub fn reply_texts(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter(|s| s.reply_to.is_some())
            .map(|s| s.text)
            .collect()
    }
}

#[async_trait]
impl ChatGateway for MockGateway {
    async fn connect(&self) -> Result<()> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn event_stream(&self) -> Result<EventStream> {
        match self.incoming.lock().unwrap().take() {
            Some(rx) => Ok(Box::pin(UnboundedReceiverStream::new(rx))),
            None => bail!("event stream already taken"),
        }
    }

    async fn reply(&self, to: &IncomingMessage, text: &str) -> Result<()> {
        if self.fail_replies.load(Ordering::SeqCst) {
            bail!("reply failed");
        }
        self.sent.lock().unwrap().push(Sent {
            channel_id: to.channel_id.clone(),
            reply_to: Some(to.message_id.clone()),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn send(&self, channel_id: &str, text: &str) -> Result<()> {
        self.sent.lock().unwrap().push(Sent {
            channel_id: channel_id.to_string(),
            reply_to: None,
            text: text.to_string(),
        });
        Ok(())
    }

    fn bot_user_id(&self) -> String {
        BOT_ID.to_string()
    }

    fn platform_id(&self) -> &'static str {
        "mock"
    }

    fn display_name(&self) -> &'static str {
        "Mock"
    }

    fn max_message_len(&self) -> usize {
        self.max_len
    }

    async fn shutdown(&self) -> Result<()> {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

type BackendScript = Box<dyn Fn() -> MockBackend + Send + Sync>;

/// Agent manager spawning mock sessions and counting lifecycle calls
pub struct MockManager {
    script: BackendScript,
    config: AgentConfig,
    spawn_delay: Option<Duration>,
    fail_spawns: AtomicUsize,
    spawned: Mutex<Vec<AgentHandle>>,
    destroyed: Mutex<HashMap<String, usize>>,
}

impl MockManager {
    pub fn new() -> Self {
        Self::scripted(MockBackend::new)
    }

    /// Every spawned session gets a backend built by `script`
    pub fn scripted<F>(script: F) -> Self
    where
        F: Fn() -> MockBackend + Send + Sync + 'static,
    {
        Self {
            script: Box::new(script),
            config: AgentConfig::default(),
            spawn_delay: None,
            fail_spawns: AtomicUsize::new(0),
            spawned: Mutex::new(Vec::new()),
            destroyed: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_spawn_delay(mut self, delay: Duration) -> Self {
        self.spawn_delay = Some(delay);
        self
    }

    /// Make the next `count` spawns fail
    pub fn failing(self, count: usize) -> Self {
        self.fail_spawns.store(count, Ordering::SeqCst);
        self
    }

    pub fn spawn_count(&self) -> usize {
        self.spawned.lock().unwrap().len()
    }

    pub fn spawned(&self) -> Vec<AgentHandle> {
        self.spawned.lock().unwrap().clone()
    }

    pub fn destroy_count(&self, agent_id: &str) -> usize {
        self.destroyed
            .lock()
            .unwrap()
            .get(agent_id)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_destroys(&self) -> usize {
        self.destroyed.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl AgentManager for MockManager {
    async fn spawn(&self, agent_type: &str) -> Result<AgentHandle> {
        if let Some(delay) = self.spawn_delay {
            tokio::time::sleep(delay).await;
        }
        let should_fail = self
            .fail_spawns
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            bail!("agent service unavailable");
        }

        let agent = AgentHandle::spawn(Box::new((self.script)()), agent_type, self.config);
        self.spawned.lock().unwrap().push(agent.clone());
        Ok(agent)
    }

    async fn destroy(&self, agent: &AgentHandle) -> Result<()> {
        *self
            .destroyed
            .lock()
            .unwrap()
            .entry(agent.id().to_string())
            .or_insert(0) += 1;
        agent.shutdown().await;
        Ok(())
    }
}

static NEXT_MESSAGE: AtomicUsize = AtomicUsize::new(1);

fn next_message_id() -> String {
    format!("m{}", NEXT_MESSAGE.fetch_add(1, Ordering::SeqCst))
}

/// Direct message from `user_id`
pub fn dm(user_id: &str, body: &str) -> IncomingMessage {
    IncomingMessage {
        message_id: next_message_id(),
        ..IncomingMessage::direct("mock", format!("dm-{}", user_id), user_id, body)
    }
}

/// Guild channel message from `user_id`
pub fn channel_message(user_id: &str, body: &str, mentions_bot: bool) -> IncomingMessage {
    IncomingMessage {
        channel_id: "general".to_string(),
        is_direct: false,
        mentions_bot,
        ..dm(user_id, body)
    }
}

/// Message authored by another bot
pub fn bot_message(body: &str) -> IncomingMessage {
    IncomingMessage {
        sender: ChatUser::bot("777"),
        ..dm("777", body)
    }
}
