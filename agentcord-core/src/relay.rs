// ABOUTME: Relay engine: one request/response cycle between a chat message and an agent session.
// ABOUTME: Correlates output by cursor and request id, forwards replies, ends on completion or deadline.

use crate::metrics;
use crate::traits::{ChatGateway, IncomingMessage};
use crate::utils::{chunk_message, format_system_output};
use agentcord_agent::{AgentEvent, AgentHandle, RequestId, Subscription};
use anyhow::Result;
use std::sync::Arc;
use std::time::Instant;

/// Reply sent when the agent finished without producing any output
pub const NO_RESPONSE_REPLY: &str = "No response received from agent.";

/// Reply sent when a cycle exceeds the agent's run deadline
pub fn timeout_reply(secs: u64) -> String {
    format!("Agent timed out after {} seconds.", secs)
}

/// How a relay cycle ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    /// The agent handled the input and at least one reply was sent
    Completed,
    /// The agent handled the input without output; the fallback reply was sent
    NoResponse,
    /// The deadline expired first; the timeout reply was sent
    TimedOut,
    /// The session was destroyed mid-cycle; nothing was sent
    SessionClosed,
}

impl RelayOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelayOutcome::Completed => "completed",
            RelayOutcome::NoResponse => "no_response",
            RelayOutcome::TimedOut => "timed_out",
            RelayOutcome::SessionClosed => "session_closed",
        }
    }
}

impl std::fmt::Display for RelayOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Drives relay cycles, sending replies through the gateway
pub struct RelayEngine {
    gateway: Arc<dyn ChatGateway>,
}

impl RelayEngine {
    pub fn new(gateway: Arc<dyn ChatGateway>) -> Self {
        Self { gateway }
    }

    /// Submit `text` to `agent` and relay its output as replies to `msg`.
    ///
    /// Waits for the session to go idle first so each cycle sees only its own
    /// output. The agent's `max_run_time_secs` bounds the whole cycle; the
    /// deadline is checked while waiting on the session, never during a send.
    pub async fn relay(
        &self,
        agent: &AgentHandle,
        msg: &IncomingMessage,
        text: &str,
    ) -> Result<RelayOutcome> {
        let started = Instant::now();
        let max_run_time = agent.config().max_run_time();
        let deadline = async move {
            match max_run_time {
                Some(limit) => tokio::time::sleep(limit).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::pin!(deadline);

        let outcome = self.run_cycle(agent, msg, text, &mut deadline).await?;

        match outcome {
            RelayOutcome::NoResponse => self.send_reply(msg, NO_RESPONSE_REPLY).await?,
            RelayOutcome::TimedOut => {
                tracing::warn!(
                    user_id = %msg.sender.id,
                    agent_id = %agent.id(),
                    max_run_time_secs = agent.config().max_run_time_secs,
                    "Agent timed out"
                );
                self.send_reply(msg, &timeout_reply(agent.config().max_run_time_secs))
                    .await?
            }
            RelayOutcome::Completed | RelayOutcome::SessionClosed => {}
        }

        let elapsed = started.elapsed();
        metrics::record_relay(outcome.as_str(), elapsed);
        tracing::info!(
            user_id = %msg.sender.id,
            agent_id = %agent.id(),
            outcome = %outcome,
            elapsed_ms = elapsed.as_millis() as u64,
            "Relay cycle finished"
        );
        Ok(outcome)
    }

    async fn run_cycle<D>(
        &self,
        agent: &AgentHandle,
        msg: &IncomingMessage,
        text: &str,
        deadline: &mut std::pin::Pin<&mut D>,
    ) -> Result<RelayOutcome>
    where
        D: std::future::Future<Output = ()>,
    {
        // Idle wait and submit happen under the turn lock so no other cycle
        // can slip an input in between.
        let submitted = tokio::select! {
            biased;
            submitted = submit_when_idle(agent, text) => submitted,
            _ = deadline.as_mut() => return Ok(RelayOutcome::TimedOut),
        };
        let (mut subscription, request_id) = match submitted {
            Ok(submitted) => submitted,
            Err(e) if !agent.is_alive() => {
                tracing::debug!(agent_id = %agent.id(), error = %e, "Session closed before submit");
                return Ok(RelayOutcome::SessionClosed);
            }
            Err(e) => return Err(e),
        };
        tracing::debug!(
            user_id = %msg.sender.id,
            request_id = %request_id,
            cursor = subscription.cursor().position(),
            "Input submitted to agent"
        );

        let mut responded = false;
        let outcome = 'cycle: loop {
            let batch = tokio::select! {
                biased;
                batch = subscription.next_batch() => batch,
                _ = deadline.as_mut() => break 'cycle RelayOutcome::TimedOut,
            };
            let Some(batch) = batch else {
                break 'cycle RelayOutcome::SessionClosed;
            };

            for sequenced in batch {
                match sequenced.event {
                    AgentEvent::OutputChat { content } => {
                        self.send_reply(msg, &content).await?;
                        responded = true;
                    }
                    AgentEvent::OutputSystem { level, message } => {
                        self.send_reply(msg, &format_system_output(level, &message))
                            .await?;
                        responded = true;
                    }
                    AgentEvent::InputHandled {
                        request_id: ref handled,
                        status,
                    } if *handled == request_id => {
                        tracing::debug!(request_id = %request_id, status = ?status, "Input handled");
                        break 'cycle if responded {
                            RelayOutcome::Completed
                        } else {
                            RelayOutcome::NoResponse
                        };
                    }
                    _ => {}
                }
            }
        };

        subscription.unsubscribe();
        Ok(outcome)
    }

    /// Send `text` as one or more replies under the platform's length limit
    async fn send_reply(&self, msg: &IncomingMessage, text: &str) -> Result<()> {
        for chunk in chunk_message(text, self.gateway.max_message_len()) {
            self.gateway.reply(msg, &chunk).await?;
            metrics::record_reply_sent();
        }
        Ok(())
    }
}

/// Wait for idle, subscribe at the idle cursor, then submit.
///
/// Subscribing before the submit means no event of this cycle can be
/// evicted from the log before the subscription sees it.
async fn submit_when_idle(
    agent: &AgentHandle,
    text: &str,
) -> Result<(Subscription, RequestId)> {
    let _turn = agent.lock_turn().await;
    let state = agent.wait_for_idle().await?;
    let subscription = agent.subscribe(state.cursor);
    let request_id = agent.submit_input(text).await?;
    Ok((subscription, request_id))
}
