// ABOUTME: Service wiring shared by the run and console modes
// ABOUTME: Builds the agent manager, then drives one bridge from startup through graceful shutdown

use agentcord_core::{
    AgentManager, AgentRegistry, BridgeConfig, BridgeService, ChatGateway, Config,
    LocalAgentManager,
};
use anyhow::Result;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Agent manager over the built-in backends and the configured agent types
pub fn agent_manager(config: &Config) -> Arc<dyn AgentManager> {
    Arc::new(LocalAgentManager::new(
        AgentRegistry::default(),
        config.agents.clone(),
    ))
}

/// Bridge settings for the local console: open to the console user, no announcement
pub fn console_bridge_config(config: &Config) -> BridgeConfig {
    let default_agent_type = config
        .discord
        .as_ref()
        .map(|discord| discord.default_agent_type.clone())
        .unwrap_or_else(|| BridgeConfig::default().default_agent_type);

    BridgeConfig {
        authorized_user_ids: Vec::new(),
        announce_channel_id: None,
        default_agent_type,
    }
}

/// Run a bridge until `shutdown` fires or the gateway's stream ends.
///
/// When the stream ends on its own, in-flight messages finish before the
/// sessions are destroyed. On shutdown they are aborted.
pub async fn serve(
    gateway: Arc<dyn ChatGateway>,
    manager: Arc<dyn AgentManager>,
    bridge: BridgeConfig,
    shutdown: CancellationToken,
) -> Result<()> {
    let service = Arc::new(BridgeService::new(gateway, manager, bridge));

    if let Err(e) = service.start().await {
        tracing::error!(error = %format!("{:#}", e), "Failed to start bridge");
        if let Err(stop_err) = service.stop().await {
            tracing::warn!(error = %stop_err, "Cleanup after failed start incomplete");
        }
        return Err(e);
    }

    let run_result = service.run(shutdown.clone()).await;
    if run_result.is_ok() && !shutdown.is_cancelled() {
        tokio::select! {
            _ = service.drain() => {}
            _ = shutdown.cancelled() => {
                tracing::info!(in_flight = service.in_flight(), "Shutdown requested while draining");
            }
        }
    }

    let stop_result = service.stop().await;
    run_result.and(stop_result)
}
