// ABOUTME: Main entry point for the agentcord Discord-to-agent bridge
// ABOUTME: Parses the CLI, loads config, initializes logging and metrics, then runs the chosen mode

use agentcord::cli::{config_summary, Cli, Commands};
use agentcord::{logging, metrics, platform, server};
use agentcord_core::Config;
use anyhow::{Context, Result};
use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> ExitCode {
    // Set up panic hook to log panics before they crash the process
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("\nPANIC! agentcord crashed with the following error:\n");
        eprintln!("{}", panic_info);
        eprintln!("\nBacktrace:");
        eprintln!("{:?}", std::backtrace::Backtrace::force_capture());
    }));

    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %format!("{:#}", e), "agentcord exited with error");
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(format) = cli.log_format {
        config.logging.format = format.into();
    }

    if cli.mode() == Commands::CheckConfig {
        print!("{}", config_summary(&config));
        println!("Configuration OK");
        return Ok(());
    }

    let _log_guard = logging::init(&config.logging)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting agentcord");

    if let Some(listen) = config.metrics.listen {
        metrics::init_prometheus(listen)?;
    }

    let shutdown = CancellationToken::new();
    spawn_signal_handler(shutdown.clone());

    let manager = server::agent_manager(&config);
    match cli.mode() {
        Commands::Console => {
            let gateway = Arc::new(platform::ConsolePlatform::stdio());
            server::serve(gateway, manager, server::console_bridge_config(&config), shutdown).await
        }
        Commands::Run | Commands::CheckConfig => run_discord(&config, manager, shutdown).await,
    }
}

#[cfg(feature = "discord")]
async fn run_discord(
    config: &Config,
    manager: Arc<dyn agentcord_core::AgentManager>,
    shutdown: CancellationToken,
) -> Result<()> {
    let discord = config.discord_config()?;
    tracing::info!(
        channel_id = ?discord.channel_id,
        authorized_users = discord.authorized_user_ids.len(),
        default_agent_type = %discord.default_agent_type,
        "Configuration loaded"
    );

    let gateway = Arc::new(platform::DiscordPlatform::new(discord)?);
    server::serve(gateway, manager, discord.into(), shutdown).await
}

#[cfg(not(feature = "discord"))]
async fn run_discord(
    _config: &Config,
    _manager: Arc<dyn agentcord_core::AgentManager>,
    _shutdown: CancellationToken,
) -> Result<()> {
    anyhow::bail!("agentcord was built without the \"discord\" feature; use the console command")
}

/// Cancel `shutdown` on Ctrl-C
fn spawn_signal_handler(shutdown: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c()
            .await
            .context("Failed to listen for Ctrl-C")
        {
            Ok(()) => {
                tracing::info!("Ctrl-C received, shutting down");
                shutdown.cancel();
            }
            Err(e) => tracing::warn!(error = %e, "Graceful shutdown on Ctrl-C unavailable"),
        }
    });
}
