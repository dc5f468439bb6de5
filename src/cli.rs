// ABOUTME: Command-line interface definition and the check-config summary
// ABOUTME: Parsed with clap derive; the summary never prints secrets

use agentcord_core::config::LogFormat;
use agentcord_core::Config;
use clap::{Parser, Subcommand, ValueEnum};
use std::fmt::Write as _;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "agentcord", version, about = "Discord bridge to per-user agent sessions")]
pub struct Cli {
    /// Path to config.toml (default: AGENTCORD_CONFIG_PATH, ./config.toml, then the user config dir)
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    /// Console log format, overriding [logging].format
    #[arg(long, value_enum, global = true)]
    pub log_format: Option<LogFormatArg>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Connect to Discord and serve messages (default)
    Run,
    /// Chat with an agent from stdin, without Discord
    Console,
    /// Load and validate configuration, then print a summary
    CheckConfig,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormatArg {
    Pretty,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Pretty => LogFormat::Pretty,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

impl Cli {
    pub fn mode(&self) -> Commands {
        self.command.unwrap_or(Commands::Run)
    }
}

/// Human-readable configuration summary with the bot token redacted
pub fn config_summary(config: &Config) -> String {
    let mut out = String::new();
    match &config.discord {
        Some(discord) => {
            let _ = writeln!(out, "discord:");
            let _ = writeln!(out, "  bot_token: [REDACTED]");
            let _ = writeln!(
                out,
                "  channel_id: {}",
                discord.channel_id.as_deref().unwrap_or("(none)")
            );
            let authorized = if discord.authorized_user_ids.is_empty() {
                "(everyone)".to_string()
            } else {
                discord.authorized_user_ids.join(", ")
            };
            let _ = writeln!(out, "  authorized_user_ids: {}", authorized);
            let _ = writeln!(out, "  default_agent_type: {}", discord.default_agent_type);
        }
        None => {
            let _ = writeln!(out, "discord: (not configured)");
        }
    }

    let mut agent_types: Vec<_> = config.agents.iter().collect();
    agent_types.sort_by(|a, b| a.0.cmp(b.0));
    let _ = writeln!(out, "agents:");
    if agent_types.is_empty() {
        let _ = writeln!(out, "  (none; the echo backend is used)");
    }
    for (name, agent) in agent_types {
        let deadline = match agent.max_run_time_secs {
            0 => "none".to_string(),
            secs => format!("{}s", secs),
        };
        let _ = writeln!(
            out,
            "  {}: backend={} max_run_time={} event_log_capacity={}",
            name,
            agent.backend_type(),
            deadline,
            agent.event_log_capacity
        );
    }

    let _ = writeln!(out, "logging: format={:?}", config.logging.format);
    if let Some(directory) = &config.logging.directory {
        let _ = writeln!(out, "  directory: {}", directory);
    }
    match config.metrics.listen {
        Some(listen) => {
            let _ = writeln!(out, "metrics: listen={}", listen);
        }
        None => {
            let _ = writeln!(out, "metrics: disabled");
        }
    }
    out
}
