// ABOUTME: Configuration parsing from TOML file with environment variable overrides
// ABOUTME: Validates required fields and provides sensible defaults for optional ones
use crate::paths;
use agentcord_agent::AgentTypeConfig;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Env var naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "AGENTCORD_CONFIG_PATH";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Discord service settings; the service is only installed when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discord: Option<DiscordConfig>,
    /// Agent types by name (`[agents.teamLeader]`)
    #[serde(default)]
    pub agents: HashMap<String, AgentTypeConfig>,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

// ─── DiscordConfig ──────────────────────────────────────────────

#[derive(Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    #[serde(default)]
    pub bot_token: String,
    /// Channel that receives the startup announcement
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    /// Users allowed to talk to the agent (empty = everyone)
    #[serde(default)]
    pub authorized_user_ids: Vec<String>,
    /// Agent type spawned for each new user
    #[serde(default = "default_agent_type")]
    pub default_agent_type: String,
}

// Custom Debug impl to redact bot_token
impl std::fmt::Debug for DiscordConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordConfig")
            .field("bot_token", &"[REDACTED]")
            .field("channel_id", &self.channel_id)
            .field("authorized_user_ids", &self.authorized_user_ids)
            .field("default_agent_type", &self.default_agent_type)
            .finish()
    }
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            channel_id: None,
            authorized_user_ids: Vec::new(),
            default_agent_type: default_agent_type(),
        }
    }
}

fn default_agent_type() -> String {
    "teamLeader".to_string()
}

// ─── LoggingConfig ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => bail!("Unknown log format '{}', expected 'pretty' or 'json'", other),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
    /// Directory for a daily-rolling log file, in addition to stderr
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,
    /// Default filter directive when RUST_LOG is unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
}

// ─── MetricsConfig ──────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Address for the Prometheus scrape endpoint; unset disables the exporter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listen: Option<SocketAddr>,
}

fn split_list(val: &str) -> Vec<String> {
    val.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

impl Config {
    /// Find the config file, checking multiple locations in order:
    /// 1. AGENTCORD_CONFIG_PATH env var (if set)
    /// 2. ./config.toml (current directory - for development)
    /// 3. ~/.config/agentcord/config.toml (XDG config dir)
    fn find_config_file() -> Option<PathBuf> {
        if let Ok(env_path) = std::env::var(CONFIG_PATH_ENV) {
            let path = PathBuf::from(&env_path);
            if path.exists() {
                return Some(path);
            }
        }

        let local_config = PathBuf::from("config.toml");
        if local_config.exists() {
            return Some(local_config);
        }

        let xdg_config = paths::config_file();
        if xdg_config.exists() {
            return Some(xdg_config);
        }

        None
    }

    /// Parse a TOML document without env overrides or validation
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str::<Config>(content).context("Invalid configuration")
    }

    /// Load configuration with environment variable overrides, then validate.
    ///
    /// An explicit `path` must exist. Without one the usual locations are
    /// searched and a missing file yields defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(path) => Some(path.to_path_buf()),
            None => Self::find_config_file(),
        };

        let mut config = if let Some(config_path) = config_path {
            tracing::info!(
                path = %config_path.display(),
                "Loading configuration from file"
            );
            let content = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read {}", config_path.display()))?;
            toml::from_str::<Config>(&content)
                .with_context(|| format!("Failed to parse {}", config_path.display()))?
        } else {
            tracing::info!("No config file found, using environment variables and defaults");
            Config::default()
        };

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        // A token in the environment is enough to enable Discord
        if let Ok(val) = std::env::var("DISCORD_BOT_TOKEN") {
            self.discord.get_or_insert_with(DiscordConfig::default).bot_token = val;
        }

        if let Some(ref mut discord) = self.discord {
            if let Ok(val) = std::env::var("DISCORD_CHANNEL_ID") {
                discord.channel_id = Some(val).filter(|v| !v.trim().is_empty());
            }
            if let Ok(val) = std::env::var("DISCORD_AUTHORIZED_USER_IDS") {
                discord.authorized_user_ids = split_list(&val);
            }
            if let Ok(val) = std::env::var("DEFAULT_AGENT_TYPE") {
                discord.default_agent_type = val;
            }
        }

        if let Ok(val) = std::env::var("AGENTCORD_LOG_FORMAT") {
            self.logging.format = val.parse()?;
        }
        if let Ok(val) = std::env::var("AGENTCORD_LOG_DIR") {
            self.logging.directory = Some(val);
        }
        if let Ok(val) = std::env::var("AGENTCORD_METRICS_LISTEN") {
            self.metrics.listen = Some(val.parse().with_context(|| {
                format!("AGENTCORD_METRICS_LISTEN must be a socket address, got: {}", val)
            })?);
        }

        if let Some(ref mut dir) = self.logging.directory {
            *dir = paths::expand_tilde(dir);
        }
        Ok(())
    }

    /// Check required fields and clean up list values
    pub fn validate(&mut self) -> Result<()> {
        if let Some(ref mut discord) = self.discord {
            if discord.bot_token.trim().is_empty() {
                bail!("discord.bot_token is required (set in config.toml or DISCORD_BOT_TOKEN env var)");
            }
            if discord.default_agent_type.trim().is_empty() {
                bail!("discord.default_agent_type must not be empty");
            }
            if let Some(channel_id) = &discord.channel_id {
                if channel_id.parse::<u64>().is_err() {
                    bail!("discord.channel_id must be a numeric Discord id, got: {}", channel_id);
                }
            }
            discord
                .authorized_user_ids
                .retain(|id| !id.trim().is_empty());
        }

        for (name, agent) in &self.agents {
            if agent.event_log_capacity == 0 {
                bail!("agents.{}.event_log_capacity must be greater than zero", name);
            }
        }
        Ok(())
    }

    /// Get a reference to the Discord config, returning an error if not configured.
    pub fn discord_config(&self) -> Result<&DiscordConfig> {
        self.discord
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("Discord configuration is required but not present"))
    }
}
