// ABOUTME: XDG Base Directory paths for cross-platform config and log storage
// ABOUTME: Falls back to the working directory when no home directory is known

use directories::ProjectDirs;
use std::path::PathBuf;

/// Application identifier for XDG directories
const QUALIFIER: &str = "dev";
const ORGANIZATION: &str = "agentcord";
const APPLICATION: &str = "agentcord";

/// Get XDG-compliant directories for the application
pub fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from(QUALIFIER, ORGANIZATION, APPLICATION)
}

/// Get the config directory path (e.g., ~/.config/agentcord/)
pub fn config_dir() -> PathBuf {
    project_dirs()
        .map(|p| p.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Get the default config file path
/// e.g., ~/.config/agentcord/config.toml
pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}

/// Get the default log directory (e.g., ~/.local/share/agentcord/logs/)
pub fn log_dir() -> PathBuf {
    project_dirs()
        .map(|p| p.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("./logs"))
}

/// Expand a leading `~` to the home directory.
/// Logs a warning and returns the path unchanged when the home directory is unknown.
pub fn expand_tilde(path: &str) -> String {
    let rest = match path.strip_prefix("~/") {
        Some(rest) => Some(rest),
        None if path == "~" => Some(""),
        None => None,
    };
    let Some(rest) = rest else {
        return path.to_string();
    };

    match directories::BaseDirs::new() {
        Some(base_dirs) => base_dirs.home_dir().join(rest).to_string_lossy().to_string(),
        None => {
            tracing::warn!(
                path = %path,
                "Failed to expand tilde in path: could not determine home directory"
            );
            path.to_string()
        }
    }
}
