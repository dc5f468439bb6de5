// ABOUTME: Tests for global tracing setup with a rolling file sink
// ABOUTME: Kept in its own test binary since the subscriber can only be installed once per process

use agentcord::logging;
use agentcord_core::config::{LogFormat, LoggingConfig};

#[test]
fn test_init_creates_log_directory_and_rejects_second_install() {
    let tmpdir = tempfile::tempdir().unwrap();
    let log_dir = tmpdir.path().join("logs").join("agentcord");
    let config = LoggingConfig {
        format: LogFormat::Json,
        directory: Some(log_dir.to_string_lossy().into_owned()),
        filter: Some("debug".to_string()),
    };

    let guard = logging::init(&config).unwrap();
    assert!(guard.is_some());
    assert!(log_dir.is_dir());

    tracing::info!(user_id = "123", "written to the file sink");

    let second = logging::init(&LoggingConfig::default());
    assert!(second.is_err());
    drop(guard);
}
