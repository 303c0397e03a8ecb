//! Configuration loading from YAML files and environment

use std::io::Write;

use deposit_watch::config::AppConfig;

fn write_yaml(dir: &tempfile::TempDir, name: &str, body: &str) -> String {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(body.as_bytes()).unwrap();
    path.to_string_lossy().into_owned()
}

#[test]
fn test_missing_files_fall_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent").to_string_lossy().into_owned();

    let config = AppConfig::load_from(&[missing.as_str()]).unwrap();
    assert_eq!(config.session.keepalive_interval_secs, 30);
    assert_eq!(config.session.reconnect_delay_secs, 5);
    assert_eq!(config.session.handshake_timeout_ms, 10_000);
    assert!(config.monitor.user_id.is_none());
    assert!(config.validate().is_ok());
}

#[test]
fn test_yaml_overrides_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_yaml(
        &dir,
        "deposit_watch.yaml",
        r#"
api:
  base_url: "https://deposits.example.com"
  request_timeout_ms: 2500
session:
  keepalive_interval_secs: 15
  reconnect_delay_secs: 2
monitor:
  user_id: "6f1c1a43-94c6-4f0a-9d3f-0d6b6c2f6a11"
  wallet_address: "0xabc0000000000000000000000000000000000123"
logging:
  json: false
"#,
    );

    let config = AppConfig::load_from(&[path.as_str()]).unwrap();
    assert_eq!(config.api.base_url, "https://deposits.example.com");
    assert_eq!(config.api.request_timeout_ms, 2500);
    assert_eq!(config.api.push_base_url(), "wss://deposits.example.com");
    assert_eq!(config.session.keepalive_interval_secs, 15);
    assert_eq!(config.session.reconnect_delay_secs, 2);
    assert_eq!(
        config.monitor.user_id.map(|u| u.to_string()).as_deref(),
        Some("6f1c1a43-94c6-4f0a-9d3f-0d6b6c2f6a11")
    );
    assert_eq!(
        config.monitor.wallet_address.as_deref(),
        Some("0xabc0000000000000000000000000000000000123")
    );
    assert!(!config.logging.json);
    assert!(config.validate().is_ok());
}

#[test]
fn test_later_file_wins() {
    let dir = tempfile::tempdir().unwrap();
    let base = write_yaml(&dir, "base.yaml", "session:\n  reconnect_delay_secs: 7\n");
    let local = write_yaml(&dir, "local.yaml", "session:\n  reconnect_delay_secs: 9\n");

    let config = AppConfig::load_from(&[base.as_str(), local.as_str()]).unwrap();
    assert_eq!(config.session.reconnect_delay_secs, 9);
}

#[test]
fn test_zero_keepalive_rejected_by_validate() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_yaml(
        &dir,
        "deposit_watch.yaml",
        "session:\n  keepalive_interval_secs: 0\n",
    );

    let config = AppConfig::load_from(&[path.as_str()]).unwrap();
    assert!(config.validate().is_err());
}

#[test]
fn test_environment_overrides_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_yaml(&dir, "deposit_watch.yaml", "feed:\n  retention: 4\n");

    // Only this test touches feed.retention
    std::env::set_var("DEPOSIT_WATCH_FEED__RETENTION", "25");
    let config = AppConfig::load_from(&[path.as_str()]);
    std::env::remove_var("DEPOSIT_WATCH_FEED__RETENTION");

    assert_eq!(config.unwrap().feed.retention, 25);
}
