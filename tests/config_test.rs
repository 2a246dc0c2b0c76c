//! Unit tests for config.rs module

use std::fs;
use std::time::Duration;

use conversation_sync::config::{AppConfig, LoggingConfig, ScannerConfig, SyncConfig};
use conversation_sync::store::MergePolicy;
use tempfile::tempdir;

#[test]
fn test_default_sync_config() {
    let config = AppConfig::default();

    assert_eq!(config.sync.poll_interval_ms, 5_000);
    assert_eq!(config.sync.poll_interval(), Duration::from_secs(5));
    assert_eq!(config.sync.merge_policy, MergePolicy::Snapshot);
}

#[test]
fn test_default_scanner_and_logging_config() {
    let config = AppConfig::default();

    assert_eq!(config.scanner.cache_capacity, 2_048);
    assert_eq!(config.logging.level, "info");
    assert_eq!(config.logging.file_path, None);
    assert_eq!(config.logging.format, "text");
}

#[test]
fn test_default_config_is_valid() {
    assert!(AppConfig::default().validate().is_ok());
}

#[test]
fn test_poll_interval_bounds() {
    let mut config = AppConfig::default();

    config.sync.poll_interval_ms = 0;
    assert!(config.validate().is_err());

    config.sync.poll_interval_ms = 100;
    assert!(config.validate().is_err());

    config.sync.poll_interval_ms = 250;
    assert!(config.validate().is_ok());

    config.sync.poll_interval_ms = 600_000;
    assert!(config.validate().is_ok());

    config.sync.poll_interval_ms = 600_001;
    assert!(config.validate().is_err());
}

#[test]
fn test_zero_cache_capacity_rejected() {
    let config = AppConfig {
        scanner: ScannerConfig { cache_capacity: 0 },
        ..AppConfig::default()
    };
    assert!(config.validate().is_err());
}

#[test]
fn test_invalid_log_level_and_format() {
    let mut config = AppConfig::default();
    config.logging.level = "verbose".to_string();
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("Invalid log level"));

    let config = AppConfig {
        logging: LoggingConfig {
            format: "xml".to_string(),
            ..LoggingConfig::default()
        },
        ..AppConfig::default()
    };
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("Invalid log format"));
}

#[test]
fn test_load_from_missing_files_gives_defaults() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("absent");
    let config = AppConfig::load_from(&[missing.to_str().unwrap()]).unwrap();

    assert_eq!(config.sync.poll_interval_ms, 5_000);
    assert_eq!(config.scanner.cache_capacity, 2_048);
}

#[test]
fn test_load_from_toml_overrides_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("sync.toml");
    fs::write(
        &path,
        r#"
[sync]
poll_interval_ms = 1500
merge_policy = "preserve_pending"

[logging]
level = "debug"
format = "json"
"#,
    )
    .unwrap();

    let config = AppConfig::load_from(&[path.to_str().unwrap()]).unwrap();

    assert_eq!(config.sync.poll_interval_ms, 1_500);
    assert_eq!(config.sync.merge_policy, MergePolicy::PreservePending);
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.logging.format, "json");
    // Untouched sections keep their defaults
    assert_eq!(config.scanner.cache_capacity, 2_048);
}

#[test]
fn test_later_files_take_precedence() {
    let dir = tempdir().unwrap();
    let base = dir.path().join("base.toml");
    let local = dir.path().join("local.toml");
    fs::write(&base, "[sync]\npoll_interval_ms = 2000\n[scanner]\ncache_capacity = 10\n").unwrap();
    fs::write(&local, "[sync]\npoll_interval_ms = 3000\n").unwrap();

    let config = AppConfig::load_from(&[base.to_str().unwrap(), local.to_str().unwrap()]).unwrap();

    assert_eq!(config.sync.poll_interval_ms, 3_000);
    assert_eq!(config.scanner.cache_capacity, 10);
}

#[test]
fn test_load_from_rejects_invalid_values() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(&path, "[sync]\npoll_interval_ms = 10\n").unwrap();

    assert!(AppConfig::load_from(&[path.to_str().unwrap()]).is_err());
}

#[test]
fn test_config_serialization_roundtrip() {
    let config = AppConfig {
        sync: SyncConfig {
            poll_interval_ms: 750,
            merge_policy: MergePolicy::PreservePending,
        },
        ..AppConfig::default()
    };

    let json = serde_json::to_value(&config).unwrap();
    assert_eq!(json["sync"]["merge_policy"], "preserve_pending");

    let back: AppConfig = serde_json::from_value(json).unwrap();
    assert_eq!(back.sync.poll_interval_ms, 750);
    assert_eq!(back.sync.merge_policy, MergePolicy::PreservePending);
}

#[test]
fn test_partial_json_fills_defaults() {
    let config: AppConfig = serde_json::from_str(r#"{"sync": {"poll_interval_ms": 900}}"#).unwrap();
    assert_eq!(config.sync.poll_interval_ms, 900);
    assert_eq!(config.sync.merge_policy, MergePolicy::Snapshot);
    assert_eq!(config.logging.level, "info");
}
