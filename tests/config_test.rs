//! Tests for server configuration loading.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use tempfile::TempDir;

use letter_rush::{RegistryOptions, ServerConfig};

fn write_config(dir: &TempDir, content: &str) -> PathBuf {
    let path = dir.path().join("letter_rush.toml");
    fs::write(&path, content).expect("Failed to write TOML");
    path
}

#[test]
fn test_defaults() {
    let config = ServerConfig::default();
    assert_eq!(config.host(), "127.0.0.1");
    assert_eq!(*config.port(), 5174);
    assert_eq!(config.data_dir(), &PathBuf::from("data"));
    assert_eq!(config.timings().prep, Duration::from_secs(5));
    assert_eq!(config.timings().post, Duration::from_secs(5));
    assert!(config.validate().is_ok());
}

#[test]
fn test_partial_file_keeps_other_defaults() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = write_config(
        &dir,
        r#"
port = 9000
post_seconds = 8
default_total_rounds = 3
"#,
    );

    let config = ServerConfig::from_file(&path).expect("Load failed");
    assert_eq!(*config.port(), 9000);
    assert_eq!(config.timings().post, Duration::from_secs(8));
    assert_eq!(*config.default_total_rounds(), 3);
    assert_eq!(*config.default_round_seconds(), 60);
    assert_eq!(config.host(), "127.0.0.1");
}

#[test]
fn test_invalid_toml_is_rejected() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = write_config(&dir, "port = [this is not toml");
    let error = ServerConfig::from_file(&path).unwrap_err();
    assert!(error.message.contains("Failed to parse config"));
}

#[test]
fn test_zero_windows_are_rejected() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = write_config(&dir, "prep_seconds = 0\n");
    assert!(ServerConfig::from_file(&path).is_err());
    assert!(ServerConfig::default().with_windows(5, 0).validate().is_err());
}

#[test]
fn test_short_default_round_is_rejected() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = write_config(&dir, "default_round_seconds = 3\n");
    assert!(ServerConfig::from_file(&path).is_err());
}

#[test]
fn test_missing_file_is_an_error() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    assert!(ServerConfig::from_file(dir.path().join("absent.toml")).is_err());
}

#[test]
fn test_builders_and_registry_options() {
    let config = ServerConfig::default()
        .with_host("0.0.0.0")
        .with_port(8080)
        .with_data_dir("/srv/words")
        .with_windows(2, 3);
    assert_eq!(config.host(), "0.0.0.0");
    assert_eq!(*config.port(), 8080);
    assert_eq!(config.data_dir(), &PathBuf::from("/srv/words"));

    let options = RegistryOptions::from(&config);
    assert_eq!(options.timings.prep, Duration::from_secs(2));
    assert_eq!(options.timings.post, Duration::from_secs(3));
    assert_eq!(options.defaults.total_rounds, 5);
    assert_eq!(options.pin_attempts, 64);
    assert_eq!(options.command_buffer, 256);
}
