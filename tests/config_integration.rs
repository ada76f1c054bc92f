use newschat::config::AppConfig;
use serial_test::serial;
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

// Helper to clear environment variables that might interfere with tests
fn clear_env_vars() {
    unsafe {
        env::remove_var("NEWSCHAT_BACKEND__BASE_URL");
        env::remove_var("NEWSCHAT_CHAT__TITLE_MAX_CHARS");
        env::remove_var("NEWSCHAT_BACKEND_URL");
        env::remove_var("NEWSCHAT_STORE");
        env::remove_var("CONFIG_FILE");
    }
}

#[test]
#[serial]
fn test_default_config() {
    clear_env_vars();

    let config = AppConfig::load_from_args(["newschat"]).expect("Failed to load defaults");
    assert_eq!(config.backend.base_url, "http://localhost:3000");
    assert_eq!(config.backend.request_timeout(), Duration::from_secs(30));
    assert_eq!(config.storage.path, Path::new("newschat-store.json"));
    assert!(!config.storage.ephemeral);
    assert_eq!(config.chat.stream_idle_timeout(), Duration::from_secs(60));
    assert_eq!(config.chat.reveal_interval(), Duration::from_millis(20));
    assert_eq!(config.chat.title_max_chars, 50);
    assert_eq!(config.chat.default_title, "New Chat");
}

#[test]
#[serial]
fn test_env_override() {
    clear_env_vars();
    unsafe {
        env::set_var("NEWSCHAT_BACKEND__BASE_URL", "http://news.internal:8080");
        env::set_var("NEWSCHAT_CHAT__TITLE_MAX_CHARS", "20");
    }

    let config = AppConfig::load_from_args(["newschat"]).expect("Failed to load config");
    assert_eq!(config.backend.base_url, "http://news.internal:8080");
    assert_eq!(config.chat.title_max_chars, 20);

    clear_env_vars();
}

#[test]
#[serial]
fn test_cli_flags_win_over_env() {
    clear_env_vars();
    unsafe {
        env::set_var("NEWSCHAT_BACKEND__BASE_URL", "http://from-env:1");
    }

    let config = AppConfig::load_from_args([
        "newschat",
        "--backend-url",
        "http://from-cli:2",
        "--store",
        "/tmp/sessions.json",
        "--ephemeral",
    ])
    .expect("Failed to load config");
    assert_eq!(config.backend.base_url, "http://from-cli:2");
    assert_eq!(config.storage.path, Path::new("/tmp/sessions.json"));
    assert!(config.storage.ephemeral);

    clear_env_vars();
}

#[test]
#[serial]
fn test_file_load() {
    clear_env_vars();

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let file_path = dir.path().join("newschat.yaml");
    fs::write(
        &file_path,
        r"
backend:
  base_url: http://file-host:7070
chat:
  reveal_interval_ms: 5
",
    )
    .expect("Failed to write temp config");

    let config = AppConfig::load_from_args([
        "newschat",
        "--config",
        file_path.to_str().expect("utf-8 path"),
    ])
    .expect("Failed to load config from file");
    assert_eq!(config.backend.base_url, "http://file-host:7070");
    assert_eq!(config.chat.reveal_interval(), Duration::from_millis(5));
    // Untouched keys keep their defaults
    assert_eq!(config.backend.request_timeout_secs, 30);
}

#[test]
#[serial]
fn test_missing_explicit_config_file_is_an_error() {
    clear_env_vars();

    let result = AppConfig::load_from_args(["newschat", "--config", "/nonexistent/newschat.yaml"]);
    assert!(result.is_err());
}

#[test]
#[serial]
fn test_cwd_config_fallback() {
    clear_env_vars();

    // Create ./config.yaml
    let cwd_path = "config.yaml";
    fs::write(cwd_path, "chat:\n  default_title: Untitled\n")
        .expect("Failed to write ./config.yaml");

    let config = AppConfig::load_from_args(["newschat"]);

    fs::remove_file(cwd_path).unwrap();

    let config = config.expect("Failed to load config");
    assert_eq!(config.chat.default_title, "Untitled");
}
