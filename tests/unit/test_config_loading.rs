//! Unit Tests for Configuration Loading and Credentials

use std::fs;
use std::path::Path;

use aiderchat::config::credentials::Credential;
use aiderchat::config::loader::{ConfigFormat, ConfigLoader};
use aiderchat::{Config, Error};
use tempfile::TempDir;

#[test]
fn test_search_path_priority() {
    let temp_dir = TempDir::new().unwrap();
    let first = temp_dir.path().join("first.toml");
    let second = temp_dir.path().join("second.toml");
    fs::write(&first, "[assistant]\nmodel = \"first\"\n").unwrap();
    fs::write(&second, "[assistant]\nmodel = \"second\"\n").unwrap();

    let mut loader = ConfigLoader::new();
    loader.set_search_path(temp_dir.path().join("missing.toml"));
    assert_eq!(loader.load_first().unwrap(), Config::default());

    loader.set_search_path(second.clone());
    assert_eq!(loader.load_first().unwrap().assistant.model, "second");
    assert_eq!(loader.current_path(), Some(second.as_path()));
}

#[test]
fn test_full_config_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    fs::write(
        &path,
        r#"
[assistant]
binary = "/opt/aider/bin/aider"
model = "sonnet"
credential_env = "ANTHROPIC_API_KEY"
credential_provider = "anthropic"
auto_commits = true
extra_args = ["--no-pretty"]
working_directory = "/srv/project"

[relay]
poll_timeout_ms = 250
log_tail_lines = 40

[logging]
level = "debug"
"#,
    )
    .unwrap();

    let config = ConfigLoader::load_from_file(&path).unwrap();
    assert_eq!(config.assistant.binary, "/opt/aider/bin/aider");
    assert_eq!(config.assistant.credential_env, "ANTHROPIC_API_KEY");
    assert!(config.assistant.auto_commits);
    assert_eq!(config.relay.poll_timeout_ms, 250);
    assert_eq!(config.relay.log_tail_lines, 40);
    // Unset relay fields keep their defaults
    assert_eq!(config.relay.idle_backoff_ms, 10);
    assert_eq!(config.logging.level, "debug");

    let credential = Credential::new("ANTHROPIC_API_KEY", "key-1".to_string());
    let spec = config.assistant.launch_spec(&credential);
    assert_eq!(spec.program(), "/opt/aider/bin/aider");
    assert!(spec.args().contains(&"anthropic=key-1".to_string()));
    assert!(spec.args().contains(&"--auto-commits".to_string()));
    assert_eq!(spec.args().last().map(String::as_str), Some("--no-pretty"));
    assert!(!spec.to_string().contains("key-1"));
}

#[test]
fn test_invalid_values_are_rejected_on_load() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    fs::write(&path, "[relay]\npoll_timeout_ms = 60000\n").unwrap();

    match ConfigLoader::load_from_file(&path) {
        Err(e @ Error::ConfigValidationFailed { .. }) => assert!(e.is_fatal_config()),
        other => panic!("Expected validation failure, got {:?}", other),
    }
}

#[test]
fn test_wrong_type_is_parse_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    fs::write(&path, "[relay]\nlog_tail_lines = \"many\"\n").unwrap();

    assert!(matches!(
        ConfigLoader::load_from_file(&path),
        Err(Error::ConfigParseFailed { .. })
    ));
}

#[test]
fn test_format_from_extension() {
    assert_eq!(ConfigFormat::from_path(Path::new("a.json")), ConfigFormat::Json);
    assert_eq!(ConfigFormat::from_path(Path::new("a.toml")), ConfigFormat::Toml);
    assert_eq!(ConfigFormat::from_path(Path::new("config")), ConfigFormat::Toml);
}

#[test]
fn test_credential_from_environment() {
    let var = "AIDERCHAT_TEST_CREDENTIAL_PRESENT";
    std::env::set_var(var, "sk-from-env");
    let credential = Credential::from_env(var).unwrap();
    assert_eq!(credential.expose(), "sk-from-env");
    assert_eq!(credential.source(), var);

    let blank = "AIDERCHAT_TEST_CREDENTIAL_BLANK";
    std::env::set_var(blank, "   ");
    match Credential::from_env(blank) {
        Err(e @ Error::MissingCredential { .. }) => assert!(e.is_fatal_config()),
        other => panic!("Expected MissingCredential, got {:?}", other),
    }
}
