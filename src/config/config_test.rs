use serial_test::serial;
use temp_env::with_vars;

use super::*;

fn cleanup_all_vote_env_vars() {
    for (key, _) in std::env::vars() {
        if key.starts_with("VOTE__") || key == "CONFIG_PATH" {
            std::env::remove_var(&key);
        }
    }
}

#[test]
#[serial]
fn default_config_should_initialize_with_hardcoded_values() {
    let config = VoteServiceConfig::default();

    assert_eq!(config.storage.engine, StorageEngineKind::Sled);
    assert!(config.voting.enforce_window);
    assert_eq!(config.retry.transaction.max_retries, 5);
    assert_eq!(config.audit.sink, AuditSinkKind::Store);
    assert!(config.audit.fallback_enabled);
    assert!(!config.monitoring.prometheus_enabled);
}

#[test]
#[serial]
fn new_should_merge_environment_overrides() {
    cleanup_all_vote_env_vars();
    with_vars(
        vec![
            ("VOTE__RETRY__TRANSACTION__MAX_RETRIES", Some("9")),
            ("VOTE__STORAGE__ENGINE", Some("memory")),
        ],
        || {
            let config = VoteServiceConfig::new().unwrap();

            assert_eq!(config.retry.transaction.max_retries, 9);
            assert_eq!(config.storage.engine, StorageEngineKind::Memory);
        },
    );
}

#[test]
#[serial]
fn with_override_config_should_merge_file_settings() {
    cleanup_all_vote_env_vars();
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("vote_override.toml");

    std::fs::write(
        &config_path,
        r#"
        [storage]
        db_root_dir = "/tmp/ballots/db"

        [voting]
        enforce_window = false
        max_options = 8
        "#,
    )
    .unwrap();

    let empty_vars: Vec<(&str, Option<&str>)> = vec![];
    with_vars(empty_vars, || {
        let base_config = VoteServiceConfig::new().expect("success");
        let config = base_config
            .with_override_config(config_path.to_str().unwrap())
            .unwrap();

        assert_eq!(config.storage.db_root_dir.to_str(), Some("/tmp/ballots/db"));
        assert!(!config.voting.enforce_window);
        assert_eq!(config.voting.max_options, 8);
        // untouched sections keep their defaults
        assert_eq!(config.retry.transaction.base_delay_ms, 5);
    });
}

#[test]
#[serial]
fn environment_variables_should_have_highest_priority() {
    cleanup_all_vote_env_vars();
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("vote.toml");
    std::fs::write(
        &config_path,
        r#"
        [audit]
        sink = "tracing"

        [monitoring]
        prometheus_port = 9100
        "#,
    )
    .unwrap();

    with_vars(
        vec![
            ("CONFIG_PATH", Some(config_path.to_str().unwrap())),
            ("VOTE__MONITORING__PROMETHEUS_PORT", Some("9200")),
        ],
        || {
            let config = VoteServiceConfig::new().unwrap();

            assert_eq!(config.audit.sink, AuditSinkKind::Tracing);
            assert_eq!(config.monitoring.prometheus_port, 9200);
        },
    );
}

#[test]
#[serial]
fn missing_config_file_should_fail() {
    cleanup_all_vote_env_vars();
    with_vars(vec![("CONFIG_PATH", Some("/nonexistent/vote.toml"))], || {
        assert!(VoteServiceConfig::new().is_err());
    });
}

#[test]
fn validation_should_accept_defaults() {
    assert!(VoteServiceConfig::default().validate().is_ok());
}

#[test]
fn validation_should_reject_unbounded_transaction_retries() {
    let mut config = VoteServiceConfig::default();
    config.retry.transaction.max_retries = 0;

    assert!(config.validate().is_err());
}

#[test]
fn validation_should_reject_single_option_sessions() {
    let mut config = VoteServiceConfig::default();
    config.voting.max_options = 1;

    assert!(config.validate().is_err());
}

#[test]
fn validation_should_reject_privileged_metrics_port() {
    let mut config = VoteServiceConfig::default();
    config.monitoring.prometheus_enabled = true;
    config.monitoring.prometheus_port = 80;

    assert!(config.validate().is_err());
}

#[test]
fn validation_should_reject_empty_sled_directory() {
    let mut config = VoteServiceConfig::default();
    config.storage.db_root_dir = std::path::PathBuf::new();

    assert!(config.validate().is_err());

    let mut config = VoteServiceConfig::default();
    config.storage.engine = StorageEngineKind::Memory;
    config.storage.db_root_dir = std::path::PathBuf::new();

    assert!(config.validate().is_ok());
}

#[test]
fn debug_output_should_not_leak_voter_key_secret() {
    let mut config = VoteServiceConfig::default();
    config.voting.voter_key_secret = "pepper-123".to_string();

    assert!(!format!("{:?}", config).contains("pepper-123"));
}
