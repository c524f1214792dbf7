use serial_test::serial;
use temp_env::with_vars;

use super::*;

fn cleanup_all_routing_env_vars() {
    for (key, _) in std::env::vars() {
        if key.starts_with("ROUTING__") || key == "CONFIG_PATH" {
            std::env::remove_var(&key);
        }
    }
}

fn dev_settings() -> Settings {
    let mut settings = Settings::default();
    settings.server.dev_mode = true;
    settings
}

#[test]
#[serial]
fn default_config_should_initialize_with_hardcoded_values() {
    let settings = Settings::default();

    assert_eq!(settings.server.listen_address.port(), 3000);
    assert!(!settings.server.dev_mode);
    assert!(!settings.monitoring.prometheus_enabled);
    assert_eq!(settings.monitoring.prometheus_port, 9100);
    assert_eq!(settings.stream.body_buffer_size, 64);
    assert_eq!(settings.stream.watcher_buffer_size, 1024);
    assert!(settings.auth.tokens.is_empty());
}

#[test]
#[serial]
fn load_should_merge_environment_overrides() {
    cleanup_all_routing_env_vars();
    with_vars(
        vec![
            ("ROUTING__SERVER__DEV_MODE", Some("true")),
            ("ROUTING__STREAM__BODY_BUFFER_SIZE", Some("8")),
        ],
        || {
            let settings = Settings::load(None).unwrap();

            assert!(settings.server.dev_mode);
            assert_eq!(settings.stream.body_buffer_size, 8);
        },
    );
}

#[test]
#[serial]
fn load_should_merge_explicit_file_settings() {
    cleanup_all_routing_env_vars();
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("routing.toml");
    std::fs::write(
        &config_path,
        r#"
        [server]
        listen_address = "127.0.0.1:8088"

        [monitoring]
        prometheus_enabled = true
        prometheus_port = 9200

        [[auth.tokens]]
        token = "secret"
        scopes = ["route.admin"]
        "#,
    )
    .unwrap();

    let empty_vars: Vec<(&str, Option<&str>)> = vec![];
    with_vars(empty_vars, || {
        let settings = Settings::load(config_path.to_str()).unwrap();

        assert_eq!(settings.server.listen_address.to_string(), "127.0.0.1:8088");
        assert!(settings.monitoring.prometheus_enabled);
        assert_eq!(settings.monitoring.prometheus_port, 9200);
        assert_eq!(
            settings.auth.tokens,
            vec![TokenGrant {
                token: "secret".into(),
                scopes: vec!["route.admin".into()],
            }]
        );
        assert!(settings.validate().is_ok());
    });
}

#[test]
#[serial]
fn environment_variables_should_have_highest_priority() {
    cleanup_all_routing_env_vars();
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("priority.toml");
    std::fs::write(
        &config_path,
        r#"
        [stream]
        watcher_buffer_size = 10
        "#,
    )
    .unwrap();

    with_vars(
        vec![
            ("CONFIG_PATH", Some(config_path.to_str().unwrap())),
            ("ROUTING__STREAM__WATCHER_BUFFER_SIZE", Some("20")),
        ],
        || {
            let settings = Settings::load(None).unwrap();
            assert_eq!(settings.stream.watcher_buffer_size, 20);
        },
    );
}

#[test]
#[serial]
fn missing_explicit_file_should_fail() {
    cleanup_all_routing_env_vars();
    let temp_dir = tempfile::tempdir().unwrap();
    let missing = temp_dir.path().join("absent.toml");

    let result = Settings::load(missing.to_str());
    assert!(matches!(result, Err(crate::Error::Config(_))));
}

#[test]
fn validation_should_require_token_grants_outside_dev_mode() {
    let settings = Settings::default();
    assert!(matches!(
        settings.validate(),
        Err(crate::Error::InvalidConfig(_))
    ));

    assert!(dev_settings().validate().is_ok());
}

#[test]
fn validation_should_reject_empty_token() {
    let mut settings = dev_settings();
    settings.auth.tokens.push(TokenGrant {
        token: "  ".into(),
        scopes: vec![],
    });

    assert!(settings.validate().is_err());
}

#[test]
fn validation_should_reject_privileged_metrics_port() {
    let mut settings = dev_settings();
    settings.monitoring.prometheus_enabled = true;
    settings.monitoring.prometheus_port = 80;
    assert!(settings.validate().is_err());

    settings.monitoring.prometheus_port = 0;
    assert!(settings.validate().is_err());

    settings.monitoring.prometheus_port = 9100;
    assert!(settings.validate().is_ok());
}

#[test]
fn validation_should_reject_metrics_port_shared_with_listener() {
    let mut settings = dev_settings();
    settings.monitoring.prometheus_enabled = true;
    settings.monitoring.prometheus_port = settings.server.listen_address.port();
    assert!(matches!(
        settings.validate(),
        Err(crate::Error::InvalidConfig(msg)) if msg.contains("listen port")
    ));

    // Same port is fine while the endpoint is off
    settings.monitoring.prometheus_enabled = false;
    assert!(settings.validate().is_ok());
}

#[test]
fn validation_should_reject_zero_buffers() {
    let mut settings = dev_settings();
    settings.stream.body_buffer_size = 0;
    assert!(settings.validate().is_err());

    let mut settings = dev_settings();
    settings.stream.watcher_buffer_size = 0;
    assert!(settings.validate().is_err());
}

#[test]
fn validation_should_reject_ephemeral_listen_port() {
    let mut settings = dev_settings();
    settings.server.listen_address = "127.0.0.1:0".parse().unwrap();
    assert!(settings.validate().is_err());
}
