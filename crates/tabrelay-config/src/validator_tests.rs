use super::*;

#[test]
fn test_validate_default_config() {
    let config = Config::default();
    let result = ConfigValidator::validate(&config);
    assert!(result.is_valid());
    assert!(result.warnings.is_empty());
}

#[test]
fn test_validate_invalid_port() {
    let mut config = Config::default();
    config.relay.port = 0;

    let result = ConfigValidator::validate(&config);
    assert!(!result.is_valid());
    assert!(result.errors.iter().any(|e| e.path == "relay.port"));
}

#[test]
fn test_validate_zero_timeout_and_attempts() {
    let mut config = Config::default();
    config.relay.request_timeout_ms = 0;
    config.relay.connect_attempts = 0;

    let result = ConfigValidator::validate(&config);
    assert!(result.errors.iter().any(|e| e.path == "relay.request_timeout_ms"));
    assert!(result.errors.iter().any(|e| e.path == "relay.connect_attempts"));
}

#[test]
fn test_validate_relay_url_scheme() {
    let mut config = Config::default();
    config.dispatcher.relay_url = "http://127.0.0.1:8787".to_string();

    let result = ConfigValidator::validate(&config);
    assert!(result.errors.iter().any(|e| e.path == "dispatcher.relay_url"));
}

#[test]
fn test_validate_relay_url_garbage() {
    let mut config = Config::default();
    config.dispatcher.relay_url = "not a url".to_string();

    let result = ConfigValidator::validate(&config);
    assert!(!result.is_valid());
}

#[test]
fn test_validate_cdp_endpoint_scheme() {
    let mut config = Config::default();
    config.dispatcher.cdp_endpoint = "localhost:9222".to_string();

    let result = ConfigValidator::validate(&config);
    assert!(result.errors.iter().any(|e| e.path == "dispatcher.cdp_endpoint"));
}

#[test]
fn test_validate_slow_heartbeat_warning() {
    let mut config = Config::default();
    config.dispatcher.heartbeat_interval_ms = 90_000;

    let result = ConfigValidator::validate(&config);
    assert!(result.is_valid());
    assert!(
        result
            .warnings
            .iter()
            .any(|w| w.path == "dispatcher.heartbeat_interval_ms")
    );
}

#[test]
fn test_validate_public_host_warning() {
    let mut config = Config::default();
    config.relay.host = "0.0.0.0".to_string();

    let result = ConfigValidator::validate(&config);
    assert!(result.is_valid());
    assert!(result.warnings.iter().any(|w| w.path == "relay.host"));
}

#[test]
fn test_into_result_reports_first_error() {
    let mut config = Config::default();
    config.relay.port = 0;

    let err = ConfigValidator::validate(&config).into_result().unwrap_err();
    assert!(err.to_string().contains("relay.port"));
}

#[test]
fn test_into_result_passes_warnings_through() {
    let mut config = Config::default();
    config.dispatcher.reconnect_delay_ms = 0;

    let warnings = ConfigValidator::validate(&config).into_result().unwrap();
    assert_eq!(warnings.len(), 1);
}
