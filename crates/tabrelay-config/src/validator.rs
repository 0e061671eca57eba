//! Configuration validation.

use url::Url;

use crate::error::ConfigError;
use crate::schema::Config;

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    /// Turn the first error, if any, into a [`ConfigError`].
    pub fn into_result(self) -> Result<Vec<ValidationWarning>, ConfigError> {
        match self.errors.into_iter().next() {
            Some(err) => Err(ConfigError::InvalidValue {
                field: err.path,
                message: err.message,
            }),
            None => Ok(self.warnings),
        }
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration.
    pub fn validate(config: &Config) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_relay(config, &mut result);
        Self::validate_dispatcher(config, &mut result);
        Self::validate_server(config, &mut result);

        result
    }

    fn validate_relay(config: &Config, result: &mut ValidationResult) {
        let relay = &config.relay;

        if relay.port == 0 {
            result.add_error(ValidationError::new("relay.port", "Port cannot be 0"));
        }

        if relay.host.is_empty() {
            result.add_error(ValidationError::new("relay.host", "Host cannot be empty"));
        }

        if relay.request_timeout_ms == 0 {
            result.add_error(ValidationError::new(
                "relay.request_timeout_ms",
                "request_timeout_ms must be greater than 0",
            ));
        }

        if relay.connect_attempts == 0 {
            result.add_error(ValidationError::new(
                "relay.connect_attempts",
                "connect_attempts must be greater than 0",
            ));
        }

        if relay.connect_poll_interval_ms == 0 {
            result.add_error(ValidationError::new(
                "relay.connect_poll_interval_ms",
                "connect_poll_interval_ms must be greater than 0",
            ));
        }

        if relay.host != "127.0.0.1" && relay.host != "localhost" && relay.host != "::1" {
            result.add_warning(ValidationWarning::new(
                "relay.host",
                format!(
                    "Relay listens on non-loopback host '{}'; the relay channel is unauthenticated",
                    relay.host
                ),
            ));
        }
    }

    fn validate_dispatcher(config: &Config, result: &mut ValidationResult) {
        let dispatcher = &config.dispatcher;

        match Url::parse(&dispatcher.relay_url) {
            Ok(url) if url.scheme() == "ws" || url.scheme() == "wss" => {}
            Ok(_) => result.add_error(ValidationError::new(
                "dispatcher.relay_url",
                "relay_url must start with ws:// or wss://",
            )),
            Err(e) => result.add_error(ValidationError::new(
                "dispatcher.relay_url",
                format!("Invalid URL: {}", e),
            )),
        }

        if !dispatcher.cdp_endpoint.starts_with("http://")
            && !dispatcher.cdp_endpoint.starts_with("https://")
        {
            result.add_error(ValidationError::new(
                "dispatcher.cdp_endpoint",
                "cdp_endpoint must start with http:// or https://",
            ));
        }

        if dispatcher.heartbeat_interval_ms == 0 {
            result.add_error(ValidationError::new(
                "dispatcher.heartbeat_interval_ms",
                "heartbeat_interval_ms must be greater than 0",
            ));
        } else if dispatcher.heartbeat_interval_ms >= config.relay.stale_after_ms {
            result.add_warning(ValidationWarning::new(
                "dispatcher.heartbeat_interval_ms",
                "heartbeat interval is not shorter than relay.stale_after_ms; connections will be reported stale",
            ));
        }

        if dispatcher.reconnect_delay_ms == 0 {
            result.add_warning(ValidationWarning::new(
                "dispatcher.reconnect_delay_ms",
                "reconnect_delay_ms is 0, reconnects will retry without pause",
            ));
        }
    }

    fn validate_server(config: &Config, result: &mut ValidationResult) {
        if config.server.name.is_empty() {
            result.add_error(ValidationError::new("server.name", "Server name cannot be empty"));
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
