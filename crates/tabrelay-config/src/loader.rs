//! Configuration loader.

use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;

use crate::error::ConfigError;
use crate::schema::Config;

/// Configuration loader with environment variable substitution.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let content = fs::read_to_string(path)?;
        Self::load_str(&content)
    }

    /// Load configuration from a string.
    pub fn load_str(content: &str) -> Result<Config, ConfigError> {
        let expanded = Self::expand_env_vars(content)?;
        let config: Config = toml::from_str(&expanded)?;
        Ok(config)
    }

    /// Load from `path` if given, else from the default location.
    ///
    /// An explicit path must exist; a missing default file yields the
    /// built-in defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Config, ConfigError> {
        match path {
            Some(p) => Self::load(p),
            None => match Self::default_path() {
                Some(p) if p.exists() => Self::load(&p),
                _ => Ok(Config::default()),
            },
        }
    }

    /// Default config file location (`~/.tabrelay/config.toml`).
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".tabrelay").join("config.toml"))
    }

    /// Expand environment variables in the format `${VAR}`.
    fn expand_env_vars(content: &str) -> Result<String, ConfigError> {
        let mut result = content.to_string();
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ConfigError::InvalidValue {
            field: "env pattern".to_string(),
            message: e.to_string(),
        })?;

        for cap in re.captures_iter(content) {
            let var_name = &cap[1];
            let var_value = std::env::var(var_name)
                .map_err(|_| ConfigError::EnvVarNotSet(var_name.to_string()))?;
            result = result.replace(&cap[0], &var_value);
        }

        Ok(result)
    }

    /// Expand shell-style paths (e.g., `~/.tabrelay`).
    pub fn expand_path(path: &str) -> String {
        shellexpand::tilde(path).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_empty_config() {
        let config = ConfigLoader::load_str("").unwrap();
        assert_eq!(config.relay.port, 8787);
        assert_eq!(config.dispatcher.heartbeat_interval_ms, 20_000);
    }

    #[test]
    fn test_load_full_config() {
        let content = r#"
            [relay]
            host = "0.0.0.0"
            port = 9787
            request_timeout_ms = 2500
            connect_attempts = 3

            [dispatcher]
            relay_url = "ws://10.0.0.2:9787"
            reconnect_delay_ms = 500

            [server]
            name = "my-bridge"

            [logging]
            level = "debug"
            file = true
        "#;
        let config = ConfigLoader::load_str(content).unwrap();
        assert_eq!(config.relay.address(), "0.0.0.0:9787");
        assert_eq!(config.relay.request_timeout_ms, 2500);
        assert_eq!(config.relay.connect_attempts, 3);
        assert_eq!(config.dispatcher.relay_url, "ws://10.0.0.2:9787");
        assert_eq!(config.dispatcher.reconnect_delay_ms, 500);
        assert_eq!(config.server.name, "my-bridge");
        assert_eq!(config.server.version, "0.1.0");
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.file);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[relay]").unwrap();
        writeln!(file, "port = 5000").unwrap();

        let config = ConfigLoader::load(file.path()).unwrap();
        assert_eq!(config.relay.port, 5000);
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = ConfigLoader::load(Path::new("/nonexistent/path/config.toml"));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_load_or_default_explicit_missing() {
        let result = ConfigLoader::load_or_default(Some(Path::new("/nonexistent/tabrelay.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_or_default_explicit_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[server]").unwrap();
        writeln!(file, "version = \"9.9.9\"").unwrap();

        let config = ConfigLoader::load_or_default(Some(file.path())).unwrap();
        assert_eq!(config.server.version, "9.9.9");
    }

    #[test]
    fn test_load_invalid_toml() {
        let result = ConfigLoader::load_str("invalid = [unclosed");
        assert!(matches!(result, Err(ConfigError::TomlParse(_))));
    }

    #[test]
    fn test_expand_env_vars() {
        // SAFETY: test-only variable name, not read elsewhere
        unsafe {
            std::env::set_var("TABRELAY_TEST_RELAY_HOST", "192.168.1.5");
        }
        let config = ConfigLoader::load_str("[relay]\nhost = \"${TABRELAY_TEST_RELAY_HOST}\"").unwrap();
        assert_eq!(config.relay.host, "192.168.1.5");
        unsafe {
            std::env::remove_var("TABRELAY_TEST_RELAY_HOST");
        }
    }

    #[test]
    fn test_expand_env_vars_not_set() {
        let content = "value = \"${TABRELAY_NONEXISTENT_VAR_12345}\"";
        let result = ConfigLoader::expand_env_vars(content);
        assert!(matches!(result, Err(ConfigError::EnvVarNotSet(_))));
    }

    #[test]
    fn test_expand_path() {
        assert_eq!(ConfigLoader::expand_path("/var/log/tabrelay"), "/var/log/tabrelay");
        let expanded = ConfigLoader::expand_path("~/.tabrelay");
        assert!(!expanded.starts_with('~'));
        assert!(expanded.ends_with("/.tabrelay"));
    }
}
