//! Configuration parsing and validation for wardend
//!
//! Supports TOML configuration with:
//! - Versioned schema
//! - The monitored target set and daily budget
//! - Host command wiring for detection and suppression
//! - Validation with clear error messages

mod policy;
mod schema;
mod validation;

pub use policy::*;
pub use schema::*;
pub use validation::*;

use std::path::Path;
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation failed: {errors:?}")]
    ValidationFailed { errors: Vec<ValidationError> },

    #[error("Unsupported config version: {0}")]
    UnsupportedVersion(u32),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Load and validate configuration from a TOML file
pub fn load_config(path: impl AsRef<Path>) -> ConfigResult<Config> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate configuration from a TOML string
pub fn parse_config(content: &str) -> ConfigResult<Config> {
    let raw: RawConfig = toml::from_str(content)?;

    // Check version
    if raw.config_version != CURRENT_CONFIG_VERSION {
        return Err(ConfigError::UnsupportedVersion(raw.config_version));
    }

    // Validate
    let errors = validate_config(&raw);
    if !errors.is_empty() {
        return Err(ConfigError::ValidationFailed { errors });
    }

    Ok(Config::from_raw(raw))
}

/// Current supported config version
pub const CURRENT_CONFIG_VERSION: u32 = 1;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minimal_config() {
        let config = r#"
            config_version = 1

            [monitor]
            targets = ["com.example.game", "com.example.video"]
            budget_seconds = 3600

            [host]
            detect = ["warden-detect"]
        "#;

        let config = parse_config(config).unwrap();
        assert_eq!(config.monitor.targets.len(), 2);
        assert_eq!(config.monitor.budget_seconds, 3600);
        assert_eq!(config.host.detect, vec!["warden-detect".to_string()]);
    }

    #[test]
    fn reject_wrong_version() {
        let config = r#"
            config_version = 99

            [monitor]
            targets = ["com.example.game"]
            budget_seconds = 60

            [host]
            detect = ["warden-detect"]
        "#;

        let result = parse_config(config);
        assert!(matches!(result, Err(ConfigError::UnsupportedVersion(99))));
    }

    #[test]
    fn reject_empty_targets() {
        let config = r#"
            config_version = 1

            [monitor]
            targets = []
            budget_seconds = 60

            [host]
            detect = ["warden-detect"]
        "#;

        let result = parse_config(config);
        assert!(matches!(result, Err(ConfigError::ValidationFailed { .. })));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
                config_version = 1

                [monitor]
                targets = ["com.example.game"]
                budget_seconds = 120

                [host]
                detect = ["warden-detect"]
            "#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.monitor.budget_seconds, 120);
    }
}
