//! Configuration validation

use crate::RawConfig;
use std::collections::HashSet;
use thiserror::Error;

/// Validation error
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("Monitor config error: {0}")]
    MonitorError(String),

    #[error("Duplicate monitored target: {0}")]
    DuplicateTarget(String),

    #[error("Host command '{command}': {message}")]
    HostCommandError { command: String, message: String },
}

/// Validate a raw configuration
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if config.monitor.targets.is_empty() {
        errors.push(ValidationError::MonitorError(
            "at least one monitored target is required".into(),
        ));
    }

    if config.monitor.budget_seconds == 0 {
        errors.push(ValidationError::MonitorError(
            "budget_seconds must be greater than zero".into(),
        ));
    }

    let mut seen = HashSet::new();
    for target in &config.monitor.targets {
        if target.is_empty() {
            errors.push(ValidationError::MonitorError(
                "target identifiers cannot be empty".into(),
            ));
        } else if !seen.insert(target) {
            errors.push(ValidationError::DuplicateTarget(target.clone()));
        }
    }

    if config.host.detect.is_empty() {
        errors.push(ValidationError::HostCommandError {
            command: "detect".into(),
            message: "a detection command is required".into(),
        });
    }

    for (name, argv) in [
        ("detect", &config.host.detect),
        ("home", &config.host.home),
        ("overlay", &config.host.overlay),
        ("terminate", &config.host.terminate),
        ("notify", &config.host.notify),
    ] {
        if argv.iter().any(|a| a.trim().is_empty()) {
            errors.push(ValidationError::HostCommandError {
                command: name.into(),
                message: "argv elements cannot be empty".into(),
            });
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{RawHostConfig, RawMonitorConfig, RawServiceConfig};

    fn base_config() -> RawConfig {
        RawConfig {
            config_version: 1,
            service: RawServiceConfig::default(),
            monitor: RawMonitorConfig {
                targets: vec!["com.example.game".into()],
                budget_seconds: 3600,
            },
            host: RawHostConfig {
                detect: vec!["warden-detect".into()],
                ..Default::default()
            },
        }
    }

    #[test]
    fn valid_config_passes() {
        assert!(validate_config(&base_config()).is_empty());
    }

    #[test]
    fn zero_budget_rejected() {
        let mut config = base_config();
        config.monitor.budget_seconds = 0;
        let errors = validate_config(&config);
        assert!(
            errors
                .iter()
                .any(|e| matches!(e, ValidationError::MonitorError(_)))
        );
    }

    #[test]
    fn duplicate_targets_rejected() {
        let mut config = base_config();
        config.monitor.targets.push("com.example.game".into());
        let errors = validate_config(&config);
        assert!(
            errors
                .iter()
                .any(|e| matches!(e, ValidationError::DuplicateTarget(_)))
        );
    }

    #[test]
    fn missing_detect_rejected() {
        let mut config = base_config();
        config.host.detect.clear();
        let errors = validate_config(&config);
        assert!(
            errors
                .iter()
                .any(|e| matches!(e, ValidationError::HostCommandError { .. }))
        );
    }
}
