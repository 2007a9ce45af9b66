//! Validated configuration types

use std::path::PathBuf;
use warden_util::TargetId;

use crate::{RawConfig, RawHostConfig};

/// Fully validated configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub service: ServiceConfig,
    pub monitor: MonitorPolicy,
    pub host: HostCommands,
}

/// Daemon-level settings with defaults applied
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub data_dir: PathBuf,
    pub auto_start: bool,
}

/// The monitored set and its budget, immutable per monitoring run.
///
/// Replaced wholesale on each `start` call; starting is never additive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorPolicy {
    pub targets: Vec<TargetId>,
    pub budget_seconds: u64,
}

impl MonitorPolicy {
    pub fn new(targets: Vec<TargetId>, budget_seconds: u64) -> Self {
        Self {
            targets,
            budget_seconds,
        }
    }
}

/// Host command wiring with defaults applied
#[derive(Debug, Clone, Default)]
pub struct HostCommands {
    pub detect: Vec<String>,
    pub detect_window_ms: u64,
    pub home: Vec<String>,
    pub overlay: Vec<String>,
    pub terminate: Vec<String>,
    pub notify: Vec<String>,
}

/// Default detection window handed to the detect command
pub const DEFAULT_DETECT_WINDOW_MS: u64 = 5000;

impl Config {
    /// Convert a validated raw config into the typed form
    pub fn from_raw(raw: RawConfig) -> Self {
        let RawHostConfig {
            detect,
            detect_window_ms,
            home,
            overlay,
            terminate,
            notify,
        } = raw.host;

        Self {
            service: ServiceConfig {
                data_dir: raw
                    .service
                    .data_dir
                    .unwrap_or_else(warden_util::default_data_dir),
                auto_start: raw.service.auto_start,
            },
            monitor: MonitorPolicy {
                targets: raw.monitor.targets.into_iter().map(TargetId::from).collect(),
                budget_seconds: raw.monitor.budget_seconds,
            },
            host: HostCommands {
                detect,
                detect_window_ms: detect_window_ms.unwrap_or(DEFAULT_DETECT_WINDOW_MS),
                home,
                overlay,
                terminate,
                notify,
            },
        }
    }
}
