//! Raw configuration schema (as parsed from TOML)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    /// Global daemon settings
    #[serde(default)]
    pub service: RawServiceConfig,

    /// The monitored set and its budget
    pub monitor: RawMonitorConfig,

    /// Host command wiring
    pub host: RawHostConfig,
}

/// Daemon-level settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawServiceConfig {
    /// Data directory for the store
    pub data_dir: Option<PathBuf>,

    /// Start monitoring immediately after the daemon comes up
    /// (a restored blocking/monitoring session always takes precedence)
    #[serde(default)]
    pub auto_start: bool,
}

/// Monitored-set definition
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawMonitorConfig {
    /// Target identifiers subject to the shared budget
    pub targets: Vec<String>,

    /// Total daily budget across all targets, in seconds
    pub budget_seconds: u64,
}

/// Host command wiring.
///
/// Every entry is an argv vector. `detect` must print the foreground target
/// identifier on stdout (empty output means "none"); exit code 77 signals a
/// missing usage-access permission. The suppression commands may substitute
/// `{target}` and `{percentage}` in their arguments. All of them are
/// best-effort.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawHostConfig {
    /// Foreground detection command (required)
    pub detect: Vec<String>,

    /// Detection window in milliseconds, appended to the `detect` argv
    pub detect_window_ms: Option<u64>,

    /// Bring the home surface forward
    #[serde(default)]
    pub home: Vec<String>,

    /// Show the full-screen blocking/milestone overlay
    #[serde(default)]
    pub overlay: Vec<String>,

    /// Best-effort target termination
    #[serde(default)]
    pub terminate: Vec<String>,

    /// Lightweight notification
    #[serde(default)]
    pub notify: Vec<String>,
}
