//! Event types for engine -> host streaming

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use warden_util::TargetId;

use crate::{API_VERSION, MilestoneAlert, StatusSnapshot};

/// Event envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub api_version: u32,
    pub timestamp: DateTime<Local>,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(payload: EventPayload) -> Self {
        Self {
            api_version: API_VERSION,
            timestamp: warden_util::now(),
            payload,
        }
    }
}

/// All possible events pushed by the engine to its host
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    /// Monitoring has started (fresh or superseding a prior run)
    MonitoringStarted {
        targets: Vec<TargetId>,
        budget_seconds: u64,
    },

    /// Monitoring was stopped explicitly before the budget ran out
    MonitoringStopped { used_seconds: u64 },

    /// A usage milestone (30/50/70%) fired
    MilestoneReached {
        alert: MilestoneAlert,
        /// False when the full-screen surface was skipped because the
        /// blocking surface already held the screen; the lightweight
        /// notification is still delivered.
        fullscreen_shown: bool,
    },

    /// The budget is spent; enforcement has begun
    TimeUp {
        terminated_targets: Vec<TargetId>,
        used_seconds: u64,
        budget_seconds: u64,
    },

    /// Foreground status changed or was refreshed
    ForegroundStatus {
        monitored_target_active: bool,
        current_target: Option<TargetId>,
        remaining_seconds: u64,
        used_seconds: u64,
    },

    /// Foreground detection is unavailable until a permission is granted
    PermissionRequired,

    /// The 24h blocking cooldown expired; engine returned to Idle
    BlockingEnded,

    /// Monitoring or blocking state was restored after a process restart
    StateRestored(StatusSnapshot),

    /// Engine is shutting down
    Shutdown,
}
