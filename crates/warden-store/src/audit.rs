//! Audit event types

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use warden_util::{SessionId, TargetId};

/// Types of audit events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEventType {
    /// Daemon started
    ServiceStarted,

    /// Daemon stopped
    ServiceStopped,

    /// Monitoring started (fresh config)
    MonitoringStarted {
        target_count: usize,
        budget_seconds: u64,
    },

    /// Monitoring stopped explicitly
    MonitoringStopped { used_seconds: u64 },

    /// A foreground usage session opened
    SessionOpened {
        session_id: SessionId,
        target: TargetId,
    },

    /// A foreground usage session closed
    SessionClosed {
        session_id: SessionId,
        target: TargetId,
        seconds: u64,
    },

    /// A usage milestone fired
    MilestoneReached { percentage: u8, used_seconds: u64 },

    /// Budget exhausted; blocking began
    BlockingStarted {
        target_count: usize,
        used_seconds: u64,
    },

    /// 24h cooldown expired
    BlockingExpired,

    /// Day boundary crossed; daily counters were reset
    DailyReset { previous_used_seconds: u64 },

    /// State restored from a persisted snapshot after a restart
    StateRestored { mode: String },
}

/// Full audit event with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique event ID
    pub id: i64,

    /// Event timestamp
    pub timestamp: DateTime<Local>,

    /// Event type and details
    pub event: AuditEventType,
}

impl AuditEvent {
    pub fn new(event: AuditEventType) -> Self {
        Self {
            id: 0, // Assigned by the store; populated on read-back
            timestamp: warden_util::now(),
            event,
        }
    }
}
