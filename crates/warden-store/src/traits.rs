//! Store trait definitions

use chrono::{DateTime, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use warden_api::EngineMode;
use warden_util::TargetId;

use crate::{AuditEvent, StoreResult};

/// Main store trait
pub trait Store: Send + Sync {
    // State snapshot

    /// Load the last complete snapshot. A missing or unparseable snapshot is
    /// reported as `None`.
    fn load_snapshot(&self) -> StoreResult<Option<EngineSnapshot>>;

    /// Save a full state snapshot, replacing any previous one
    fn save_snapshot(&self, snapshot: &EngineSnapshot) -> StoreResult<()>;

    /// Remove the persisted snapshot (explicit stop, blocking expiry)
    fn clear_snapshot(&self) -> StoreResult<()>;

    // Audit log

    /// Append an audit event
    fn append_audit(&self, event: AuditEvent) -> StoreResult<()>;

    /// Get recent audit events, newest first
    fn get_recent_audits(&self, limit: usize) -> StoreResult<Vec<AuditEvent>>;

    // Health

    /// Check if the store is healthy
    fn is_healthy(&self) -> bool;
}

/// Serialized engine state for crash/restart recovery.
///
/// An open usage session is finalized into `used_seconds` before the snapshot
/// is taken, so the restart boundary closes the partial session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSnapshot {
    /// Timestamp of snapshot
    pub saved_at: DateTime<Local>,

    /// Engine mode at snapshot time
    pub mode: EngineMode,

    /// Monitored target set
    pub targets: Vec<TargetId>,

    /// Total budget, seconds
    pub budget_seconds: u64,

    /// Accumulated usage today, seconds
    pub used_seconds: u64,

    /// Milestone thresholds already fired today (subset of {30, 50, 70})
    pub milestones_fired: Vec<u8>,

    /// Calendar date of the last daily reset
    pub last_reset_date: NaiveDate,

    /// Whether 100% was reached for `last_reset_date`
    pub session_completed_today: bool,

    /// When blocking began; drives the 24h expiry across restarts
    pub blocking_started_at: Option<DateTime<Local>>,
}
