//! Events produced by the synchronous engine.
//!
//! These are the engine's outputs towards the controller, which turns them
//! into host side effects and published [`warden_api::Event`]s. They are not
//! serialized; the API-level event envelope is.

use warden_api::{MilestoneAlert, StatusSnapshot};
use warden_util::TargetId;

/// Outcome of a single engine operation, in the order they occurred
#[derive(Debug, Clone)]
pub enum CoreEvent {
    /// A monitoring run began (fresh or superseding a previous one)
    MonitoringStarted {
        targets: Vec<TargetId>,
        budget_seconds: u64,
    },

    /// Monitoring was stopped explicitly before the budget ran out
    MonitoringStopped { used_seconds: u64 },

    /// A usage milestone crossed its threshold this tick.
    ///
    /// The controller still has to request the full-screen surface; whether
    /// that succeeds determines the `fullscreen_shown` flag of the published
    /// event.
    MilestoneDue { alert: MilestoneAlert },

    /// The budget is spent; the engine is now Blocking and enforcement
    /// must begin
    BudgetExhausted {
        targets: Vec<TargetId>,
        /// The monitored target that was foreground when the budget ran out
        foreground: Option<TargetId>,
        used_seconds: u64,
        budget_seconds: u64,
    },

    /// Periodic foreground/usage refresh while monitoring
    ForegroundStatus {
        monitored_target_active: bool,
        current_target: Option<TargetId>,
        remaining_seconds: u64,
        used_seconds: u64,
    },

    /// Detection is unavailable until a permission is granted
    PermissionRequired,

    /// The 24h cooldown expired; the engine left Blocking
    BlockingExpired,

    /// State was restored from a persisted snapshot
    StateRestored(StatusSnapshot),
}
