//! Shared types for the wardend API

use serde::{Deserialize, Serialize};
use warden_util::{TargetId, format_duration};

/// Top-level engine mode
///
/// Transitions within a day are one-directional:
/// Idle -> Monitoring -> Blocking. Only the 24h cooldown expiry leaves
/// Blocking; only an explicit stop (while not blocking) returns to Idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineMode {
    Idle,
    Monitoring,
    Blocking,
}

impl EngineMode {
    pub fn is_active(self) -> bool {
        self != EngineMode::Idle
    }
}

/// Read-only view of the engine, served by `status()` without mutating state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub api_version: u32,
    pub mode: EngineMode,
    /// Seconds of budget left today (0 while blocking)
    pub remaining_seconds: u64,
    /// Seconds spent inside monitored targets today
    pub used_seconds: u64,
    /// Configured budget (0 when idle)
    pub budget_seconds: u64,
    /// The monitored target currently judged foreground, if any
    pub current_target: Option<TargetId>,
    pub monitored_count: usize,
}

/// Usage-milestone thresholds, in the order they are evaluated.
///
/// The ladder is descending on purpose: when usage jumps across several
/// thresholds in one tick, only the highest fires and the ones below are
/// skipped for the rest of the day.
pub const MILESTONE_LADDER: [u8; 3] = [70, 50, 30];

/// Lightweight notification categories delivered through the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    /// Periodic countdown refresh while monitoring
    Countdown,
    /// A usage milestone was reached
    Milestone,
    /// The budget is exhausted and blocking has begun
    TimeUp,
    /// A blocked target was suppressed
    Blocked,
    /// Foreground detection needs a permission grant
    PermissionRequired,
}

/// Payload for the full-screen milestone surface
///
/// Carries pre-formatted strings because the presentation layer renders them
/// verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MilestoneAlert {
    pub percentage: u8,
    pub remaining_seconds: u64,
    pub used_seconds: u64,
    pub budget_seconds: u64,
    pub remaining_text: String,
    pub used_text: String,
    pub total_text: String,
}

impl MilestoneAlert {
    pub fn new(percentage: u8, remaining: u64, used: u64, budget: u64) -> Self {
        Self {
            percentage,
            remaining_seconds: remaining,
            used_seconds: used,
            budget_seconds: budget,
            remaining_text: format_duration(remaining),
            used_text: format_duration(used),
            total_text: format_duration(budget),
        }
    }
}
