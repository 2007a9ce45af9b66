//! In-memory engine state and its persisted form.

use chrono::{DateTime, Local, NaiveDate};
use warden_api::{API_VERSION, EngineMode, StatusSnapshot};
use warden_store::EngineSnapshot;
use warden_util::TargetId;

use crate::{ActiveSession, MilestoneFlags};

/// The engine's full mutable state.
///
/// Mutated only inside the engine's operation methods; everything else gets
/// read-only views through [`EngineState::status`].
#[derive(Debug, Clone)]
pub struct EngineState {
    pub mode: EngineMode,
    pub targets: Vec<TargetId>,
    pub budget_seconds: u64,
    /// Seconds accumulated in closed sessions today
    pub used_seconds: u64,
    pub active_session: Option<ActiveSession>,
    pub milestones: MilestoneFlags,
    pub last_reset_date: NaiveDate,
    /// Whether 100% was reached on `last_reset_date`
    pub session_completed_today: bool,
    pub blocking_started_at: Option<DateTime<Local>>,
}

impl EngineState {
    pub fn idle(now: DateTime<Local>) -> Self {
        Self {
            mode: EngineMode::Idle,
            targets: Vec::new(),
            budget_seconds: 0,
            used_seconds: 0,
            active_session: None,
            milestones: MilestoneFlags::new(),
            last_reset_date: now.date_naive(),
            session_completed_today: false,
            blocking_started_at: None,
        }
    }

    pub fn is_monitored(&self, target: &TargetId) -> bool {
        self.targets.contains(target)
    }

    /// Closed-session seconds plus the open session's elapsed time
    pub fn total_used(&self, now: DateTime<Local>) -> u64 {
        let open = self
            .active_session
            .as_ref()
            .map(|s| s.elapsed_seconds(now))
            .unwrap_or(0);
        self.used_seconds + open
    }

    pub fn remaining_seconds(&self, now: DateTime<Local>) -> u64 {
        self.budget_seconds.saturating_sub(self.total_used(now))
    }

    /// Percentage of the budget used, saturating at 100
    pub fn percentage_used(&self, now: DateTime<Local>) -> u64 {
        if self.budget_seconds == 0 {
            return 0;
        }
        (self.total_used(now) * 100 / self.budget_seconds).min(100)
    }

    /// Reset the daily counters for a new calendar day.
    ///
    /// Blocking is untouched: a blocked engine stays blocked across midnight
    /// until the 24h cooldown expires. An open session is re-anchored at
    /// `now` so pre-midnight time does not leak into the new day. Returns
    /// the previous day's used seconds.
    pub fn apply_daily_reset(&mut self, now: DateTime<Local>) -> u64 {
        let previous = self.total_used(now);
        self.used_seconds = 0;
        self.milestones.reset();
        self.session_completed_today = false;
        self.last_reset_date = now.date_naive();
        if let Some(session) = self.active_session.as_mut() {
            session.reanchor(now);
        }
        previous
    }

    pub fn needs_daily_reset(&self, now: DateTime<Local>) -> bool {
        now.date_naive() != self.last_reset_date
    }

    /// Read-only view for `status()` and API events
    pub fn status(&self, now: DateTime<Local>) -> StatusSnapshot {
        StatusSnapshot {
            api_version: API_VERSION,
            mode: self.mode,
            remaining_seconds: match self.mode {
                EngineMode::Monitoring => self.remaining_seconds(now),
                _ => 0,
            },
            used_seconds: self.total_used(now),
            budget_seconds: self.budget_seconds,
            current_target: self.active_session.as_ref().map(|s| s.target.clone()),
            monitored_count: self.targets.len(),
        }
    }

    /// Persisted form. The open session is finalized into `used_seconds`,
    /// so the restart boundary closes any partial session.
    pub fn to_snapshot(&self, now: DateTime<Local>) -> EngineSnapshot {
        EngineSnapshot {
            saved_at: now,
            mode: self.mode,
            targets: self.targets.clone(),
            budget_seconds: self.budget_seconds,
            used_seconds: self.total_used(now),
            milestones_fired: self.milestones.fired().to_vec(),
            last_reset_date: self.last_reset_date,
            session_completed_today: self.session_completed_today,
            blocking_started_at: self.blocking_started_at,
        }
    }

    pub fn from_snapshot(snapshot: EngineSnapshot) -> Self {
        Self {
            mode: snapshot.mode,
            targets: snapshot.targets,
            budget_seconds: snapshot.budget_seconds,
            used_seconds: snapshot.used_seconds,
            active_session: None,
            milestones: MilestoneFlags::from_fired(snapshot.milestones_fired),
            last_reset_date: snapshot.last_reset_date,
            session_completed_today: snapshot.session_completed_today,
            blocking_started_at: snapshot.blocking_started_at,
        }
    }
}
