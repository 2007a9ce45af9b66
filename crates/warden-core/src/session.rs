//! Usage session accounting.
//!
//! A session opens when a monitored target becomes foreground and closes when
//! it leaves (or when monitoring stops, the budget runs out, or a snapshot is
//! taken). Elapsed time is wall-clock at 1-second granularity; the open
//! session's seconds are folded into the daily total only on close.

use chrono::{DateTime, Local};
use warden_util::{SessionId, TargetId};

/// An open foreground session on a monitored target
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveSession {
    pub id: SessionId,
    pub target: TargetId,
    pub started_at: DateTime<Local>,
}

impl ActiveSession {
    pub fn open(target: TargetId, now: DateTime<Local>) -> Self {
        Self {
            id: SessionId::new(),
            target,
            started_at: now,
        }
    }

    /// Whole seconds since the session opened, clamped at zero
    pub fn elapsed_seconds(&self, now: DateTime<Local>) -> u64 {
        now.signed_duration_since(self.started_at)
            .num_seconds()
            .max(0) as u64
    }

    pub fn close(self, now: DateTime<Local>) -> ClosedSession {
        let seconds = self.elapsed_seconds(now);
        ClosedSession {
            id: self.id,
            target: self.target,
            seconds,
        }
    }

    /// Re-anchor the session at `now`, discarding elapsed time.
    ///
    /// Used at the daily boundary so time spent before midnight is not
    /// double-counted into the new day.
    pub fn reanchor(&mut self, now: DateTime<Local>) {
        self.started_at = now;
    }
}

/// A finalized session, ready for the audit log
#[derive(Debug, Clone)]
pub struct ClosedSession {
    pub id: SessionId,
    pub target: TargetId,
    pub seconds: u64,
}
