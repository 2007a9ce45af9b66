//! Usage-milestone evaluation.
//!
//! Thresholds are checked as a descending else-if ladder: when usage jumps
//! across several thresholds between two ticks, only the highest one fires
//! and the lower ones are written off for the rest of the day. Each threshold
//! fires at most once per day; the flags are reset by the daily reset.

use warden_api::MILESTONE_LADDER;

/// Fired-today flags for the milestone thresholds
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MilestoneFlags {
    fired: Vec<u8>,
}

impl MilestoneFlags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from a persisted fired list, dropping unknown thresholds
    pub fn from_fired(fired: Vec<u8>) -> Self {
        Self {
            fired: fired
                .into_iter()
                .filter(|t| MILESTONE_LADDER.contains(t))
                .collect(),
        }
    }

    pub fn fired(&self) -> &[u8] {
        &self.fired
    }

    pub fn has_fired(&self, threshold: u8) -> bool {
        self.fired.contains(&threshold)
    }

    /// The threshold due at `percentage` used, if any.
    ///
    /// Walks the ladder from the top; the first threshold at or below the
    /// current percentage decides, fired or not. A fired one yields `None`.
    pub fn due(&self, percentage: u64) -> Option<u8> {
        for &threshold in &MILESTONE_LADDER {
            if percentage >= u64::from(threshold) {
                if self.has_fired(threshold) {
                    return None;
                }
                return Some(threshold);
            }
        }
        None
    }

    /// Record a fired threshold, writing off everything below it
    pub fn mark(&mut self, threshold: u8) {
        for &t in &MILESTONE_LADDER {
            if t <= threshold && !self.has_fired(t) {
                self.fired.push(t);
            }
        }
    }

    pub fn reset(&mut self) {
        self.fired.clear();
    }
}
