//! Full-screen surface mutual exclusion
//!
//! The milestone alert and the blocking overlay compete for the same
//! full-screen slot. The registry is the single owner of that slot: a
//! surface must `try_acquire` before showing and `release` when dismissed.
//! Re-acquiring the kind that already holds the slot succeeds (showing the
//! blocking overlay twice is idempotent); acquiring while the other kind
//! holds it fails, and the caller falls back to a notification.

use std::sync::{Arc, Mutex};

/// The two full-screen surface kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceKind {
    Milestone,
    Blocking,
}

/// Shared registry for the single full-screen slot
#[derive(Debug, Clone, Default)]
pub struct SurfaceRegistry {
    current: Arc<Mutex<Option<SurfaceKind>>>,
}

impl SurfaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to take (or keep) the full-screen slot for `kind`.
    /// Returns false when the other kind holds it.
    pub fn try_acquire(&self, kind: SurfaceKind) -> bool {
        let mut current = self.current.lock().unwrap();
        match *current {
            None => {
                *current = Some(kind);
                true
            }
            Some(held) => held == kind,
        }
    }

    /// Release the slot if `kind` holds it
    pub fn release(&self, kind: SurfaceKind) {
        let mut current = self.current.lock().unwrap();
        if *current == Some(kind) {
            *current = None;
        }
    }

    /// Which surface currently holds the slot, if any
    pub fn current(&self) -> Option<SurfaceKind> {
        *self.current.lock().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_and_release() {
        let registry = SurfaceRegistry::new();
        assert!(registry.try_acquire(SurfaceKind::Milestone));
        assert_eq!(registry.current(), Some(SurfaceKind::Milestone));

        registry.release(SurfaceKind::Milestone);
        assert_eq!(registry.current(), None);
    }

    #[test]
    fn same_kind_reacquires() {
        let registry = SurfaceRegistry::new();
        assert!(registry.try_acquire(SurfaceKind::Blocking));
        assert!(registry.try_acquire(SurfaceKind::Blocking));
    }

    #[test]
    fn other_kind_is_refused() {
        let registry = SurfaceRegistry::new();
        assert!(registry.try_acquire(SurfaceKind::Blocking));
        assert!(!registry.try_acquire(SurfaceKind::Milestone));

        // Releasing the wrong kind changes nothing
        registry.release(SurfaceKind::Milestone);
        assert_eq!(registry.current(), Some(SurfaceKind::Blocking));

        registry.release(SurfaceKind::Blocking);
        assert!(registry.try_acquire(SurfaceKind::Milestone));
    }
}
