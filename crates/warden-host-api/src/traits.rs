//! Host collaborator traits

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use warden_api::{MilestoneAlert, NoticeKind};
use warden_util::TargetId;

/// Errors from host operations
#[derive(Debug, Error)]
pub enum HostError {
    #[error("Usage-access permission denied: {0}")]
    PermissionDenied(String),

    #[error("Detection failed: {0}")]
    DetectFailed(String),

    #[error("Action failed: {0}")]
    ActionFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type HostResult<T> = Result<T, HostError>;

/// Outcome of a full-screen overlay request.
///
/// The host owns a single full-screen slot (see [`crate::SurfaceRegistry`]);
/// a request is refused when the other surface kind already holds it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayOutcome {
    /// The overlay is up (or was already up for the same surface kind)
    Shown,
    /// An equivalent surface of the other kind holds the screen
    Refused,
}

impl OverlayOutcome {
    pub fn shown(self) -> bool {
        self == OverlayOutcome::Shown
    }
}

/// Host trait - implemented by platform-specific adapters.
///
/// All methods other than `detect_foreground` are fire-and-forget
/// side effects: callers log failures and move on.
#[async_trait]
pub trait Host: Send + Sync {
    /// Best-guess identifier of the application currently foreground,
    /// observed over the given window. `None` means nothing (or nothing
    /// attributable) was detected; the result may be stale.
    async fn detect_foreground(&self, window: Duration) -> HostResult<Option<TargetId>>;

    /// Ask the platform to bring its home surface forward
    async fn suppress_to_background(&self) -> HostResult<()>;

    /// Request the full-screen blocking overlay for a target
    async fn show_blocking_overlay(&self, target: &TargetId) -> HostResult<OverlayOutcome>;

    /// Request the full-screen milestone alert
    async fn show_milestone_overlay(&self, alert: &MilestoneAlert) -> HostResult<OverlayOutcome>;

    /// Best-effort request to stop/disable a target
    async fn terminate_target(&self, target: &TargetId) -> HostResult<()>;

    /// Fire-and-forget lightweight notification
    async fn notify(&self, kind: NoticeKind, message: &str) -> HostResult<()>;

    /// Optional: check if the host is healthy
    fn is_healthy(&self) -> bool {
        true
    }
}
