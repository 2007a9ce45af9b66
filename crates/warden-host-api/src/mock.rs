//! Mock host for testing

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use warden_api::{MilestoneAlert, NoticeKind};
use warden_util::TargetId;

use crate::{Host, HostError, HostResult, OverlayOutcome, SurfaceKind, SurfaceRegistry};

/// Mock host for unit/integration testing.
///
/// The scripted foreground result is returned from `detect_foreground` until
/// changed; every suppression primitive records its invocation so tests can
/// assert on the enforcement traffic.
pub struct MockHost {
    registry: SurfaceRegistry,

    foreground: Mutex<Option<TargetId>>,

    /// When true, detection reports a missing usage-access permission
    pub permission_denied: Mutex<bool>,

    /// When true, overlays stay acquired until the test releases them
    /// through [`MockHost::registry`]; otherwise they are released as soon
    /// as they are shown.
    pub hold_surfaces: Mutex<bool>,

    home_requests: AtomicU64,
    terminations: Mutex<Vec<TargetId>>,
    blocking_overlays: Mutex<Vec<TargetId>>,
    milestone_overlays: Mutex<Vec<u8>>,
    notices: Mutex<Vec<(NoticeKind, String)>>,
}

impl MockHost {
    pub fn new() -> Self {
        Self {
            registry: SurfaceRegistry::new(),
            foreground: Mutex::new(None),
            permission_denied: Mutex::new(false),
            hold_surfaces: Mutex::new(false),
            home_requests: AtomicU64::new(0),
            terminations: Mutex::new(Vec::new()),
            blocking_overlays: Mutex::new(Vec::new()),
            milestone_overlays: Mutex::new(Vec::new()),
            notices: Mutex::new(Vec::new()),
        }
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Script the detector output
    pub fn set_foreground(&self, target: Option<TargetId>) {
        *self.foreground.lock().unwrap() = target;
    }

    pub fn set_permission_denied(&self, denied: bool) {
        *self.permission_denied.lock().unwrap() = denied;
    }

    pub fn registry(&self) -> &SurfaceRegistry {
        &self.registry
    }

    pub fn home_request_count(&self) -> u64 {
        self.home_requests.load(Ordering::SeqCst)
    }

    pub fn terminations(&self) -> Vec<TargetId> {
        self.terminations.lock().unwrap().clone()
    }

    pub fn blocking_overlays(&self) -> Vec<TargetId> {
        self.blocking_overlays.lock().unwrap().clone()
    }

    pub fn milestone_overlays(&self) -> Vec<u8> {
        self.milestone_overlays.lock().unwrap().clone()
    }

    pub fn notices(&self) -> Vec<(NoticeKind, String)> {
        self.notices.lock().unwrap().clone()
    }

    fn show(&self, kind: SurfaceKind) -> OverlayOutcome {
        if !self.registry.try_acquire(kind) {
            return OverlayOutcome::Refused;
        }
        if !*self.hold_surfaces.lock().unwrap() {
            self.registry.release(kind);
        }
        OverlayOutcome::Shown
    }
}

impl Default for MockHost {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Host for MockHost {
    async fn detect_foreground(&self, _window: Duration) -> HostResult<Option<TargetId>> {
        if *self.permission_denied.lock().unwrap() {
            return Err(HostError::PermissionDenied(
                "usage access not granted".into(),
            ));
        }
        Ok(self.foreground.lock().unwrap().clone())
    }

    async fn suppress_to_background(&self) -> HostResult<()> {
        self.home_requests.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn show_blocking_overlay(&self, target: &TargetId) -> HostResult<OverlayOutcome> {
        self.blocking_overlays.lock().unwrap().push(target.clone());
        Ok(self.show(SurfaceKind::Blocking))
    }

    async fn show_milestone_overlay(&self, alert: &MilestoneAlert) -> HostResult<OverlayOutcome> {
        self.milestone_overlays
            .lock()
            .unwrap()
            .push(alert.percentage);
        Ok(self.show(SurfaceKind::Milestone))
    }

    async fn terminate_target(&self, target: &TargetId) -> HostResult<()> {
        self.terminations.lock().unwrap().push(target.clone());
        Ok(())
    }

    async fn notify(&self, kind: NoticeKind, message: &str) -> HostResult<()> {
        self.notices
            .lock()
            .unwrap()
            .push((kind, message.to_string()));
        Ok(())
    }
}
