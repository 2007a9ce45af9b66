//! Async controller: polling loops, progress surface and enforcement.
//!
//! Wraps the synchronous [`Engine`] behind a `tokio::sync::Mutex` and drives
//! it from a 1 s accounting poll plus a 1 s progress loop. When the budget
//! runs out it spawns the enforcement task group: an initial suppression
//! burst, three repeating sweeps at different cadences and a one-shot expiry
//! timer, all cancelled together through a single `watch` channel.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};
use tokio::sync::{Mutex, broadcast, watch};
use tokio::time::{MissedTickBehavior, interval, sleep};
use tracing::{debug, error, info, warn};
use warden_api::{API_VERSION, EngineMode, Event, EventPayload, NoticeKind, StatusSnapshot};
use warden_config::MonitorPolicy;
use warden_host_api::{Host, HostError};
use warden_store::Store;
use warden_util::{Clock, Result, TargetId, format_duration};

use crate::{CoreEvent, Detection, Engine, StopOutcome};

/// Accounting poll cadence
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Countdown-notice refresh cadence
pub const PROGRESS_INTERVAL: Duration = Duration::from_secs(1);

/// Detection window for accounting polls
pub const ACCOUNTING_DETECT_WINDOW: Duration = Duration::from_millis(5000);

/// Detection window for enforcement sweeps; short so a freshly launched
/// target is spotted before it settles
pub const ENFORCEMENT_DETECT_WINDOW: Duration = Duration::from_millis(500);

/// Rounds of the initial suppression burst across the whole target set
pub const BURST_ROUNDS: u32 = 5;

/// Pause between burst rounds
pub const BURST_PAUSE: Duration = Duration::from_millis(100);

/// Rounds of the emergency sequence against the target that was foreground
/// when the budget ran out
pub const EMERGENCY_ROUNDS: u32 = 10;

/// Cadence of the fast suppression sweep while blocking
pub const FAST_SWEEP_INTERVAL: Duration = Duration::from_millis(50);

/// Cadence of the terminating sweep while blocking
pub const EMERGENCY_SWEEP_INTERVAL: Duration = Duration::from_millis(100);

/// Cadence of the launch watcher, the first line of defence against a
/// target being reopened
pub const LAUNCH_WATCH_INTERVAL: Duration = Duration::from_millis(25);

/// Blocking cooldown, seconds: 24 hours
pub const BLOCKING_COOLDOWN_SECONDS: i64 = 24 * 60 * 60;

/// The cooldown as a chrono duration
pub fn blocking_cooldown() -> chrono::Duration {
    chrono::Duration::seconds(BLOCKING_COOLDOWN_SECONDS)
}

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Longest single sleep of the expiry timer; re-reads the clock between
/// chunks so a wall-clock jump cannot overshoot the deadline by much
const EXPIRY_CHECK_CHUNK: Duration = Duration::from_secs(60);

pub struct Controller {
    engine: Mutex<Engine>,
    host: Arc<dyn Host>,
    clock: Arc<dyn Clock>,
    detect_window: Duration,
    events: broadcast::Sender<Event>,
    /// Cancellation handle for the running enforcement task group
    enforcement: Mutex<Option<watch::Sender<bool>>>,
}

impl Controller {
    pub fn new(
        store: Arc<dyn Store>,
        host: Arc<dyn Host>,
        clock: Arc<dyn Clock>,
        detect_window: Duration,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let engine = Engine::new(store, clock.now());
        Arc::new(Self {
            engine: Mutex::new(engine),
            host,
            clock,
            detect_window,
            events,
            enforcement: Mutex::new(None),
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    pub async fn start(self: &Arc<Self>, policy: MonitorPolicy) -> Result<()> {
        let now = self.clock.now();
        let events = self.engine.lock().await.start(policy, now)?;
        self.dispatch(events).await;
        Ok(())
    }

    pub async fn stop(self: &Arc<Self>) -> Result<StopOutcome> {
        let now = self.clock.now();
        let (outcome, events) = self.engine.lock().await.stop(now)?;
        self.dispatch(events).await;
        Ok(outcome)
    }

    pub async fn status(&self) -> StatusSnapshot {
        self.engine.lock().await.status(self.clock.now())
    }

    /// Restore persisted state after a restart. A restored Blocking run
    /// immediately re-arms its enforcement group and expiry timer, anchored
    /// to the original blocking start.
    pub async fn restore(self: &Arc<Self>) -> Result<()> {
        let now = self.clock.now();
        let events = self.engine.lock().await.restore(now)?;
        self.dispatch(events).await;

        if self.engine.lock().await.mode() == EngineMode::Blocking {
            self.begin_blocking(None).await;
        }
        Ok(())
    }

    /// Main loop: accounting polls and progress notices until `shutdown`
    /// flips. Enforcement tasks live outside this loop and are cancelled on
    /// the way out; the persisted snapshot carries blocking across restarts.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut poll = interval(POLL_INTERVAL);
        poll.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut progress = interval(PROGRESS_INTERVAL);
        progress.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!("Controller loop running");
        loop {
            tokio::select! {
                _ = poll.tick() => self.poll_once().await,
                _ = progress.tick() => self.progress_once().await,
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        self.cancel_enforcement().await;
        self.publish(EventPayload::Shutdown);
        info!("Controller loop stopped");
    }

    /// One accounting poll: detect, tick, dispatch
    async fn poll_once(self: &Arc<Self>) {
        let detection = match self.engine.lock().await.mode() {
            EngineMode::Idle => return,
            // No detection needed; the tick only keeps the daily boundary
            // current while blocked
            EngineMode::Blocking => Detection::Observed(None),
            EngineMode::Monitoring => {
                match self.host.detect_foreground(self.detect_window).await {
                    Ok(foreground) => Detection::Observed(foreground),
                    Err(HostError::PermissionDenied(reason)) => {
                        debug!(reason = %reason, "Detection lacks permission");
                        Detection::PermissionRequired
                    }
                    Err(e) => {
                        warn!(error = %e, "Foreground detection failed, skipping tick");
                        return;
                    }
                }
            }
        };

        let now = self.clock.now();
        let events = match self.engine.lock().await.tick(detection, now) {
            Ok(events) => events,
            Err(e) => {
                error!(error = %e, "Engine tick failed");
                return;
            }
        };
        self.dispatch(events).await;
    }

    /// Refresh the countdown notice while monitoring
    async fn progress_once(&self) {
        let status = self.engine.lock().await.status(self.clock.now());
        if status.mode != EngineMode::Monitoring {
            return;
        }

        let text = format!(
            "{} of {} left",
            format_duration(status.remaining_seconds),
            format_duration(status.budget_seconds)
        );
        if let Err(e) = self.host.notify(NoticeKind::Countdown, &text).await {
            debug!(error = %e, "Countdown notice failed");
        }
    }

    /// Turn engine events into host side effects and published API events
    async fn dispatch(self: &Arc<Self>, events: Vec<CoreEvent>) {
        for event in events {
            match event {
                CoreEvent::MonitoringStarted {
                    targets,
                    budget_seconds,
                } => {
                    self.publish(EventPayload::MonitoringStarted {
                        targets,
                        budget_seconds,
                    });
                }

                CoreEvent::MonitoringStopped { used_seconds } => {
                    self.publish(EventPayload::MonitoringStopped { used_seconds });
                }

                CoreEvent::MilestoneDue { alert } => {
                    // The milestone surface yields to the blocking surface;
                    // the lightweight notice is delivered either way.
                    let fullscreen_shown = match self.host.show_milestone_overlay(&alert).await {
                        Ok(outcome) => outcome.shown(),
                        Err(e) => {
                            warn!(error = %e, "Milestone overlay failed");
                            false
                        }
                    };
                    let text = format!(
                        "{}% of your time is used, {} left",
                        alert.percentage, alert.remaining_text
                    );
                    self.notify(NoticeKind::Milestone, &text).await;
                    self.publish(EventPayload::MilestoneReached {
                        alert,
                        fullscreen_shown,
                    });
                }

                CoreEvent::BudgetExhausted {
                    targets,
                    foreground,
                    used_seconds,
                    budget_seconds,
                } => {
                    self.publish(EventPayload::TimeUp {
                        terminated_targets: targets,
                        used_seconds,
                        budget_seconds,
                    });
                    self.notify(NoticeKind::TimeUp, "Time is up for today").await;
                    self.begin_blocking(foreground).await;
                }

                CoreEvent::ForegroundStatus {
                    monitored_target_active,
                    current_target,
                    remaining_seconds,
                    used_seconds,
                } => {
                    self.publish(EventPayload::ForegroundStatus {
                        monitored_target_active,
                        current_target,
                        remaining_seconds,
                        used_seconds,
                    });
                }

                CoreEvent::PermissionRequired => {
                    self.notify(
                        NoticeKind::PermissionRequired,
                        "Usage access is required to keep monitoring",
                    )
                    .await;
                    self.publish(EventPayload::PermissionRequired);
                }

                CoreEvent::BlockingExpired => {
                    self.publish(EventPayload::BlockingEnded);
                }

                CoreEvent::StateRestored(status) => {
                    self.publish(EventPayload::StateRestored(status));
                }
            }
        }
    }

    /// Spawn the enforcement task group under a fresh cancellation token
    async fn begin_blocking(self: &Arc<Self>, foreground: Option<TargetId>) {
        let (deadline, targets) = {
            let engine = self.engine.lock().await;
            let started = engine.blocking_started_at().unwrap_or_else(|| self.clock.now());
            (started + blocking_cooldown(), engine.targets().to_vec())
        };

        let (token, cancelled) = watch::channel(false);
        if let Some(previous) = self.enforcement.lock().await.replace(token) {
            let _ = previous.send(true);
        }

        info!(
            target_count = targets.len(),
            deadline = %deadline,
            "Enforcement started"
        );

        tokio::spawn(self.clone().enforcement_burst(
            targets.clone(),
            foreground,
            cancelled.clone(),
        ));
        tokio::spawn(self.clone().fast_sweep(targets.clone(), cancelled.clone()));
        tokio::spawn(
            self.clone()
                .emergency_sweep(targets.clone(), cancelled.clone()),
        );
        tokio::spawn(self.clone().launch_watcher(targets, cancelled.clone()));
        tokio::spawn(self.clone().expiry_oneshot(deadline, cancelled));
    }

    async fn cancel_enforcement(&self) {
        if let Some(token) = self.enforcement.lock().await.take() {
            let _ = token.send(true);
        }
    }

    /// Initial suppression burst, run once at enforcement start.
    ///
    /// If a monitored target was foreground at the moment the budget ran
    /// out, it gets the emergency sequence first.
    async fn enforcement_burst(
        self: Arc<Self>,
        targets: Vec<TargetId>,
        foreground: Option<TargetId>,
        mut cancelled: watch::Receiver<bool>,
    ) {
        if let Some(offender) = foreground {
            debug!(target = %offender, "Emergency sequence against foreground target");
            for _ in 0..EMERGENCY_ROUNDS {
                if *cancelled.borrow() {
                    return;
                }
                self.suppress(&offender, true).await;
            }
        }

        for round in 0..BURST_ROUNDS {
            if *cancelled.borrow() {
                return;
            }
            for target in &targets {
                self.suppress(target, true).await;
            }
            if round + 1 < BURST_ROUNDS {
                tokio::select! {
                    _ = sleep(BURST_PAUSE) => {}
                    _ = cancelled.changed() => return,
                }
            }
        }
        debug!("Suppression burst complete");
    }

    /// 50 ms sweep: push any monitored foreground target home and keep the
    /// blocking overlay up
    async fn fast_sweep(
        self: Arc<Self>,
        targets: Vec<TargetId>,
        mut cancelled: watch::Receiver<bool>,
    ) {
        loop {
            tokio::select! {
                _ = sleep(FAST_SWEEP_INTERVAL) => {}
                _ = cancelled.changed() => return,
            }
            if *cancelled.borrow() {
                return;
            }
            if let Some(target) = self.detect_offender(&targets).await {
                self.suppress(&target, false).await;
            }
        }
    }

    /// 100 ms sweep: terminate a monitored target that is still foreground
    async fn emergency_sweep(
        self: Arc<Self>,
        targets: Vec<TargetId>,
        mut cancelled: watch::Receiver<bool>,
    ) {
        loop {
            tokio::select! {
                _ = sleep(EMERGENCY_SWEEP_INTERVAL) => {}
                _ = cancelled.changed() => return,
            }
            if *cancelled.borrow() {
                return;
            }
            if let Some(target) = self.detect_offender(&targets).await {
                self.suppress(&target, true).await;
            }
        }
    }

    /// 25 ms watcher: the cheapest possible reaction to a target being
    /// relaunched, home-press only
    async fn launch_watcher(
        self: Arc<Self>,
        targets: Vec<TargetId>,
        mut cancelled: watch::Receiver<bool>,
    ) {
        loop {
            tokio::select! {
                _ = sleep(LAUNCH_WATCH_INTERVAL) => {}
                _ = cancelled.changed() => return,
            }
            if *cancelled.borrow() {
                return;
            }
            if self.detect_offender(&targets).await.is_some() {
                if let Err(e) = self.host.suppress_to_background().await {
                    debug!(error = %e, "Home press failed");
                }
            }
        }
    }

    /// Sleep until the cooldown deadline, then expire blocking
    async fn expiry_oneshot(
        self: Arc<Self>,
        deadline: DateTime<Local>,
        mut cancelled: watch::Receiver<bool>,
    ) {
        loop {
            let now = self.clock.now();
            if now >= deadline {
                break;
            }
            let remaining = (deadline - now)
                .to_std()
                .unwrap_or(Duration::ZERO)
                .min(EXPIRY_CHECK_CHUNK);
            tokio::select! {
                _ = sleep(remaining) => {}
                _ = cancelled.changed() => return,
            }
            if *cancelled.borrow() {
                return;
            }
        }

        self.cancel_enforcement().await;
        let now = self.clock.now();
        let events = match self.engine.lock().await.expire_blocking(now) {
            Ok(events) => events,
            Err(e) => {
                error!(error = %e, "Failed to expire blocking");
                return;
            }
        };
        // Published directly rather than through `dispatch`: expiry only
        // ever yields a cooldown-ended event, and routing it through the
        // dispatcher would make this spawned future recursive.
        if events
            .iter()
            .any(|e| matches!(e, CoreEvent::BlockingExpired))
        {
            self.publish(EventPayload::BlockingEnded);
        }
    }

    /// The monitored target currently foreground, if any, using the short
    /// enforcement detection window. Detection errors are swallowed here;
    /// the accounting poll reports them.
    async fn detect_offender(&self, targets: &[TargetId]) -> Option<TargetId> {
        match self.host.detect_foreground(ENFORCEMENT_DETECT_WINDOW).await {
            Ok(Some(target)) if targets.contains(&target) => Some(target),
            Ok(_) => None,
            Err(_) => None,
        }
    }

    /// One suppression round against a single target
    async fn suppress(&self, target: &TargetId, terminate: bool) {
        if let Err(e) = self.host.suppress_to_background().await {
            debug!(error = %e, "Home press failed");
        }
        if let Err(e) = self.host.show_blocking_overlay(target).await {
            debug!(error = %e, "Blocking overlay failed");
        }
        if terminate {
            if let Err(e) = self.host.terminate_target(target).await {
                debug!(target = %target, error = %e, "Terminate failed");
            }
        }
    }

    async fn notify(&self, kind: NoticeKind, text: &str) {
        if let Err(e) = self.host.notify(kind, text).await {
            debug!(error = %e, "Notice failed");
        }
    }

    fn publish(&self, payload: EventPayload) {
        // Nobody listening is fine
        let _ = self.events.send(Event {
            api_version: API_VERSION,
            timestamp: self.clock.now(),
            payload,
        });
    }
}
