//! The synchronous budget-enforcement engine.
//!
//! All mutation happens here, in five entry points: `start`, `stop`,
//! `restore`, `tick` and `expire_blocking`. Each takes `now` as an argument
//! and returns the [`CoreEvent`]s it produced; the controller translates
//! those into host side effects. The engine persists a full snapshot through
//! its store on every mutating call, so a crash at any point restarts from
//! the last completed tick.

use std::sync::Arc;

use chrono::{DateTime, Local};
use tracing::{debug, info, warn};
use warden_api::{EngineMode, MilestoneAlert, StatusSnapshot};
use warden_config::MonitorPolicy;
use warden_store::{AuditEvent, AuditEventType, Store};
use warden_util::{Result, TargetId, WardenError};

use crate::{ActiveSession, CoreEvent, EngineState};

/// What the foreground detector reported for this tick
#[derive(Debug, Clone, PartialEq)]
pub enum Detection {
    /// Detection ran; `None` means nothing attributable was foreground
    Observed(Option<TargetId>),
    /// Detection is unavailable until a permission is granted.
    /// Accounting and milestones are skipped for the tick.
    PermissionRequired,
}

/// Result of a stop request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    Stopped { used_seconds: u64 },
    /// Stop arrived while Blocking (or Idle) and was deliberately ignored
    Ignored,
}

pub struct Engine {
    state: EngineState,
    store: Arc<dyn Store>,
}

impl Engine {
    pub fn new(store: Arc<dyn Store>, now: DateTime<Local>) -> Self {
        Self {
            state: EngineState::idle(now),
            store,
        }
    }

    pub fn mode(&self) -> EngineMode {
        self.state.mode
    }

    pub fn targets(&self) -> &[TargetId] {
        &self.state.targets
    }

    pub fn blocking_started_at(&self) -> Option<DateTime<Local>> {
        self.state.blocking_started_at
    }

    /// Begin a monitoring run, superseding any previous one.
    ///
    /// Counters and milestone flags start from zero; resuming persisted
    /// usage after a restart goes through [`Engine::restore`] instead.
    /// Refused while Blocking.
    pub fn start(&mut self, policy: MonitorPolicy, now: DateTime<Local>) -> Result<Vec<CoreEvent>> {
        if policy.targets.is_empty() {
            return Err(WardenError::invalid_config("no targets to monitor"));
        }
        if policy.budget_seconds == 0 {
            return Err(WardenError::invalid_config("budget must be positive"));
        }
        if self.state.mode == EngineMode::Blocking {
            return Err(WardenError::Blocked);
        }

        if self.state.needs_daily_reset(now) {
            self.daily_reset(now);
        }

        // Superseding run: fold any open session into the audit trail, then
        // start the counters and the ladder over
        self.close_session(now);
        self.state.used_seconds = 0;
        self.state.milestones.reset();

        self.state.mode = EngineMode::Monitoring;
        self.state.targets = policy.targets.clone();
        self.state.budget_seconds = policy.budget_seconds;

        info!(
            target_count = policy.targets.len(),
            budget_seconds = policy.budget_seconds,
            used_seconds = self.state.used_seconds,
            "Monitoring started"
        );
        self.audit(AuditEventType::MonitoringStarted {
            target_count: policy.targets.len(),
            budget_seconds: policy.budget_seconds,
        });
        self.persist(now);

        Ok(vec![CoreEvent::MonitoringStarted {
            targets: policy.targets,
            budget_seconds: policy.budget_seconds,
        }])
    }

    /// Stop monitoring. While Blocking this is a no-op by design: the
    /// cooldown cannot be cancelled from the outside.
    pub fn stop(&mut self, now: DateTime<Local>) -> Result<(StopOutcome, Vec<CoreEvent>)> {
        match self.state.mode {
            EngineMode::Blocking => {
                warn!("Stop requested while blocking, ignoring");
                Ok((StopOutcome::Ignored, Vec::new()))
            }
            EngineMode::Idle => {
                debug!("Stop requested while idle, nothing to do");
                Ok((StopOutcome::Ignored, Vec::new()))
            }
            EngineMode::Monitoring => {
                self.close_session(now);
                let used_seconds = self.state.used_seconds;

                self.state.mode = EngineMode::Idle;
                self.state.targets.clear();
                self.state.budget_seconds = 0;

                info!(used_seconds, "Monitoring stopped");
                self.audit(AuditEventType::MonitoringStopped { used_seconds });
                self.clear_persisted();

                Ok((
                    StopOutcome::Stopped { used_seconds },
                    vec![CoreEvent::MonitoringStopped { used_seconds }],
                ))
            }
        }
    }

    /// Restore state from the persisted snapshot, if any.
    ///
    /// A snapshot from a previous day is daily-reset before resuming. A
    /// Blocking snapshot without a `blocking_started_at` timestamp has no
    /// anchored cooldown and expires immediately.
    pub fn restore(&mut self, now: DateTime<Local>) -> Result<Vec<CoreEvent>> {
        let snapshot = self
            .store
            .load_snapshot()
            .map_err(|e| WardenError::store(e.to_string()))?;

        let Some(snapshot) = snapshot else {
            debug!("No persisted state to restore");
            return Ok(Vec::new());
        };

        if snapshot.mode == EngineMode::Idle {
            debug!("Persisted state is idle, nothing to restore");
            return Ok(Vec::new());
        }

        self.state = EngineState::from_snapshot(snapshot);

        if self.state.needs_daily_reset(now) {
            self.daily_reset(now);
        }

        if self.state.mode == EngineMode::Blocking && self.state.blocking_started_at.is_none() {
            warn!("Restored blocking state has no start timestamp, expiring");
            return self.expire_blocking(now);
        }

        info!(
            mode = ?self.state.mode,
            used_seconds = self.state.used_seconds,
            target_count = self.state.targets.len(),
            "State restored"
        );
        self.audit(AuditEventType::StateRestored {
            mode: format!("{:?}", self.state.mode).to_lowercase(),
        });
        self.persist(now);

        Ok(vec![CoreEvent::StateRestored(self.state.status(now))])
    }

    /// One accounting tick.
    ///
    /// Strict order: daily reset first, then session accounting, then the
    /// 100% check, then the milestone ladder; the snapshot is persisted last
    /// so it reflects the whole tick.
    pub fn tick(&mut self, detection: Detection, now: DateTime<Local>) -> Result<Vec<CoreEvent>> {
        if self.state.mode == EngineMode::Idle {
            return Ok(Vec::new());
        }

        let mut events = Vec::new();

        if self.state.needs_daily_reset(now) {
            self.daily_reset(now);
        }

        if self.state.mode == EngineMode::Blocking {
            // Enforcement is the controller's business; the engine only
            // keeps the daily boundary current while blocked.
            self.persist(now);
            return Ok(events);
        }

        let foreground = match detection {
            Detection::PermissionRequired => {
                // Keep polling; the open session (if any) is left untouched
                // so a transient permission lapse does not shred accounting.
                debug!("Detection unavailable, permission required");
                events.push(CoreEvent::PermissionRequired);
                self.persist(now);
                return Ok(events);
            }
            Detection::Observed(foreground) => foreground,
        };

        let monitored = foreground
            .as_ref()
            .map(|t| self.state.is_monitored(t))
            .unwrap_or(false);

        self.account(foreground.clone(), monitored, now);

        let total = self.state.total_used(now);

        // Exhaustion preempts the ladder: a tick that crosses 100% shows
        // only the blocking surface, never a late milestone.
        if total >= self.state.budget_seconds {
            let foreground_target = foreground.filter(|_| monitored);
            events.push(self.enter_blocking(foreground_target, now));
            self.persist(now);
            return Ok(events);
        }

        let percentage = self.state.percentage_used(now);
        if let Some(threshold) = self.state.milestones.due(percentage) {
            self.state.milestones.mark(threshold);
            info!(threshold, used_seconds = total, "Milestone reached");
            self.audit(AuditEventType::MilestoneReached {
                percentage: threshold,
                used_seconds: total,
            });
            events.push(CoreEvent::MilestoneDue {
                alert: MilestoneAlert::new(
                    threshold,
                    self.state.remaining_seconds(now),
                    total,
                    self.state.budget_seconds,
                ),
            });
        }

        events.push(CoreEvent::ForegroundStatus {
            monitored_target_active: monitored,
            current_target: self.state.active_session.as_ref().map(|s| s.target.clone()),
            remaining_seconds: self.state.remaining_seconds(now),
            used_seconds: total,
        });

        self.persist(now);
        Ok(events)
    }

    /// The only exit from Blocking: the 24h cooldown ran out
    pub fn expire_blocking(&mut self, now: DateTime<Local>) -> Result<Vec<CoreEvent>> {
        if self.state.mode != EngineMode::Blocking {
            return Ok(Vec::new());
        }

        info!("Blocking cooldown expired");
        self.state = EngineState::idle(now);
        self.audit(AuditEventType::BlockingExpired);
        self.clear_persisted();

        Ok(vec![CoreEvent::BlockingExpired])
    }

    /// Read-only view; never mutates
    pub fn status(&self, now: DateTime<Local>) -> StatusSnapshot {
        self.state.status(now)
    }

    fn account(&mut self, foreground: Option<TargetId>, monitored: bool, now: DateTime<Local>) {
        let Some(fg) = foreground.filter(|_| monitored) else {
            // Nothing monitored is foreground; fold the open session, if any
            self.close_session(now);
            return;
        };

        let same_target = self
            .state
            .active_session
            .as_ref()
            .is_some_and(|open| open.target == fg);
        if same_target {
            // Time accrues implicitly while the session stays open
            return;
        }

        self.close_session(now);
        let session = ActiveSession::open(fg.clone(), now);
        debug!(target = %fg, session_id = %session.id, "Session opened");
        self.audit(AuditEventType::SessionOpened {
            session_id: session.id.clone(),
            target: fg,
        });
        self.state.active_session = Some(session);
    }

    /// Fold the open session (if any) into the daily total
    fn close_session(&mut self, now: DateTime<Local>) {
        if let Some(session) = self.state.active_session.take() {
            let closed = session.close(now);
            self.state.used_seconds += closed.seconds;
            debug!(
                target = %closed.target,
                session_id = %closed.id,
                seconds = closed.seconds,
                "Session closed"
            );
            self.audit(AuditEventType::SessionClosed {
                session_id: closed.id,
                target: closed.target,
                seconds: closed.seconds,
            });
        }
    }

    fn enter_blocking(&mut self, foreground: Option<TargetId>, now: DateTime<Local>) -> CoreEvent {
        self.close_session(now);
        self.state.mode = EngineMode::Blocking;
        self.state.session_completed_today = true;
        self.state.blocking_started_at = Some(now);

        info!(
            used_seconds = self.state.used_seconds,
            budget_seconds = self.state.budget_seconds,
            "Budget exhausted, blocking"
        );
        self.audit(AuditEventType::BlockingStarted {
            target_count: self.state.targets.len(),
            used_seconds: self.state.used_seconds,
        });

        CoreEvent::BudgetExhausted {
            targets: self.state.targets.clone(),
            foreground,
            used_seconds: self.state.used_seconds,
            budget_seconds: self.state.budget_seconds,
        }
    }

    fn daily_reset(&mut self, now: DateTime<Local>) {
        let previous = self.state.apply_daily_reset(now);
        info!(
            previous_used_seconds = previous,
            date = %now.date_naive(),
            "Daily reset"
        );
        self.audit(AuditEventType::DailyReset {
            previous_used_seconds: previous,
        });
    }

    /// Persist failures are logged; the in-memory state stays authoritative
    /// and the tick's events still go out.
    fn persist(&self, now: DateTime<Local>) {
        if let Err(e) = self.store.save_snapshot(&self.state.to_snapshot(now)) {
            warn!(error = %e, "Failed to persist snapshot");
        }
    }

    fn clear_persisted(&self) {
        if let Err(e) = self.store.clear_snapshot() {
            warn!(error = %e, "Failed to clear persisted snapshot");
        }
    }

    /// Audit failures are logged, never propagated
    fn audit(&self, event: AuditEventType) {
        if let Err(e) = self.store.append_audit(AuditEvent::new(event)) {
            warn!(error = %e, "Failed to append audit event");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;
    use chrono::Duration;
    use warden_store::{EngineSnapshot, SqliteStore, StoreError, StoreResult};

    /// Store whose snapshot writes can be made to fail on demand
    struct FailingStore {
        inner: SqliteStore,
        fail_saves: AtomicBool,
    }

    impl FailingStore {
        fn new() -> Self {
            Self {
                inner: SqliteStore::in_memory().unwrap(),
                fail_saves: AtomicBool::new(false),
            }
        }
    }

    impl Store for FailingStore {
        fn load_snapshot(&self) -> StoreResult<Option<EngineSnapshot>> {
            self.inner.load_snapshot()
        }

        fn save_snapshot(&self, snapshot: &EngineSnapshot) -> StoreResult<()> {
            if self.fail_saves.load(Ordering::SeqCst) {
                return Err(StoreError::Database("disk full".into()));
            }
            self.inner.save_snapshot(snapshot)
        }

        fn clear_snapshot(&self) -> StoreResult<()> {
            self.inner.clear_snapshot()
        }

        fn append_audit(&self, event: AuditEvent) -> StoreResult<()> {
            self.inner.append_audit(event)
        }

        fn get_recent_audits(&self, limit: usize) -> StoreResult<Vec<AuditEvent>> {
            self.inner.get_recent_audits(limit)
        }

        fn is_healthy(&self) -> bool {
            self.inner.is_healthy()
        }
    }

    fn game() -> TargetId {
        TargetId::new("com.example.game")
    }

    fn policy(budget: u64) -> MonitorPolicy {
        MonitorPolicy::new(vec![game()], budget)
    }

    fn engine() -> (Engine, Arc<dyn Store>) {
        let store: Arc<dyn Store> = Arc::new(SqliteStore::in_memory().unwrap());
        (Engine::new(store.clone(), Local::now()), store)
    }

    fn observed(target: &TargetId) -> Detection {
        Detection::Observed(Some(target.clone()))
    }

    /// Monitor a 10s budget with the game foreground until it exhausts
    fn drive_to_blocking(engine: &mut Engine, start: DateTime<Local>) {
        engine.start(policy(10), start).unwrap();
        engine.tick(observed(&game()), start).unwrap();
        engine
            .tick(observed(&game()), start + Duration::seconds(10))
            .unwrap();
        assert_eq!(engine.mode(), EngineMode::Blocking);
    }

    #[test]
    fn start_rejects_empty_policy() {
        let (mut engine, _) = engine();
        let now = Local::now();

        let err = engine.start(MonitorPolicy::new(vec![], 100), now);
        assert!(matches!(err, Err(WardenError::InvalidConfig(_))));

        let err = engine.start(MonitorPolicy::new(vec![game()], 0), now);
        assert!(matches!(err, Err(WardenError::InvalidConfig(_))));
    }

    #[test]
    fn continuous_usage_fires_each_milestone_once_then_blocks() {
        let (mut engine, _) = engine();
        let start = Local::now();
        engine.start(policy(100), start).unwrap();

        let mut milestones = Vec::new();
        let mut blocked_at = None;

        for second in 0..=110 {
            let now = start + Duration::seconds(second);
            for event in engine.tick(observed(&game()), now).unwrap() {
                match event {
                    CoreEvent::MilestoneDue { alert } => milestones.push(alert.percentage),
                    CoreEvent::BudgetExhausted { used_seconds, .. } => {
                        blocked_at.get_or_insert((second, used_seconds));
                    }
                    _ => {}
                }
            }
            if engine.mode() == EngineMode::Blocking {
                break;
            }
        }

        assert_eq!(milestones, vec![30, 50, 70]);
        assert_eq!(blocked_at, Some((100, 100)));
        assert_eq!(engine.mode(), EngineMode::Blocking);
        assert!(engine.blocking_started_at().is_some());
    }

    #[test]
    fn only_monitored_time_accrues() {
        let (mut engine, _) = engine();
        let start = Local::now();
        engine.start(policy(100), start).unwrap();

        // Alternate 10s in the monitored target, 10s elsewhere
        let mut now = start;
        for cycle in 0..4 {
            for _ in 0..10 {
                now += Duration::seconds(1);
                let detection = if cycle % 2 == 0 {
                    observed(&game())
                } else {
                    Detection::Observed(Some(TargetId::new("com.example.browser")))
                };
                engine.tick(detection, now).unwrap();
            }
        }

        assert_eq!(engine.status(now).used_seconds, 20);
        assert_eq!(engine.mode(), EngineMode::Monitoring);
    }

    #[test]
    fn usage_jump_fires_only_the_highest_milestone() {
        let (mut engine, _) = engine();
        let start = Local::now();
        engine.start(policy(100), start).unwrap();

        // 60s of steady use fires 30 and 50
        let mut milestones = Vec::new();
        let mut now = start;
        for _ in 0..60 {
            now += Duration::seconds(1);
            for event in engine.tick(observed(&game()), now).unwrap() {
                if let CoreEvent::MilestoneDue { alert } = event {
                    milestones.push(alert.percentage);
                }
            }
        }
        assert_eq!(milestones, vec![30, 50]);

        // A 25s gap between ticks inside one session: 60% -> 85%
        now += Duration::seconds(25);
        let events = engine.tick(observed(&game()), now).unwrap();
        let fired: Vec<u8> = events
            .iter()
            .filter_map(|e| match e {
                CoreEvent::MilestoneDue { alert } => Some(alert.percentage),
                _ => None,
            })
            .collect();
        assert_eq!(fired, vec![70]);
    }

    #[test]
    fn superseding_start_resets_counters() {
        let (mut engine, _) = engine();
        let start = Local::now();
        engine.start(policy(100), start).unwrap();
        engine.tick(observed(&game()), start).unwrap();
        engine
            .tick(observed(&game()), start + Duration::seconds(50))
            .unwrap();
        assert_eq!(engine.status(start + Duration::seconds(50)).used_seconds, 50);

        // Starting again supersedes: counters and the ladder start over
        let now = start + Duration::seconds(60);
        engine.start(policy(100), now).unwrap();
        assert_eq!(engine.status(now).used_seconds, 0);

        engine.tick(observed(&game()), now).unwrap();
        let events = engine
            .tick(observed(&game()), now + Duration::seconds(30))
            .unwrap();
        assert!(matches!(
            events.as_slice(),
            [
                CoreEvent::MilestoneDue { alert },
                CoreEvent::ForegroundStatus { .. }
            ] if alert.percentage == 30
        ));
    }

    #[test]
    fn jump_past_budget_blocks_without_late_milestone() {
        let (mut engine, store) = engine();
        let start = Local::now();
        engine.start(policy(100), start).unwrap();

        let mut now = start;
        for _ in 0..60 {
            now += Duration::seconds(1);
            engine.tick(observed(&game()), now).unwrap();
        }

        // 60% straight past the budget in one gap: only the blocking
        // surface, no late 70% milestone
        now += Duration::seconds(50);
        let events = engine.tick(observed(&game()), now).unwrap();
        assert!(matches!(
            events.as_slice(),
            [CoreEvent::BudgetExhausted { .. }]
        ));
        assert_eq!(engine.mode(), EngineMode::Blocking);
        let snapshot = store.load_snapshot().unwrap().unwrap();
        assert!(!snapshot.milestones_fired.contains(&70));
    }

    #[test]
    fn persist_failure_still_reports_exhaustion() {
        let store = Arc::new(FailingStore::new());
        let mut engine = Engine::new(store.clone(), Local::now());
        let start = Local::now();
        engine.start(policy(10), start).unwrap();
        engine.tick(observed(&game()), start).unwrap();

        // The store dies right before the 100% tick; the transition and
        // its event must survive on the in-memory state alone
        store.fail_saves.store(true, Ordering::SeqCst);
        let events = engine
            .tick(observed(&game()), start + Duration::seconds(10))
            .unwrap();

        assert!(
            events
                .iter()
                .any(|e| matches!(e, CoreEvent::BudgetExhausted { .. }))
        );
        assert_eq!(engine.mode(), EngineMode::Blocking);
    }

    #[test]
    fn stop_while_monitoring_clears_snapshot() {
        let (mut engine, store) = engine();
        let start = Local::now();
        engine.start(policy(100), start).unwrap();

        engine.tick(observed(&game()), start).unwrap();
        let now = start + Duration::seconds(10);
        engine.tick(observed(&game()), now).unwrap();
        assert!(store.load_snapshot().unwrap().is_some());

        let (outcome, events) = engine.stop(now + Duration::seconds(5)).unwrap();
        assert_eq!(outcome, StopOutcome::Stopped { used_seconds: 15 });
        assert!(matches!(
            events.as_slice(),
            [CoreEvent::MonitoringStopped { used_seconds: 15 }]
        ));
        assert_eq!(engine.mode(), EngineMode::Idle);
        assert!(store.load_snapshot().unwrap().is_none());
    }

    #[test]
    fn stop_while_blocking_is_ignored() {
        let (mut engine, store) = engine();
        let start = Local::now();
        drive_to_blocking(&mut engine, start);

        let (outcome, events) = engine.stop(start + Duration::seconds(11)).unwrap();
        assert_eq!(outcome, StopOutcome::Ignored);
        assert!(events.is_empty());
        assert_eq!(engine.mode(), EngineMode::Blocking);
        assert!(store.load_snapshot().unwrap().is_some());
    }

    #[test]
    fn start_while_blocking_is_refused() {
        let (mut engine, _) = engine();
        let start = Local::now();
        drive_to_blocking(&mut engine, start);

        let err = engine.start(policy(100), start + Duration::seconds(11));
        assert!(matches!(err, Err(WardenError::Blocked)));
    }

    #[test]
    fn restart_resumes_monitoring_with_carried_usage() {
        let (mut engine, store) = engine();
        let start = Local::now();
        engine.start(policy(100), start).unwrap();
        for second in 0..=40 {
            engine
                .tick(observed(&game()), start + Duration::seconds(second))
                .unwrap();
        }

        // New engine over the same store, as after a process restart
        let mut restarted = Engine::new(store.clone(), start);
        let now = start + Duration::seconds(60);
        let events = restarted.restore(now).unwrap();

        assert!(matches!(events.as_slice(), [CoreEvent::StateRestored(_)]));
        assert_eq!(restarted.mode(), EngineMode::Monitoring);
        assert_eq!(restarted.status(now).used_seconds, 40);

        // Milestone flags carried: 30% already fired, 50 is next
        restarted.tick(observed(&game()), now).unwrap();
        let events = restarted
            .tick(observed(&game()), now + Duration::seconds(10))
            .unwrap();
        assert!(matches!(
            events.as_slice(),
            [
                CoreEvent::MilestoneDue { alert },
                CoreEvent::ForegroundStatus { .. }
            ] if alert.percentage == 50
        ));
    }

    #[test]
    fn restart_resumes_blocking_with_original_anchor() {
        let (mut engine, store) = engine();
        let start = Local::now();
        drive_to_blocking(&mut engine, start);
        let anchor = engine.blocking_started_at().unwrap();

        let mut restarted = Engine::new(store, start);
        restarted.restore(start + Duration::seconds(300)).unwrap();

        assert_eq!(restarted.mode(), EngineMode::Blocking);
        assert_eq!(restarted.blocking_started_at(), Some(anchor));
    }

    #[test]
    fn restored_blocking_without_anchor_expires_immediately() {
        let (mut engine, store) = engine();
        let start = Local::now();
        drive_to_blocking(&mut engine, start);

        // Strip the anchor from the persisted snapshot
        let mut snapshot = store.load_snapshot().unwrap().unwrap();
        snapshot.blocking_started_at = None;
        store.save_snapshot(&snapshot).unwrap();

        let mut restarted = Engine::new(store.clone(), start);
        let events = restarted.restore(start + Duration::seconds(60)).unwrap();

        assert!(matches!(events.as_slice(), [CoreEvent::BlockingExpired]));
        assert_eq!(restarted.mode(), EngineMode::Idle);
        assert!(store.load_snapshot().unwrap().is_none());
    }

    #[test]
    fn restore_from_previous_day_resets_counters() {
        let (mut engine, store) = engine();
        let start = Local::now();
        engine.start(policy(100), start).unwrap();
        for second in 1..=40 {
            engine
                .tick(observed(&game()), start + Duration::seconds(second))
                .unwrap();
        }

        let mut restarted = Engine::new(store, start);
        let tomorrow = start + Duration::days(1);
        restarted.restore(tomorrow).unwrap();

        assert_eq!(restarted.mode(), EngineMode::Monitoring);
        assert_eq!(restarted.status(tomorrow).used_seconds, 0);
    }

    #[test]
    fn day_rollover_resets_counters_but_keeps_blocking() {
        let (mut engine, _) = engine();
        let start = Local::now();
        drive_to_blocking(&mut engine, start);

        let tomorrow = start + Duration::days(1);
        let events = engine.tick(observed(&game()), tomorrow).unwrap();

        assert!(events.is_empty());
        assert_eq!(engine.mode(), EngineMode::Blocking);
        assert_eq!(engine.status(tomorrow).used_seconds, 0);
    }

    #[test]
    fn permission_lapse_skips_accounting_and_keeps_session() {
        let (mut engine, _) = engine();
        let start = Local::now();
        engine.start(policy(100), start).unwrap();
        engine
            .tick(observed(&game()), start + Duration::seconds(10))
            .unwrap();

        let now = start + Duration::seconds(20);
        let events = engine.tick(Detection::PermissionRequired, now).unwrap();
        assert!(matches!(events.as_slice(), [CoreEvent::PermissionRequired]));

        // The open session survived the lapse and kept accruing
        let events = engine
            .tick(observed(&game()), start + Duration::seconds(30))
            .unwrap();
        assert!(matches!(
            events.as_slice(),
            [CoreEvent::ForegroundStatus { used_seconds: 20, .. }]
        ));
    }

    #[test]
    fn expire_blocking_returns_to_idle() {
        let (mut engine, store) = engine();
        let start = Local::now();
        drive_to_blocking(&mut engine, start);

        let now = start + Duration::hours(24);
        let events = engine.expire_blocking(now).unwrap();

        assert!(matches!(events.as_slice(), [CoreEvent::BlockingExpired]));
        assert_eq!(engine.mode(), EngineMode::Idle);
        assert!(store.load_snapshot().unwrap().is_none());

        // Idempotent
        assert!(engine.expire_blocking(now).unwrap().is_empty());
    }

    #[test]
    fn switching_monitored_targets_splits_sessions() {
        let (mut engine, store) = engine();
        let start = Local::now();
        let other = TargetId::new("com.example.videos");
        engine
            .start(MonitorPolicy::new(vec![game(), other.clone()], 100), start)
            .unwrap();

        engine
            .tick(observed(&game()), start + Duration::seconds(1))
            .unwrap();
        engine
            .tick(observed(&game()), start + Duration::seconds(10))
            .unwrap();
        engine
            .tick(observed(&other), start + Duration::seconds(11))
            .unwrap();
        engine
            .tick(observed(&other), start + Duration::seconds(20))
            .unwrap();

        let status = engine.status(start + Duration::seconds(20));
        assert_eq!(status.used_seconds, 19);
        assert_eq!(status.current_target, Some(other));

        let audits = store.get_recent_audits(50).unwrap();
        let opened = audits
            .iter()
            .filter(|a| matches!(a.event, AuditEventType::SessionOpened { .. }))
            .count();
        assert_eq!(opened, 2);
    }
}
