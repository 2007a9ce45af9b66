//! The exec host adapter

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};
use warden_api::{MilestoneAlert, NoticeKind};
use warden_config::HostCommands;
use warden_host_api::{
    Host, HostError, HostResult, OverlayOutcome, SurfaceKind, SurfaceRegistry,
};
use warden_util::TargetId;

/// Exit code by which the detect command signals a missing permission
pub const PERMISSION_EXIT_CODE: i32 = 77;

/// Host adapter that drives configured commands.
///
/// Suppression commands are treated as best-effort throughout: a failure is
/// logged and swallowed, because the enforcement loops retry continuously
/// anyway.
pub struct ExecHost {
    commands: HostCommands,
    registry: SurfaceRegistry,
}

impl ExecHost {
    pub fn new(commands: HostCommands) -> Self {
        Self {
            commands,
            registry: SurfaceRegistry::new(),
        }
    }

    pub fn registry(&self) -> &SurfaceRegistry {
        &self.registry
    }

    /// Substitute `{placeholder}` tokens in an argv template
    fn render(argv: &[String], substitutions: &[(&str, &str)]) -> Vec<String> {
        argv.iter()
            .map(|arg| {
                let mut rendered = arg.clone();
                for (key, value) in substitutions {
                    rendered = rendered.replace(&format!("{{{key}}}"), value);
                }
                rendered
            })
            .collect()
    }

    async fn run(&self, argv: &[String], substitutions: &[(&str, &str)]) -> HostResult<std::process::Output> {
        let argv = Self::render(argv, substitutions);
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| HostError::Internal("empty argv".into()))?;

        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await?;

        Ok(output)
    }

    /// Run a best-effort side-effect command; absence of wiring is a no-op
    async fn run_best_effort(&self, name: &str, argv: &[String], substitutions: &[(&str, &str)]) {
        if argv.is_empty() {
            debug!(command = name, "No command wired, skipping");
            return;
        }

        match self.run(argv, substitutions).await {
            Ok(output) if output.status.success() => {}
            Ok(output) => {
                debug!(
                    command = name,
                    status = ?output.status.code(),
                    "Command reported failure"
                );
            }
            Err(e) => {
                warn!(command = name, error = %e, "Command failed to run");
            }
        }
    }

    fn show(&self, kind: SurfaceKind) -> OverlayOutcome {
        if self.registry.try_acquire(kind) {
            OverlayOutcome::Shown
        } else {
            OverlayOutcome::Refused
        }
    }
}

#[async_trait]
impl Host for ExecHost {
    async fn detect_foreground(&self, window: Duration) -> HostResult<Option<TargetId>> {
        let window_ms = window.as_millis().to_string();
        let mut argv = self.commands.detect.clone();
        argv.push(window_ms);

        let output = self
            .run(&argv, &[])
            .await
            .map_err(|e| HostError::DetectFailed(e.to_string()))?;

        if output.status.code() == Some(PERMISSION_EXIT_CODE) {
            return Err(HostError::PermissionDenied(
                "detect command reported missing usage access".into(),
            ));
        }

        if !output.status.success() {
            return Err(HostError::DetectFailed(format!(
                "detect command exited with {:?}",
                output.status.code()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let id = stdout.trim();
        if id.is_empty() {
            Ok(None)
        } else {
            Ok(Some(TargetId::new(id)))
        }
    }

    async fn suppress_to_background(&self) -> HostResult<()> {
        self.run_best_effort("home", &self.commands.home, &[])
            .await;
        Ok(())
    }

    async fn show_blocking_overlay(&self, target: &TargetId) -> HostResult<OverlayOutcome> {
        let outcome = self.show(SurfaceKind::Blocking);
        if outcome.shown() {
            let subs = [
                ("kind", "blocking"),
                ("target", target.as_str()),
                ("percentage", "100"),
            ];
            self.run_best_effort("overlay", &self.commands.overlay, &subs)
                .await;
            // The external overlay owns its own lifetime; the slot is freed
            // once the command has been dispatched.
            self.registry.release(SurfaceKind::Blocking);
        }
        Ok(outcome)
    }

    async fn show_milestone_overlay(&self, alert: &MilestoneAlert) -> HostResult<OverlayOutcome> {
        let outcome = self.show(SurfaceKind::Milestone);
        if outcome.shown() {
            let percentage = alert.percentage.to_string();
            let subs = [
                ("kind", "milestone"),
                ("percentage", percentage.as_str()),
                ("remaining", alert.remaining_text.as_str()),
                ("used", alert.used_text.as_str()),
                ("total", alert.total_text.as_str()),
            ];
            self.run_best_effort("overlay", &self.commands.overlay, &subs)
                .await;
            self.registry.release(SurfaceKind::Milestone);
        }
        Ok(outcome)
    }

    async fn terminate_target(&self, target: &TargetId) -> HostResult<()> {
        let subs = [("target", target.as_str())];
        self.run_best_effort("terminate", &self.commands.terminate, &subs)
            .await;
        Ok(())
    }

    async fn notify(&self, kind: NoticeKind, message: &str) -> HostResult<()> {
        let kind_str = format!("{kind:?}").to_lowercase();
        let subs = [("kind", kind_str.as_str()), ("message", message)];
        self.run_best_effort("notify", &self.commands.notify, &subs)
            .await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host_with_detect(argv: Vec<&str>) -> ExecHost {
        ExecHost::new(HostCommands {
            detect: argv.into_iter().map(String::from).collect(),
            detect_window_ms: 500,
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn detect_parses_stdout() {
        let host = host_with_detect(vec!["sh", "-c", "echo com.example.game"]);
        let detected = host
            .detect_foreground(Duration::from_millis(500))
            .await
            .unwrap();
        assert_eq!(detected, Some(TargetId::new("com.example.game")));
    }

    #[tokio::test]
    async fn detect_empty_output_is_none() {
        let host = host_with_detect(vec!["sh", "-c", "echo"]);
        let detected = host
            .detect_foreground(Duration::from_millis(500))
            .await
            .unwrap();
        assert_eq!(detected, None);
    }

    #[tokio::test]
    async fn detect_permission_exit_code() {
        let host = host_with_detect(vec!["sh", "-c", "exit 77"]);
        let result = host.detect_foreground(Duration::from_millis(500)).await;
        assert!(matches!(result, Err(HostError::PermissionDenied(_))));
    }

    #[tokio::test]
    async fn detect_failure_is_reported() {
        let host = host_with_detect(vec!["sh", "-c", "exit 1"]);
        let result = host.detect_foreground(Duration::from_millis(500)).await;
        assert!(matches!(result, Err(HostError::DetectFailed(_))));
    }

    #[tokio::test]
    async fn terminate_substitutes_target() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("terminated");

        let host = ExecHost::new(HostCommands {
            detect: vec!["true".into()],
            terminate: vec![
                "sh".into(),
                "-c".into(),
                format!("echo {{target}} > {}", out.display()),
            ],
            ..Default::default()
        });

        host.terminate_target(&TargetId::new("com.example.game"))
            .await
            .unwrap();

        let written = std::fs::read_to_string(&out).unwrap();
        assert_eq!(written.trim(), "com.example.game");
    }

    #[tokio::test]
    async fn missing_suppression_commands_are_noops() {
        let host = host_with_detect(vec!["true"]);
        host.suppress_to_background().await.unwrap();
        host.terminate_target(&TargetId::new("x")).await.unwrap();
        host.notify(NoticeKind::Countdown, "5s left").await.unwrap();
    }
}
