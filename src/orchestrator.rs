//! Step building and execution.
//!
//! # Pipeline
//!
//! ```text
//! selected ids -> build_steps_from_selection -> Vec<Step> -> run_steps -> RunReport
//! ```
//!
//! Every selected tool becomes one primary step (its installer, plus the
//! shortcut follow-on inside the same closure) and one extra step per
//! taskbar pin target. Steps run strictly one at a time in build order.
//!
//! # Failure policy
//!
//! A step that returns `false`, returns `Err` or panics is logged as ERROR
//! and recorded as failed; the run carries on. Cancellation is only checked
//! between steps.

use crate::catalog::{InstallerType, PostInstallKind, ToolSpec};
use crate::events::{CancelFlag, Observer, UiEvent};
use crate::installers::chocolatey::ChocolateyInstaller;
use crate::installers::functions::{CreateShortcutInstaller, PinTaskbarInstaller};
use crate::installers::powershell::PowerShellInstaller;
use crate::installers::registry::{InstallerRegistry, ids};
use crate::installers::{InstallContext, Installer};
use crate::logger::Logger;
use std::any::Any;
use std::collections::HashSet;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};
use strum::Display;

/// Work done by one step. `Ok(false)` is a handled failure.
pub type StepAction = Box<dyn FnOnce() -> anyhow::Result<bool> + Send>;

/// A named unit of work, built fresh for every run.
pub struct Step {
    name: String,
    action: StepAction,
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step").field("name", &self.name).finish_non_exhaustive()
    }
}

impl Step {
    pub fn new<F>(name: impl Into<String>, action: F) -> Self
    where
        F: FnOnce() -> anyhow::Result<bool> + Send + 'static,
    {
        Self {
            name: name.into(),
            action: Box::new(action),
        }
    }

    /// Step running `installer`
    pub fn from_installer(installer: Box<dyn Installer>) -> Self {
        Self::new(installer.display_name(), move || Ok(installer.install()))
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Runner lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum RunStatus {
    Idle,
    Running,
    Cancelled,
    Completed,
}

impl RunStatus {
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Cancelled | Self::Completed)
    }
}

/// Per-run bookkeeping held by the runner.
#[derive(Debug, Clone)]
pub struct RunState {
    pub status: RunStatus,
    /// 1-based index of the current (or last started) step
    pub index: usize,
    pub total: usize,
    pub started: Instant,
    pub current_step: Option<String>,
}

impl RunState {
    pub fn new(total: usize) -> Self {
        Self {
            status: RunStatus::Idle,
            index: 0,
            total,
            started: Instant::now(),
            current_step: None,
        }
    }

    fn begin(&mut self) {
        self.status = RunStatus::Running;
        self.started = Instant::now();
    }

    fn enter(&mut self, index: usize, name: &str) {
        self.index = index;
        self.current_step = Some(name.to_string());
    }

    fn finish(&mut self, status: RunStatus) {
        debug_assert!(status.is_terminal());
        self.status = status;
        self.current_step = None;
    }

    /// Percentage before the current step started
    pub fn progress_before(&self) -> u8 {
        progress_percent(self.index.saturating_sub(1), self.total)
    }

    /// Percentage once the current step is done
    pub fn progress_after(&self) -> u8 {
        progress_percent(self.index, self.total)
    }

    /// Remaining time, assuming the current step is done
    pub fn eta(&self) -> Option<Duration> {
        linear_eta(self.started.elapsed(), self.index, self.total)
    }

    /// `[i/total] name` for console output
    pub fn console_label(&self) -> String {
        format!(
            "[{}/{}] {}",
            self.index,
            self.total,
            self.current_step.as_deref().unwrap_or("")
        )
    }
}

/// `done/total` as a rounded percentage in `0..=100`.
pub fn progress_percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    let done = done.min(total);
    ((done as f64 * 100.0 / total as f64).round()) as u8
}

/// Linear estimate: `elapsed / (done/total) - elapsed`.
pub fn linear_eta(elapsed: Duration, done: usize, total: usize) -> Option<Duration> {
    if done == 0 || total == 0 {
        return None;
    }
    let remaining = total.saturating_sub(done) as f64 / done as f64;
    Some(elapsed.mul_f64(remaining))
}

/// Ledger entry for one executed step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    pub index: usize,
    pub name: String,
    pub success: bool,
}

/// What a run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub status: RunStatus,
    pub total: usize,
    pub outcomes: Vec<StepOutcome>,
}

impl RunReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.success).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.success).count()
    }

    /// Per-step success flags in execution order
    pub fn ledger(&self) -> Vec<bool> {
        self.outcomes.iter().map(|o| o.success).collect()
    }

    /// Steps never started because of cancellation
    pub fn skipped(&self) -> usize {
        self.total.saturating_sub(self.outcomes.len())
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Builds step lists from tool selections and runs them.
pub struct Orchestrator {
    ctx: InstallContext,
    registry: Arc<InstallerRegistry>,
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("ctx", &self.ctx)
            .field("registry", &self.registry)
            .finish()
    }
}

impl Orchestrator {
    pub fn new(ctx: InstallContext, registry: Arc<InstallerRegistry>) -> Self {
        Self { ctx, registry }
    }

    /// Orchestrator over the built-in function installers
    pub fn with_builtin(ctx: InstallContext) -> Self {
        Self::new(ctx, Arc::new(InstallerRegistry::with_builtin()))
    }

    pub fn context(&self) -> &InstallContext {
        &self.ctx
    }

    pub fn logger(&self) -> &Logger {
        &self.ctx.logger
    }

    // ========================================================================
    // Building
    // ========================================================================

    /// Expand selected tool ids into an ordered step list.
    ///
    /// - unknown ids and unresolvable installers are warned about and skipped
    /// - repeated ids are built once
    /// - desktop group preparation runs first, desktop organization last;
    ///   everything else keeps selection order
    pub fn build_steps_from_selection<S: AsRef<str>>(&self, selected: &[S]) -> Vec<Step> {
        let mut seen = HashSet::new();
        let mut ranked: Vec<(u8, Step)> = Vec::new();

        for id in selected {
            let id = id.as_ref().trim();
            if id.is_empty() || !seen.insert(id.to_string()) {
                continue;
            }
            let Some(tool) = self.ctx.catalog.get_tool(id) else {
                self.ctx
                    .logger
                    .warn(format!("Unknown tool id '{}'; skipping.", id));
                continue;
            };
            let rank = Self::phase(tool);
            ranked.extend(self.steps_for_tool(tool).into_iter().map(|s| (rank, s)));
        }

        // stable: equal ranks keep selection order
        ranked.sort_by_key(|(rank, _)| *rank);
        ranked.into_iter().map(|(_, step)| step).collect()
    }

    fn phase(tool: &ToolSpec) -> u8 {
        if tool.kind() != Some(InstallerType::Function) {
            return 1;
        }
        match tool.installer.as_deref() {
            Some(ids::PREPARE_DESKTOP_GROUPS) => 0,
            Some(ids::ORGANIZE_DESKTOP) => 2,
            _ => 1,
        }
    }

    fn primary_installer(&self, tool: &ToolSpec) -> Option<Box<dyn Installer>> {
        let logger = &self.ctx.logger;
        match tool.kind() {
            Some(InstallerType::Chocolatey) => {
                Some(Box::new(ChocolateyInstaller::from_spec(&self.ctx, tool)))
            }
            Some(InstallerType::Powershell) => {
                Some(Box::new(PowerShellInstaller::from_spec(&self.ctx, tool)))
            }
            Some(InstallerType::Function) => {
                let installer_id = tool.installer.as_deref().unwrap_or_default();
                let resolved = self.registry.resolve(installer_id, &self.ctx, tool);
                if resolved.is_none() {
                    logger.warn(format!(
                        "No installer registered as '{}' for {}; skipping.",
                        installer_id,
                        tool.display_name()
                    ));
                }
                resolved
            }
            None => {
                logger.warn(format!(
                    "Unknown installer type {:?} for {}; skipping.",
                    tool.installer_type.as_deref().unwrap_or(""),
                    tool.display_name()
                ));
                None
            }
        }
    }

    fn wants_shortcut_follow_on(tool: &ToolSpec) -> bool {
        tool.shortcut.is_some()
            && tool.shortcut_group().is_some()
            && tool.installer.as_deref() != Some(ids::CREATE_SHORTCUT)
    }

    /// Steps for one tool: the primary step, then one per pin target.
    pub fn steps_for_tool(&self, tool: &ToolSpec) -> Vec<Step> {
        let Some(installer) = self.primary_installer(tool) else {
            return Vec::new();
        };

        let mut steps = Vec::new();
        if Self::wants_shortcut_follow_on(tool) {
            let shortcuts = CreateShortcutInstaller::new(&self.ctx, tool);
            let logger = Arc::clone(&self.ctx.logger);
            let tool_name = tool.display_name().to_string();
            steps.push(Step::new(installer.display_name(), move || {
                let ok = installer.install();
                if !shortcuts.install() {
                    logger.info(format!("Shortcuts for {} were not all created.", tool_name));
                }
                Ok(ok)
            }));
        } else {
            steps.push(Step::from_installer(installer));
        }

        for action in &tool.post_install {
            match action.action() {
                Some(PostInstallKind::PinTaskbar) => {
                    for path in action.targets() {
                        let pin = PinTaskbarInstaller::new(&self.ctx, tool.display_name(), path);
                        steps.push(Step::from_installer(Box::new(pin)));
                    }
                }
                Some(PostInstallKind::PinTaskbarMulti) => {
                    for path in action.targets() {
                        let pin = PinTaskbarInstaller::new(&self.ctx, tool.display_name(), path)
                            .attempt();
                        steps.push(Step::from_installer(Box::new(pin)));
                    }
                }
                None => self.ctx.logger.warn(format!(
                    "Unknown post_install type '{}' for {}; skipping.",
                    action.kind,
                    tool.display_name()
                )),
            }
        }
        steps
    }

    // ========================================================================
    // Running
    // ========================================================================

    /// Run steps, reporting progress and ETA to `observer`.
    pub fn run_steps(
        &self,
        steps: Vec<Step>,
        observer: &dyn Observer,
        cancel: &CancelFlag,
    ) -> RunReport {
        self.execute(steps, Some(observer), Some(cancel))
    }

    /// Run steps with log output only.
    pub fn run_steps_console(&self, steps: Vec<Step>, cancel: Option<&CancelFlag>) -> RunReport {
        self.execute(steps, None, cancel)
    }

    fn execute(
        &self,
        steps: Vec<Step>,
        observer: Option<&dyn Observer>,
        cancel: Option<&CancelFlag>,
    ) -> RunReport {
        let logger = &self.ctx.logger;
        let emit = |event: UiEvent| {
            if let Some(observer) = observer {
                observer.enqueue(event);
            }
        };

        let total = steps.len();
        let mut state = RunState::new(total);
        let mut outcomes = Vec::with_capacity(total);
        state.begin();

        for (i, step) in steps.into_iter().enumerate() {
            if cancel.is_some_and(CancelFlag::is_cancelled) {
                logger.warn("Cancelled by user before next step.");
                state.finish(RunStatus::Cancelled);
                break;
            }

            let Step { name, action } = step;
            state.enter(i + 1, &name);

            emit(UiEvent::StepHeader {
                index: state.index,
                total,
                name: name.clone(),
            });
            emit(UiEvent::Status("Working".to_string()));
            emit(UiEvent::ProgressTo(state.progress_before()));

            logger.set_current_step(name.as_str());
            if observer.is_some() {
                logger.info(format!("{}...", name));
            } else {
                logger.info(format!("{}...", state.console_label()));
            }

            let success = match panic::catch_unwind(AssertUnwindSafe(action)) {
                Ok(Ok(true)) => {
                    logger.success(format!("{} completed.", name));
                    true
                }
                Ok(Ok(false)) => {
                    logger.error(format!("{} failed.", name));
                    false
                }
                Ok(Err(e)) => {
                    logger.error(format!("{} failed: {:#}", name, e));
                    false
                }
                Err(payload) => {
                    logger.error(format!(
                        "{} failed: panicked: {}",
                        name,
                        panic_message(&*payload)
                    ));
                    false
                }
            };

            outcomes.push(StepOutcome {
                index: state.index,
                name,
                success,
            });

            emit(UiEvent::StepResult {
                index: state.index,
                success,
            });
            emit(UiEvent::Eta(state.eta()));
            emit(UiEvent::ProgressTo(state.progress_after()));
        }

        logger.clear_current_step();
        if !state.status.is_terminal() {
            state.finish(RunStatus::Completed);
        }
        let status = state.status;

        let report = RunReport {
            status,
            total,
            outcomes,
        };
        match status {
            RunStatus::Cancelled => logger.info(format!(
                "Setup cancelled: {} succeeded, {} failed, {} not run.",
                report.succeeded(),
                report.failed(),
                report.skipped()
            )),
            _ => logger.info(format!(
                "Setup finished: {} succeeded, {} failed.",
                report.succeeded(),
                report.failed()
            )),
        }
        emit(UiEvent::Status(
            if status == RunStatus::Cancelled { "Cancelled" } else { "Done" }.to_string(),
        ));
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_percent_rounds() {
        assert_eq!(progress_percent(0, 3), 0);
        assert_eq!(progress_percent(1, 3), 33);
        assert_eq!(progress_percent(2, 3), 67);
        assert_eq!(progress_percent(3, 3), 100);
        assert_eq!(progress_percent(0, 0), 100);
    }

    #[test]
    fn test_linear_eta() {
        assert_eq!(linear_eta(Duration::from_secs(10), 0, 4), None);
        assert_eq!(
            linear_eta(Duration::from_secs(10), 1, 4),
            Some(Duration::from_secs(30))
        );
        assert_eq!(
            linear_eta(Duration::from_secs(10), 4, 4),
            Some(Duration::ZERO)
        );
    }

    #[test]
    fn test_run_state_tracks_current_step() {
        let mut state = RunState::new(4);
        assert_eq!(state.status, RunStatus::Idle);
        state.begin();
        state.enter(1, "Install Wireshark");
        assert_eq!(state.status, RunStatus::Running);
        assert_eq!(state.console_label(), "[1/4] Install Wireshark");
        assert_eq!(state.progress_before(), 0);
        assert_eq!(state.progress_after(), 25);
        assert!(state.eta().is_some());

        state.finish(RunStatus::Completed);
        assert!(state.current_step.is_none());
        assert!(state.status.is_terminal());
    }

    #[test]
    fn test_run_status_terminal() {
        assert!(!RunStatus::Idle.is_terminal());
        assert!(!RunStatus::Running.is_terminal());
        assert!(RunStatus::Cancelled.is_terminal());
        assert!(RunStatus::Completed.is_terminal());
    }

    #[test]
    fn test_report_counts() {
        let report = RunReport {
            status: RunStatus::Cancelled,
            total: 4,
            outcomes: vec![
                StepOutcome { index: 1, name: "a".into(), success: true },
                StepOutcome { index: 2, name: "b".into(), success: false },
            ],
        };
        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.skipped(), 2);
        assert_eq!(report.ledger(), vec![true, false]);
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(&*payload), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(&*payload), "bang");
    }
}
