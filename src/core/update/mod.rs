use std::sync::Arc;
use std::time::Duration;

use semver::Version;
use tokio::sync::watch;
use tracing::{debug, error};

use crate::core::types::{UpdateError, UpdateState, UpdateStatus};
use crate::pkg::installer::PackageInstaller;
use crate::pkg::registry;

pub mod diagnostics;
pub mod restart;

use diagnostics::DiagnosticFilter;
use restart::Relaunch;

/// How long an installer-invocation failure stays on screen before the
/// status reverts to idle
const ERROR_DISPLAY_DURATION: Duration = Duration::from_secs(4);

/// Owns the update state and drives the install/restart flow.
///
/// All mutation goes through this controller; consumers (the status line,
/// the watch session) observe it through [`UpdateController::subscribe`].
pub struct UpdateController<I> {
    installer: I,
    launcher: Box<dyn Relaunch>,
    diagnostics: DiagnosticFilter,
    state: Arc<watch::Sender<UpdateState>>,
}

impl<I: PackageInstaller> UpdateController<I> {
    pub fn new(initial: UpdateState, installer: I, launcher: Box<dyn Relaunch>) -> Self {
        let (state, _) = watch::channel(initial);
        Self {
            installer,
            launcher,
            diagnostics: DiagnosticFilter::default(),
            state: Arc::new(state),
        }
    }

    /// Replaces the default benign-diagnostic patterns
    pub fn with_diagnostics(mut self, diagnostics: DiagnosticFilter) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Subscribe to state changes; the receiver always sees the latest snapshot
    pub fn subscribe(&self) -> watch::Receiver<UpdateState> {
        self.state.subscribe()
    }

    /// Copy of the current state
    pub fn current_state(&self) -> UpdateState {
        self.state.borrow().clone()
    }

    /// Records the result of a registry check
    pub fn record_latest(&self, latest: Option<Version>) {
        self.state.send_modify(|state| match &latest {
            Some(latest) => {
                state.update_available = registry::is_newer(&state.current_version, latest);
                state.latest_version = Some(latest.to_string());
            }
            None => {
                state.latest_version = None;
                state.update_available = false;
            }
        });
    }

    /// Mirrors the persisted auto-update preference into the state
    pub fn set_auto_update(&self, enabled: bool) {
        self.state
            .send_modify(|state| state.auto_update_enabled = enabled);
    }

    /// Installs the latest CLI package and, for automatic updates, hands the
    /// terminal over to the freshly installed version.
    ///
    /// A call while an update is already running is ignored.
    pub async fn perform_update(&self, is_auto_update: bool) {
        let target = self.target_label();

        // Claiming the updating slot and checking for a running update is a
        // single guarded mutation, so two racing callers cannot both start
        let started = self.state.send_if_modified(|state| {
            if state.status == UpdateStatus::Updating {
                return false;
            }
            state.status = UpdateStatus::Updating;
            state.is_auto_update = is_auto_update;
            state.error = None;
            state.message = if is_auto_update {
                format!("Auto-updating to {target}")
            } else {
                format!("Updating to {target}")
            };
            true
        });
        if !started {
            debug!("Update already in progress, ignoring request");
            return;
        }

        match self.installer.install().await {
            Ok(output) => {
                debug!("Installer stdout: {}", output.stdout.trim());
                debug!("Installer stderr: {}", output.stderr.trim());

                if let Some(line) = self.diagnostics.first_fatal_line(&output.stderr) {
                    debug!("Installer reported a fatal diagnostic: {line}");
                    self.state.send_modify(|state| {
                        state.status = UpdateStatus::Error;
                        state.message = format!("Error updating to {target}");
                        state.error = Some(UpdateError::Diagnostic {
                            output: output.stderr.clone(),
                        });
                    });
                    return;
                }

                self.state.send_modify(|state| {
                    state.status = UpdateStatus::Updated;
                    state.error = None;
                    state.update_available = false;
                    state.message = if is_auto_update {
                        format!("Auto-updated to {target}, restarting")
                    } else {
                        format!("Installed {target}, restart keel to use it")
                    };
                });

                if is_auto_update {
                    self.launcher.relaunch();
                }
            }
            Err(err) => {
                error!("Failed to run the package installer: {err}");
                self.state.send_modify(|state| {
                    state.status = UpdateStatus::Error;
                    state.message = if is_auto_update {
                        "Auto-update failed".to_string()
                    } else {
                        "Update failed".to_string()
                    };
                    state.error = Some(UpdateError::Invocation {
                        message: err.to_string(),
                    });
                });
                self.schedule_error_reset();
            }
        }
    }

    /// Clears an invocation failure from the display after a fixed delay.
    /// A newer attempt that has since replaced the error is left alone.
    fn schedule_error_reset(&self) {
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            tokio::time::sleep(ERROR_DISPLAY_DURATION).await;
            state.send_if_modified(|state| {
                if state.status != UpdateStatus::Error
                    || !matches!(state.error, Some(UpdateError::Invocation { .. }))
                {
                    return false;
                }
                state.status = UpdateStatus::Idle;
                state.error = None;
                state.message = match &state.latest_version {
                    Some(latest) => format!("Run `keel update` to install v{latest}"),
                    None => "Run `keel update` to retry".to_string(),
                };
                true
            });
        });
    }

    /// Version label used in status messages, once a check has completed
    fn target_label(&self) -> String {
        match &self.state.borrow().latest_version {
            Some(latest) => format!("v{latest}"),
            None => "the latest version".to_string(),
        }
    }
}
