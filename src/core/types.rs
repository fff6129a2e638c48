use std::fmt;
use tokio::sync::mpsc;

/// Phase of the update lifecycle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateStatus {
    /// No update in flight
    Idle,
    /// The installer is running
    Updating,
    /// An update was installed; a restart (automatic or manual) is pending
    Updated,
    /// The last attempt failed
    Error,
}

/// Failure recorded in the update state
#[derive(Clone, Debug)]
pub enum UpdateError {
    /// The installer ran but wrote a fatal line to its error stream.
    /// Carries the complete error stream, not just the line that tripped.
    Diagnostic { output: String },
    /// The installer could not be invoked at all
    Invocation { message: String },
}

impl fmt::Display for UpdateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateError::Diagnostic { output } => {
                write!(f, "installer reported: {}", output.trim())
            }
            UpdateError::Invocation { message } => {
                write!(f, "could not run installer: {message}")
            }
        }
    }
}

impl std::error::Error for UpdateError {}

/// Snapshot of the updater, published to subscribers on every change
#[derive(Clone, Debug)]
pub struct UpdateState {
    /// Current phase
    pub status: UpdateStatus,
    /// Mirrors the persisted auto-update preference
    pub auto_update_enabled: bool,
    /// Whether the in-flight/last operation was automatic or user-invoked
    pub is_auto_update: bool,
    /// Human-readable status line, recomputed on every transition
    pub message: String,
    /// Present exactly when `status` is `Error`
    pub error: Option<UpdateError>,
    /// Version the running process reports
    pub current_version: String,
    /// Latest published version, once a registry check has completed
    pub latest_version: Option<String>,
    /// Whether `latest_version` is newer than `current_version`
    pub update_available: bool,
}

impl UpdateState {
    /// Creates the initial state for a freshly started process
    pub fn new(current_version: String, auto_update_enabled: bool) -> Self {
        let message = format!("keel v{current_version}");
        Self {
            status: UpdateStatus::Idle,
            auto_update_enabled,
            is_auto_update: false,
            message,
            error: None,
            current_version,
            latest_version: None,
            update_available: false,
        }
    }
}

/// Events produced by the keyboard worker during a watch session
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    /// User asked to quit ('q', Esc or Ctrl+C)
    Quit,
    /// User forced an immediate update check ('u')
    CheckNow,
}

pub type EventSender = mpsc::Sender<SessionEvent>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state_is_idle() {
        let state = UpdateState::new("1.2.3".to_string(), true);
        assert_eq!(state.status, UpdateStatus::Idle);
        assert!(state.error.is_none());
        assert!(state.latest_version.is_none());
        assert!(!state.update_available);
        assert_eq!(state.message, "keel v1.2.3");
    }

    #[test]
    fn test_diagnostic_error_display_keeps_stream_content() {
        let error = UpdateError::Diagnostic {
            output: "npm ERR! EACCES: permission denied\n".to_string(),
        };
        let rendered = error.to_string();
        assert!(rendered.contains("permission denied"));
    }

    #[test]
    fn test_invocation_error_display() {
        let error = UpdateError::Invocation {
            message: "npm: command not found".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "could not run installer: npm: command not found"
        );
    }
}
