use crate::core::types::{UpdateState, UpdateStatus};

/// Multi-line summary shown by the `status` subcommand
pub fn render_status(state: &UpdateState) -> String {
    let mut lines = vec![format!("keel v{}", state.current_version)];

    let latest = match &state.latest_version {
        Some(latest) if state.update_available => {
            format!("v{latest} (update available, run `keel update`)")
        }
        Some(latest) => format!("v{latest}"),
        None => "unknown (run `keel check`)".to_string(),
    };
    lines.push(format!("  latest:      {latest}"));
    lines.push(format!(
        "  auto-update: {}",
        if state.auto_update_enabled { "on" } else { "off" }
    ));

    lines.join("\n")
}

/// One-line rendering of a state change for the watch session
pub fn transition_line(state: &UpdateState) -> String {
    match (&state.status, &state.error) {
        (UpdateStatus::Error, Some(error)) => format!("{} ({error})", state.message),
        _ => state.message.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::UpdateError;

    /// Helper macro to assert inline snapshots with version redaction
    macro_rules! assert_snapshot_with_redaction {
        ($value:expr, @$snapshot:literal) => {{
            let mut settings = insta::Settings::clone_current();
            settings.add_filter(r"v\d+\.\d+\.\d+", "vX.X.X");
            settings.bind(|| {
                insta::assert_snapshot!($value, @$snapshot);
            });
        }};
    }

    fn state() -> UpdateState {
        UpdateState::new("1.2.3".to_string(), true)
    }

    #[test]
    fn test_status_before_any_check() {
        assert_snapshot_with_redaction!(render_status(&state()), @r"
        keel vX.X.X
          latest:      unknown (run `keel check`)
          auto-update: on
        ");
    }

    #[test]
    fn test_status_with_update_available() {
        let mut state = state();
        state.latest_version = Some("1.3.0".to_string());
        state.update_available = true;
        state.auto_update_enabled = false;
        assert_snapshot_with_redaction!(render_status(&state), @r"
        keel vX.X.X
          latest:      vX.X.X (update available, run `keel update`)
          auto-update: off
        ");
    }

    #[test]
    fn test_status_when_up_to_date() {
        let mut state = state();
        state.latest_version = Some("1.2.3".to_string());
        assert_snapshot_with_redaction!(render_status(&state), @r"
        keel vX.X.X
          latest:      vX.X.X
          auto-update: on
        ");
    }

    #[test]
    fn test_transition_line_plain() {
        let mut state = state();
        state.message = "Auto-updating to v1.3.0".to_string();
        assert_eq!(transition_line(&state), "Auto-updating to v1.3.0");
    }

    #[test]
    fn test_transition_line_appends_error_details() {
        let mut state = state();
        state.status = UpdateStatus::Error;
        state.message = "Update failed".to_string();
        state.error = Some(UpdateError::Invocation {
            message: "npm: command not found".to_string(),
        });
        assert_eq!(
            transition_line(&state),
            "Update failed (could not run installer: npm: command not found)"
        );
    }
}
