use std::env;
use std::error::Error;
use std::ffi::OsString;
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, error};

/// Marker set in the child's environment so the restarted process knows it
/// is the product of an auto-update and can skip the redundant startup check
pub const AUTO_UPDATED_ENV: &str = "KEEL_AUTO_UPDATED";

/// Whether this process was spawned by the restart launcher
pub fn is_auto_update_restart() -> bool {
    env::var_os(AUTO_UPDATED_ENV).is_some()
}

/// Hands the terminal over to a fresh instance of the CLI
#[cfg_attr(test, mockall::automock)]
pub trait Relaunch: Send + Sync {
    fn relaunch(&self);
}

/// Respawns the current executable with its original arguments.
///
/// The parent does not exit once the child is running: it stays resident and
/// relays the child's exit code. Exiting immediately was observed to glitch
/// the child's terminal input, so the parent acts as a passive relay instead.
pub struct SelfRelauncher {
    /// Pause flag shared with the keyboard worker; set before the handoff so
    /// the old and new process never compete for terminal input
    input_paused: Option<Arc<AtomicBool>>,
}

impl SelfRelauncher {
    pub fn new() -> Self {
        Self { input_paused: None }
    }

    pub fn with_input_pause(flag: Arc<AtomicBool>) -> Self {
        Self {
            input_paused: Some(flag),
        }
    }

    /// Stops routing terminal input to this process.
    /// The screen itself is left alone; output from before the handoff
    /// should stay in scrollback.
    fn release_terminal(&self) {
        if let Some(flag) = &self.input_paused {
            flag.store(true, Ordering::Relaxed);
        }
        if let Err(err) = crossterm::terminal::disable_raw_mode() {
            debug!("Failed to reset terminal before handoff: {err}");
        }
    }

    fn spawn_replacement(&self) -> Result<(), Box<dyn Error>> {
        let exe = env::current_exe()?;
        let args: Vec<OsString> = env::args_os().skip(1).collect();
        debug!("Relaunching {} with {:?}", exe.display(), args);

        let mut command = Command::new(&exe);
        command
            .args(&args)
            .env(AUTO_UPDATED_ENV, "true")
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        // Detach from our process group so the child outlives us
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }
        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
            command.creation_flags(CREATE_NEW_PROCESS_GROUP);
        }

        let mut child = command.spawn()?;

        // Sole remaining reference to the child: wait for it to finish and
        // forward its exit code as our own
        std::thread::spawn(move || {
            let code = child
                .wait()
                .ok()
                .and_then(|status| status.code())
                .unwrap_or(0);
            std::process::exit(code);
        });

        Ok(())
    }
}

impl Default for SelfRelauncher {
    fn default() -> Self {
        Self::new()
    }
}

impl Relaunch for SelfRelauncher {
    fn relaunch(&self) {
        self.release_terminal();
        if let Err(err) = self.spawn_replacement() {
            // The install already succeeded; a failed handoff only means the
            // user restarts by hand
            error!("Failed to respawn after update: {err}");
        }
    }
}
