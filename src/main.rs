use clap::Parser;
use std::error::Error;
use std::fs::File;
use std::io::{self, Write};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use keel::cli::config::Config;
use keel::core::types::{EventSender, SessionEvent, UpdateState, UpdateStatus};
use keel::core::update::UpdateController;
use keel::core::update::restart::{SelfRelauncher, is_auto_update_restart};
use keel::http_logging::LoggingClient;
use keel::pkg::installer::NpmInstaller;
use keel::pkg::registry::{self, RegistryClient};
use keel::ui::input::keyboard_worker;
use keel::ui::status::{render_status, transition_line};
use keel::version;

/// Companion CLI for the Keel editor assistant
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// npm-style registry to consult for release metadata
    #[arg(long, global = true)]
    registry: Option<String>,

    /// Package name the CLI is distributed as
    #[arg(long, global = true)]
    package: Option<String>,

    /// Mirror HTTP requests and responses to stderr
    #[arg(long, global = true)]
    log_http: bool,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Show the running version and update settings
    Status,
    /// Ask the registry whether a newer release exists
    Check,
    /// Update keel to the latest version
    Update,
    /// Stay resident and apply updates as they are published
    Watch {
        /// Seconds between update checks
        #[arg(long, default_value_t = 3600)]
        interval: u64,
    },
    /// Enable or disable automatic updates
    AutoUpdate {
        #[arg(value_enum)]
        state: Toggle,
    },
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum Toggle {
    On,
    Off,
}

fn main() -> Result<(), Box<dyn Error>> {
    // Setup logging
    setup_logging()?;

    // Parse command line arguments
    let args = Args::parse();

    run_async(args)
}

#[tokio::main]
async fn run_async(args: Args) -> Result<(), Box<dyn Error>> {
    let Args {
        command,
        registry,
        package,
        log_http,
    } = args;

    // Load config file and merge with CLI flags (flags take precedence)
    let (config, config_path) = Config::load_with_path()?;
    if let Some(path) = &config_path {
        debug!("Loaded config from {}", path.display());
    }
    let config = config.merge_with_cli(registry, package);

    let current_version = version::resolve_version();

    match command.unwrap_or(Command::Status) {
        Command::Status => {
            let state = UpdateState::new(current_version, config.auto_update);
            println!("{}", render_status(&state));
            Ok(())
        }
        Command::Check => run_check(&config, &current_version, log_http).await,
        Command::Update => run_update(&config, &current_version, log_http).await,
        Command::Watch { interval } => {
            run_watch(
                &config,
                &current_version,
                log_http,
                Duration::from_secs(interval),
            )
            .await
        }
        Command::AutoUpdate { state } => set_auto_update(state),
    }
}

/// Reports whether the registry has a newer release than the running binary
async fn run_check(
    config: &Config,
    current_version: &str,
    log_http: bool,
) -> Result<(), Box<dyn Error>> {
    let registry = build_registry(config, log_http)?;
    let latest = registry
        .latest_version()
        .await
        .map_err(|err| format!("update check failed: {err}"))?;

    if registry::is_newer(current_version, &latest) {
        println!("Update available: v{current_version} -> v{latest}");
        println!("Run `keel update` to install it.");
    } else {
        println!("keel is up to date (v{current_version})");
    }
    Ok(())
}

/// Runs a user-invoked update; never restarts the process
async fn run_update(
    config: &Config,
    current_version: &str,
    log_http: bool,
) -> Result<(), Box<dyn Error>> {
    let controller = UpdateController::new(
        UpdateState::new(current_version.to_string(), config.auto_update),
        NpmInstaller::new(config.package()),
        Box::new(SelfRelauncher::new()),
    );

    // Resolve the target version first so status messages can name it.
    // The install itself proceeds even when the registry is unreachable.
    match build_registry(config, log_http) {
        Ok(registry) => match registry.latest_version().await {
            Ok(latest) => controller.record_latest(Some(latest)),
            Err(err) => warn!("Could not resolve the latest version: {err}"),
        },
        Err(err) => warn!("Could not resolve the latest version: {err}"),
    }

    println!(
        "Installing {} from {}...",
        config.package(),
        config.registry()
    );
    controller.perform_update(false).await;

    let state = controller.current_state();
    println!("{}", transition_line(&state));
    if state.status != UpdateStatus::Updated {
        return Err("update did not complete".into());
    }
    Ok(())
}

/// Persists the auto-update preference
fn set_auto_update(state: Toggle) -> Result<(), Box<dyn Error>> {
    let (mut config, _) = Config::load_with_path()?;
    config.auto_update = matches!(state, Toggle::On);
    let path = config.store()?;
    println!(
        "Auto-update {} (saved to {})",
        if config.auto_update {
            "enabled"
        } else {
            "disabled"
        },
        path.display()
    );
    Ok(())
}

/// Resident session: checks the registry on an interval and, when allowed,
/// updates in place and hands the terminal to the new version
async fn run_watch(
    config: &Config,
    current_version: &str,
    log_http: bool,
    interval: Duration,
) -> Result<(), Box<dyn Error>> {
    let resumed = is_auto_update_restart();
    if resumed {
        debug!("Resumed after an auto-update restart, skipping the initial check");
    }

    let paused = Arc::new(AtomicBool::new(false));
    let controller = Arc::new(UpdateController::new(
        UpdateState::new(current_version.to_string(), config.auto_update),
        NpmInstaller::new(config.package()),
        Box::new(SelfRelauncher::with_input_pause(Arc::clone(&paused))),
    ));
    let registry = Arc::new(build_registry(config, log_http)?);

    println!(
        "keel v{current_version} watching for updates every {}s (u: check now, q: quit)",
        interval.as_secs()
    );
    if !config.auto_update {
        println!("auto-update is off; new releases are only reported");
    }

    crossterm::terminal::enable_raw_mode()?;

    // Create event channel and spawn keyboard worker in blocking thread
    let (tx, mut rx) = mpsc::channel::<SessionEvent>(32);
    spawn_keyboard_worker(tx.clone(), Arc::clone(&paused));

    let mut state_rx = controller.subscribe();
    let mut last_message = controller.current_state().message;
    let mut ticker = tokio::time::interval(interval);
    let mut skip_next_check = resumed;
    let mut restart_pending = false;

    loop {
        tokio::select! {
            _ = ticker.tick(), if !restart_pending => {
                if skip_next_check {
                    skip_next_check = false;
                    continue;
                }
                spawn_update_check(Arc::clone(&controller), Arc::clone(&registry));
            }
            changed = state_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = state_rx.borrow_and_update().clone();
                if state.message != last_message {
                    print_session_line(&transition_line(&state));
                    last_message = state.message.clone();
                }
                if state.status == UpdateStatus::Updated {
                    // Either the relay exits this process when the new
                    // instance finishes, or the user restarts by hand
                    restart_pending = true;
                }
            }
            event = rx.recv() => match event {
                Some(SessionEvent::CheckNow) if !restart_pending => {
                    spawn_update_check(Arc::clone(&controller), Arc::clone(&registry));
                }
                Some(SessionEvent::CheckNow) => {}
                Some(SessionEvent::Quit) | None => break,
            }
        }
    }

    crossterm::terminal::disable_raw_mode()?;
    Ok(())
}

/// Queries the registry once and applies the result
fn spawn_update_check(controller: Arc<UpdateController<NpmInstaller>>, registry: Arc<RegistryClient>) {
    tokio::spawn(async move {
        match registry.latest_version().await {
            Ok(latest) => {
                controller.record_latest(Some(latest.clone()));
                let state = controller.current_state();
                if !state.update_available {
                    debug!("Already up to date (v{})", state.current_version);
                } else if state.auto_update_enabled {
                    controller.perform_update(true).await;
                } else {
                    print_session_line(&format!(
                        "Update available: v{latest} (auto-update is off, run `keel update`)"
                    ));
                }
            }
            Err(err) => {
                warn!("Update check failed: {err}");
                print_session_line(&format!("Update check failed: {err}"));
            }
        }
    });
}

/// Spawns the keyboard input worker thread
fn spawn_keyboard_worker(tx: EventSender, paused: Arc<AtomicBool>) {
    std::thread::spawn(move || {
        keyboard_worker(tx, paused);
    });
}

/// Prints one line while the terminal is in raw mode
fn print_session_line(text: &str) {
    let mut stdout = io::stdout();
    let _ = write!(stdout, "{}\r\n", text.replace('\n', "\r\n"));
    let _ = stdout.flush();
}

fn build_registry(config: &Config, log_http: bool) -> Result<RegistryClient, Box<dyn Error>> {
    Ok(RegistryClient::new(
        config.registry(),
        config.package(),
        LoggingClient::new(log_http),
    )?)
}

fn setup_logging() -> Result<(), Box<dyn Error>> {
    // Check if DEBUG is enabled
    if std::env::var("DEBUG").is_ok() {
        let log_file = File::create("debug.log")?;

        tracing_subscriber::fmt()
            .with_writer(log_file)
            .with_env_filter(EnvFilter::new("keel=debug"))
            .with_ansi(false)
            .init();
    }

    Ok(())
}
