// Core modules
pub mod core {
    pub mod types;
    pub mod update;
}

// Package installation and registry access
pub mod pkg {
    pub mod installer;
    pub mod registry;
}

// UI modules
pub mod ui {
    pub mod input;
    pub mod status;
}

// CLI modules
pub mod cli {
    pub mod config;
}

pub mod http_logging;
pub mod version;

// Re-export commonly used items for convenience
pub use self::cli::config::Config;
pub use self::core::types::*;
pub use self::core::update::UpdateController;
pub use self::core::update::restart::{Relaunch, SelfRelauncher, is_auto_update_restart};
pub use self::http_logging::LoggingClient;
pub use self::pkg::installer::{InstallerOutput, NpmInstaller, PackageInstaller};
pub use self::pkg::registry::RegistryClient;
