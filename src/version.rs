use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

/// Environment override for the reported CLI version
pub const VERSION_ENV: &str = "KEEL_VERSION";

/// File the release pipeline drops next to the binary
const RELEASE_INFO_FILE: &str = "release-info.json";

#[derive(Debug, Deserialize)]
struct ReleaseInfo {
    version: String,
}

/// Resolves the version this process should report, in priority order:
/// the `KEEL_VERSION` environment variable, the `release-info.json` shipped
/// next to the executable, then the compiled-in crate version.
pub fn resolve_version() -> String {
    let env_version = env::var(VERSION_ENV).ok();
    resolve_from(env_version.as_deref(), release_info_path().as_deref())
}

fn resolve_from(env_version: Option<&str>, release_info: Option<&Path>) -> String {
    if let Some(version) = env_version {
        let version = version.trim();
        if !version.is_empty() {
            return version.to_string();
        }
    }
    if let Some(path) = release_info
        && let Some(version) = read_release_info(path)
    {
        return version;
    }
    env!("CARGO_PKG_VERSION").to_string()
}

fn release_info_path() -> Option<PathBuf> {
    let exe = env::current_exe().ok()?;
    Some(exe.parent()?.join(RELEASE_INFO_FILE))
}

fn read_release_info(path: &Path) -> Option<String> {
    if !path.exists() {
        return None;
    }
    let contents = fs::read_to_string(path).ok()?;
    match serde_json::from_str::<ReleaseInfo>(&contents) {
        Ok(info) => {
            let version = info.version.trim();
            if version.is_empty() {
                None
            } else {
                Some(version.to_string())
            }
        }
        Err(err) => {
            debug!("Ignoring malformed {}: {err}", path.display());
            None
        }
    }
}
