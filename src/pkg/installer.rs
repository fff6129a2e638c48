use std::future::Future;
use std::io;

use tokio::process::Command;
use tracing::debug;

/// Captured output of one installer run
#[derive(Clone, Debug, Default)]
pub struct InstallerOutput {
    pub stdout: String,
    pub stderr: String,
}

/// External package-installation collaborator.
///
/// One call installs the CLI package system-wide. The installer itself does
/// not interpret its output; the caller inspects the captured error stream.
pub trait PackageInstaller: Send + Sync {
    fn install(&self) -> impl Future<Output = io::Result<InstallerOutput>> + Send;
}

/// Installs the CLI through `npm install -g`
pub struct NpmInstaller {
    package: String,
}

impl NpmInstaller {
    pub fn new(package: impl Into<String>) -> Self {
        Self {
            package: package.into(),
        }
    }
}

impl PackageInstaller for NpmInstaller {
    fn install(&self) -> impl Future<Output = io::Result<InstallerOutput>> + Send {
        let package = self.package.clone();
        async move {
            debug!("Installing {package} globally via npm");
            let output = Command::new("npm")
                .args(["install", "-g", &package])
                .output()
                .await?;

            Ok(InstallerOutput {
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            })
        }
    }
}
