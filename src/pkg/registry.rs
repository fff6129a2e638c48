use std::error::Error;

use semver::Version;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::http_logging::LoggingClient;

/// Default npm-style registry consulted for release metadata
pub const DEFAULT_REGISTRY: &str = "https://registry.npmjs.org";

/// npm package the CLI ships as
pub const DEFAULT_PACKAGE: &str = "@keel/cli";

/// Abbreviated package metadata returned by `{registry}/{package}/latest`
#[derive(Debug, Deserialize)]
struct PackageMetadata {
    version: String,
}

/// Queries an npm-style registry for the latest published version of the CLI
pub struct RegistryClient {
    http: LoggingClient,
    base: Url,
    package: String,
}

impl RegistryClient {
    pub fn new(
        base: &str,
        package: impl Into<String>,
        http: LoggingClient,
    ) -> Result<Self, url::ParseError> {
        let mut base = Url::parse(base)?;
        // Url::join drops the last path segment unless the base ends in '/'
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self {
            http,
            base,
            package: package.into(),
        })
    }

    /// Fetches the latest published version of the CLI package
    pub async fn latest_version(&self) -> Result<Version, Box<dyn Error + Send + Sync>> {
        let url = self.metadata_url()?;
        let body = self.http.get_text(url).await?;
        let metadata: PackageMetadata = serde_json::from_str(&body)?;
        Ok(Version::parse(&metadata.version)?)
    }

    fn metadata_url(&self) -> Result<Url, url::ParseError> {
        let path = format!("{}/latest", encode_package_name(&self.package));
        self.base.join(&path)
    }
}

/// Scoped package names keep their '@' but escape the scope separator,
/// matching how npm clients address the registry
fn encode_package_name(name: &str) -> String {
    name.replacen('/', "%2f", 1)
}

/// Whether `latest` is strictly newer than the running version.
/// Unparseable running versions (dev builds) never count as outdated.
pub fn is_newer(current: &str, latest: &Version) -> bool {
    match Version::parse(current) {
        Ok(current) => *latest > current,
        Err(err) => {
            debug!("Skipping version comparison for {current:?}: {err}");
            false
        }
    }
}
