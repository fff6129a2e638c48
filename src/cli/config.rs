use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::pkg::registry::{DEFAULT_PACKAGE, DEFAULT_REGISTRY};

fn default_auto_update() -> bool {
    true
}

/// Configuration that can be loaded from a YAML file
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Whether the CLI may update and restart itself without being asked
    #[serde(default = "default_auto_update")]
    pub auto_update: bool,

    /// npm-style registry consulted for release metadata
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registry: Option<String>,

    /// Package the CLI is distributed as
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            auto_update: true,
            registry: None,
            package: None,
        }
    }
}

impl Config {
    /// Find and load config file from the following locations (in priority order):
    /// 1. ./keel.yaml or ./keel.yml (relative to current directory)
    /// 2. ~/.config/keel/config.yaml or ~/.config/keel/config.yml
    /// 3. ~/.keel.yaml or ~/.keel.yml
    ///
    /// Returns (Config, Option<PathBuf>) where the PathBuf is Some if a config file was found
    pub fn load_with_path() -> Result<(Self, Option<PathBuf>), Box<dyn std::error::Error>> {
        let config_paths = Self::get_config_paths();

        for path in config_paths {
            if path.exists() {
                let contents = std::fs::read_to_string(&path)?;
                let config: Config = serde_yaml::from_str(&contents)?;
                return Ok((config, Some(path)));
            }
        }

        Ok((Config::default(), None))
    }

    /// Get list of potential config file paths in priority order
    fn get_config_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        // 1. Relative paths (current directory)
        paths.push(PathBuf::from("keel.yaml"));
        paths.push(PathBuf::from("keel.yml"));

        if let Some(home) = dirs::home_dir() {
            // 2. ~/.config/keel/config.{yaml,yml}
            let config_dir = home.join(".config").join("keel");
            paths.push(config_dir.join("config.yaml"));
            paths.push(config_dir.join("config.yml"));

            // 3. ~/.keel.{yaml,yml}
            paths.push(home.join(".keel.yaml"));
            paths.push(home.join(".keel.yml"));
        }

        paths
    }

    /// Path the `auto-update` subcommand persists to
    fn store_path() -> Result<PathBuf, Box<dyn std::error::Error>> {
        let home = dirs::home_dir().ok_or("could not determine home directory")?;
        Ok(home.join(".config").join("keel").join("config.yaml"))
    }

    /// Persist the configuration, creating the config directory if needed.
    /// Returns the path written to.
    pub fn store(&self) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let path = Self::store_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, serde_yaml::to_string(self)?)?;
        Ok(path)
    }

    /// Merge config with command line arguments
    /// CLI args take precedence over config file values
    pub fn merge_with_cli(mut self, registry: Option<String>, package: Option<String>) -> Self {
        if registry.is_some() {
            self.registry = registry;
        }
        if package.is_some() {
            self.package = package;
        }
        self
    }

    /// Registry to consult, falling back to the public npm registry
    pub fn registry(&self) -> &str {
        self.registry.as_deref().unwrap_or(DEFAULT_REGISTRY)
    }

    /// Package to install, falling back to the published CLI package
    pub fn package(&self) -> &str {
        self.package.as_deref().unwrap_or(DEFAULT_PACKAGE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.auto_update);
        assert_eq!(config.registry(), DEFAULT_REGISTRY);
        assert_eq!(config.package(), DEFAULT_PACKAGE);
    }

    #[test]
    fn test_merge_with_cli_prefers_flags() {
        let config = Config {
            auto_update: true,
            registry: Some("https://npm.corp.example.com".to_string()),
            package: None,
        };

        let merged = config.merge_with_cli(
            Some("https://other.example.com".to_string()),
            Some("@keel/cli-nightly".to_string()),
        );
        assert_eq!(merged.registry(), "https://other.example.com");
        assert_eq!(merged.package(), "@keel/cli-nightly");
    }

    #[test]
    fn test_merge_with_cli_keeps_config_when_no_flags() {
        let config = Config {
            auto_update: false,
            registry: Some("https://npm.corp.example.com".to_string()),
            package: None,
        };

        let merged = config.merge_with_cli(None, None);
        assert_eq!(merged.registry(), "https://npm.corp.example.com");
        assert_eq!(merged.package(), DEFAULT_PACKAGE);
        assert!(!merged.auto_update);
    }

    #[test]
    fn test_yaml_deserialization() {
        let yaml = r#"
auto_update: false
registry: https://npm.corp.example.com
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(!config.auto_update);
        assert_eq!(config.registry(), "https://npm.corp.example.com");
        assert_eq!(config.package, None);
    }

    #[test]
    fn test_auto_update_defaults_to_on() {
        let config: Config = serde_yaml::from_str("registry: https://example.com").unwrap();
        assert!(config.auto_update);
    }

    #[test]
    fn test_serialization_skips_unset_fields() {
        let rendered = serde_yaml::to_string(&Config::default()).unwrap();
        assert!(rendered.contains("auto_update: true"));
        assert!(!rendered.contains("registry"));
        assert!(!rendered.contains("package"));
    }
}
