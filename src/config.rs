/*============================================================
  Helmport Project: Helm-Up
  Module: helmup_core::config
  Etiquette: Helmport Script Etiquette — Rust Profile v1.1
  ------------------------------------------------------------
  Purpose:
    Load and validate Helm-Up-Core configuration covering the
    release catalog service, the console update service, and
    action settle timing.

  Security / Safety Notes:
    Configuration files are read from operator-controlled
    paths; values are never written back.

  Dependencies:
    toml for parsing, dirs for platform path resolution.

  Operational Scope:
    Resolved once at startup; every section carries defaults so
    the binary runs without a config file present.

  Revision History:
    2025-05-12 KSL  Authored configuration layer.
  ------------------------------------------------------------
  HSE Principles Observed:
    - Defaults for every tunable, overrides via file and env
    - Explicit validation with actionable diagnostics
    - No hidden global state
============================================================*/

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{HelmupError, Result};

/// Environment variable carrying the locally running client build id.
pub const CLIENT_BUILD_ENV: &str = "HELMUP_CLIENT_BUILD";

/// Package name the catalog service is queried for.
pub const CONSOLE_PACKAGE_NAME: &str = "helm-console-ui";

/// Top-level Helm-Up-Core configuration document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HelmupConfig {
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub console: ConsoleConfig,
    #[serde(default)]
    pub action: ActionConfig,
    #[serde(default)]
    pub paths: PathsConfig,
}

/// Settings for the release catalog service.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CatalogConfig {
    pub base_url: String,
    pub package_name: String,
    pub timeout: u64,
    pub max_retries: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: "https://catalog.helmport.dev/v2".to_string(),
            package_name: CONSOLE_PACKAGE_NAME.to_string(),
            timeout: 30,
            max_retries: 3,
        }
    }
}

/// Settings for the console update service.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConsoleConfig {
    pub base_url: String,
    pub timeout: u64,
    pub max_retries: usize,
    /// Locally known client build, the fallback when the service
    /// is unreachable. Overridden by `HELMUP_CLIENT_BUILD`.
    pub client_build: Option<String>,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:7070".to_string(),
            timeout: 30,
            max_retries: 3,
            client_build: None,
        }
    }
}

/// Timing for the update/rollback action state machine.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ActionConfig {
    /// Seconds to hold a resolved mutation before surfacing its
    /// terminal state; covers slow server-side switchover.
    pub settle_delay_secs: u64,
}

impl Default for ActionConfig {
    fn default() -> Self {
        Self {
            settle_delay_secs: 45,
        }
    }
}

/// Filesystem locations used by the runtime.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    pub log_dir: Option<PathBuf>,
}

impl HelmupConfig {
    /// Load configuration from an explicit path, or from the default
    /// location when present, or fall back to built-in defaults.
    pub fn load_from_optional_path(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|err| {
                    HelmupError::Config(format!(
                        "Failed to read config {}: {err}",
                        path.display()
                    ))
                })?;
                Self::parse(&raw, path)
            }
            None => {
                let default_path = default_config_path();
                match default_path {
                    Some(path) if path.is_file() => {
                        let raw = std::fs::read_to_string(&path).map_err(|err| {
                            HelmupError::Config(format!(
                                "Failed to read config {}: {err}",
                                path.display()
                            ))
                        })?;
                        Self::parse(&raw, &path)
                    }
                    _ => Ok(Self::default()),
                }
            }
        }
    }

    fn parse(raw: &str, path: &Path) -> Result<Self> {
        let config: HelmupConfig = toml::from_str(raw).map_err(|err| {
            HelmupError::Config(format!("Invalid config {}: {err}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.catalog.package_name.trim().is_empty() {
            return Err(HelmupError::Config(
                "catalog.package_name must not be empty".into(),
            ));
        }
        if self.catalog.timeout == 0 || self.console.timeout == 0 {
            return Err(HelmupError::Config(
                "service timeouts must be at least one second".into(),
            ));
        }
        Ok(())
    }

    /// Directory for session logs.
    pub fn log_dir(&self) -> PathBuf {
        if let Some(dir) = &self.paths.log_dir {
            return dir.clone();
        }
        dirs::state_dir()
            .or_else(dirs::data_local_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("helm-up")
            .join("logs")
    }

    /// Artificial settle window applied before terminal action states.
    pub fn settle_delay(&self) -> Duration {
        Duration::from_secs(self.action.settle_delay_secs)
    }

    /// Resolve the locally running client build identifier:
    /// environment first, then config, then a conservative stub.
    pub fn local_client_build(&self) -> String {
        std::env::var(CLIENT_BUILD_ENV)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .or_else(|| self.console.client_build.clone())
            .unwrap_or_else(|| "local+v0.0.0".to_string())
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("helm-up").join("core.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = HelmupConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.catalog.package_name, CONSOLE_PACKAGE_NAME);
        assert_eq!(config.settle_delay(), Duration::from_secs(45));
    }

    #[test]
    fn parses_partial_document() {
        let raw = r#"
            [action]
            settle_delay_secs = 1

            [console]
            base_url = "http://console.internal:7070"
        "#;
        let config: HelmupConfig = toml::from_str(raw).unwrap();
        assert_eq!(config.action.settle_delay_secs, 1);
        assert_eq!(config.console.base_url, "http://console.internal:7070");
        // Untouched sections keep their defaults.
        assert_eq!(config.catalog.max_retries, 3);
    }

    #[test]
    fn rejects_zero_timeout() {
        let raw = "[catalog]\ntimeout = 0\n";
        let config: HelmupConfig = toml::from_str(raw).unwrap();
        assert!(config.validate().is_err());
    }
}
