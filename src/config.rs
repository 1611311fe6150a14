//! # Configuration
//!
//! Runtime settings of the dispatch core.
//!
//! Settings are layered with the `config` crate: an optional base file
//! (`config/mediator.{toml,yaml,json}`), an optional environment overlay
//! (`config/mediator-{env}.*`), then `MEDIATOR__*` environment variables.
//! The loaded configuration is validated and installed once per process;
//! until then [`DispatchConfig::global`] returns the defaults.

use crate::constants::system;
use crate::error::{DispatchError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Deepest chain of nested inquiries before resolution is refused
    pub max_resolution_depth: usize,
    /// Emit a trace record for every candidate binding
    pub trace_candidates: bool,
    pub logging: LoggingConfig,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_resolution_depth: system::DEFAULT_MAX_RESOLUTION_DEPTH,
            trace_candidates: false,
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// Add a JSON formatted layer next to the console output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: system::DEFAULT_LOG_LEVEL.to_string(),
            json: false,
        }
    }
}

static GLOBAL_CONFIG: OnceLock<DispatchConfig> = OnceLock::new();

impl DispatchConfig {
    /// Load from the default directory for the detected environment
    pub fn load() -> Result<Self> {
        Self::load_from_directory(Path::new(system::CONFIG_DIRECTORY))
    }

    pub fn load_from_directory(directory: &Path) -> Result<Self> {
        let environment = crate::logging::get_environment();
        Self::load_from_directory_with_env(directory, &environment)
    }

    /// Load with an explicit environment name, without touching process state
    pub fn load_from_directory_with_env(directory: &Path, environment: &str) -> Result<Self> {
        let base: PathBuf = directory.join(system::CONFIG_FILE_STEM);
        let overlay: PathBuf = directory.join(format!("{}-{environment}", system::CONFIG_FILE_STEM));
        debug!(
            directory = %directory.display(),
            environment = %environment,
            "Loading dispatch configuration"
        );

        let config: DispatchConfig = config::Config::builder()
            .add_source(config::File::from(base).required(false))
            .add_source(config::File::from(overlay).required(false))
            .add_source(
                config::Environment::with_prefix(system::ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_resolution_depth == 0 {
            return Err(DispatchError::Config(
                "max_resolution_depth must be at least 1".to_string(),
            ));
        }
        if self.logging.level.trim().is_empty() {
            return Err(DispatchError::Config("logging.level must not be empty".to_string()));
        }
        Ok(())
    }

    /// Install as the process-wide configuration. Only the first install
    /// takes effect; later calls return `false`.
    pub fn install(self) -> Result<bool> {
        self.validate()?;
        let installed = GLOBAL_CONFIG.set(self).is_ok();
        if !installed {
            warn!("Dispatch configuration already installed, keeping the existing one");
        }
        Ok(installed)
    }

    /// The installed configuration, or the defaults
    pub fn global() -> &'static DispatchConfig {
        GLOBAL_CONFIG.get_or_init(DispatchConfig::default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_without_files() {
        let dir = TempDir::new().unwrap();
        let config = DispatchConfig::load_from_directory_with_env(dir.path(), "test").unwrap();
        assert_eq!(config.max_resolution_depth, system::DEFAULT_MAX_RESOLUTION_DEPTH);
        assert!(!config.trace_candidates);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_environment_overlay_wins() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("mediator.toml"),
            "max_resolution_depth = 8\n\n[logging]\nlevel = \"warn\"\n",
        )
        .unwrap();
        fs::write(dir.path().join("mediator-staging.toml"), "trace_candidates = true\n").unwrap();

        let config = DispatchConfig::load_from_directory_with_env(dir.path(), "staging").unwrap();
        assert_eq!(config.max_resolution_depth, 8);
        assert!(config.trace_candidates);
        assert_eq!(config.logging.level, "warn");
        assert!(!config.logging.json);
    }

    #[test]
    fn test_invalid_depth_is_rejected() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("mediator.toml"), "max_resolution_depth = 0\n").unwrap();
        let error = DispatchConfig::load_from_directory_with_env(dir.path(), "test").unwrap_err();
        assert!(matches!(error, DispatchError::Config(_)));
    }

    #[test]
    fn test_serialization_round_trip() {
        let config = DispatchConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: DispatchConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, parsed);
    }
}
