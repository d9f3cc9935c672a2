//! Executor configuration
//!
//! Loaded from TOML; every field has a default so partial files are fine.

use cmdlang::rewriter::DEFAULT_MAX_PASSES;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read or write config: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Parse rounds the identifier rewriter may take per command.
    pub max_rewrite_passes: usize,
    /// Install the prelude builtins (`len`, `str`, ...) before the first
    /// command. Names already bound are left alone.
    pub install_prelude: bool,
    /// Log each rewritten command at debug level.
    pub log_rewrites: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        ExecutorConfig {
            max_rewrite_passes: DEFAULT_MAX_PASSES,
            install_prelude: false,
            log_rewrites: false,
        }
    }
}

impl ExecutorConfig {
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn partial_files_fall_back_to_defaults() {
        let config = ExecutorConfig::from_toml("install_prelude = true").unwrap();
        assert_eq!(
            config,
            ExecutorConfig {
                install_prelude: true,
                ..ExecutorConfig::default()
            }
        );
    }

    #[test]
    fn save_and_load_round_trip_through_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("executor.toml");
        let config = ExecutorConfig {
            max_rewrite_passes: 4,
            install_prelude: true,
            log_rewrites: true,
        };
        config.save_to_file(&path).unwrap();
        assert_eq!(ExecutorConfig::load_from_file(&path).unwrap(), config);
    }

    #[test]
    fn unknown_types_are_rejected() {
        assert!(matches!(
            ExecutorConfig::from_toml("max_rewrite_passes = \"many\""),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            ExecutorConfig::load_from_file("/nonexistent/executor.toml"),
            Err(ConfigError::Io(_))
        ));
    }
}
