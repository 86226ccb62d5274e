// src/config/loader.rs
//! Layered configuration loading: defaults, TOML files, environment

use crate::config::constants::paths;
use crate::config::AcquisitionConfig;
use crate::error::AcqError;
use ::config::{Config, Environment, File};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("configuration source error: {0}")]
    Source(#[from] ::config::ConfigError),

    #[error("configuration serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl From<ConfigError> for AcqError {
    fn from(err: ConfigError) -> Self {
        AcqError::Configuration(err.to_string())
    }
}

/// Configuration loader.
///
/// Later sources override earlier ones: built-in defaults, then each file in
/// order (missing files are skipped), then `AMP_`-prefixed environment
/// variables.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    config_paths: Vec<PathBuf>,
    env_prefix: Option<String>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Loader reading `amp.toml` then `amp.local.toml` from the working
    /// directory
    pub fn new() -> Self {
        Self::with_paths(vec![
            PathBuf::from(paths::DEFAULT_CONFIG_FILE),
            PathBuf::from(paths::LOCAL_CONFIG_FILE),
        ])
    }

    /// Create loader with custom paths
    pub fn with_paths(paths: Vec<PathBuf>) -> Self {
        Self {
            config_paths: paths,
            env_prefix: Some(paths::ENV_PREFIX.to_string()),
        }
    }

    pub fn env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = Some(prefix.into());
        self
    }

    /// Ignore environment overrides
    pub fn without_env(mut self) -> Self {
        self.env_prefix = None;
        self
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.config_paths
    }

    /// Load and validate the merged configuration
    pub fn load(&self) -> Result<AcquisitionConfig, ConfigError> {
        let mut builder = Config::builder();
        for path in &self.config_paths {
            if path.exists() {
                tracing::debug!(path = %path.display(), "adding configuration file");
            }
            builder = builder.add_source(File::from(path.as_path()).required(false));
        }
        self.finish(builder)
    }

    /// Load a single file, which must exist, plus environment overrides
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<AcquisitionConfig, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }
        let builder = Config::builder().add_source(File::from(path).required(true));
        self.finish(builder)
    }

    /// Write a configuration as TOML
    pub fn export(config: &AcquisitionConfig, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(config)?;
        fs::write(path.as_ref(), content)?;
        Ok(())
    }

    fn finish(
        &self,
        mut builder: ::config::ConfigBuilder<::config::builder::DefaultState>,
    ) -> Result<AcquisitionConfig, ConfigError> {
        if let Some(prefix) = &self.env_prefix {
            builder = builder.add_source(
                Environment::with_prefix(prefix)
                    .prefix_separator("_")
                    .separator(paths::ENV_SEPARATOR)
                    .try_parsing(true),
            );
        }

        let config: AcquisitionConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        tracing::info!(channels = config.channels.len(), "configuration loaded");
        Ok(config)
    }
}
