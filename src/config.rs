//! Configuration loading via `ortho-config`.

use std::ffi::OsString;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

use crate::events::DEFAULT_EVENT_BUFFER;
use crate::orchestrator::{DEFAULT_VOLUME_SIZE_GIB, OrchestratorSettings};
use crate::volume::DEFAULT_FILESYSTEM_PATH_PREFIX;

/// Orchestrator defaults layered from configuration files and environment
/// variables.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(
    prefix = "MOORING",
    discovery(
        app_name = "mooring",
        env_var = "MOORING_CONFIG_PATH",
        config_file_name = "mooring.toml",
        dotfile_name = ".mooring.toml",
        project_file_name = "mooring.toml"
    )
)]
pub struct MooringConfig {
    /// Size seeded into the create drawer, in GiB.
    #[ortho_config(default = DEFAULT_VOLUME_SIZE_GIB)]
    pub default_volume_size_gib: u32,
    /// Prefix for device paths the gateway does not report.
    #[ortho_config(default = DEFAULT_FILESYSTEM_PATH_PREFIX.to_owned())]
    pub filesystem_path_prefix: String,
    /// Capacity of the in-process event bus.
    #[ortho_config(default = DEFAULT_EVENT_BUFFER)]
    pub event_buffer: usize,
}

/// Errors raised during configuration loading and validation.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Indicates a required configuration field is empty or missing.
    #[error("missing configuration field: {0}")]
    MissingField(String),
    /// Surfaces errors from the `ortho-config` loader.
    #[error("configuration parsing failed: {0}")]
    Parse(String),
    /// A value is present but unusable.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl From<ortho_config::OrthoError> for ConfigError {
    fn from(value: ortho_config::OrthoError) -> Self {
        Self::Parse(value.to_string())
    }
}

impl MooringConfig {
    /// Built-in values, as used when no file or variable overrides them.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            default_volume_size_gib: DEFAULT_VOLUME_SIZE_GIB,
            filesystem_path_prefix: DEFAULT_FILESYSTEM_PATH_PREFIX.to_owned(),
            event_buffer: DEFAULT_EVENT_BUFFER,
        }
    }

    /// Loads configuration without attempting to parse CLI arguments. Values
    /// merge defaults, configuration files, and environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the merge fails.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([OsString::from("mooring")])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Checks that every value is usable. Error messages name the
    /// environment variable and TOML key that set the value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] describing the first unusable value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_volume_size_gib == 0 {
            return Err(ConfigError::Invalid(String::from(
                "default volume size must be positive: set MOORING_DEFAULT_VOLUME_SIZE_GIB \
                 or default_volume_size_gib in mooring.toml",
            )));
        }
        if self.filesystem_path_prefix.trim().is_empty() {
            return Err(ConfigError::MissingField(String::from(
                "filesystem path prefix: set MOORING_FILESYSTEM_PATH_PREFIX or \
                 filesystem_path_prefix in mooring.toml",
            )));
        }
        if self.event_buffer == 0 {
            return Err(ConfigError::Invalid(String::from(
                "event buffer must hold at least one event: set MOORING_EVENT_BUFFER or \
                 event_buffer in mooring.toml",
            )));
        }
        Ok(())
    }

    /// Orchestrator settings derived from this configuration.
    #[must_use]
    pub fn settings(&self) -> OrchestratorSettings {
        OrchestratorSettings {
            default_volume_size_gib: self.default_volume_size_gib,
            filesystem_path_prefix: self.filesystem_path_prefix.clone(),
        }
    }
}
