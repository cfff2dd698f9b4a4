//! JSON fixtures describing a parent instance, its volumes and a script of
//! intents to replay.

use std::collections::HashSet;

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8::Dir};
use serde::Deserialize;
use thiserror::Error;

use crate::events::{DomainEvent, EventBus};
use crate::memory::MemoryGateway;
use crate::orchestrator::Intent;
use crate::volume::{ParentInstance, Volume};

/// Errors raised while loading a fixture.
#[derive(Debug, Error)]
pub enum FixtureError {
    /// Raised when the fixture cannot be read.
    #[error("failed to read {path}: {message}")]
    Io {
        /// Path that could not be read.
        path: Utf8PathBuf,
        /// Human-readable error message.
        message: String,
    },
    /// Raised when the fixture is not valid JSON for the expected shape.
    #[error("failed to parse {path}: {message}")]
    Parse {
        /// Path that could not be parsed.
        path: Utf8PathBuf,
        /// Human-readable error message.
        message: String,
    },
    /// Raised when the fixture parses but describes an impossible state.
    #[error("invalid fixture {path}: {message}")]
    Invalid {
        /// Path of the fixture.
        path: Utf8PathBuf,
        /// Human-readable error message.
        message: String,
    },
}

/// Parent, volumes and script loaded from a fixture file.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct Fixture {
    /// Parent instance the view is scoped to.
    pub parent: ParentInstance,
    /// Number of boot configurations on the parent.
    #[serde(default = "default_configs")]
    pub configs: usize,
    /// Volumes known to the gateway, in listing order.
    #[serde(default)]
    pub volumes: Vec<Volume>,
    /// Intents replayed by `mooring apply`.
    #[serde(default)]
    pub intents: Vec<Intent>,
    /// Domain events published after the intents, as if from other sessions.
    #[serde(default)]
    pub events: Vec<DomainEvent>,
}

const fn default_configs() -> usize {
    1
}

impl Fixture {
    /// Reads and validates the fixture at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`FixtureError`] when the file cannot be read or parsed, or
    /// describes duplicate, empty or out-of-range volumes.
    pub fn load(path: &Utf8Path) -> Result<Self, FixtureError> {
        let contents = read_fixture(path)?;
        let fixture: Self = serde_json::from_str(&contents).map_err(|err| FixtureError::Parse {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        fixture.validate().map_err(|message| FixtureError::Invalid {
            path: path.to_path_buf(),
            message,
        })?;
        Ok(fixture)
    }

    fn validate(&self) -> Result<(), String> {
        let mut seen = HashSet::new();
        for volume in &self.volumes {
            if !seen.insert(volume.id) {
                return Err(format!("volume {} is listed twice", volume.id));
            }
            if volume.size == 0 {
                return Err(format!("volume {} has a zero size", volume.id));
            }
            if volume.id.0 == u64::MAX {
                return Err(format!("volume id {} is reserved", volume.id));
            }
        }
        Ok(())
    }

    /// Builds a gateway seeded with the fixture's parent and volumes that
    /// publishes events on `bus`.
    #[must_use]
    pub fn gateway(&self, bus: EventBus) -> MemoryGateway {
        let gateway = MemoryGateway::new().with_events(bus);
        gateway.add_parent(&self.parent, self.configs);
        for volume in &self.volumes {
            gateway.insert_volume(volume.clone());
        }
        gateway
    }
}

fn read_fixture(path: &Utf8Path) -> Result<String, FixtureError> {
    let parent = path
        .parent()
        .filter(|parent| !parent.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));
    let file_name = path.file_name().ok_or_else(|| FixtureError::Invalid {
        path: path.to_path_buf(),
        message: String::from("fixture path is missing a filename"),
    })?;

    let dir = Dir::open_ambient_dir(parent, ambient_authority()).map_err(|err| FixtureError::Io {
        path: parent.to_path_buf(),
        message: err.to_string(),
    })?;
    dir.read_to_string(file_name).map_err(|err| FixtureError::Io {
        path: path.to_path_buf(),
        message: err.to_string(),
    })
}
