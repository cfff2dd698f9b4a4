//! Errors raised by orchestrator intents.

use thiserror::Error;

use crate::confirmation::ConfirmationError;
use crate::drawer::{DrawerError, DrawerMode};
use crate::gateway::GatewayError;
use crate::volume::VolumeId;

/// Initial load failure, surfaced as the page-level error state.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("failed to load volumes: {source}")]
pub struct LoadError {
    /// Gateway failure that aborted the load.
    #[from]
    pub source: GatewayError,
}

/// Intents that are invalid in the current orchestrator state.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum OrchestratorError {
    /// The intent needs an open drawer.
    #[error("no drawer is open")]
    DrawerClosed,
    /// The intent needs an open confirmation.
    #[error("no confirmation is open")]
    ConfirmationClosed,
    /// A submission or confirmation is already in flight.
    #[error("{operation} is already in flight")]
    Busy {
        /// Description of the in-flight operation.
        operation: String,
    },
    /// The volume is not in the collection the intent acts on.
    #[error("volume {id} is not available for this action")]
    UnknownVolume {
        /// Identifier passed by the caller.
        id: VolumeId,
    },
    /// The key does not name an editable field of the open drawer.
    #[error("field '{key}' is not editable in {mode} mode")]
    UnknownField {
        /// Mode of the open drawer.
        mode: DrawerMode,
        /// Key passed by the caller.
        key: String,
    },
    /// The value cannot be stored in the field.
    #[error("invalid value '{value}' for field '{key}'")]
    InvalidValue {
        /// Field key.
        key: String,
        /// Raw value passed by the caller.
        value: String,
    },
    /// The mode was opened with a seed it cannot take, or without one it needs.
    #[error("{mode} drawer {requirement}")]
    WrongMode {
        /// Requested mode.
        mode: DrawerMode,
        /// What the mode expects.
        requirement: &'static str,
    },
    /// The orchestrator has been unmounted.
    #[error("the volume view has been unmounted")]
    NotMounted,
    /// The initial load failed.
    #[error(transparent)]
    Load(#[from] LoadError),
    /// A manual refresh failed; the previous snapshot is kept.
    #[error("refresh failed: {0}")]
    Refresh(#[source] GatewayError),
}

impl From<DrawerError> for OrchestratorError {
    fn from(error: DrawerError) -> Self {
        match error {
            DrawerError::Closed => Self::DrawerClosed,
            DrawerError::Busy { mode } => Self::Busy {
                operation: format!("the {mode} submission"),
            },
            DrawerError::UnknownField { mode, key } => Self::UnknownField { mode, key },
            DrawerError::InvalidValue { key, value } => Self::InvalidValue { key, value },
        }
    }
}

impl From<ConfirmationError> for OrchestratorError {
    fn from(error: ConfirmationError) -> Self {
        match error {
            ConfirmationError::Closed => Self::ConfirmationClosed,
            ConfirmationError::Busy { mode, target } => Self::Busy {
                operation: format!("the {mode} of volume {target}"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::confirmation::ConfirmationMode;

    #[test]
    fn drawer_busy_names_the_mode() {
        let error = OrchestratorError::from(DrawerError::Busy {
            mode: DrawerMode::Resize,
        });
        assert_eq!(error.to_string(), "the resize submission is already in flight");
    }

    #[test]
    fn confirmation_busy_names_the_target() {
        let error = OrchestratorError::from(ConfirmationError::Busy {
            mode: ConfirmationMode::Detach,
            target: VolumeId(7),
        });
        assert_eq!(error.to_string(), "the detach of volume 7 is already in flight");
    }

    #[test]
    fn load_error_wraps_the_gateway_message() {
        let error = LoadError::from(GatewayError::operation("timeout"));
        assert_eq!(
            error.to_string(),
            "failed to load volumes: operation failed: timeout"
        );
    }
}
