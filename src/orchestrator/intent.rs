//! Serialisable user intents and their outcomes.
//!
//! Intents are the only way the presentation layer drives the orchestrator;
//! the CLI replays them from fixtures.

use serde::{Deserialize, Serialize};

use crate::confirmation::ConfirmationMode;
use crate::drawer::DrawerMode;
use crate::gateway::FieldError;
use crate::ticket::Ticket;
use crate::view::OperationError;
use crate::volume::VolumeId;

/// A user intent accepted by [`super::Orchestrator::dispatch`].
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "intent", rename_all = "snake_case")]
pub enum Intent {
    /// Open a drawer, seeded from a volume for edit, resize and clone.
    OpenDrawer {
        /// Drawer mode.
        mode: DrawerMode,
        /// Volume the drawer acts on.
        #[serde(default)]
        seed: Option<VolumeId>,
    },
    /// Close the drawer.
    CloseDrawer,
    /// Change one field of the open drawer.
    EditField {
        /// Field key.
        key: String,
        /// New raw value.
        value: String,
    },
    /// Validate and submit the open drawer.
    SubmitDrawer,
    /// Ask for confirmation before detaching or deleting.
    OpenConfirmation {
        /// Operation to confirm.
        mode: ConfirmationMode,
        /// Attached volume to act on.
        target: VolumeId,
    },
    /// Confirm the pending operation.
    ConfirmAction,
    /// Dismiss the pending confirmation.
    CancelConfirmation,
    /// Refetch both volume collections.
    Refresh,
    /// Retry the initial load.
    Reload,
}

/// Result of a drawer submission.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "result", content = "detail", rename_all = "snake_case")]
pub enum SubmitOutcome {
    /// Local validation failed; nothing was sent.
    Invalid(Vec<FieldError>),
    /// The gateway rejected the request; errors are shown in the drawer.
    Rejected(Vec<FieldError>),
    /// The call succeeded and the drawer closed.
    Completed(DrawerMode),
    /// The orchestrator was unmounted before the call resolved; its
    /// result was not applied to the drawer.
    Superseded(DrawerMode),
}

/// Result of a confirmed detach or delete.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ConfirmOutcome {
    /// The call succeeded and the confirmation closed.
    Completed {
        /// Operation performed.
        mode: ConfirmationMode,
        /// Volume acted on.
        target: VolumeId,
    },
    /// The call failed; the confirmation closed and a notice was raised.
    Failed(OperationError),
    /// The orchestrator was unmounted before the call resolved.
    Superseded {
        /// Operation performed.
        mode: ConfirmationMode,
        /// Volume acted on.
        target: VolumeId,
    },
}

/// Result of [`super::Orchestrator::dispatch`].
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum IntentOutcome {
    /// A drawer or confirmation opened.
    Opened {
        /// Session ticket.
        ticket: Ticket,
    },
    /// A close or cancel; `changed` is false when nothing was open.
    Dismissed {
        /// Whether anything was closed.
        changed: bool,
    },
    /// A field was updated.
    Edited,
    /// A drawer submission resolved.
    Submitted {
        /// Submission result.
        submission: SubmitOutcome,
    },
    /// A confirmed operation resolved.
    Confirmed {
        /// Confirmation result.
        confirmation: ConfirmOutcome,
    },
    /// A refresh or reload completed; `applied` is false when a newer
    /// snapshot had already been applied.
    Refreshed {
        /// Whether the snapshot replaced the cached lists.
        applied: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intents_parse_from_tagged_json() {
        let intents: Vec<Intent> = serde_json::from_str(
            r#"[
                {"intent":"open_drawer","mode":"resize","seed":4},
                {"intent":"open_drawer","mode":"create"},
                {"intent":"edit_field","key":"size","value":"80"},
                {"intent":"open_confirmation","mode":"detach","target":7},
                {"intent":"confirm_action"}
            ]"#,
        )
        .expect("parse intents");

        assert_eq!(
            intents,
            vec![
                Intent::OpenDrawer {
                    mode: DrawerMode::Resize,
                    seed: Some(VolumeId(4)),
                },
                Intent::OpenDrawer {
                    mode: DrawerMode::Create,
                    seed: None,
                },
                Intent::EditField {
                    key: String::from("size"),
                    value: String::from("80"),
                },
                Intent::OpenConfirmation {
                    mode: ConfirmationMode::Detach,
                    target: VolumeId(7),
                },
                Intent::ConfirmAction,
            ]
        );
    }

    #[test]
    fn unknown_intents_are_rejected() {
        let parsed = serde_json::from_str::<Intent>(r#"{"intent":"format_disk"}"#);
        assert!(parsed.is_err());
    }
}
