//! Read-only projection of orchestrator state for the presentation layer.
//!
//! The list rules are evaluated in priority order:
//!
//! 1. a parent without configurations shows only the no-config placeholder;
//! 2. a parent without attached volumes shows a placeholder whose call to
//!    action is *attach* when something is attachable, otherwise *create*;
//! 3. otherwise the attached table is rendered with per-row actions and a
//!    header affordance chosen the same way.

use serde::Serialize;

use crate::confirmation::{ConfirmationMode, PendingConfirmation};
use crate::drawer::{DrawerForm, DrawerMode, OpenDrawer};
use crate::gateway::FieldError;
use crate::volume::{Volume, VolumeId, VolumeSnapshot};

/// Kind of placeholder shown instead of the table.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlaceholderKind {
    /// The parent has no configurations; volumes cannot be used yet.
    NoConfig,
    /// Nothing attached, but attachable volumes exist.
    Attach,
    /// Nothing attached and nothing attachable.
    Create,
}

/// Placeholder content.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Placeholder {
    /// Placeholder kind.
    pub kind: PlaceholderKind,
    /// Heading.
    pub title: &'static str,
    /// Body copy.
    pub copy: &'static str,
    /// Button label.
    pub action_label: &'static str,
}

impl Placeholder {
    /// Placeholder for `kind`.
    #[must_use]
    pub const fn for_kind(kind: PlaceholderKind) -> Self {
        match kind {
            PlaceholderKind::NoConfig => Self {
                kind,
                title: "No configs available",
                copy: "This Linode has no configurations. Click below to create a configuration.",
                action_label: "View Linode Config",
            },
            PlaceholderKind::Attach => Self {
                kind,
                title: "No volumes attached",
                copy: "Click below to attach a volume.",
                action_label: "Attach a Volume",
            },
            PlaceholderKind::Create => Self {
                kind,
                title: "No volumes found",
                copy: "Click below to create a volume.",
                action_label: "Create a Volume",
            },
        }
    }
}

/// Header affordance shown above the attached table.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Affordance {
    /// Opens the attach drawer.
    Attach,
    /// Opens the create drawer.
    Create,
}

impl Affordance {
    /// Link label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Attach => "Attach Existing Volume",
            Self::Create => "Create a Volume",
        }
    }

    const fn for_attachable(attachable: usize) -> Self {
        if attachable > 0 { Self::Attach } else { Self::Create }
    }
}

/// Actions offered on every attached row, in menu order.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowAction {
    /// Opens the detach confirmation.
    Detach,
    /// Opens the delete confirmation.
    Delete,
    /// Opens the clone drawer.
    Clone,
    /// Opens the rename drawer.
    Edit,
    /// Opens the resize drawer.
    Resize,
}

/// Row actions offered for attached volumes.
pub const ROW_ACTIONS: [RowAction; 5] = [
    RowAction::Detach,
    RowAction::Delete,
    RowAction::Clone,
    RowAction::Edit,
    RowAction::Resize,
];

/// One row of the attached table.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct VolumeRow {
    /// Volume identifier.
    pub id: VolumeId,
    /// Label.
    pub label: String,
    /// Size formatted for display, for example `20 GiB`.
    pub size: String,
    /// Device path, synthesised when the gateway omits it.
    pub filesystem_path: String,
    /// Row menu.
    pub actions: Vec<RowAction>,
}

impl VolumeRow {
    fn from_volume(volume: &Volume, path_prefix: &str) -> Self {
        Self {
            id: volume.id,
            label: volume.label.clone(),
            size: format!("{} GiB", volume.size),
            filesystem_path: volume.filesystem_path_or(path_prefix),
            actions: ROW_ACTIONS.to_vec(),
        }
    }
}

/// Derived list section: placeholder, header affordance and rows.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct ListView {
    /// Placeholder shown instead of the table.
    pub placeholder: Option<Placeholder>,
    /// Header affordance above the table.
    pub header_action: Option<Affordance>,
    /// Attached rows.
    pub rows: Vec<VolumeRow>,
}

impl ListView {
    /// Applies the list rules to `snapshot`.
    #[must_use]
    pub fn derive(config_count: usize, snapshot: &VolumeSnapshot, path_prefix: &str) -> Self {
        if config_count == 0 {
            return Self {
                placeholder: Some(Placeholder::for_kind(PlaceholderKind::NoConfig)),
                ..Self::default()
            };
        }

        let affordance = Affordance::for_attachable(snapshot.attachable.len());
        if snapshot.attached.is_empty() {
            let kind = match affordance {
                Affordance::Attach => PlaceholderKind::Attach,
                Affordance::Create => PlaceholderKind::Create,
            };
            return Self {
                placeholder: Some(Placeholder::for_kind(kind)),
                ..Self::default()
            };
        }

        Self {
            placeholder: None,
            header_action: Some(affordance),
            rows: snapshot
                .attached
                .iter()
                .map(|volume| VolumeRow::from_volume(volume, path_prefix))
                .collect(),
        }
    }

    /// Kind of the placeholder, if one is shown.
    #[must_use]
    pub fn placeholder_kind(&self) -> Option<PlaceholderKind> {
        self.placeholder.as_ref().map(|placeholder| placeholder.kind)
    }
}

/// Option listed in the attach drawer.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct AttachOption {
    /// Volume identifier.
    pub id: VolumeId,
    /// Label.
    pub label: String,
}

/// Open drawer as rendered.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct DrawerView {
    /// Drawer mode.
    pub mode: DrawerMode,
    /// Title.
    pub title: &'static str,
    /// Label of the parent instance.
    pub parent_label: String,
    /// Current field values.
    pub form: DrawerForm,
    /// Fields shown read-only.
    pub locked_fields: &'static [&'static str],
    /// Field-scoped errors.
    pub errors: Vec<FieldError>,
    /// First field with an error; the presentation layer scrolls to it.
    pub scroll_to: Option<String>,
    /// Submission in flight; the submit button is disabled.
    pub submitting: bool,
    /// Choices for the attach drawer; empty in other modes.
    pub attach_options: Vec<AttachOption>,
}

impl DrawerView {
    /// Renders `drawer` for `parent_label`.
    #[must_use]
    pub fn from_open(drawer: &OpenDrawer, parent_label: &str, snapshot: &VolumeSnapshot) -> Self {
        let mode = drawer.form().mode();
        let attach_options = if mode == DrawerMode::Attach {
            snapshot
                .attachable
                .iter()
                .map(|volume| AttachOption {
                    id: volume.id,
                    label: volume.label.clone(),
                })
                .collect()
        } else {
            Vec::new()
        };
        Self {
            mode,
            title: mode.title(),
            parent_label: parent_label.to_owned(),
            form: drawer.form().clone(),
            locked_fields: mode.locked_fields(),
            errors: drawer.errors().to_vec(),
            scroll_to: drawer.errors().first().map(|error| error.field.clone()),
            submitting: drawer.is_submitting(),
            attach_options,
        }
    }
}

/// Open confirmation as rendered.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ConfirmationView {
    /// Operation awaiting confirmation.
    pub mode: ConfirmationMode,
    /// Volume captured when the dialog opened.
    pub target: VolumeId,
    /// Dialog title.
    pub title: &'static str,
    /// Dialog prompt.
    pub prompt: String,
    /// Confirmed call in flight; both buttons are disabled.
    pub confirming: bool,
}

impl From<&PendingConfirmation> for ConfirmationView {
    fn from(pending: &PendingConfirmation) -> Self {
        Self {
            mode: pending.mode,
            target: pending.target,
            title: pending.mode.title(),
            prompt: pending.mode.prompt(),
            confirming: pending.confirming,
        }
    }
}

/// Page-level status.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PageStatus {
    /// Initial load has not completed.
    Loading,
    /// Volumes are loaded.
    Ready,
    /// Initial load failed; only a manual retry recovers.
    Failed {
        /// Description of the load failure.
        message: String,
    },
}

/// Failure of a confirmed operation, shown until the next intent.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct OperationError {
    /// Operation that failed.
    pub mode: ConfirmationMode,
    /// Volume targeted.
    pub target: VolumeId,
    /// Failure description.
    pub message: String,
}

/// Full rendering surface.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct RenderSurface {
    /// Page-level status.
    pub page: PageStatus,
    /// Placeholder, header affordance and rows.
    pub list: ListView,
    /// Open drawer.
    pub drawer: Option<DrawerView>,
    /// Open confirmation.
    pub confirmation: Option<ConfirmationView>,
    /// Failure of the last confirmed operation, until the next intent.
    pub notice: Option<OperationError>,
}

impl RenderSurface {
    /// Kind of the placeholder shown, if any.
    #[must_use]
    pub fn placeholder_kind(&self) -> Option<PlaceholderKind> {
        self.list.placeholder_kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drawer::DrawerState;
    use crate::volume::{DEFAULT_FILESYSTEM_PATH_PREFIX, ParentId};
    use rstest::rstest;

    fn volume(id: u64, parent: Option<u64>) -> Volume {
        Volume {
            id: VolumeId(id),
            label: format!("vol-{id}"),
            size: 20,
            region: String::from("us-east"),
            filesystem_path: None,
            parent_id: parent.map(ParentId),
        }
    }

    fn snapshot(attached: usize, attachable: usize) -> VolumeSnapshot {
        VolumeSnapshot {
            attached: (0..attached as u64).map(|id| volume(id + 1, Some(1))).collect(),
            attachable: (0..attachable as u64)
                .map(|id| volume(id + 100, None))
                .collect(),
        }
    }

    #[rstest]
    #[case(0, 0, 0, Some(PlaceholderKind::NoConfig), None, 0)]
    #[case(0, 3, 2, Some(PlaceholderKind::NoConfig), None, 0)]
    #[case(1, 0, 0, Some(PlaceholderKind::Create), None, 0)]
    #[case(1, 0, 2, Some(PlaceholderKind::Attach), None, 0)]
    #[case(2, 2, 0, None, Some(Affordance::Create), 2)]
    #[case(2, 1, 1, None, Some(Affordance::Attach), 1)]
    fn list_rules_apply_in_priority_order(
        #[case] configs: usize,
        #[case] attached: usize,
        #[case] attachable: usize,
        #[case] placeholder: Option<PlaceholderKind>,
        #[case] header: Option<Affordance>,
        #[case] rows: usize,
    ) {
        let view = ListView::derive(
            configs,
            &snapshot(attached, attachable),
            DEFAULT_FILESYSTEM_PATH_PREFIX,
        );
        assert_eq!(view.placeholder_kind(), placeholder);
        assert_eq!(view.header_action, header);
        assert_eq!(view.rows.len(), rows);
    }

    #[test]
    fn rows_format_size_path_and_actions() {
        let view = ListView::derive(1, &snapshot(1, 0), DEFAULT_FILESYSTEM_PATH_PREFIX);
        let row = view.rows.first().expect("one row");
        assert_eq!(row.size, "20 GiB");
        assert_eq!(row.filesystem_path, "/dev/disk/by-id/scsi-0Linode_Volume_vol-1");
        assert_eq!(row.actions, ROW_ACTIONS.to_vec());
    }

    #[test]
    fn placeholder_kind_serialises_kebab_case() {
        let json = serde_json::to_string(&PlaceholderKind::NoConfig).expect("serialise");
        assert_eq!(json, r#""no-config""#);
    }

    #[test]
    fn drawer_view_points_at_first_error() {
        let mut drawer = DrawerState::default();
        drawer.open(DrawerForm::create(ParentId(1), "us-east", 20)).expect("open drawer");
        drawer
            .show_errors(vec![
                FieldError::new("label", "Label cannot be blank."),
                FieldError::new("size", "Size cannot be blank."),
            ])
            .expect("show errors");
        let open = drawer.current().expect("open");

        let view = DrawerView::from_open(open, "web-1", &snapshot(0, 1));
        assert_eq!(view.title, "Create a Volume");
        assert_eq!(view.scroll_to.as_deref(), Some("label"));
        assert!(view.attach_options.is_empty());
    }

    #[test]
    fn attach_drawer_lists_attachable_volumes() {
        let mut drawer = DrawerState::default();
        drawer.open(DrawerForm::attach()).expect("open drawer");
        let open = drawer.current().expect("open");

        let view = DrawerView::from_open(open, "web-1", &snapshot(1, 2));
        let ids: Vec<_> = view.attach_options.iter().map(|option| option.id.0).collect();
        assert_eq!(ids, vec![100, 101]);
    }
}
