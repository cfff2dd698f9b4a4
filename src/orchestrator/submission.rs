//! Translation of a validated drawer form into one gateway call.

use crate::drawer::{DrawerForm, DrawerMode, DrawerState, field};
use crate::gateway::{CreateVolumeRequest, FieldError, GatewayError, ResourceGateway};
use crate::ticket::Ticket;
use crate::validate::{parse_size, validate};
use crate::volume::{ParentId, ParentInstance, VolumeId};

use super::OrchestratorError;

const ATTACH_FAILED: &str = "Could not attach volume.";

/// Outcome of preparing the open drawer for submission.
#[derive(Debug)]
pub(super) enum Prepared {
    /// Local validation failed; errors are already shown in the drawer.
    Invalid(Vec<FieldError>),
    /// The drawer is now submitting `submission`.
    Ready {
        ticket: Ticket,
        submission: Submission,
    },
}

/// Gateway call derived from a valid drawer form.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(super) enum Submission {
    Create(CreateVolumeRequest),
    Rename { id: VolumeId, label: String },
    Resize { id: VolumeId, size: u32 },
    Clone { id: VolumeId, label: String },
    Attach { id: VolumeId, parent: ParentId },
}

impl Submission {
    /// Validates the open drawer and, when valid, marks it as submitting.
    pub(super) fn prepare(
        drawer: &mut DrawerState,
        parent: &ParentInstance,
    ) -> Result<Prepared, OrchestratorError> {
        let open = drawer.current().ok_or(OrchestratorError::DrawerClosed)?;
        if open.is_submitting() {
            return Err(OrchestratorError::Busy {
                operation: format!("the {} submission", open.form().mode()),
            });
        }
        let submission = match Self::from_form(open.form(), parent) {
            Ok(submission) => submission,
            Err(errors) => {
                drawer.show_errors(errors.clone())?;
                return Ok(Prepared::Invalid(errors));
            }
        };

        let ticket = drawer.begin_submit()?;
        Ok(Prepared::Ready { ticket, submission })
    }

    fn from_form(form: &DrawerForm, parent: &ParentInstance) -> Result<Self, Vec<FieldError>> {
        let errors = validate(form);
        if !errors.is_empty() {
            return Err(errors);
        }
        let size = |raw: &str| parse_size(raw).ok_or_else(|| validate(form));

        Ok(match form {
            DrawerForm::Create(create) => Self::Create(CreateVolumeRequest {
                label: create.label.trim().to_owned(),
                size: size(&create.size)?,
                region: parent.region.clone(),
                parent_id: Some(parent.id),
            }),
            DrawerForm::Edit(edit) => Self::Rename {
                id: edit.id,
                label: edit.label.trim().to_owned(),
            },
            DrawerForm::Resize(resize) => Self::Resize {
                id: resize.id,
                size: size(&resize.size)?,
            },
            DrawerForm::Clone(clone) => Self::Clone {
                id: clone.id,
                label: clone.clone_label.trim().to_owned(),
            },
            DrawerForm::Attach(attach) => Self::Attach {
                id: attach.selected.ok_or_else(|| validate(form))?,
                parent: parent.id,
            },
        })
    }

    pub(super) const fn mode(&self) -> DrawerMode {
        match self {
            Self::Create(_) => DrawerMode::Create,
            Self::Rename { .. } => DrawerMode::Edit,
            Self::Resize { .. } => DrawerMode::Resize,
            Self::Clone { .. } => DrawerMode::Clone,
            Self::Attach { .. } => DrawerMode::Attach,
        }
    }

    /// Runs the call and returns the id of the volume it produced or changed.
    pub(super) async fn execute<G: ResourceGateway>(&self, gateway: &G) -> Result<VolumeId, GatewayError> {
        let volume = match self {
            Self::Create(request) => gateway.create(request).await?,
            Self::Rename { id, label } => gateway.update(*id, label).await?,
            Self::Resize { id, size } => gateway.resize(*id, *size).await?,
            Self::Clone { id, label } => gateway.clone_volume(*id, label).await?,
            Self::Attach { id, parent } => gateway.attach(*id, *parent).await?,
        };
        Ok(volume.id)
    }

    /// Maps a gateway failure onto the drawer's fields.
    ///
    /// Attach failures collapse into a single selection error and resize
    /// failures are always reported on the size field.
    pub(super) fn failure_errors(&self, error: GatewayError) -> Vec<FieldError> {
        match self.mode() {
            DrawerMode::Attach => vec![FieldError::new(field::VOLUME, ATTACH_FAILED)],
            DrawerMode::Resize => error
                .into_field_errors(field::SIZE)
                .into_iter()
                .map(|error| FieldError::new(field::SIZE, error.reason))
                .collect(),
            mode => error.into_field_errors(mode.primary_field()),
        }
    }
}
