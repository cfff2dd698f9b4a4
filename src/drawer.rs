//! Drawer state machine for the single modal form family.
//!
//! At most one drawer is open at a time. Opening a mode while another is open
//! replaces it wholesale, so field values and errors never leak across modes.
//! While a submission is in flight the drawer refuses edits and further
//! submissions until the result is applied.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::gateway::FieldError;
use crate::ticket::{Ticket, TicketCounter};
use crate::volume::{ParentId, Volume, VolumeId};

/// Form field keys understood by [`DrawerState::edit_field`].
pub mod field {
    /// Volume label (create, edit).
    pub const LABEL: &str = "label";
    /// Size in GiB (create, resize).
    pub const SIZE: &str = "size";
    /// Label for the clone (clone).
    pub const CLONE_LABEL: &str = "clone_label";
    /// Selected volume (attach).
    pub const VOLUME: &str = "volume";
    /// Region, always locked.
    pub const REGION: &str = "region";
    /// Parent instance, always locked.
    pub const PARENT: &str = "parent";
}

/// Drawer modes.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawerMode {
    /// Create a new volume attached to the parent.
    Create,
    /// Rename an attached volume.
    Edit,
    /// Grow an attached volume.
    Resize,
    /// Clone an attached volume.
    Clone,
    /// Attach an existing unbound volume.
    Attach,
}

impl DrawerMode {
    /// Title shown at the top of the drawer.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Create => "Create a Volume",
            Self::Edit => "Rename a Volume",
            Self::Resize => "Resize a Volume",
            Self::Clone => "Clone a Volume",
            Self::Attach => "Attach Volume",
        }
    }

    /// Fields displayed but not editable in this mode.
    #[must_use]
    pub const fn locked_fields(self) -> &'static [&'static str] {
        match self {
            Self::Create => &[field::REGION, field::PARENT],
            Self::Edit => &[field::REGION, field::PARENT, field::SIZE],
            Self::Resize => &[field::REGION, field::PARENT, field::LABEL],
            Self::Clone => &[field::REGION, field::PARENT, field::SIZE, field::LABEL],
            Self::Attach => &[field::PARENT],
        }
    }

    /// Field that gateway failures without a field mapping are reported on.
    #[must_use]
    pub const fn primary_field(self) -> &'static str {
        match self {
            Self::Create | Self::Edit => field::LABEL,
            Self::Resize => field::SIZE,
            Self::Clone => field::CLONE_LABEL,
            Self::Attach => field::VOLUME,
        }
    }
}

impl fmt::Display for DrawerMode {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Create => "create",
            Self::Edit => "edit",
            Self::Resize => "resize",
            Self::Clone => "clone",
            Self::Attach => "attach",
        };
        formatter.write_str(name)
    }
}

/// Fields of the create drawer.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct CreateForm {
    /// Label typed by the user.
    pub label: String,
    /// Raw size input in GiB.
    pub size: String,
    /// Region, fixed to the parent's region.
    pub region: String,
    /// Parent the new volume attaches to.
    pub parent_id: ParentId,
}

/// Fields of the rename drawer.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct EditForm {
    /// Volume being renamed.
    pub id: VolumeId,
    /// New label.
    pub label: String,
}

/// Fields of the resize drawer.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ResizeForm {
    /// Volume being resized.
    pub id: VolumeId,
    /// Current label, for display.
    pub label: String,
    /// Raw size input in GiB.
    pub size: String,
}

/// Fields of the clone drawer.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct CloneForm {
    /// Volume being cloned.
    pub id: VolumeId,
    /// Label of the source volume, for display.
    pub source_label: String,
    /// Label for the clone.
    pub clone_label: String,
}

/// Fields of the attach drawer.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct AttachForm {
    /// Volume picked from the attachable set.
    pub selected: Option<VolumeId>,
}

/// Mode-specific field payload of an open drawer.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DrawerForm {
    /// Create drawer.
    Create(CreateForm),
    /// Rename drawer.
    Edit(EditForm),
    /// Resize drawer.
    Resize(ResizeForm),
    /// Clone drawer.
    Clone(CloneForm),
    /// Attach drawer.
    Attach(AttachForm),
}

impl DrawerForm {
    /// Blank create form seeded with the default size.
    #[must_use]
    pub fn create(parent_id: ParentId, region: &str, default_size: u32) -> Self {
        Self::Create(CreateForm {
            label: String::new(),
            size: default_size.to_string(),
            region: region.to_owned(),
            parent_id,
        })
    }

    /// Rename form seeded from `volume`.
    #[must_use]
    pub fn edit(volume: &Volume) -> Self {
        Self::Edit(EditForm {
            id: volume.id,
            label: volume.label.clone(),
        })
    }

    /// Resize form seeded from `volume`.
    #[must_use]
    pub fn resize(volume: &Volume) -> Self {
        Self::Resize(ResizeForm {
            id: volume.id,
            label: volume.label.clone(),
            size: volume.size.to_string(),
        })
    }

    /// Clone form seeded from `volume` with an empty clone label.
    #[must_use]
    pub fn clone_of(volume: &Volume) -> Self {
        Self::Clone(CloneForm {
            id: volume.id,
            source_label: volume.label.clone(),
            clone_label: String::new(),
        })
    }

    /// Attach form with nothing selected.
    #[must_use]
    pub fn attach() -> Self {
        Self::Attach(AttachForm::default())
    }

    /// Mode of this form.
    #[must_use]
    pub const fn mode(&self) -> DrawerMode {
        match self {
            Self::Create(_) => DrawerMode::Create,
            Self::Edit(_) => DrawerMode::Edit,
            Self::Resize(_) => DrawerMode::Resize,
            Self::Clone(_) => DrawerMode::Clone,
            Self::Attach(_) => DrawerMode::Attach,
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), DrawerError> {
        let mode = self.mode();
        match (self, key) {
            (Self::Create(form), field::LABEL) => form.label = value.to_owned(),
            (Self::Create(form), field::SIZE) => form.size = value.to_owned(),
            (Self::Edit(form), field::LABEL) => form.label = value.to_owned(),
            (Self::Resize(form), field::SIZE) => form.size = value.to_owned(),
            (Self::Clone(form), field::CLONE_LABEL) => form.clone_label = value.to_owned(),
            (Self::Attach(form), field::VOLUME) => form.selected = parse_selection(value)?,
            _ => {
                return Err(DrawerError::UnknownField {
                    mode,
                    key: key.to_owned(),
                });
            }
        }
        Ok(())
    }
}

pub(crate) fn parse_selection(value: &str) -> Result<Option<VolumeId>, DrawerError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse::<u64>()
        .map(|id| Some(VolumeId(id)))
        .map_err(|_| DrawerError::InvalidValue {
            key: field::VOLUME.to_owned(),
            value: value.to_owned(),
        })
}

/// An open drawer with its form, errors and submission flag.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OpenDrawer {
    ticket: Ticket,
    form: DrawerForm,
    errors: Vec<FieldError>,
    submitting: bool,
}

impl OpenDrawer {
    /// Ticket issued when the drawer opened.
    #[must_use]
    pub const fn ticket(&self) -> Ticket {
        self.ticket
    }

    /// Current field values.
    #[must_use]
    pub const fn form(&self) -> &DrawerForm {
        &self.form
    }

    /// Errors currently shown.
    #[must_use]
    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// Whether a submission is in flight.
    #[must_use]
    pub const fn is_submitting(&self) -> bool {
        self.submitting
    }
}

/// Errors raised by drawer transitions that are invalid in the current state.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum DrawerError {
    /// No drawer is open.
    #[error("no drawer is open")]
    Closed,
    /// A submission is still in flight.
    #[error("a {mode} submission is already in flight")]
    Busy {
        /// Mode of the busy drawer.
        mode: DrawerMode,
    },
    /// The key does not name an editable field of the open mode.
    #[error("field '{key}' is not editable in {mode} mode")]
    UnknownField {
        /// Mode of the open drawer.
        mode: DrawerMode,
        /// Key passed by the caller.
        key: String,
    },
    /// The value cannot be represented by the field.
    #[error("invalid value '{value}' for field '{key}'")]
    InvalidValue {
        /// Field key.
        key: String,
        /// Raw value passed by the caller.
        value: String,
    },
}

/// Drawer state: closed, or exactly one open mode.
#[derive(Clone, Debug, Default)]
pub struct DrawerState {
    open: Option<OpenDrawer>,
    tickets: TicketCounter,
}

impl DrawerState {
    /// Returns the open drawer, if any.
    #[must_use]
    pub const fn current(&self) -> Option<&OpenDrawer> {
        self.open.as_ref()
    }

    /// Returns the mode of the open drawer, if any.
    #[must_use]
    pub fn mode(&self) -> Option<DrawerMode> {
        self.open.as_ref().map(|drawer| drawer.form.mode())
    }

    /// Fails while the open drawer has a submission in flight.
    ///
    /// # Errors
    ///
    /// Returns [`DrawerError::Busy`] while submitting.
    pub fn ensure_idle(&self) -> Result<(), DrawerError> {
        match &self.open {
            Some(drawer) if drawer.submitting => Err(DrawerError::Busy {
                mode: drawer.form.mode(),
            }),
            _ => Ok(()),
        }
    }

    /// Opens `form`, replacing an idle drawer.
    ///
    /// # Errors
    ///
    /// Returns [`DrawerError::Busy`] while the current drawer is submitting.
    pub fn open(&mut self, form: DrawerForm) -> Result<Ticket, DrawerError> {
        self.ensure_idle()?;
        let ticket = self.tickets.issue();
        self.open = Some(OpenDrawer {
            ticket,
            form,
            errors: Vec::new(),
            submitting: false,
        });
        Ok(ticket)
    }

    /// Closes the drawer. Returns `false` when it was already closed.
    ///
    /// # Errors
    ///
    /// Returns [`DrawerError::Busy`] while a submission is in flight.
    pub fn close(&mut self) -> Result<bool, DrawerError> {
        self.ensure_idle()?;
        Ok(self.open.take().is_some())
    }

    /// Drops the drawer even mid-submission. The pending result no longer
    /// matches any session and is ignored.
    pub fn discard(&mut self) {
        self.open = None;
    }

    /// Updates one field and clears any shown errors.
    ///
    /// # Errors
    ///
    /// Returns [`DrawerError`] when no drawer is open, a submission is in
    /// flight, or the key is not editable in the open mode.
    pub fn edit_field(&mut self, key: &str, value: &str) -> Result<(), DrawerError> {
        let drawer = self.open.as_mut().ok_or(DrawerError::Closed)?;
        if drawer.submitting {
            return Err(DrawerError::Busy {
                mode: drawer.form.mode(),
            });
        }
        drawer.form.set(key, value)?;
        drawer.errors.clear();
        Ok(())
    }

    /// Shows locally detected errors and keeps the drawer open.
    ///
    /// # Errors
    ///
    /// Returns [`DrawerError::Closed`] when no drawer is open.
    pub fn show_errors(&mut self, errors: Vec<FieldError>) -> Result<(), DrawerError> {
        let drawer = self.open.as_mut().ok_or(DrawerError::Closed)?;
        drawer.errors = errors;
        Ok(())
    }

    /// Marks the drawer as submitting and returns its session ticket.
    ///
    /// # Errors
    ///
    /// Returns [`DrawerError::Closed`] when no drawer is open and
    /// [`DrawerError::Busy`] when a submission is already in flight.
    pub fn begin_submit(&mut self) -> Result<Ticket, DrawerError> {
        let drawer = self.open.as_mut().ok_or(DrawerError::Closed)?;
        if drawer.submitting {
            return Err(DrawerError::Busy {
                mode: drawer.form.mode(),
            });
        }
        drawer.submitting = true;
        drawer.errors.clear();
        Ok(drawer.ticket)
    }

    /// Applies a successful result: closes the drawer if `ticket` is still
    /// the open session. Returns whether the drawer was closed.
    pub fn finish_success(&mut self, ticket: Ticket) -> bool {
        if self.is_current(ticket) {
            self.open = None;
            return true;
        }
        false
    }

    /// Applies a failed result: re-enables the drawer and shows `errors` if
    /// `ticket` is still the open session. Returns whether they were shown.
    pub fn finish_failure(&mut self, ticket: Ticket, errors: Vec<FieldError>) -> bool {
        match self.open.as_mut() {
            Some(drawer) if drawer.ticket == ticket => {
                drawer.submitting = false;
                drawer.errors = errors;
                true
            }
            _ => false,
        }
    }

    fn is_current(&self, ticket: Ticket) -> bool {
        self.open
            .as_ref()
            .is_some_and(|drawer| drawer.ticket == ticket)
    }
}
