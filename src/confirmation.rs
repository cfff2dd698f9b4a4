//! Confirmation gate for detach and delete.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ticket::{Ticket, TicketCounter};
use crate::volume::VolumeId;

/// Disruptive operations that require confirmation.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationMode {
    /// Detach the volume from the parent.
    Detach,
    /// Delete the volume.
    Delete,
}

impl ConfirmationMode {
    /// Dialog title.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Detach => "Detach Volume",
            Self::Delete => "Delete Volume",
        }
    }

    /// Dialog prompt.
    #[must_use]
    pub fn prompt(self) -> String {
        format!("Are you sure you want to {self} this volume?")
    }
}

impl fmt::Display for ConfirmationMode {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(match self {
            Self::Detach => "detach",
            Self::Delete => "delete",
        })
    }
}

/// An open confirmation bound to the volume captured when it opened.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PendingConfirmation {
    /// Session ticket.
    pub ticket: Ticket,
    /// Operation to confirm.
    pub mode: ConfirmationMode,
    /// Volume captured at open time.
    pub target: VolumeId,
    /// Whether the confirmed call is in flight.
    pub confirming: bool,
}

/// Errors raised by confirmation transitions.
#[derive(Clone, Copy, Debug, Error, Eq, PartialEq)]
pub enum ConfirmationError {
    /// Nothing is awaiting confirmation.
    #[error("no confirmation is open")]
    Closed,
    /// The confirmed call is still in flight.
    #[error("the {mode} of volume {target} is already in flight")]
    Busy {
        /// Operation in flight.
        mode: ConfirmationMode,
        /// Volume targeted.
        target: VolumeId,
    },
}

/// Confirmation state: none, or one pending operation on one volume.
#[derive(Clone, Debug, Default)]
pub struct ConfirmationState {
    pending: Option<PendingConfirmation>,
    tickets: TicketCounter,
}

impl ConfirmationState {
    /// Returns the pending confirmation, if any.
    #[must_use]
    pub const fn current(&self) -> Option<&PendingConfirmation> {
        self.pending.as_ref()
    }

    /// Fails while the confirmed call is in flight.
    ///
    /// # Errors
    ///
    /// Returns [`ConfirmationError::Busy`] while confirming.
    pub fn ensure_idle(&self) -> Result<(), ConfirmationError> {
        match self.pending {
            Some(pending) if pending.confirming => Err(ConfirmationError::Busy {
                mode: pending.mode,
                target: pending.target,
            }),
            _ => Ok(()),
        }
    }

    /// Opens a confirmation for `target`, replacing an idle one.
    ///
    /// # Errors
    ///
    /// Returns [`ConfirmationError::Busy`] while the current confirmation is
    /// in flight.
    pub fn open(
        &mut self,
        mode: ConfirmationMode,
        target: VolumeId,
    ) -> Result<Ticket, ConfirmationError> {
        self.ensure_idle()?;
        let ticket = self.tickets.issue();
        self.pending = Some(PendingConfirmation {
            ticket,
            mode,
            target,
            confirming: false,
        });
        Ok(ticket)
    }

    /// Dismisses the confirmation. Returns `false` when nothing was open.
    ///
    /// # Errors
    ///
    /// Returns [`ConfirmationError::Busy`] while the confirmed call is in
    /// flight.
    pub fn cancel(&mut self) -> Result<bool, ConfirmationError> {
        self.ensure_idle()?;
        Ok(self.pending.take().is_some())
    }

    /// Drops the confirmation even mid-call. The pending result no longer
    /// matches any session and is ignored.
    pub fn discard(&mut self) {
        self.pending = None;
    }

    /// Marks the pending confirmation as confirmed and returns it.
    ///
    /// The target is read from the state at this moment, never from a value
    /// captured elsewhere.
    ///
    /// # Errors
    ///
    /// Returns [`ConfirmationError`] when nothing is open or the call is
    /// already in flight.
    pub fn begin_confirm(&mut self) -> Result<PendingConfirmation, ConfirmationError> {
        let pending = self.pending.as_mut().ok_or(ConfirmationError::Closed)?;
        if pending.confirming {
            return Err(ConfirmationError::Busy {
                mode: pending.mode,
                target: pending.target,
            });
        }
        pending.confirming = true;
        Ok(*pending)
    }

    /// Closes the confirmation if `ticket` is still the open session.
    pub fn finish(&mut self, ticket: Ticket) -> bool {
        if self
            .pending
            .is_some_and(|pending| pending.ticket == ticket)
        {
            self.pending = None;
            return true;
        }
        false
    }
}
