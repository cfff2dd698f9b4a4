//! Core library for the mooring volume lifecycle orchestrator.
//!
//! The crate drives the "volumes" view of a single compute instance: it
//! loads the attached and attachable volumes through a [`ResourceGateway`],
//! walks create, attach, edit, resize and clone requests through a drawer
//! state machine, confirms detach and delete, and refreshes its snapshot
//! when [`EventSource`] reports a volume lifecycle event. [`MemoryGateway`]
//! provides an in-process gateway used by the CLI and the test suite.

pub mod config;
pub mod confirmation;
pub mod drawer;
pub mod events;
pub mod fixture;
pub mod gateway;
pub mod memory;
pub mod orchestrator;
#[cfg(test)]
pub mod test_helpers;
pub mod ticket;
pub mod validate;
pub mod view;
pub mod volume;

pub use config::{ConfigError, MooringConfig};
pub use confirmation::{ConfirmationError, ConfirmationMode, ConfirmationState, PendingConfirmation};
pub use drawer::{DrawerError, DrawerForm, DrawerMode, DrawerState, OpenDrawer};
pub use events::{
    DomainEvent, EventBus, EventSource, EventSubscription, RefreshTrigger, VolumeAction,
};
pub use fixture::{Fixture, FixtureError};
pub use gateway::{CreateVolumeRequest, FieldError, GatewayError, GatewayFuture, ResourceGateway};
pub use memory::{GatewayCall, GatewayOp, MemoryGateway};
pub use orchestrator::{
    ConfirmOutcome, Intent, IntentOutcome, LoadError, Orchestrator, OrchestratorError,
    OrchestratorSettings, SubmitOutcome,
};
pub use ticket::Ticket;
pub use validate::validate;
pub use view::{
    ConfirmationView, DrawerView, ListView, OperationError, PageStatus, PlaceholderKind,
    RenderSurface, VolumeRow,
};
pub use volume::{ParentId, ParentInstance, Volume, VolumeId, VolumeSnapshot};
