//! Resource gateway abstraction for the remote volume API.
//!
//! The gateway executes every lifecycle operation asynchronously. Transport
//! and authentication live behind implementations of [`ResourceGateway`];
//! the orchestrator only sees volumes, field errors and operation errors.

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::volume::{ParentId, Volume, VolumeId};

/// Field-scoped error descriptor, either detected locally or reported by the
/// gateway.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct FieldError {
    /// Form field the error applies to (for example `label`).
    pub field: String,
    /// Human-readable reason.
    pub reason: String,
}

impl FieldError {
    /// Creates a field error.
    #[must_use]
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Errors reported by a gateway call.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum GatewayError {
    /// The request was rejected with field-scoped reasons.
    #[error("request rejected: {}", summarise(.0))]
    Fields(Vec<FieldError>),
    /// The operation failed without a field mapping.
    #[error("operation failed: {message}")]
    Operation {
        /// Message returned by the gateway.
        message: String,
    },
    /// The referenced volume does not exist.
    #[error("volume {id} not found")]
    NotFound {
        /// Identifier that could not be resolved.
        id: VolumeId,
    },
}

impl GatewayError {
    /// Convenience constructor for an operation failure.
    #[must_use]
    pub fn operation(message: impl Into<String>) -> Self {
        Self::Operation {
            message: message.into(),
        }
    }

    /// Returns the field errors carried by the failure.
    ///
    /// Failures without a field mapping are reported against `fallback_field`
    /// so they still surface inside the originating drawer.
    #[must_use]
    pub fn into_field_errors(self, fallback_field: &str) -> Vec<FieldError> {
        match self {
            Self::Fields(errors) if !errors.is_empty() => errors,
            Self::Fields(_) => vec![FieldError::new(fallback_field, "Request was rejected.")],
            other => vec![FieldError::new(fallback_field, other.to_string())],
        }
    }
}

fn summarise(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|error| format!("{}: {}", error.field, error.reason))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Payload for creating a volume.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct CreateVolumeRequest {
    /// Label for the new volume.
    pub label: String,
    /// Size in GiB.
    pub size: u32,
    /// Region the volume is created in.
    pub region: String,
    /// Parent to attach to immediately; `None` creates an unattached volume.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<ParentId>,
}

/// Future returned by gateway operations.
pub type GatewayFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, GatewayError>> + Send + 'a>>;

/// Asynchronous operations exposed by the remote volume API.
pub trait ResourceGateway {
    /// Lists volumes bound to `parent`.
    fn list_attached(&self, parent: ParentId) -> GatewayFuture<'_, Vec<Volume>>;

    /// Lists volumes in `region` that may be attached.
    ///
    /// Implementations may return a superset; callers filter by region and
    /// binding before use.
    fn list_attachable<'a>(&'a self, region: &'a str) -> GatewayFuture<'a, Vec<Volume>>;

    /// Returns how many boot configurations `parent` has.
    fn count_configs(&self, parent: ParentId) -> GatewayFuture<'_, usize>;

    /// Creates a volume.
    fn create<'a>(&'a self, request: &'a CreateVolumeRequest) -> GatewayFuture<'a, Volume>;

    /// Renames a volume.
    fn update<'a>(&'a self, id: VolumeId, label: &'a str) -> GatewayFuture<'a, Volume>;

    /// Grows a volume to `size` GiB.
    fn resize(&self, id: VolumeId, size: u32) -> GatewayFuture<'_, Volume>;

    /// Clones a volume under a new label.
    fn clone_volume<'a>(&'a self, id: VolumeId, label: &'a str) -> GatewayFuture<'a, Volume>;

    /// Attaches a volume to `parent`.
    fn attach(&self, id: VolumeId, parent: ParentId) -> GatewayFuture<'_, Volume>;

    /// Detaches a volume from whatever parent it is bound to.
    fn detach(&self, id: VolumeId) -> GatewayFuture<'_, ()>;

    /// Deletes a volume.
    fn delete(&self, id: VolumeId) -> GatewayFuture<'_, ()>;
}
