//! Volume records and their classification relative to a parent instance.
//!
//! A [`Volume`] is owned by the remote gateway; the orchestrator only keeps a
//! cached projection. Classification is always relative to one
//! [`ParentInstance`]: a volume is *attached* when it is bound to that parent
//! and *attachable* when it is unbound and lives in the parent's region.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Prefix used to synthesise a device path when the gateway omits one.
pub const DEFAULT_FILESYSTEM_PATH_PREFIX: &str = "/dev/disk/by-id/scsi-0Linode_Volume_";

/// Numeric identifier assigned to a volume by the gateway.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct VolumeId(pub u64);

impl fmt::Display for VolumeId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

impl From<u64> for VolumeId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Numeric identifier of a parent compute instance.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct ParentId(pub u64);

impl fmt::Display for ParentId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

impl From<u64> for ParentId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Block storage volume as reported by the gateway.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Volume {
    /// Gateway identifier.
    pub id: VolumeId,
    /// Human-readable label.
    pub label: String,
    /// Size in GiB.
    pub size: u32,
    /// Region the volume lives in.
    pub region: String,
    /// Device path on the parent, when the gateway reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filesystem_path: Option<String>,
    /// Parent the volume is bound to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<ParentId>,
}

impl Volume {
    /// Returns `true` when the volume is bound to `parent`.
    #[must_use]
    pub fn is_attached_to(&self, parent: &ParentInstance) -> bool {
        self.parent_id == Some(parent.id)
    }

    /// Returns `true` when the volume is unbound and shares the parent's
    /// region.
    #[must_use]
    pub fn is_attachable_to(&self, parent: &ParentInstance) -> bool {
        self.parent_id.is_none() && self.region == parent.region
    }

    /// Returns the device path, synthesising one from `prefix` and the label
    /// when the gateway did not report it.
    #[must_use]
    pub fn filesystem_path_or(&self, prefix: &str) -> String {
        resolve_filesystem_path(self.filesystem_path.as_deref(), &self.label, prefix)
    }
}

/// Falls back to `{prefix}{label}` when `reported` is absent.
///
/// Kept at the data-mapping boundary so the render layer never needs to know
/// about the fallback.
#[must_use]
pub fn resolve_filesystem_path(reported: Option<&str>, label: &str, prefix: &str) -> String {
    reported.map_or_else(|| format!("{prefix}{label}"), str::to_owned)
}

/// Compute instance that volumes attach to.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ParentInstance {
    /// Gateway identifier.
    pub id: ParentId,
    /// Human-readable label shown in drawers.
    pub label: String,
    /// Region; only volumes in this region can be attached.
    pub region: String,
}

impl ParentInstance {
    /// Creates a parent description, trimming string fields.
    #[must_use]
    pub fn new(id: impl Into<ParentId>, label: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into().trim().to_owned(),
            region: region.into().trim().to_owned(),
        }
    }
}

/// Atomic pair of volume collections taken from a single refresh.
///
/// The two lists are disjoint by id: anything returned as attached is removed
/// from the attachable side.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct VolumeSnapshot {
    /// Volumes bound to the parent, in gateway order.
    pub attached: Vec<Volume>,
    /// Unbound volumes in the parent's region, in gateway order.
    pub attachable: Vec<Volume>,
}

impl VolumeSnapshot {
    /// Builds a snapshot from the two raw gateway listings.
    ///
    /// `attached` is trusted as scoped by the gateway. `candidates` is
    /// filtered down to volumes that are attachable to `parent` and not
    /// already present on the attached side.
    #[must_use]
    pub fn classify(parent: &ParentInstance, attached: Vec<Volume>, candidates: Vec<Volume>) -> Self {
        let attachable = candidates
            .into_iter()
            .filter(|volume| volume.is_attachable_to(parent))
            .filter(|volume| !attached.iter().any(|bound| bound.id == volume.id))
            .collect();
        Self {
            attached,
            attachable,
        }
    }

    /// Looks up a volume on either side of the snapshot.
    #[must_use]
    pub fn find(&self, id: VolumeId) -> Option<&Volume> {
        self.attached
            .iter()
            .chain(self.attachable.iter())
            .find(|volume| volume.id == id)
    }

    /// Looks up a volume on the attached side.
    #[must_use]
    pub fn find_attached(&self, id: VolumeId) -> Option<&Volume> {
        self.attached.iter().find(|volume| volume.id == id)
    }
}
