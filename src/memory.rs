//! In-memory [`ResourceGateway`] that behaves like the remote volume API.
//!
//! The gateway keeps volumes in insertion order, enforces the same rules the
//! remote service does (size limits, unique labels, grow-only resizes,
//! same-region attachment) and publishes a domain event for every completed
//! mutation when an [`EventBus`] is wired in. Calls are recorded, failures
//! can be scripted per operation, and a gate can hold calls in flight so
//! callers can observe intermediate state.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use tokio::sync::watch;
use tracing::debug;

use crate::events::{DomainEvent, EventBus};
use crate::gateway::{CreateVolumeRequest, FieldError, GatewayError, GatewayFuture, ResourceGateway};
use crate::volume::{DEFAULT_FILESYSTEM_PATH_PREFIX, ParentId, ParentInstance, Volume, VolumeId};

/// Smallest volume the service accepts, in GiB.
pub const MIN_VOLUME_SIZE_GIB: u32 = 10;
/// Largest volume the service accepts, in GiB.
pub const MAX_VOLUME_SIZE_GIB: u32 = 10_240;

/// Gateway operations, used to script failures and count calls.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayOp {
    /// `list_attached`
    ListAttached,
    /// `list_attachable`
    ListAttachable,
    /// `count_configs`
    CountConfigs,
    /// `create`
    Create,
    /// `update`
    Update,
    /// `resize`
    Resize,
    /// `clone_volume`
    Clone,
    /// `attach`
    Attach,
    /// `detach`
    Detach,
    /// `delete`
    Delete,
}

/// One recorded gateway call with its arguments.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum GatewayCall {
    /// Listed volumes bound to a parent.
    ListAttached {
        /// Parent queried.
        parent: ParentId,
    },
    /// Listed volumes in a region.
    ListAttachable {
        /// Region queried.
        region: String,
    },
    /// Counted configurations of a parent.
    CountConfigs {
        /// Parent queried.
        parent: ParentId,
    },
    /// Created a volume.
    Create {
        /// Request payload.
        request: CreateVolumeRequest,
    },
    /// Renamed a volume.
    Update {
        /// Volume renamed.
        id: VolumeId,
        /// New label.
        label: String,
    },
    /// Resized a volume.
    Resize {
        /// Volume resized.
        id: VolumeId,
        /// Requested size in GiB.
        size: u32,
    },
    /// Cloned a volume.
    Clone {
        /// Source volume.
        id: VolumeId,
        /// Label of the clone.
        label: String,
    },
    /// Attached a volume.
    Attach {
        /// Volume attached.
        id: VolumeId,
        /// Target parent.
        parent: ParentId,
    },
    /// Detached a volume.
    Detach {
        /// Volume detached.
        id: VolumeId,
    },
    /// Deleted a volume.
    Delete {
        /// Volume deleted.
        id: VolumeId,
    },
}

impl GatewayCall {
    /// Operation this call belongs to.
    #[must_use]
    pub const fn op(&self) -> GatewayOp {
        match self {
            Self::ListAttached { .. } => GatewayOp::ListAttached,
            Self::ListAttachable { .. } => GatewayOp::ListAttachable,
            Self::CountConfigs { .. } => GatewayOp::CountConfigs,
            Self::Create { .. } => GatewayOp::Create,
            Self::Update { .. } => GatewayOp::Update,
            Self::Resize { .. } => GatewayOp::Resize,
            Self::Clone { .. } => GatewayOp::Clone,
            Self::Attach { .. } => GatewayOp::Attach,
            Self::Detach { .. } => GatewayOp::Detach,
            Self::Delete { .. } => GatewayOp::Delete,
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    volumes: Vec<Volume>,
    parents: HashMap<ParentId, ParentRecord>,
    next_id: u64,
    calls: Vec<GatewayCall>,
    failures: HashMap<GatewayOp, VecDeque<GatewayError>>,
}

#[derive(Clone, Debug)]
struct ParentRecord {
    region: String,
    configs: usize,
}

/// Shared in-memory volume store implementing [`ResourceGateway`].
///
/// Clones share the same store, call log and gate.
#[derive(Clone, Debug)]
pub struct MemoryGateway {
    inner: Arc<Mutex<Inner>>,
    gate: Arc<watch::Sender<bool>>,
    events: Option<EventBus>,
}

impl Default for MemoryGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryGateway {
    /// Creates an empty store with the gate open and no event bus.
    #[must_use]
    pub fn new() -> Self {
        let (gate, _) = watch::channel(true);
        Self {
            inner: Arc::new(Mutex::new(Inner {
                next_id: 1,
                ..Inner::default()
            })),
            gate: Arc::new(gate),
            events: None,
        }
    }

    /// Publishes a domain event on `bus` for every completed mutation.
    #[must_use]
    pub fn with_events(mut self, bus: EventBus) -> Self {
        self.events = Some(bus);
        self
    }

    /// Registers `parent` with `configs` boot configurations.
    pub fn add_parent(&self, parent: &ParentInstance, configs: usize) {
        self.with_inner(|inner| {
            inner.parents.insert(
                parent.id,
                ParentRecord {
                    region: parent.region.clone(),
                    configs,
                },
            );
        });
    }

    /// Stores `volume` as-is. Later generated ids never collide with it.
    pub fn insert_volume(&self, volume: Volume) -> VolumeId {
        self.with_inner(|inner| {
            let id = volume.id;
            inner.next_id = inner.next_id.max(id.0.saturating_add(1));
            inner.volumes.retain(|existing| existing.id != id);
            inner.volumes.push(volume);
            id
        })
    }

    /// Current volumes in insertion order.
    #[must_use]
    pub fn volumes(&self) -> Vec<Volume> {
        self.with_inner(|inner| inner.volumes.clone())
    }

    /// Looks up one volume.
    #[must_use]
    pub fn volume(&self, id: VolumeId) -> Option<Volume> {
        self.with_inner(|inner| inner.find(id).cloned())
    }

    /// Every call made so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<GatewayCall> {
        self.with_inner(|inner| inner.calls.clone())
    }

    /// Number of calls made to `op`.
    #[must_use]
    pub fn count_calls(&self, op: GatewayOp) -> usize {
        self.with_inner(|inner| inner.calls.iter().filter(|call| call.op() == op).count())
    }

    /// Forgets recorded calls.
    pub fn clear_calls(&self) {
        self.with_inner(|inner| inner.calls.clear());
    }

    /// Makes the next call to `op` fail with `error`. Failures queue up per
    /// operation.
    pub fn fail_next(&self, op: GatewayOp, error: GatewayError) {
        self.with_inner(|inner| inner.failures.entry(op).or_default().push_back(error));
    }

    /// Holds every subsequent call after it is recorded, until
    /// [`MemoryGateway::release`].
    pub fn hold(&self) {
        self.gate.send_replace(false);
    }

    /// Lets held and future calls proceed.
    pub fn release(&self) {
        self.gate.send_replace(true);
    }

    fn with_inner<T>(&self, apply: impl FnOnce(&mut Inner) -> T) -> T {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        apply(&mut guard)
    }

    async fn enter(&self, call: GatewayCall) {
        debug!(?call, "memory gateway call");
        self.with_inner(|inner| inner.calls.push(call));
        let mut gate = self.gate.subscribe();
        loop {
            let open = *gate.borrow_and_update();
            if open || gate.changed().await.is_err() {
                return;
            }
        }
    }

    fn complete<T>(
        &self,
        op: GatewayOp,
        apply: impl FnOnce(&mut Inner) -> Result<(T, Option<&'static str>), GatewayError>,
    ) -> Result<T, GatewayError> {
        let (value, action) = self.with_inner(|inner| {
            if let Some(error) = inner.failures.get_mut(&op).and_then(VecDeque::pop_front) {
                return Err(error);
            }
            apply(inner)
        })?;
        if let (Some(action), Some(bus)) = (action, &self.events) {
            bus.publish(DomainEvent::live(action));
        }
        Ok(value)
    }
}

impl Inner {
    fn find(&self, id: VolumeId) -> Option<&Volume> {
        self.volumes.iter().find(|volume| volume.id == id)
    }

    fn find_mut(&mut self, id: VolumeId) -> Result<&mut Volume, GatewayError> {
        self.volumes
            .iter_mut()
            .find(|volume| volume.id == id)
            .ok_or(GatewayError::NotFound { id })
    }

    fn check_label(&self, field: &str, label: &str, except: Option<VolumeId>) -> Result<(), GatewayError> {
        if label.trim().is_empty() {
            return Err(GatewayError::Fields(vec![FieldError::new(field, "Label is required.")]));
        }
        let taken = self
            .volumes
            .iter()
            .any(|volume| volume.label == label && Some(volume.id) != except);
        if taken {
            return Err(GatewayError::Fields(vec![FieldError::new(
                field,
                "Label must be unique among your volumes.",
            )]));
        }
        Ok(())
    }

    fn check_size(size: u32) -> Result<(), GatewayError> {
        if (MIN_VOLUME_SIZE_GIB..=MAX_VOLUME_SIZE_GIB).contains(&size) {
            return Ok(());
        }
        Err(GatewayError::Fields(vec![FieldError::new(
            "size",
            format!("Size must be between {MIN_VOLUME_SIZE_GIB} and {MAX_VOLUME_SIZE_GIB}."),
        )]))
    }

    fn allocate(
        &mut self,
        label: &str,
        size: u32,
        region: &str,
        parent_id: Option<ParentId>,
    ) -> Result<Volume, GatewayError> {
        let id = VolumeId(self.next_id);
        if self.find(id).is_some() {
            return Err(GatewayError::operation("No volume ids are left to allocate."));
        }
        self.next_id = self.next_id.saturating_add(1);
        let volume = Volume {
            id,
            label: label.to_owned(),
            size,
            region: region.to_owned(),
            filesystem_path: Some(format!("{DEFAULT_FILESYSTEM_PATH_PREFIX}{label}")),
            parent_id,
        };
        self.volumes.push(volume.clone());
        Ok(volume)
    }

    fn create(&mut self, request: &CreateVolumeRequest) -> Result<Volume, GatewayError> {
        self.check_label("label", &request.label, None)?;
        Self::check_size(request.size)?;
        if let Some(parent) = request.parent_id {
            let record = self
                .parents
                .get(&parent)
                .ok_or_else(|| GatewayError::operation(format!("Linode {parent} not found.")))?;
            if record.region != request.region {
                return Err(GatewayError::Fields(vec![FieldError::new(
                    "region",
                    "Volume and Linode must be in the same region.",
                )]));
            }
        }
        self.allocate(&request.label, request.size, &request.region, request.parent_id)
    }

    fn update(&mut self, id: VolumeId, label: &str) -> Result<Volume, GatewayError> {
        self.check_label("label", label, Some(id))?;
        let volume = self.find_mut(id)?;
        volume.label = label.to_owned();
        Ok(volume.clone())
    }

    fn resize(&mut self, id: VolumeId, size: u32) -> Result<Volume, GatewayError> {
        let volume = self.find_mut(id)?;
        if size <= volume.size {
            return Err(GatewayError::operation("Volumes can only be resized up."));
        }
        Self::check_size(size)?;
        let volume = self.find_mut(id)?;
        volume.size = size;
        Ok(volume.clone())
    }

    fn clone_volume(&mut self, id: VolumeId, label: &str) -> Result<Volume, GatewayError> {
        let source = self.find(id).cloned().ok_or(GatewayError::NotFound { id })?;
        self.check_label("label", label, None)?;
        self.allocate(label, source.size, &source.region, None)
    }

    fn attach(&mut self, id: VolumeId, parent: ParentId) -> Result<Volume, GatewayError> {
        let region = self
            .parents
            .get(&parent)
            .map(|record| record.region.clone())
            .ok_or_else(|| GatewayError::operation(format!("Linode {parent} not found.")))?;
        let volume = self.find_mut(id)?;
        if volume.parent_id.is_some() {
            return Err(GatewayError::operation("Volume is already attached."));
        }
        if volume.region != region {
            return Err(GatewayError::operation(
                "Volume and Linode must be in the same region.",
            ));
        }
        volume.parent_id = Some(parent);
        Ok(volume.clone())
    }

    fn detach(&mut self, id: VolumeId) -> Result<(), GatewayError> {
        let volume = self.find_mut(id)?;
        if volume.parent_id.take().is_none() {
            return Err(GatewayError::operation("Volume is not attached."));
        }
        Ok(())
    }

    fn delete(&mut self, id: VolumeId) -> Result<(), GatewayError> {
        let before = self.volumes.len();
        self.volumes.retain(|volume| volume.id != id);
        if self.volumes.len() == before {
            return Err(GatewayError::NotFound { id });
        }
        Ok(())
    }
}

impl ResourceGateway for MemoryGateway {
    fn list_attached(&self, parent: ParentId) -> GatewayFuture<'_, Vec<Volume>> {
        Box::pin(async move {
            self.enter(GatewayCall::ListAttached { parent }).await;
            self.complete(GatewayOp::ListAttached, |inner| {
                let attached = inner
                    .volumes
                    .iter()
                    .filter(|volume| volume.parent_id == Some(parent))
                    .cloned()
                    .collect();
                Ok((attached, None))
            })
        })
    }

    fn list_attachable<'a>(&'a self, region: &'a str) -> GatewayFuture<'a, Vec<Volume>> {
        Box::pin(async move {
            self.enter(GatewayCall::ListAttachable {
                region: region.to_owned(),
            })
            .await;
            // Returns every volume in the region; callers drop bound ones.
            self.complete(GatewayOp::ListAttachable, |inner| {
                let in_region = inner
                    .volumes
                    .iter()
                    .filter(|volume| volume.region == region)
                    .cloned()
                    .collect();
                Ok((in_region, None))
            })
        })
    }

    fn count_configs(&self, parent: ParentId) -> GatewayFuture<'_, usize> {
        Box::pin(async move {
            self.enter(GatewayCall::CountConfigs { parent }).await;
            self.complete(GatewayOp::CountConfigs, |inner| {
                let configs = inner.parents.get(&parent).map_or(0, |record| record.configs);
                Ok((configs, None))
            })
        })
    }

    fn create<'a>(&'a self, request: &'a CreateVolumeRequest) -> GatewayFuture<'a, Volume> {
        Box::pin(async move {
            self.enter(GatewayCall::Create {
                request: request.clone(),
            })
            .await;
            self.complete(GatewayOp::Create, |inner| {
                inner.create(request).map(|volume| (volume, Some("volume_create")))
            })
        })
    }

    fn update<'a>(&'a self, id: VolumeId, label: &'a str) -> GatewayFuture<'a, Volume> {
        Box::pin(async move {
            self.enter(GatewayCall::Update {
                id,
                label: label.to_owned(),
            })
            .await;
            self.complete(GatewayOp::Update, |inner| {
                inner.update(id, label).map(|volume| (volume, Some("volume_update")))
            })
        })
    }

    fn resize(&self, id: VolumeId, size: u32) -> GatewayFuture<'_, Volume> {
        Box::pin(async move {
            self.enter(GatewayCall::Resize { id, size }).await;
            self.complete(GatewayOp::Resize, |inner| {
                inner.resize(id, size).map(|volume| (volume, Some("volume_resize")))
            })
        })
    }

    fn clone_volume<'a>(&'a self, id: VolumeId, label: &'a str) -> GatewayFuture<'a, Volume> {
        Box::pin(async move {
            self.enter(GatewayCall::Clone {
                id,
                label: label.to_owned(),
            })
            .await;
            self.complete(GatewayOp::Clone, |inner| {
                inner
                    .clone_volume(id, label)
                    .map(|volume| (volume, Some("volume_clone")))
            })
        })
    }

    fn attach(&self, id: VolumeId, parent: ParentId) -> GatewayFuture<'_, Volume> {
        Box::pin(async move {
            self.enter(GatewayCall::Attach { id, parent }).await;
            self.complete(GatewayOp::Attach, |inner| {
                inner.attach(id, parent).map(|volume| (volume, Some("volume_attach")))
            })
        })
    }

    fn detach(&self, id: VolumeId) -> GatewayFuture<'_, ()> {
        Box::pin(async move {
            self.enter(GatewayCall::Detach { id }).await;
            self.complete(GatewayOp::Detach, |inner| {
                inner.detach(id).map(|()| ((), Some("volume_detach")))
            })
        })
    }

    fn delete(&self, id: VolumeId) -> GatewayFuture<'_, ()> {
        Box::pin(async move {
            self.enter(GatewayCall::Delete { id }).await;
            self.complete(GatewayOp::Delete, |inner| {
                inner.delete(id).map(|()| ((), Some("volume_delete")))
            })
        })
    }
}
