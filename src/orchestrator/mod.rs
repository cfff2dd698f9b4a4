//! Volume lifecycle orchestration for one parent instance.
//!
//! The [`Orchestrator`] owns the cached volume snapshot together with the
//! drawer and confirmation state. User intents validate locally, call the
//! [`ResourceGateway`], and reconcile the cached lists through a full
//! refresh. Live domain events from the injected [`EventSource`] trigger the
//! same refresh so changes made elsewhere show up without user action.
//!
//! State sits behind a synchronous mutex that is never held across an
//! `.await`; every gateway result is applied in a single critical section
//! and only when the drawer or confirmation session that issued the call is
//! still open.

mod error;
mod intent;
mod submission;

use std::sync::{Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, watch};
use tracing::{debug, info, warn};

pub use error::{LoadError, OrchestratorError};
pub use intent::{ConfirmOutcome, Intent, IntentOutcome, SubmitOutcome};

use crate::confirmation::{ConfirmationMode, ConfirmationState, PendingConfirmation};
use crate::drawer::{AttachForm, DrawerForm, DrawerMode, DrawerState, field, parse_selection};
use crate::events::{EventSource, EventSubscription, RefreshTrigger};
use crate::gateway::{GatewayError, ResourceGateway};
use crate::ticket::Ticket;
use crate::view::{ConfirmationView, DrawerView, ListView, OperationError, PageStatus, RenderSurface};
use crate::volume::{
    DEFAULT_FILESYSTEM_PATH_PREFIX, ParentInstance, VolumeId, VolumeSnapshot,
};
use submission::{Prepared, Submission};

/// Default size offered by the create drawer, in GiB.
pub const DEFAULT_VOLUME_SIZE_GIB: u32 = 20;

/// Presentation defaults applied by the orchestrator.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OrchestratorSettings {
    /// Size seeded into the create drawer, in GiB.
    pub default_volume_size_gib: u32,
    /// Prefix used to synthesise missing device paths.
    pub filesystem_path_prefix: String,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            default_volume_size_gib: DEFAULT_VOLUME_SIZE_GIB,
            filesystem_path_prefix: DEFAULT_FILESYSTEM_PATH_PREFIX.to_owned(),
        }
    }
}

#[derive(Debug)]
struct State {
    mounted: bool,
    page: PageStatus,
    config_count: usize,
    snapshot: VolumeSnapshot,
    drawer: DrawerState,
    confirmation: ConfirmationState,
    notice: Option<OperationError>,
    refresh_issued: u64,
    refresh_applied: u64,
}

impl Default for State {
    fn default() -> Self {
        Self {
            mounted: true,
            page: PageStatus::Loading,
            config_count: 0,
            snapshot: VolumeSnapshot::default(),
            drawer: DrawerState::default(),
            confirmation: ConfirmationState::default(),
            notice: None,
            refresh_issued: 0,
            refresh_applied: 0,
        }
    }
}

impl State {
    /// Common entry for user intents: refuses after teardown and clears the
    /// notice left by a failed confirmation.
    fn begin_intent(&mut self) -> Result<(), OrchestratorError> {
        if !self.mounted {
            return Err(OrchestratorError::NotMounted);
        }
        self.notice = None;
        Ok(())
    }

    const fn issue_refresh(&mut self) -> u64 {
        self.refresh_issued += 1;
        self.refresh_issued
    }

    fn apply_snapshot(&mut self, sequence: u64, snapshot: VolumeSnapshot) -> bool {
        if !self.mounted || sequence <= self.refresh_applied {
            return false;
        }
        self.refresh_applied = sequence;
        self.snapshot = snapshot;
        true
    }
}

/// Controller tying the gateway, event source and modal state together.
#[derive(Debug)]
pub struct Orchestrator<G, E> {
    parent: ParentInstance,
    gateway: G,
    events: E,
    settings: OrchestratorSettings,
    state: Mutex<State>,
    subscription: AsyncMutex<EventSubscription>,
    shutdown: watch::Sender<bool>,
}

impl<G, E> Orchestrator<G, E>
where
    G: ResourceGateway,
    E: EventSource,
{
    /// Mounts the orchestrator for `parent` and subscribes to `events` once.
    ///
    /// Nothing is fetched until [`Orchestrator::load`] runs.
    #[must_use]
    pub fn mount(
        parent: ParentInstance,
        gateway: G,
        events: E,
        settings: OrchestratorSettings,
    ) -> Self {
        let subscription = EventSubscription::attach(&events);
        let (shutdown, _) = watch::channel(false);
        debug!(parent_id = %parent.id, region = %parent.region, "mounted volume orchestrator");
        Self {
            parent,
            gateway,
            events,
            settings,
            state: Mutex::new(State::default()),
            subscription: AsyncMutex::new(subscription),
            shutdown,
        }
    }

    /// Parent instance the orchestrator is scoped to.
    #[must_use]
    pub const fn parent(&self) -> &ParentInstance {
        &self.parent
    }

    /// Gateway the orchestrator calls.
    #[must_use]
    pub const fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Event source the orchestrator subscribed to.
    #[must_use]
    pub const fn events(&self) -> &E {
        &self.events
    }

    /// Whether [`Orchestrator::unmount`] has not run yet.
    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.with_state(|state| state.mounted)
    }

    /// Copy of the cached volume snapshot.
    #[must_use]
    pub fn snapshot(&self) -> VolumeSnapshot {
        self.with_state(|state| state.snapshot.clone())
    }

    /// Number of configurations reported by the last successful load.
    #[must_use]
    pub fn config_count(&self) -> usize {
        self.with_state(|state| state.config_count)
    }

    /// Mode of the open drawer, if any.
    #[must_use]
    pub fn drawer_mode(&self) -> Option<DrawerMode> {
        self.with_state(|state| state.drawer.mode())
    }

    /// Mode and target of the open confirmation, if any.
    #[must_use]
    pub fn confirmation(&self) -> Option<(ConfirmationMode, VolumeId)> {
        self.with_state(|state| {
            state
                .confirmation
                .current()
                .map(|pending| (pending.mode, pending.target))
        })
    }

    /// Read-only projection for the presentation layer.
    #[must_use]
    pub fn surface(&self) -> RenderSurface {
        self.with_state(|state| {
            let list = match state.page {
                PageStatus::Ready => ListView::derive(
                    state.config_count,
                    &state.snapshot,
                    &self.settings.filesystem_path_prefix,
                ),
                PageStatus::Loading | PageStatus::Failed { .. } => ListView::default(),
            };
            RenderSurface {
                page: state.page.clone(),
                list,
                drawer: state
                    .drawer
                    .current()
                    .map(|drawer| DrawerView::from_open(drawer, &self.parent.label, &state.snapshot)),
                confirmation: state.confirmation.current().map(ConfirmationView::from),
                notice: state.notice.clone(),
            }
        })
    }

    /// Performs the initial load: configuration count and both volume
    /// collections, fetched concurrently and applied together.
    ///
    /// Calling it again is the manual retry after a failed load.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError`] when any fetch fails; the page switches to the
    /// failed state and keeps whatever snapshot it had.
    pub async fn load(&self) -> Result<bool, LoadError> {
        let sequence = self.with_state(|state| {
            if matches!(state.page, PageStatus::Failed { .. }) {
                state.page = PageStatus::Loading;
            }
            state.issue_refresh()
        });

        let fetched = tokio::try_join!(
            self.gateway.count_configs(self.parent.id),
            self.gateway.list_attached(self.parent.id),
            self.gateway.list_attachable(&self.parent.region),
        );

        match fetched {
            Ok((config_count, attached, candidates)) => {
                let snapshot = VolumeSnapshot::classify(&self.parent, attached, candidates);
                let applied = self.with_state(|state| {
                    if !state.mounted {
                        return false;
                    }
                    state.config_count = config_count;
                    state.page = PageStatus::Ready;
                    state.apply_snapshot(sequence, snapshot)
                });
                debug!(config_count, applied, "initial volume load finished");
                Ok(applied)
            }
            Err(source) => {
                let error = LoadError::from(source);
                warn!(error = %error, "initial volume load failed");
                self.with_state(|state| {
                    if state.mounted {
                        state.page = PageStatus::Failed {
                            message: error.to_string(),
                        };
                    }
                });
                Err(error)
            }
        }
    }

    /// Refetches both volume collections concurrently and replaces them in
    /// one step. Returns `false` when the result was discarded because a
    /// newer refresh had already been applied or the view was unmounted.
    ///
    /// # Errors
    ///
    /// Returns the [`GatewayError`] of the first failed fetch; the previous
    /// snapshot stays in place.
    pub async fn refresh_all(&self) -> Result<bool, GatewayError> {
        let sequence = self.with_state(State::issue_refresh);
        let (attached, candidates) = tokio::try_join!(
            self.gateway.list_attached(self.parent.id),
            self.gateway.list_attachable(&self.parent.region),
        )
        .inspect_err(|error| warn!(error = %error, sequence, "volume refresh failed"))?;

        let snapshot = VolumeSnapshot::classify(&self.parent, attached, candidates);
        let (attached, attachable) = (snapshot.attached.len(), snapshot.attachable.len());
        let applied = self.with_state(|state| state.apply_snapshot(sequence, snapshot));
        debug!(sequence, attached, attachable, applied, "volume refresh finished");
        Ok(applied)
    }

    /// Opens a drawer, replacing an idle drawer and dismissing an idle
    /// confirmation.
    ///
    /// Edit, resize and clone need `seed` naming an attached volume; attach
    /// takes an optional attachable volume to preselect; create takes none.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::WrongMode`] when the seed does not fit
    /// the mode and [`OrchestratorError::UnknownVolume`] when it names a
    /// volume outside the relevant collection. Returns
    /// [`OrchestratorError::Busy`] while a submission or confirmed call is in
    /// flight.
    pub fn open_drawer(
        &self,
        mode: DrawerMode,
        seed: Option<VolumeId>,
    ) -> Result<Ticket, OrchestratorError> {
        self.with_state(|state| {
            state.begin_intent()?;
            let form = self.seed_form(state, mode, seed)?;
            state.drawer.ensure_idle()?;
            state.confirmation.cancel()?;
            let ticket = state.drawer.open(form)?;
            debug!(%mode, seed = ?seed.map(|id| id.0), "opened drawer");
            Ok(ticket)
        })
    }

    fn seed_form(
        &self,
        state: &State,
        mode: DrawerMode,
        seed: Option<VolumeId>,
    ) -> Result<DrawerForm, OrchestratorError> {
        match (mode, seed) {
            (DrawerMode::Create, None) => Ok(DrawerForm::create(
                self.parent.id,
                &self.parent.region,
                self.settings.default_volume_size_gib,
            )),
            (DrawerMode::Create, Some(_)) => Err(OrchestratorError::WrongMode {
                mode,
                requirement: "does not take a volume",
            }),
            (DrawerMode::Attach, None) => Ok(DrawerForm::attach()),
            (DrawerMode::Attach, Some(id)) => {
                if !state.snapshot.attachable.iter().any(|volume| volume.id == id) {
                    return Err(OrchestratorError::UnknownVolume { id });
                }
                Ok(DrawerForm::Attach(AttachForm { selected: Some(id) }))
            }
            (DrawerMode::Edit | DrawerMode::Resize | DrawerMode::Clone, None) => {
                Err(OrchestratorError::WrongMode {
                    mode,
                    requirement: "needs an attached volume",
                })
            }
            (DrawerMode::Edit | DrawerMode::Resize | DrawerMode::Clone, Some(id)) => {
                let volume = state
                    .snapshot
                    .find_attached(id)
                    .ok_or(OrchestratorError::UnknownVolume { id })?;
                Ok(match mode {
                    DrawerMode::Edit => DrawerForm::edit(volume),
                    DrawerMode::Resize => DrawerForm::resize(volume),
                    _ => DrawerForm::clone_of(volume),
                })
            }
        }
    }

    /// Closes the drawer. Returns `false` when none was open.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::NotMounted`] after teardown and
    /// [`OrchestratorError::Busy`] while a submission is in flight.
    pub fn close_drawer(&self) -> Result<bool, OrchestratorError> {
        self.with_state(|state| {
            state.begin_intent()?;
            Ok(state.drawer.close()?)
        })
    }

    /// Updates one field of the open drawer and clears its errors.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError`] when no drawer is open, a submission is
    /// in flight, or `key` is not editable in the open mode. An attach
    /// selection outside the attachable list yields
    /// [`OrchestratorError::UnknownVolume`].
    pub fn edit_field(&self, key: &str, value: &str) -> Result<(), OrchestratorError> {
        self.with_state(|state| {
            state.begin_intent()?;
            state.drawer.ensure_idle()?;
            if state.drawer.mode() == Some(DrawerMode::Attach) && key == field::VOLUME {
                let foreign = parse_selection(value)?.filter(|id| {
                    !state.snapshot.attachable.iter().any(|volume| volume.id == *id)
                });
                if let Some(id) = foreign {
                    return Err(OrchestratorError::UnknownVolume { id });
                }
            }
            state.drawer.edit_field(key, value)?;
            Ok(())
        })
    }

    /// Validates and submits the open drawer.
    ///
    /// Validation failures never reach the gateway. On success the drawer
    /// closes and a full refresh follows; on failure the drawer stays open
    /// with the gateway's field errors.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError`] when no drawer is open or a submission
    /// is already in flight.
    pub async fn submit_drawer(&self) -> Result<SubmitOutcome, OrchestratorError> {
        let prepared = self.with_state(|state| {
            state.begin_intent()?;
            Submission::prepare(&mut state.drawer, &self.parent)
        })?;
        let (ticket, submission) = match prepared {
            Prepared::Invalid(errors) => {
                debug!(errors = errors.len(), "drawer failed local validation");
                return Ok(SubmitOutcome::Invalid(errors));
            }
            Prepared::Ready { ticket, submission } => (ticket, submission),
        };

        let mode = submission.mode();
        match submission.execute(&self.gateway).await {
            Ok(volume_id) => {
                let closed = self.with_state(|state| state.drawer.finish_success(ticket));
                info!(%mode, volume_id = %volume_id, "volume {mode} succeeded");
                if mode != DrawerMode::Edit {
                    self.events.reset_polling();
                }
                self.refresh_after_mutation().await;
                Ok(if closed {
                    SubmitOutcome::Completed(mode)
                } else {
                    SubmitOutcome::Superseded(mode)
                })
            }
            Err(error) => {
                warn!(%mode, error = %error, "volume {mode} rejected");
                let errors = submission.failure_errors(error);
                let shown = self.with_state(|state| state.drawer.finish_failure(ticket, errors.clone()));
                Ok(if shown {
                    SubmitOutcome::Rejected(errors)
                } else {
                    SubmitOutcome::Superseded(mode)
                })
            }
        }
    }

    /// Opens a detach or delete confirmation bound to `target`, closing any
    /// idle drawer.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::UnknownVolume`] when `target` is not
    /// attached to the parent and [`OrchestratorError::Busy`] while a
    /// submission or confirmed call is in flight.
    pub fn open_confirmation(
        &self,
        mode: ConfirmationMode,
        target: VolumeId,
    ) -> Result<Ticket, OrchestratorError> {
        self.with_state(|state| {
            state.begin_intent()?;
            if state.snapshot.find_attached(target).is_none() {
                return Err(OrchestratorError::UnknownVolume { id: target });
            }
            state.confirmation.ensure_idle()?;
            state.drawer.close()?;
            let ticket = state.confirmation.open(mode, target)?;
            debug!(%mode, volume_id = %target, "opened confirmation");
            Ok(ticket)
        })
    }

    /// Dismisses the confirmation. Returns `false` when none was open.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::NotMounted`] after teardown and
    /// [`OrchestratorError::Busy`] while the confirmed call is in flight.
    pub fn cancel_confirmation(&self) -> Result<bool, OrchestratorError> {
        self.with_state(|state| {
            state.begin_intent()?;
            Ok(state.confirmation.cancel()?)
        })
    }

    /// Performs the confirmed operation on the target captured when the
    /// confirmation opened.
    ///
    /// The confirmation closes whether the call succeeds or fails. Success
    /// triggers a refresh; failure raises an [`OperationError`] notice that
    /// stays on the surface until the next intent.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError`] when nothing awaits confirmation or the
    /// confirmed call is still in flight.
    pub async fn confirm_action(&self) -> Result<ConfirmOutcome, OrchestratorError> {
        let pending = self.with_state(|state| -> Result<PendingConfirmation, OrchestratorError> {
            state.begin_intent()?;
            Ok(state.confirmation.begin_confirm()?)
        })?;
        let (mode, target) = (pending.mode, pending.target);

        let result = match mode {
            ConfirmationMode::Detach => self.gateway.detach(target).await,
            ConfirmationMode::Delete => self.gateway.delete(target).await,
        };

        match result {
            Ok(()) => {
                let closed = self.with_state(|state| state.confirmation.finish(pending.ticket));
                info!(%mode, volume_id = %target, "volume {mode} succeeded");
                self.events.reset_polling();
                self.refresh_after_mutation().await;
                Ok(if closed {
                    ConfirmOutcome::Completed { mode, target }
                } else {
                    ConfirmOutcome::Superseded { mode, target }
                })
            }
            Err(error) => {
                warn!(%mode, volume_id = %target, error = %error, "volume {mode} failed");
                let notice = OperationError {
                    mode,
                    target,
                    message: error.to_string(),
                };
                self.with_state(|state| {
                    if state.confirmation.finish(pending.ticket) {
                        state.notice = Some(notice.clone());
                    }
                });
                Ok(ConfirmOutcome::Failed(notice))
            }
        }
    }

    async fn refresh_after_mutation(&self) {
        if let Err(error) = self.refresh_all().await {
            debug!(error = %error, "keeping previous snapshot after mutation");
        }
    }

    /// Applies one user intent.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError`] when the intent is invalid in the
    /// current state, or when a reload or refresh fails.
    pub async fn dispatch(&self, intent: Intent) -> Result<IntentOutcome, OrchestratorError> {
        debug!(?intent, "dispatching intent");
        match intent {
            Intent::OpenDrawer { mode, seed } => self
                .open_drawer(mode, seed)
                .map(|ticket| IntentOutcome::Opened { ticket }),
            Intent::CloseDrawer => self
                .close_drawer()
                .map(|changed| IntentOutcome::Dismissed { changed }),
            Intent::EditField { key, value } => self
                .edit_field(&key, &value)
                .map(|()| IntentOutcome::Edited),
            Intent::SubmitDrawer => self
                .submit_drawer()
                .await
                .map(|submission| IntentOutcome::Submitted { submission }),
            Intent::OpenConfirmation { mode, target } => self
                .open_confirmation(mode, target)
                .map(|ticket| IntentOutcome::Opened { ticket }),
            Intent::ConfirmAction => self
                .confirm_action()
                .await
                .map(|confirmation| IntentOutcome::Confirmed { confirmation }),
            Intent::CancelConfirmation => self
                .cancel_confirmation()
                .map(|changed| IntentOutcome::Dismissed { changed }),
            Intent::Refresh => {
                self.with_state(State::begin_intent)?;
                self.refresh_all()
                    .await
                    .map(|applied| IntentOutcome::Refreshed { applied })
                    .map_err(OrchestratorError::Refresh)
            }
            Intent::Reload => {
                self.with_state(State::begin_intent)?;
                let applied = self.load().await?;
                Ok(IntentOutcome::Refreshed { applied })
            }
        }
    }

    /// Waits for the next relevant domain event and refreshes for it.
    ///
    /// Returns `None` once the orchestrator is unmounted or the event source
    /// closes.
    pub async fn next_event(&self) -> Option<RefreshTrigger> {
        let mut shutdown = self.shutdown.subscribe();
        if *shutdown.borrow_and_update() {
            return None;
        }

        let trigger = {
            let mut subscription = self.subscription.lock().await;
            tokio::select! {
                trigger = subscription.next_trigger() => trigger,
                () = stopped(&mut shutdown) => None,
            }
        }?;
        self.handle_trigger(trigger).await;
        Some(trigger)
    }

    /// Refreshes for every relevant event until the orchestrator is
    /// unmounted or the event source closes.
    pub async fn listen(&self) {
        while self.next_event().await.is_some() {}
        debug!("event listener stopped");
    }

    /// Drains events that are already buffered, refreshing once per
    /// relevant event. Returns how many refreshes were triggered.
    ///
    /// Returns zero without draining while [`Orchestrator::listen`] holds the
    /// subscription.
    pub async fn process_pending_events(&self) -> usize {
        let triggers: Vec<RefreshTrigger> = {
            let Ok(mut subscription) = self.subscription.try_lock() else {
                return 0;
            };
            std::iter::from_fn(|| subscription.try_next_trigger()).collect()
        };
        for trigger in &triggers {
            self.handle_trigger(*trigger).await;
        }
        triggers.len()
    }

    async fn handle_trigger(&self, trigger: RefreshTrigger) {
        if !self.is_mounted() {
            return;
        }
        match trigger {
            RefreshTrigger::Action(action) => debug!(%action, "refreshing for domain event"),
            RefreshTrigger::Lagged(skipped) => debug!(skipped, "refreshing after lagged events"),
        }
        if let Err(error) = self.refresh_all().await {
            debug!(error = %error, "event-driven refresh failed");
        }
    }

    /// Tears the orchestrator down: closes any modal, stops the listener and
    /// releases the event subscription. Later results and events are
    /// dropped.
    pub async fn unmount(&self) {
        self.with_state(|state| {
            state.mounted = false;
            state.drawer.discard();
            state.confirmation.discard();
        });
        self.shutdown.send_replace(true);
        self.subscription.lock().await.release();
        debug!(parent_id = %self.parent.id, "unmounted volume orchestrator");
    }

    fn with_state<T>(&self, apply: impl FnOnce(&mut State) -> T) -> T {
        let mut guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        apply(&mut guard)
    }
}

async fn stopped(shutdown: &mut watch::Receiver<bool>) {
    loop {
        let stopped = *shutdown.borrow_and_update();
        if stopped || shutdown.changed().await.is_err() {
            return;
        }
    }
}
