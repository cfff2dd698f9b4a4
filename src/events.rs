//! Push-event glue between the domain event stream and the orchestrator.
//!
//! Events arrive as `{action, initial}` records. Only volume lifecycle
//! actions that represent new activity trigger a refresh: events flagged as
//! initial are history replayed on subscribe and are discarded. Subscriptions
//! are `tokio::sync::broadcast` receivers, so a subscriber never observes
//! anything published before it subscribed.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::{debug, warn};

/// Default capacity of an [`EventBus`].
pub const DEFAULT_EVENT_BUFFER: usize = 64;

/// Domain event as delivered by the event stream.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct DomainEvent {
    /// Action name, for example `volume_resize`.
    pub action: String,
    /// Set on events replayed from history when subscribing.
    #[serde(default, alias = "_initial")]
    pub initial: bool,
}

impl DomainEvent {
    /// Creates a live (non-replayed) event.
    #[must_use]
    pub fn live(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            initial: false,
        }
    }

    /// Creates a replayed event.
    #[must_use]
    pub fn replayed(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            initial: true,
        }
    }
}

/// Volume lifecycle actions that invalidate the cached volume lists.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeAction {
    /// `volume_attach`
    Attach,
    /// `volume_clone`
    Clone,
    /// `volume_create`
    Create,
    /// `volume_delete`
    Delete,
    /// `volume_detach`
    Detach,
    /// `volume_resize`
    Resize,
}

impl VolumeAction {
    /// Every action that triggers a refresh.
    pub const ALL: [Self; 6] = [
        Self::Attach,
        Self::Clone,
        Self::Create,
        Self::Delete,
        Self::Detach,
        Self::Resize,
    ];

    /// Wire name of the action.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Attach => "volume_attach",
            Self::Clone => "volume_clone",
            Self::Create => "volume_create",
            Self::Delete => "volume_delete",
            Self::Detach => "volume_detach",
            Self::Resize => "volume_resize",
        }
    }

    /// Parses a wire action name; anything outside the refresh set yields
    /// `None`.
    #[must_use]
    pub fn parse(action: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|known| known.as_str() == action)
    }
}

impl fmt::Display for VolumeAction {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Returns the action `event` should refresh for, or `None` when it is
/// replayed history or outside the volume refresh set.
#[must_use]
pub fn refresh_trigger(event: &DomainEvent) -> Option<VolumeAction> {
    if event.initial {
        return None;
    }
    VolumeAction::parse(&event.action)
}

/// Reason a subscription asks for a refresh.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RefreshTrigger {
    /// A matching live event arrived.
    Action(VolumeAction),
    /// The receiver fell behind and skipped this many events, some of which
    /// may have been relevant.
    Lagged(u64),
}

/// Source of domain events injected into the orchestrator.
pub trait EventSource {
    /// Subscribes to events published from now on.
    fn subscribe(&self) -> broadcast::Receiver<DomainEvent>;

    /// Asks the source to poll for new events sooner. Sources without a
    /// polling cadence ignore this.
    fn reset_polling(&self) {}
}

/// In-process event stream backed by a broadcast channel.
#[derive(Clone, Debug)]
pub struct EventBus {
    sender: broadcast::Sender<DomainEvent>,
    poll_resets: Arc<AtomicUsize>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER)
    }
}

impl EventBus {
    /// Creates a bus buffering up to `capacity` events per subscriber.
    ///
    /// A zero capacity is raised to one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            poll_resets: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Publishes `event` and returns how many subscribers will see it.
    pub fn publish(&self, event: DomainEvent) -> usize {
        let action = event.action.clone();
        let delivered = self.sender.send(event).unwrap_or(0);
        debug!(%action, delivered, "published domain event");
        delivered
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Number of times a subscriber asked for a faster poll.
    #[must_use]
    pub fn poll_resets(&self) -> usize {
        self.poll_resets.load(Ordering::SeqCst)
    }
}

impl EventSource for EventBus {
    fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.sender.subscribe()
    }

    fn reset_polling(&self) {
        self.poll_resets.fetch_add(1, Ordering::SeqCst);
    }
}

/// Filtered view over a subscription.
///
/// Dropping the subscription, or calling [`EventSubscription::release`],
/// unsubscribes from the source.
#[derive(Debug)]
pub struct EventSubscription {
    receiver: Option<broadcast::Receiver<DomainEvent>>,
}

impl EventSubscription {
    /// Subscribes to `source`.
    #[must_use]
    pub fn attach<E: EventSource + ?Sized>(source: &E) -> Self {
        Self {
            receiver: Some(source.subscribe()),
        }
    }

    /// Whether the subscription still holds a receiver.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.receiver.is_some()
    }

    /// Drops the receiver. Later calls yield nothing.
    pub fn release(&mut self) {
        self.receiver = None;
    }

    /// Waits for the next event that should trigger a refresh.
    ///
    /// Returns `None` once the source closes or the subscription has been
    /// released.
    pub async fn next_trigger(&mut self) -> Option<RefreshTrigger> {
        loop {
            let receiver = self.receiver.as_mut()?;
            match receiver.recv().await {
                Ok(event) => {
                    if let Some(action) = refresh_trigger(&event) {
                        return Some(RefreshTrigger::Action(action));
                    }
                    debug!(action = %event.action, initial = event.initial, "ignored domain event");
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "event subscription lagged");
                    return Some(RefreshTrigger::Lagged(skipped));
                }
                Err(RecvError::Closed) => {
                    self.receiver = None;
                    return None;
                }
            }
        }
    }

    /// Returns the next buffered trigger without waiting.
    pub fn try_next_trigger(&mut self) -> Option<RefreshTrigger> {
        loop {
            let receiver = self.receiver.as_mut()?;
            match receiver.try_recv() {
                Ok(event) => {
                    if let Some(action) = refresh_trigger(&event) {
                        return Some(RefreshTrigger::Action(action));
                    }
                    debug!(action = %event.action, initial = event.initial, "ignored domain event");
                }
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "event subscription lagged");
                    return Some(RefreshTrigger::Lagged(skipped));
                }
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Closed) => {
                    self.receiver = None;
                    return None;
                }
            }
        }
    }
}
