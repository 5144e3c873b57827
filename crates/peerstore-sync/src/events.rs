//! Event bus.
//!
//! Multi-subscriber fan-out of [`StoreEvent`]s, one subscriber list per
//! [`EventKind`]. Per-call success and error outcomes do not go through the
//! bus: they are routed to the request's own completion handler.

use std::sync::{Arc, Mutex};

use peerstore_core::{Capability, ChangeEvent};

use crate::messages::Entries;

/// An event raised by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// The first handshake arrived.
    Ready { capability: Capability },

    /// A full snapshot replaced the mirror.
    Refresh { entries: Entries },

    /// An unsolicited change was applied to the mirror.
    Update(ChangeEvent),
}

impl StoreEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            StoreEvent::Ready { .. } => EventKind::Ready,
            StoreEvent::Refresh { .. } => EventKind::Refresh,
            StoreEvent::Update(_) => EventKind::Update,
        }
    }
}

/// Discriminant used to subscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Ready,
    Refresh,
    Update,
}

/// Handle returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// A subscriber callback.
pub type Listener = Arc<dyn Fn(&StoreEvent) + Send + Sync + 'static>;

/// Subscriber lists for one host-side instance.
pub struct EventBus {
    inner: Mutex<BusInner>,
}

struct BusInner {
    next_id: u64,
    listeners: Vec<(SubscriptionId, EventKind, Listener)>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(BusInner {
                next_id: 0,
                listeners: Vec::new(),
            }),
        }
    }

    /// Add a subscriber for events of `kind`.
    pub fn subscribe<F>(&self, kind: EventKind, listener: F) -> SubscriptionId
    where
        F: Fn(&StoreEvent) + Send + Sync + 'static,
    {
        let mut inner = self.inner.lock().unwrap();
        let id = SubscriptionId(inner.next_id);
        inner.next_id += 1;
        inner.listeners.push((id, kind, Arc::new(listener)));
        id
    }

    /// Remove a subscriber. Returns `false` if it was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut inner = self.inner.lock().unwrap();
        let before = inner.listeners.len();
        inner.listeners.retain(|(sid, _, _)| *sid != id);
        inner.listeners.len() != before
    }

    /// Whether anyone listens for `kind`.
    pub fn has_listeners(&self, kind: EventKind) -> bool {
        let inner = self.inner.lock().unwrap();
        inner.listeners.iter().any(|(_, k, _)| *k == kind)
    }

    /// Deliver `event` to every subscriber of its kind.
    ///
    /// Subscribers run outside the lock, so they may subscribe, unsubscribe
    /// or issue new requests. Returns the number of subscribers reached.
    pub fn emit(&self, event: &StoreEvent) -> usize {
        let kind = event.kind();
        let targets: Vec<Listener> = {
            let inner = self.inner.lock().unwrap();
            inner
                .listeners
                .iter()
                .filter(|(_, k, _)| *k == kind)
                .map(|(_, _, listener)| Arc::clone(listener))
                .collect()
        };

        for listener in &targets {
            listener(event);
        }
        targets.len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
