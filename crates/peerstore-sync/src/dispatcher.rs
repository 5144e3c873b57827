//! Inbound dispatcher.
//!
//! Processes peer messages in arrival order: settles the handshake once,
//! resolves per-call outcomes against the registry, keeps the mirror
//! current and raises events.
//!
//! ## State machine
//!
//! ```text
//! AwaitingHandshake --Ready{entries}------> Ready (supported)
//! AwaitingHandshake --ReadyUnsupported----> Ready (unsupported)
//! Ready             --any handshake-------> Ready (ignored)
//! ```
//!
//! The peer is not trusted to be well behaved. Every anomaly (stale ids,
//! duplicate handshakes, changes before the snapshot) is logged and
//! dropped; nothing here returns an error to the host.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use peerstore_core::{Capability, ChangeEvent, ChangeKind, CorrelationId, InstanceId, Outcome};
use peerstore_mirror::{MirrorError, MirrorStore};

use crate::events::{EventBus, EventKind, StoreEvent};
use crate::gate::ReadyGate;
use crate::messages::{Entries, PeerMessage};
use crate::registry::CorrelationRegistry;

/// Mode flags read by the dispatcher.
#[derive(Debug, Clone, Default)]
pub struct DispatcherConfig {
    /// Apply unsolicited change notifications.
    pub live_update: bool,
    /// Force the unsupported handshake path.
    pub simulate_unsupported: bool,
}

/// Why an inbound message was dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    /// A handshake arrived after the first one.
    DuplicateHandshake,
    /// The correlation id is the sentinel, unknown, or already resolved.
    StaleCorrelation(CorrelationId),
    /// The message needs a completed handshake.
    BeforeHandshake,
    /// Change notifications are switched off.
    LiveUpdateDisabled,
    /// The mirror refused the update.
    Rejected(MirrorError),
}

/// What the dispatcher did with one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// The handshake settled the instance with this capability.
    Handshake(Capability),
    /// A pending handler was resolved.
    Resolved(CorrelationId),
    /// A snapshot replaced the mirror.
    Refreshed,
    /// A change was applied to the mirror.
    Applied(ChangeKind),
    /// The message was absorbed.
    Dropped(DropReason),
}

/// Single entry point for everything the peer sends.
pub struct InboundDispatcher {
    instance: InstanceId,
    registry: Arc<CorrelationRegistry>,
    mirror: Arc<MirrorStore>,
    gate: Arc<ReadyGate>,
    bus: Arc<EventBus>,
    handshaken: AtomicBool,
    live_update: AtomicBool,
    simulate_unsupported: bool,
}

impl InboundDispatcher {
    pub fn new(
        instance: InstanceId,
        registry: Arc<CorrelationRegistry>,
        mirror: Arc<MirrorStore>,
        gate: Arc<ReadyGate>,
        bus: Arc<EventBus>,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            instance,
            registry,
            mirror,
            gate,
            bus,
            handshaken: AtomicBool::new(false),
            live_update: AtomicBool::new(config.live_update),
            simulate_unsupported: config.simulate_unsupported,
        }
    }

    /// Route one inbound message.
    pub fn dispatch(&self, message: PeerMessage) -> Disposition {
        let kind = message.kind_name();
        let disposition = match message {
            PeerMessage::Ready { entries } => self.on_handshake_supported(entries),
            PeerMessage::ReadyUnsupported => self.on_handshake_unsupported(),
            PeerMessage::Outcome {
                correlation,
                success,
                key,
                old_value,
                new_value,
            } => self.on_callback_outcome(correlation, success, key, old_value, new_value),
            PeerMessage::Change {
                key,
                old_value,
                new_value,
            } => self.on_change_notification(key, old_value, new_value),
            PeerMessage::Refresh { entries } => self.on_refresh_snapshot(entries),
        };

        if let Disposition::Dropped(reason) = &disposition {
            tracing::warn!(instance = %self.instance, inbound = kind, ?reason, "dropped inbound message");
        }
        disposition
    }

    /// The peer hosts a store; `entries` is its initial content.
    pub fn on_handshake_supported(&self, entries: Entries) -> Disposition {
        if !self.begin_handshake() {
            return Disposition::Dropped(DropReason::DuplicateHandshake);
        }

        if self.simulate_unsupported {
            tracing::warn!(instance = %self.instance, "simulating unsupported peer");
            return self.settle_unsupported();
        }

        if let Err(e) = self.mirror.snapshot_from(entries) {
            // Only reachable if something else settled the mirror first.
            tracing::warn!(instance = %self.instance, "initial snapshot rejected: {}", e);
        }
        self.finish_handshake(Capability::Supported)
    }

    /// The peer cannot host a store.
    pub fn on_handshake_unsupported(&self) -> Disposition {
        if !self.begin_handshake() {
            return Disposition::Dropped(DropReason::DuplicateHandshake);
        }
        self.settle_unsupported()
    }

    /// Resolve the handler waiting on `correlation`.
    ///
    /// A successful outcome reports the peer's value for the key after the
    /// call (or, with no key, a clear), so it is folded into the mirror
    /// before the handler runs. No `Update` event is raised for it: the
    /// host initiated the change. Stale outcomes touch nothing.
    pub fn on_callback_outcome(
        &self,
        correlation: CorrelationId,
        success: bool,
        key: Option<String>,
        old_value: Option<String>,
        new_value: Option<String>,
    ) -> Disposition {
        if success && self.registry.is_pending(correlation) && self.mirror.is_initialized() {
            let change = ChangeEvent::new(key.clone(), old_value.clone(), new_value.clone());
            if let Err(e) = self.mirror.apply_change(&change) {
                tracing::debug!(instance = %self.instance, "outcome not mirrored: {}", e);
            }
        }

        let outcome = Outcome::from_parts(success, key, old_value, new_value);
        if self.registry.resolve(correlation, outcome) {
            Disposition::Resolved(correlation)
        } else {
            Disposition::Dropped(DropReason::StaleCorrelation(correlation))
        }
    }

    /// Replace the mirror with a full snapshot and raise `Refresh`.
    pub fn on_refresh_snapshot(&self, entries: Entries) -> Disposition {
        if !self.handshaken.load(Ordering::SeqCst) {
            return Disposition::Dropped(DropReason::BeforeHandshake);
        }
        let listened = self.bus.has_listeners(EventKind::Refresh);
        let announced = listened.then(|| entries.clone());
        if let Err(e) = self.mirror.snapshot_from(entries) {
            return Disposition::Dropped(DropReason::Rejected(e));
        }

        if let Some(entries) = announced {
            self.bus.emit(&StoreEvent::Refresh { entries });
        }
        Disposition::Refreshed
    }

    /// Classify and apply an unsolicited change and raise `Update`.
    pub fn on_change_notification(
        &self,
        key: Option<String>,
        old_value: Option<String>,
        new_value: Option<String>,
    ) -> Disposition {
        if !self.live_update() {
            return Disposition::Dropped(DropReason::LiveUpdateDisabled);
        }

        let event = ChangeEvent::new(key, old_value, new_value);
        if let Err(e) = self.mirror.apply_change(&event) {
            let reason = match e {
                MirrorError::Uninitialized if !self.handshaken.load(Ordering::SeqCst) => {
                    DropReason::BeforeHandshake
                }
                other => DropReason::Rejected(other),
            };
            return Disposition::Dropped(reason);
        }

        let kind = event.kind();
        self.bus.emit(&StoreEvent::Update(event));
        Disposition::Applied(kind)
    }

    /// Whether change notifications are applied.
    pub fn live_update(&self) -> bool {
        self.live_update.load(Ordering::SeqCst)
    }

    pub fn set_live_update(&self, enabled: bool) {
        self.live_update.store(enabled, Ordering::SeqCst);
    }

    /// Whether the first handshake has been processed.
    pub fn is_handshaken(&self) -> bool {
        self.handshaken.load(Ordering::SeqCst)
    }

    fn begin_handshake(&self) -> bool {
        self.handshaken
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    fn settle_unsupported(&self) -> Disposition {
        if let Err(e) = self.mirror.mark_unsupported() {
            tracing::warn!(instance = %self.instance, "unsupported handshake rejected: {}", e);
        }
        self.finish_handshake(Capability::Unsupported)
    }

    /// Drain deferred host actions, then tell subscribers.
    fn finish_handshake(&self, capability: Capability) -> Disposition {
        self.gate.signal_ready();
        tracing::info!(instance = %self.instance, ?capability, "peer ready");
        self.bus.emit(&StoreEvent::Ready { capability });
        Disposition::Handshake(capability)
    }
}
