//! The PeerStore: one host-side instance per session.
//!
//! The PeerStore wires the correlation registry, mirror, ready gate, event
//! bus, proxy and dispatcher together behind a single handle. The caller
//! that manages sessions owns it; there is no process-wide lookup.

use std::collections::BTreeMap;
use std::sync::Arc;

use peerstore_core::{Capability, ChangeEvent, InstanceId, Lookup, Outcome, Readiness};
use peerstore_mirror::{MirrorRead, MirrorStore};
use peerstore_sync::{
    CompletionHandler, CorrelationRegistry, DispatcherConfig, Disposition, Entries, EventBus,
    EventKind, Inbound, InboundDispatcher, Outbound, PeerMessage, ReadyGate, RemoteProxy,
    StoreEvent, SubscriptionId, SyncError,
};

use crate::error::Result;

/// Configuration for a PeerStore.
#[derive(Debug, Clone)]
pub struct PeerStoreConfig {
    /// Ask the peer for change notifications and apply them to the mirror.
    pub live_update: bool,
    /// Make the peer behave as if it had no store. Read once, at attach.
    pub simulate_unsupported: bool,
}

impl Default for PeerStoreConfig {
    fn default() -> Self {
        Self {
            live_update: true,
            simulate_unsupported: false,
        }
    }
}

/// Host-side handle to the peer's key-value store.
///
/// Provides:
/// - Correlated or fire-and-forget reads and writes
/// - Instant reads from the local mirror
/// - Ready, refresh and item-update events
/// - Deferral of host actions until the peer has attached
pub struct PeerStore {
    instance: InstanceId,
    simulate_unsupported: bool,
    registry: Arc<CorrelationRegistry>,
    mirror: Arc<MirrorStore>,
    gate: Arc<ReadyGate>,
    bus: Arc<EventBus>,
    proxy: Arc<RemoteProxy>,
    dispatcher: InboundDispatcher,
}

impl PeerStore {
    /// Create an instance and send the attach request to the peer.
    pub fn new<O>(outbound: O, config: PeerStoreConfig) -> Result<Self>
    where
        O: Outbound + 'static,
    {
        let instance = InstanceId::random();
        let registry = Arc::new(CorrelationRegistry::new());
        let mirror = Arc::new(MirrorStore::new());
        let gate = Arc::new(ReadyGate::new());
        let bus = Arc::new(EventBus::new());
        let proxy = Arc::new(RemoteProxy::new(Arc::clone(&registry), Arc::new(outbound)));
        let dispatcher = InboundDispatcher::new(
            instance,
            Arc::clone(&registry),
            Arc::clone(&mirror),
            Arc::clone(&gate),
            Arc::clone(&bus),
            DispatcherConfig {
                live_update: config.live_update,
                simulate_unsupported: config.simulate_unsupported,
            },
        );

        if config.simulate_unsupported {
            tracing::warn!(%instance, "simulate-unsupported mode activated");
        }
        proxy.attach(config.live_update, config.simulate_unsupported)?;
        tracing::debug!(%instance, live_update = config.live_update, "attached to peer");

        Ok(Self {
            instance,
            simulate_unsupported: config.simulate_unsupported,
            registry,
            mirror,
            gate,
            bus,
            proxy,
            dispatcher,
        })
    }

    /// This instance's identity in logs.
    pub fn instance_id(&self) -> InstanceId {
        self.instance
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Peer Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Read `key` on the peer. The value arrives through `handler`.
    pub fn get_item<F>(&self, key: &str, handler: F)
    where
        F: FnOnce(Outcome) + Send + 'static,
    {
        let key = key.to_owned();
        let handler: CompletionHandler = Box::new(handler);
        self.defer("get", move |proxy| {
            proxy.request_get(&key, Some(handler)).map(drop)
        });
    }

    /// Write `key` on the peer.
    pub fn set_item(&self, key: &str, value: &str, handler: Option<CompletionHandler>) {
        let key = key.to_owned();
        let value = value.to_owned();
        self.defer("set", move |proxy| {
            proxy.request_set(&key, Some(&value), handler).map(drop)
        });
    }

    /// Remove `key` on the peer.
    pub fn remove_item(&self, key: &str, handler: Option<CompletionHandler>) {
        let key = key.to_owned();
        self.defer("remove", move |proxy| {
            proxy.request_set(&key, None, handler).map(drop)
        });
    }

    /// Remove every key on the peer.
    pub fn clear(&self, handler: Option<CompletionHandler>) {
        self.defer("clear", move |proxy| proxy.request_clear(handler).map(drop));
    }

    /// Ask the peer for a full snapshot instead of trusting incremental events.
    pub fn refresh(&self) {
        self.defer("refresh", |proxy| proxy.request_refresh());
    }

    /// Run `action` once the peer has attached (immediately if it has).
    pub fn run_when_ready<F>(&self, action: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.gate.run_when_ready(action);
    }

    /// Route a peer request through the ready gate.
    ///
    /// Hand-off failures cannot be returned from a deferred action. They
    /// are logged here and the request's handler gets an error outcome.
    fn defer<F>(&self, op: &'static str, request: F)
    where
        F: FnOnce(&RemoteProxy) -> std::result::Result<(), SyncError> + Send + 'static,
    {
        let proxy = Arc::clone(&self.proxy);
        let instance = self.instance;
        self.gate.run_when_ready(move || {
            if let Err(e) = request(&proxy) {
                tracing::warn!(%instance, op, "request failed: {}", e);
            }
        });
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mirror Reads
    // ─────────────────────────────────────────────────────────────────────────

    /// Mirrored value of `key`, without a round trip.
    pub fn cached(&self, key: &str) -> Lookup {
        self.mirror.get(key)
    }

    /// Copy of the whole mirror, or `None` before the snapshot.
    pub fn cached_items(&self) -> Option<BTreeMap<String, String>> {
        self.mirror.all()
    }

    /// Read-only handle to the mirror for collaborators.
    pub fn mirror(&self) -> Arc<dyn MirrorRead> {
        self.mirror.clone()
    }

    pub fn capability(&self) -> Capability {
        self.mirror.capability()
    }

    /// Whether the peer attached with a store.
    pub fn is_supported(&self) -> bool {
        self.capability() == Capability::Supported
    }

    pub fn readiness(&self) -> Readiness {
        self.gate.readiness()
    }

    pub fn is_ready(&self) -> bool {
        self.gate.is_ready()
    }

    /// Requests still waiting for an outcome.
    pub fn pending_requests(&self) -> usize {
        self.registry.pending()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Events
    // ─────────────────────────────────────────────────────────────────────────

    /// Called once, when the peer attaches. Not replayed for late subscribers;
    /// use [`PeerStore::run_when_ready`] for that.
    pub fn on_ready<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(Capability) + Send + Sync + 'static,
    {
        self.bus.subscribe(EventKind::Ready, move |event| {
            if let StoreEvent::Ready { capability } = event {
                listener(*capability);
            }
        })
    }

    /// Called after each full snapshot requested with [`PeerStore::refresh`].
    pub fn on_refresh<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&Entries) + Send + Sync + 'static,
    {
        self.bus.subscribe(EventKind::Refresh, move |event| {
            if let StoreEvent::Refresh { entries } = event {
                listener(entries);
            }
        })
    }

    /// Called for each change the peer reports that the host did not make.
    pub fn on_item_update<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&ChangeEvent) + Send + Sync + 'static,
    {
        self.bus.subscribe(EventKind::Update, move |event| {
            if let StoreEvent::Update(change) = event {
                listener(change);
            }
        })
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.bus.unsubscribe(id)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Modes
    // ─────────────────────────────────────────────────────────────────────────

    pub fn live_update(&self) -> bool {
        self.dispatcher.live_update()
    }

    /// Switch change notifications on or off, here and on the peer.
    pub fn set_live_update(&self, enabled: bool) -> Result<()> {
        if self.dispatcher.live_update() == enabled {
            return Ok(());
        }
        self.proxy.request_live_update(enabled)?;
        self.dispatcher.set_live_update(enabled);
        tracing::info!(instance = %self.instance, enabled, "live update toggled");
        Ok(())
    }

    pub fn simulate_unsupported(&self) -> bool {
        self.simulate_unsupported
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Inbound
    // ─────────────────────────────────────────────────────────────────────────

    /// Process one message from the peer.
    pub fn dispatch(&self, message: PeerMessage) -> Disposition {
        self.dispatcher.dispatch(message)
    }

    /// Process peer messages in arrival order until the link closes.
    ///
    /// Undecodable frames are skipped. Returns `Ok(())` when the peer goes
    /// away.
    pub async fn run<I>(&self, mut inbound: I) -> Result<()>
    where
        I: Inbound,
    {
        loop {
            match inbound.recv().await {
                Ok(message) => {
                    self.dispatcher.dispatch(message);
                }
                Err(SyncError::Closed) => {
                    tracing::debug!(instance = %self.instance, "peer link closed");
                    return Ok(());
                }
                Err(e @ (SyncError::InvalidMessage(_) | SyncError::VersionMismatch { .. })) => {
                    tracing::warn!(instance = %self.instance, "skipping inbound frame: {}", e);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use peerstore_core::CorrelationId;
    use peerstore_sync::{handler, PeerRequest};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    #[derive(Clone, Default)]
    struct Recorder {
        sent: Arc<Mutex<Vec<PeerRequest>>>,
        down: Arc<AtomicBool>,
    }

    impl Outbound for Recorder {
        fn send(&self, request: PeerRequest) -> peerstore_sync::Result<()> {
            if self.down.load(Ordering::SeqCst) {
                return Err(SyncError::Closed);
            }
            self.sent.lock().unwrap().push(request);
            Ok(())
        }
    }

    impl Recorder {
        fn sent(&self) -> Vec<PeerRequest> {
            self.sent.lock().unwrap().clone()
        }
    }

    fn init_tracing() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    }

    fn store(config: PeerStoreConfig) -> (PeerStore, Recorder) {
        init_tracing();
        let recorder = Recorder::default();
        let store = PeerStore::new(recorder.clone(), config).unwrap();
        (store, recorder)
    }

    fn ready(pairs: &[(&str, &str)]) -> PeerMessage {
        PeerMessage::Ready {
            entries: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    #[test]
    fn test_new_sends_attach() {
        let (_store, recorder) = store(PeerStoreConfig::default());
        assert_eq!(
            recorder.sent(),
            vec![PeerRequest::Attach {
                live_update: true,
                simulate_unsupported: false,
            }]
        );
    }

    #[test]
    fn test_intents_deferred_until_ready() {
        let (store, recorder) = store(PeerStoreConfig::default());

        store.set_item("a", "1", None);
        store.remove_item("b", None);
        assert_eq!(recorder.sent().len(), 1);
        assert!(!store.is_ready());
        assert_eq!(store.cached("a"), Lookup::Unknown);

        store.dispatch(ready(&[("b", "2")]));
        let sent = recorder.sent();
        assert_eq!(sent.len(), 3);
        assert_eq!(
            sent[1],
            PeerRequest::Set {
                key: "a".into(),
                value: Some("1".into()),
                correlation: CorrelationId::NONE,
            }
        );
        assert_eq!(sent[2].op_name(), "remove");
        assert!(store.is_ready());
        assert!(store.is_supported());
    }

    #[test]
    fn test_deferred_actions_before_ready_event() {
        let (store, _recorder) = store(PeerStoreConfig::default());
        let log = Arc::new(Mutex::new(Vec::new()));

        let l = Arc::clone(&log);
        store.run_when_ready(move || l.lock().unwrap().push("first"));
        let l = Arc::clone(&log);
        store.run_when_ready(move || l.lock().unwrap().push("second"));
        let l = Arc::clone(&log);
        store.on_ready(move |_| l.lock().unwrap().push("ready"));

        store.dispatch(ready(&[]));
        assert_eq!(*log.lock().unwrap(), vec!["first", "second", "ready"]);

        let l = Arc::clone(&log);
        store.run_when_ready(move || l.lock().unwrap().push("now"));
        assert_eq!(log.lock().unwrap().last(), Some(&"now"));
    }

    #[test]
    fn test_panicking_deferred_action_still_readies() {
        let (store, recorder) = store(PeerStoreConfig::default());
        let readied = Arc::new(Mutex::new(false));

        store.run_when_ready(|| panic!("host bug"));
        store.set_item("a", "1", None);
        let flag = Arc::clone(&readied);
        store.on_ready(move |_| *flag.lock().unwrap() = true);

        store.dispatch(ready(&[]));
        assert!(store.is_ready());
        assert!(*readied.lock().unwrap());
        assert_eq!(recorder.sent().len(), 2);

        store.refresh();
        assert_eq!(recorder.sent().last(), Some(&PeerRequest::Refresh));
    }

    #[test]
    fn test_get_item_resolves_through_dispatch() {
        let (store, recorder) = store(PeerStoreConfig::default());
        store.dispatch(ready(&[("k", "v")]));

        let seen = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&seen);
        store.get_item("k", move |outcome| *slot.lock().unwrap() = Some(outcome));
        assert_eq!(store.pending_requests(), 1);

        let correlation = recorder.sent().last().unwrap().correlation();
        store.dispatch(PeerMessage::Outcome {
            correlation,
            success: true,
            key: Some("k".into()),
            old_value: None,
            new_value: Some("v".into()),
        });

        let outcome = seen.lock().unwrap().take().unwrap();
        assert_eq!(outcome.item().unwrap().value.as_deref(), Some("v"));
        assert_eq!(store.pending_requests(), 0);
    }

    #[test]
    fn test_unsupported_peer_reports_errors() {
        let (store, recorder) = store(PeerStoreConfig::default());
        store.dispatch(PeerMessage::ReadyUnsupported);
        assert_eq!(store.capability(), Capability::Unsupported);

        let seen = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&seen);
        store.clear(handler(move |o| *slot.lock().unwrap() = Some(o)));
        let correlation = recorder.sent().last().unwrap().correlation();

        store.dispatch(PeerMessage::Outcome {
            correlation,
            success: false,
            key: None,
            old_value: None,
            new_value: None,
        });
        assert_eq!(
            seen.lock().unwrap().take(),
            Some(Outcome::Error { key: None })
        );
        assert_eq!(store.cached_items(), None);
    }

    #[test]
    fn test_set_live_update_notifies_peer_once() {
        let (store, recorder) = store(PeerStoreConfig::default());

        store.set_live_update(true).unwrap();
        assert_eq!(recorder.sent().len(), 1);

        store.set_live_update(false).unwrap();
        assert!(!store.live_update());
        assert_eq!(
            recorder.sent().last(),
            Some(&PeerRequest::SetLiveUpdate { enabled: false })
        );
    }

    #[test]
    fn test_set_live_update_keeps_flag_when_send_fails() {
        let (store, recorder) = store(PeerStoreConfig::default());

        recorder.down.store(true, Ordering::SeqCst);
        let err = store.set_live_update(false).unwrap_err();
        assert!(err.is_closed());
        assert!(store.live_update());

        recorder.down.store(false, Ordering::SeqCst);
        store.set_live_update(false).unwrap();
        assert!(!store.live_update());
        assert_eq!(
            recorder.sent().last(),
            Some(&PeerRequest::SetLiveUpdate { enabled: false })
        );
    }

    #[test]
    fn test_simulate_unsupported_is_sent_and_enforced() {
        let (store, recorder) = store(PeerStoreConfig {
            live_update: false,
            simulate_unsupported: true,
        });
        assert!(store.simulate_unsupported());
        assert_eq!(
            recorder.sent()[0],
            PeerRequest::Attach {
                live_update: false,
                simulate_unsupported: true,
            }
        );

        store.dispatch(ready(&[("a", "1")]));
        assert_eq!(store.capability(), Capability::Unsupported);
        assert_eq!(store.cached("a"), Lookup::Unknown);
    }

    #[test]
    fn test_item_update_subscription() {
        let (store, _recorder) = store(PeerStoreConfig::default());
        store.dispatch(ready(&[]));

        let kinds = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&kinds);
        let id = store.on_item_update(move |change| sink.lock().unwrap().push(change.kind()));

        store.dispatch(PeerMessage::Change {
            key: Some("x".into()),
            old_value: None,
            new_value: Some("1".into()),
        });
        assert!(store.unsubscribe(id));
        store.dispatch(PeerMessage::Change {
            key: None,
            old_value: None,
            new_value: None,
        });

        assert_eq!(
            *kinds.lock().unwrap(),
            vec![peerstore_core::ChangeKind::Update]
        );
        assert_eq!(store.cached_items(), Some(BTreeMap::new()));
    }

    #[tokio::test]
    async fn test_run_drains_until_closed() {
        init_tracing();
        let (outbound, inbound, peer) = peerstore_sync::memory::link();
        let store = PeerStore::new(outbound, PeerStoreConfig::default()).unwrap();

        peer.send(&ready(&[("a", "1")])).unwrap();
        peer.send(&PeerMessage::Change {
            key: Some("a".into()),
            old_value: Some("1".into()),
            new_value: Some("2".into()),
        })
        .unwrap();
        drop(peer);

        store.run(inbound).await.unwrap();
        assert!(store.is_ready());
        assert_eq!(store.cached("a"), Lookup::Present("2".into()));
    }
}
