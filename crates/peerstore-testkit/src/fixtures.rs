//! Test fixtures and helpers.
//!
//! A simulated peer that answers host requests the way a browser-side store
//! does, plus helpers for collecting outcomes and wiring up sessions.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use peerstore::{CompletionHandler, Outcome, PeerStore, PeerStoreConfig};
use peerstore_core::CorrelationId;
use peerstore_sync::memory::{self, MemoryInbound, PeerLink};
use peerstore_sync::{Entries, PeerMessage, PeerRequest, SyncError};

/// A peer owning a key-value store, driven one request at a time.
///
/// Only correlated requests are answered with an outcome. The peer's own
/// writes do not produce change notifications; [`SimulatedPeer::external_set`]
/// and [`SimulatedPeer::external_clear`] stand in for another context
/// touching the same store.
#[derive(Debug, Clone)]
pub struct SimulatedPeer {
    entries: Entries,
    backend_supported: bool,
    live_update: bool,
    simulate_unsupported: bool,
    attached: bool,
}

impl SimulatedPeer {
    /// A supported, empty store.
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            backend_supported: true,
            live_update: false,
            simulate_unsupported: false,
            attached: false,
        }
    }

    /// A supported store holding `pairs`.
    pub fn with_entries<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut peer = Self::new();
        peer.entries = pairs
            .into_iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        peer
    }

    /// A peer whose backend has no store at all.
    pub fn unsupported() -> Self {
        Self {
            backend_supported: false,
            ..Self::new()
        }
    }

    /// The peer's actual contents.
    pub fn entries(&self) -> &Entries {
        &self.entries
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn live_update(&self) -> bool {
        self.live_update
    }

    /// Whether the store is usable for this session.
    pub fn is_supported(&self) -> bool {
        self.backend_supported && !self.simulate_unsupported
    }

    /// Answer one host request.
    pub fn handle(&mut self, request: PeerRequest) -> Vec<PeerMessage> {
        match request {
            PeerRequest::Attach {
                live_update,
                simulate_unsupported,
            } => {
                self.attached = true;
                self.live_update = live_update;
                self.simulate_unsupported = simulate_unsupported;
                if self.is_supported() {
                    vec![PeerMessage::Ready {
                        entries: self.entries.clone(),
                    }]
                } else {
                    vec![PeerMessage::ReadyUnsupported]
                }
            }
            PeerRequest::Get { key, correlation } => {
                if !self.is_supported() {
                    return Self::failed(correlation, Some(key));
                }
                let value = self.entries.get(&key).cloned();
                Self::answer(correlation, Some(key), None, value)
            }
            PeerRequest::Set {
                key,
                value,
                correlation,
            } => {
                if !self.is_supported() {
                    return Self::failed(correlation, Some(key));
                }
                let old = match &value {
                    Some(v) => self.entries.insert(key.clone(), v.clone()),
                    None => self.entries.remove(&key),
                };
                Self::answer(correlation, Some(key), old, value)
            }
            PeerRequest::Clear { correlation } => {
                if !self.is_supported() {
                    return Self::failed(correlation, None);
                }
                self.entries.clear();
                Self::answer(correlation, None, None, None)
            }
            PeerRequest::Refresh => {
                if !self.is_supported() {
                    return Vec::new();
                }
                vec![PeerMessage::Refresh {
                    entries: self.entries.clone(),
                }]
            }
            PeerRequest::SetLiveUpdate { enabled } => {
                self.live_update = enabled;
                Vec::new()
            }
        }
    }

    /// Another context writes `key`. `None` removes it.
    ///
    /// Returns the change notification the host would see, if any.
    pub fn external_set(&mut self, key: &str, value: Option<&str>) -> Option<PeerMessage> {
        if !self.is_supported() {
            return None;
        }
        let old = match value {
            Some(v) => self.entries.insert(key.to_owned(), v.to_owned()),
            None => self.entries.remove(key),
        };
        self.notify(Some(key.to_owned()), old, value.map(str::to_owned))
    }

    /// Another context clears the store.
    pub fn external_clear(&mut self) -> Option<PeerMessage> {
        if !self.is_supported() {
            return None;
        }
        self.entries.clear();
        self.notify(None, None, None)
    }

    /// Answer every request queued on `link` without waiting.
    ///
    /// Returns the number of requests handled.
    pub fn pump(&mut self, link: &mut PeerLink) -> Result<usize, SyncError> {
        let mut handled = 0;
        while let Some(request) = link.try_recv_request()? {
            for message in self.handle(request) {
                link.send(&message)?;
            }
            handled += 1;
        }
        Ok(handled)
    }

    /// Answer requests until the host side goes away.
    pub async fn serve(mut self, mut link: PeerLink) -> Self {
        loop {
            match link.recv_request().await {
                Ok(request) => {
                    for message in self.handle(request) {
                        if link.send(&message).is_err() {
                            return self;
                        }
                    }
                }
                Err(SyncError::Closed) => return self,
                Err(e) => tracing::warn!("simulated peer skipped a frame: {}", e),
            }
        }
    }

    fn notify(
        &self,
        key: Option<String>,
        old_value: Option<String>,
        new_value: Option<String>,
    ) -> Option<PeerMessage> {
        self.live_update.then(|| PeerMessage::Change {
            key,
            old_value,
            new_value,
        })
    }

    fn answer(
        correlation: CorrelationId,
        key: Option<String>,
        old_value: Option<String>,
        new_value: Option<String>,
    ) -> Vec<PeerMessage> {
        if correlation.is_none() {
            return Vec::new();
        }
        vec![PeerMessage::Outcome {
            correlation,
            success: true,
            key,
            old_value,
            new_value,
        }]
    }

    fn failed(correlation: CorrelationId, key: Option<String>) -> Vec<PeerMessage> {
        if correlation.is_none() {
            return Vec::new();
        }
        vec![PeerMessage::outcome(correlation, &Outcome::failed(key))]
    }
}

impl Default for SimulatedPeer {
    fn default() -> Self {
        Self::new()
    }
}

/// Records every outcome delivered to the handlers it hands out.
#[derive(Debug, Clone, Default)]
pub struct OutcomeLog {
    outcomes: Arc<Mutex<Vec<(String, Outcome)>>>,
}

impl OutcomeLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A handler that appends its outcome under `label`.
    pub fn handler(&self, label: &str) -> CompletionHandler {
        let outcomes = Arc::clone(&self.outcomes);
        let label = label.to_owned();
        Box::new(move |outcome| outcomes.lock().unwrap().push((label, outcome)))
    }

    /// Same as [`OutcomeLog::handler`], for the optional-handler operations.
    pub fn some(&self, label: &str) -> Option<CompletionHandler> {
        Some(self.handler(label))
    }

    /// Outcomes in delivery order.
    pub fn outcomes(&self) -> Vec<(String, Outcome)> {
        self.outcomes.lock().unwrap().clone()
    }

    /// Labels in delivery order.
    pub fn labels(&self) -> Vec<String> {
        self.outcomes
            .lock()
            .unwrap()
            .iter()
            .map(|(label, _)| label.clone())
            .collect()
    }

    /// Outcomes delivered under `label`.
    pub fn for_label(&self, label: &str) -> Vec<Outcome> {
        self.outcomes
            .lock()
            .unwrap()
            .iter()
            .filter(|(l, _)| l == label)
            .map(|(_, outcome)| outcome.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.outcomes.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A host-side store connected to a simulated peer over a memory link.
///
/// Nothing moves until [`Session::pump`] is called, so tests control the
/// interleaving of host intents and peer answers.
pub struct Session {
    pub store: PeerStore,
    pub peer: SimulatedPeer,
    inbound: MemoryInbound,
    link: PeerLink,
}

impl Session {
    pub fn new(peer: SimulatedPeer, config: PeerStoreConfig) -> Self {
        let (outbound, inbound, link) = memory::link();
        let store = PeerStore::new(outbound, config).unwrap();
        Self {
            store,
            peer,
            inbound,
            link,
        }
    }

    /// Let the peer answer pending requests and deliver its messages, until
    /// both directions are quiet.
    pub fn pump(&mut self) {
        loop {
            let handled = self.peer.pump(&mut self.link).unwrap();
            let delivered = self.deliver();
            if handled == 0 && delivered == 0 {
                break;
            }
        }
    }

    /// Deliver an unsolicited message from the peer, then keep pumping.
    pub fn push(&mut self, message: Option<PeerMessage>) {
        if let Some(message) = message {
            self.link.send(&message).unwrap();
        }
        self.pump();
    }

    /// Deliver a raw frame from the peer, then keep pumping.
    pub fn push_frame(&mut self, frame: impl Into<Bytes>) {
        self.link.send_frame(frame.into()).unwrap();
        self.pump();
    }

    fn deliver(&mut self) -> usize {
        let mut delivered = 0;
        loop {
            match self.inbound.try_recv() {
                Ok(Some(message)) => {
                    self.store.dispatch(message);
                    delivered += 1;
                }
                Ok(None) => return delivered,
                Err(SyncError::InvalidMessage(_)) | Err(SyncError::VersionMismatch { .. }) => {
                    delivered += 1;
                }
                Err(e) => panic!("inbound failed: {}", e),
            }
        }
    }
}

/// Install a test subscriber once per process.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}
