//! Remote proxy.
//!
//! Turns host intents into outbound requests. A request with a handler gets
//! a fresh correlation id; one without goes out with the fire-and-forget
//! sentinel. Nothing is observable synchronously: outcomes arrive only
//! through the dispatcher.

use std::sync::Arc;

use peerstore_core::{CorrelationId, Outcome};

use crate::error::Result;
use crate::messages::PeerRequest;
use crate::registry::{CompletionHandler, CorrelationRegistry};
use crate::transport::Outbound;

/// Host-side stand-in for the peer's store primitives.
pub struct RemoteProxy {
    registry: Arc<CorrelationRegistry>,
    outbound: Arc<dyn Outbound>,
}

impl RemoteProxy {
    pub fn new(registry: Arc<CorrelationRegistry>, outbound: Arc<dyn Outbound>) -> Self {
        Self { registry, outbound }
    }

    /// Open the session with the peer.
    pub fn attach(&self, live_update: bool, simulate_unsupported: bool) -> Result<()> {
        self.send(PeerRequest::Attach {
            live_update,
            simulate_unsupported,
        })
    }

    /// Read `key` on the peer.
    pub fn request_get(
        &self,
        key: &str,
        handler: Option<CompletionHandler>,
    ) -> Result<CorrelationId> {
        self.send_correlated(Some(key), handler, |correlation| PeerRequest::Get {
            key: key.to_owned(),
            correlation,
        })
    }

    /// Write `key` on the peer. `None` removes the key.
    pub fn request_set(
        &self,
        key: &str,
        value: Option<&str>,
        handler: Option<CompletionHandler>,
    ) -> Result<CorrelationId> {
        self.send_correlated(Some(key), handler, |correlation| PeerRequest::Set {
            key: key.to_owned(),
            value: value.map(str::to_owned),
            correlation,
        })
    }

    /// Clear the peer's store.
    pub fn request_clear(&self, handler: Option<CompletionHandler>) -> Result<CorrelationId> {
        self.send_correlated(None, handler, |correlation| PeerRequest::Clear { correlation })
    }

    /// Ask the peer for a full snapshot.
    pub fn request_refresh(&self) -> Result<()> {
        self.send(PeerRequest::Refresh)
    }

    /// Start or stop change notifications on the peer.
    pub fn request_live_update(&self, enabled: bool) -> Result<()> {
        self.send(PeerRequest::SetLiveUpdate { enabled })
    }

    fn send(&self, request: PeerRequest) -> Result<()> {
        tracing::debug!(op = request.op_name(), "sending request");
        self.outbound.send(request)
    }

    /// Register the handler, build the request around its id and hand it off.
    ///
    /// If the hand-off fails the entry is retired at once and its handler
    /// gets an error outcome for `key`.
    fn send_correlated<F>(
        &self,
        key: Option<&str>,
        handler: Option<CompletionHandler>,
        build: F,
    ) -> Result<CorrelationId>
    where
        F: FnOnce(CorrelationId) -> PeerRequest,
    {
        let correlation = self.registry.register(handler)?;
        let request = build(correlation);
        tracing::debug!(op = request.op_name(), correlation = %correlation, "sending request");

        if let Err(e) = self.outbound.send(request) {
            tracing::warn!(correlation = %correlation, "request not handed off: {}", e);
            self.registry
                .resolve(correlation, Outcome::failed(key.map(str::to_owned)));
            return Err(e);
        }
        Ok(correlation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;
    use crate::registry::handler;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        sent: Mutex<Vec<PeerRequest>>,
        closed: bool,
    }

    impl Outbound for Recorder {
        fn send(&self, request: PeerRequest) -> Result<()> {
            if self.closed {
                return Err(SyncError::Closed);
            }
            self.sent.lock().unwrap().push(request);
            Ok(())
        }
    }

    fn proxy(closed: bool) -> (RemoteProxy, Arc<Recorder>, Arc<CorrelationRegistry>) {
        let registry = Arc::new(CorrelationRegistry::new());
        let recorder = Arc::new(Recorder {
            closed,
            ..Default::default()
        });
        let proxy = RemoteProxy::new(Arc::clone(&registry), recorder.clone());
        (proxy, recorder, registry)
    }

    #[test]
    fn test_uncorrelated_set_uses_sentinel() {
        let (proxy, recorder, registry) = proxy(false);

        let id = proxy.request_set("k", Some("v"), None).unwrap();
        assert_eq!(id, CorrelationId::NONE);
        assert_eq!(registry.pending(), 0);
        assert_eq!(
            recorder.sent.lock().unwrap()[0],
            PeerRequest::Set {
                key: "k".into(),
                value: Some("v".into()),
                correlation: CorrelationId::NONE,
            }
        );
    }

    #[test]
    fn test_correlated_requests_carry_ids() {
        let (proxy, recorder, registry) = proxy(false);

        let get = proxy.request_get("a", handler(|_| {})).unwrap();
        let clear = proxy.request_clear(handler(|_| {})).unwrap();
        assert_eq!(get.as_raw(), 0);
        assert_eq!(clear.as_raw(), 1);
        assert_eq!(registry.pending(), 2);

        let sent = recorder.sent.lock().unwrap();
        assert_eq!(sent[0].correlation(), get);
        assert_eq!(sent[1], PeerRequest::Clear { correlation: clear });
    }

    #[test]
    fn test_failed_handoff_fails_handler() {
        let (proxy, _recorder, registry) = proxy(true);
        let seen = Arc::new(Mutex::new(None));

        let slot = Arc::clone(&seen);
        let result = proxy.request_set(
            "k",
            None,
            handler(move |outcome| *slot.lock().unwrap() = Some(outcome)),
        );

        assert!(matches!(result, Err(SyncError::Closed)));
        assert_eq!(registry.pending(), 0);
        assert_eq!(
            *seen.lock().unwrap(),
            Some(Outcome::Error {
                key: Some("k".into())
            })
        );
    }
}
