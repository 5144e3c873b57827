//! Correlation registry.
//!
//! Hands out increasing correlation ids and keeps one completion handler per
//! id until the peer's outcome consumes it. Each id is resolved at most once
//! and never reused.

use std::collections::HashMap;
use std::sync::Mutex;

use peerstore_core::{CorrelationId, Outcome};

use crate::error::Result;

/// Single-use handler for the outcome of one request.
pub type CompletionHandler = Box<dyn FnOnce(Outcome) + Send + 'static>;

/// Box a closure as a [`CompletionHandler`].
pub fn handler<F>(f: F) -> Option<CompletionHandler>
where
    F: FnOnce(Outcome) + Send + 'static,
{
    Some(Box::new(f))
}

/// Thread-safe map from correlation id to pending handler.
pub struct CorrelationRegistry {
    inner: Mutex<RegistryInner>,
}

struct RegistryInner {
    /// Next id to hand out.
    next: CorrelationId,

    /// Handlers waiting for an outcome.
    pending: HashMap<CorrelationId, CompletionHandler>,
}

impl CorrelationRegistry {
    /// Create an empty registry. The first id handed out is `0`.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(RegistryInner {
                next: CorrelationId::FIRST,
                pending: HashMap::new(),
            }),
        }
    }

    /// Store `handler` under a fresh id.
    ///
    /// Without a handler nothing is allocated and the fire-and-forget
    /// sentinel is returned.
    pub fn register(&self, handler: Option<CompletionHandler>) -> Result<CorrelationId> {
        let Some(handler) = handler else {
            return Ok(CorrelationId::NONE);
        };

        let mut inner = self.inner.lock().unwrap();
        let id = inner.next;
        inner.next = id.next()?;
        inner.pending.insert(id, handler);
        Ok(id)
    }

    /// Consume the handler for `id` and invoke it with `outcome`.
    ///
    /// Returns `false` without invoking anything for the sentinel, for
    /// unknown ids, and for ids that were already resolved. The entry is
    /// removed before the handler runs, so a handler that issues new
    /// requests never sees its own entry.
    pub fn resolve(&self, id: CorrelationId, outcome: Outcome) -> bool {
        if id.is_none() {
            return false;
        }

        let handler = self.inner.lock().unwrap().pending.remove(&id);
        match handler {
            Some(handler) => {
                handler(outcome);
                true
            }
            None => {
                tracing::debug!(correlation = %id, "dropping outcome for stale or unknown correlation");
                false
            }
        }
    }

    /// Whether a handler is waiting on `id`.
    pub fn is_pending(&self, id: CorrelationId) -> bool {
        self.inner.lock().unwrap().pending.contains_key(&id)
    }

    /// Number of handlers waiting for an outcome.
    pub fn pending(&self) -> usize {
        self.inner.lock().unwrap().pending.len()
    }
}

impl Default for CorrelationRegistry {
    fn default() -> Self {
        Self::new()
    }
}
