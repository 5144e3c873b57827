//! Ready gate.
//!
//! Host actions issued before the peer's handshake are queued and run, in
//! the order they were issued, when the handshake arrives. After that the
//! gate stays open and actions run immediately on the caller's thread.

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Mutex;

use peerstore_core::Readiness;

/// A deferred zero-argument host action.
pub type Action = Box<dyn FnOnce() + Send + 'static>;

/// FIFO gate in front of host actions.
pub struct ReadyGate {
    inner: Mutex<GateInner>,
}

struct GateInner {
    phase: Phase,
    queue: VecDeque<Action>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Pending,
    /// `signal_ready` is emptying the queue. New actions still queue up
    /// behind the ones being drained.
    Draining,
    Ready,
}

impl ReadyGate {
    /// Create a closed gate.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(GateInner {
                phase: Phase::Pending,
                queue: VecDeque::new(),
            }),
        }
    }

    /// Run `action` now if the gate is open, otherwise queue it.
    pub fn run_when_ready<F>(&self, action: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut inner = self.inner.lock().unwrap();
        if inner.phase == Phase::Ready {
            drop(inner);
            action();
        } else {
            inner.queue.push_back(Box::new(action));
        }
    }

    /// Open the gate and run every queued action in order.
    ///
    /// Returns `false` if the gate was already opened. The lock is held
    /// only to pop each action; actions run outside it and may queue more
    /// work, which runs before this call returns. A panicking action is
    /// logged and skipped; the rest of the queue still runs and the gate
    /// still opens.
    pub fn signal_ready(&self) -> bool {
        {
            let mut inner = self.inner.lock().unwrap();
            if inner.phase != Phase::Pending {
                return false;
            }
            inner.phase = Phase::Draining;
        }

        let mut drained = 0usize;
        let mut failed = 0usize;
        loop {
            let next = {
                let mut inner = self.inner.lock().unwrap();
                match inner.queue.pop_front() {
                    Some(action) => action,
                    None => {
                        inner.phase = Phase::Ready;
                        break;
                    }
                }
            };
            if panic::catch_unwind(AssertUnwindSafe(next)).is_err() {
                failed += 1;
                tracing::error!("deferred action panicked");
            }
            drained += 1;
        }

        tracing::debug!(drained, failed, "ready gate opened");
        true
    }

    /// Current readiness.
    pub fn readiness(&self) -> Readiness {
        match self.inner.lock().unwrap().phase {
            Phase::Ready => Readiness::Ready,
            Phase::Pending | Phase::Draining => Readiness::Pending,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.readiness().is_ready()
    }

    /// Number of actions waiting for the gate to open.
    pub fn queued(&self) -> usize {
        self.inner.lock().unwrap().queue.len()
    }
}

impl Default for ReadyGate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn recorder() -> (Arc<Mutex<Vec<u32>>>, impl Fn(u32) -> Action) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let push_log = Arc::clone(&log);
        let make = move |n: u32| -> Action {
            let log = Arc::clone(&push_log);
            Box::new(move || log.lock().unwrap().push(n))
        };
        (log, make)
    }

    #[test]
    fn test_actions_wait_for_ready() {
        let gate = ReadyGate::new();
        let (log, make) = recorder();

        gate.run_when_ready(make(1));
        gate.run_when_ready(make(2));
        gate.run_when_ready(make(3));

        assert!(log.lock().unwrap().is_empty());
        assert_eq!(gate.queued(), 3);
        assert_eq!(gate.readiness(), Readiness::Pending);

        assert!(gate.signal_ready());
        assert_eq!(*log.lock().unwrap(), vec![1, 2, 3]);
        assert_eq!(gate.queued(), 0);
    }

    #[test]
    fn test_ready_is_sticky() {
        let gate = ReadyGate::new();
        let (log, make) = recorder();
        gate.signal_ready();

        gate.run_when_ready(make(7));
        assert_eq!(*log.lock().unwrap(), vec![7]);
        assert!(gate.is_ready());
    }

    #[test]
    fn test_second_signal_is_noop() {
        let gate = ReadyGate::new();
        let (log, make) = recorder();
        gate.run_when_ready(make(1));

        assert!(gate.signal_ready());
        assert!(!gate.signal_ready());
        assert_eq!(*log.lock().unwrap(), vec![1]);
    }

    #[test]
    fn test_reentrant_action_runs_during_drain() {
        let gate = Arc::new(ReadyGate::new());
        let (log, make) = recorder();

        let inner_gate = Arc::clone(&gate);
        let late = make(3);
        let first = make(1);
        gate.run_when_ready(move || {
            first();
            // Queued behind 2, still drained before signal_ready returns.
            inner_gate.run_when_ready(late);
        });
        gate.run_when_ready(make(2));

        gate.signal_ready();
        assert_eq!(*log.lock().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_panicking_action_does_not_jam_gate() {
        let gate = ReadyGate::new();
        let (log, make) = recorder();

        gate.run_when_ready(make(1));
        gate.run_when_ready(|| panic!("host action failed"));
        gate.run_when_ready(make(2));

        assert!(gate.signal_ready());
        assert!(gate.is_ready());
        assert_eq!(gate.queued(), 0);
        assert_eq!(*log.lock().unwrap(), vec![1, 2]);

        gate.run_when_ready(make(3));
        assert_eq!(*log.lock().unwrap(), vec![1, 2, 3]);
    }
}
