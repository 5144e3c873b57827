//! Session-level properties over generated scripts.

use proptest::prelude::*;

use peerstore::{Capability, PeerStoreConfig};
use peerstore_testkit::generators::{entries, peer_message};
use peerstore_testkit::{session_ops, OutcomeLog, Session, SessionOp, SimulatedPeer};

fn play(session: &mut Session, log: &OutcomeLog, op: &SessionOp) {
    match op {
        SessionOp::Get { key } => session.store.get_item(key, log.handler("get")),
        SessionOp::Set {
            key,
            value,
            correlated,
        } => {
            let handler = correlated.then(|| log.handler("set"));
            session.store.set_item(key, value, handler);
        }
        SessionOp::Remove { key, correlated } => {
            let handler = correlated.then(|| log.handler("remove"));
            session.store.remove_item(key, handler);
        }
        SessionOp::Clear { correlated } => {
            let handler = correlated.then(|| log.handler("clear"));
            session.store.clear(handler);
        }
        SessionOp::Refresh => session.store.refresh(),
        SessionOp::External { key, value } => {
            let message = session.peer.external_set(key, value.as_deref());
            session.push(message);
            return;
        }
        SessionOp::ExternalClear => {
            let message = session.peer.external_clear();
            session.push(message);
            return;
        }
    }
    session.pump();
}

fn writes_confirmed(ops: &[SessionOp]) -> bool {
    ops.iter().all(|op| {
        !matches!(
            op,
            SessionOp::Set {
                correlated: false,
                ..
            } | SessionOp::Remove {
                correlated: false,
                ..
            } | SessionOp::Clear { correlated: false }
        )
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn every_correlated_op_resolves_once(
        initial in entries(4),
        ops in session_ops(24),
    ) {
        let peer = SimulatedPeer::with_entries(
            initial.iter().map(|(k, v)| (k.as_str(), v.as_str())),
        );
        let mut session = Session::new(peer, PeerStoreConfig::default());
        let log = OutcomeLog::new();

        session.pump();
        for op in &ops {
            play(&mut session, &log, op);
        }

        let expected = ops.iter().filter(|op| op.is_correlated()).count();
        prop_assert_eq!(log.len(), expected);
        prop_assert_eq!(session.store.pending_requests(), 0);
        prop_assert!(log.outcomes().iter().all(|(_, outcome)| outcome.is_success()));
    }

    #[test]
    fn mirror_converges_after_refresh(
        initial in entries(4),
        ops in session_ops(24),
    ) {
        let peer = SimulatedPeer::with_entries(
            initial.iter().map(|(k, v)| (k.as_str(), v.as_str())),
        );
        let mut session = Session::new(peer, PeerStoreConfig::default());
        let log = OutcomeLog::new();

        session.pump();
        for op in &ops {
            play(&mut session, &log, op);
        }

        if writes_confirmed(&ops) {
            let cached = session.store.cached_items();
            prop_assert_eq!(cached.as_ref(), Some(session.peer.entries()));
        }

        session.store.refresh();
        session.pump();
        let cached = session.store.cached_items();
        prop_assert_eq!(cached.as_ref(), Some(session.peer.entries()));
    }

    #[test]
    fn capability_and_readiness_are_monotone(
        messages in prop::collection::vec(peer_message(), 0..16),
    ) {
        let session = Session::new(SimulatedPeer::new(), PeerStoreConfig::default());
        let mut settled = Capability::Unknown;
        let mut was_ready = false;

        for message in messages {
            session.store.dispatch(message);

            let capability = session.store.capability();
            if settled != Capability::Unknown {
                prop_assert_eq!(capability, settled);
            }
            settled = capability;

            if was_ready {
                prop_assert!(session.store.is_ready());
            }
            was_ready = session.store.is_ready();

            if capability == Capability::Unsupported {
                prop_assert_eq!(session.store.cached_items(), None);
            }
        }
        prop_assert_eq!(session.store.pending_requests(), 0);
    }
}
