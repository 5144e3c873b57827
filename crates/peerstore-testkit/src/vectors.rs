//! Golden transcripts for deterministic verification.
//!
//! A transcript is a named sequence of peer messages fed to a fresh store,
//! with the mirror, capability and events it must end up with. Any
//! implementation of the host side must agree on every transcript.

use std::sync::{Arc, Mutex};

use serde::Serialize;

use peerstore::{Capability, Disposition, PeerStore, PeerStoreConfig};
use peerstore_sync::{Entries, Outbound, PeerMessage, PeerRequest};

/// A golden transcript.
#[derive(Debug, Clone, Serialize)]
pub struct Transcript {
    /// Human-readable name.
    pub name: &'static str,
    /// What the transcript pins down.
    pub description: &'static str,
    /// Live update setting of the store under test.
    pub live_update: bool,
    /// Messages delivered, in order.
    pub inbound: Vec<PeerMessage>,
    /// Final mirror contents. `None` means the mirror never initialized.
    pub expected_mirror: Option<Entries>,
    /// Final capability.
    pub expected_capability: Capability,
    /// Events raised, in order: `ready`, `refresh`, or `update:<kind>`.
    pub expected_events: Vec<&'static str>,
    /// Number of messages the dispatcher absorbed.
    pub expected_drops: usize,
}

/// What a store actually did with a transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranscriptRun {
    pub mirror: Option<Entries>,
    pub capability: Capability,
    pub events: Vec<String>,
    pub drops: usize,
}

impl Transcript {
    /// Whether `run` matches the expectations.
    pub fn matches(&self, run: &TranscriptRun) -> bool {
        run.mirror == self.expected_mirror
            && run.capability == self.expected_capability
            && run.events == self.expected_events
            && run.drops == self.expected_drops
    }
}

fn entries(pairs: &[(&str, &str)]) -> Entries {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn change(key: Option<&str>, old: Option<&str>, new: Option<&str>) -> PeerMessage {
    PeerMessage::Change {
        key: key.map(str::to_owned),
        old_value: old.map(str::to_owned),
        new_value: new.map(str::to_owned),
    }
}

/// Get all golden transcripts.
pub fn all_transcripts() -> Vec<Transcript> {
    vec![
        Transcript {
            name: "supported_handshake",
            description: "Snapshot seeds the mirror and readiness is announced once",
            live_update: true,
            inbound: vec![PeerMessage::Ready {
                entries: entries(&[("a", "1"), ("b", "2")]),
            }],
            expected_mirror: Some(entries(&[("a", "1"), ("b", "2")])),
            expected_capability: Capability::Supported,
            expected_events: vec!["ready"],
            expected_drops: 0,
        },
        Transcript {
            name: "unsupported_handshake",
            description: "An unsupported peer is still ready, with no mirror",
            live_update: true,
            inbound: vec![PeerMessage::ReadyUnsupported],
            expected_mirror: None,
            expected_capability: Capability::Unsupported,
            expected_events: vec!["ready"],
            expected_drops: 0,
        },
        Transcript {
            name: "duplicate_handshake",
            description: "Only the first handshake counts",
            live_update: true,
            inbound: vec![
                PeerMessage::Ready {
                    entries: entries(&[("a", "1")]),
                },
                PeerMessage::Ready {
                    entries: entries(&[("b", "2")]),
                },
                PeerMessage::ReadyUnsupported,
            ],
            expected_mirror: Some(entries(&[("a", "1")])),
            expected_capability: Capability::Supported,
            expected_events: vec!["ready"],
            expected_drops: 2,
        },
        Transcript {
            name: "change_classification",
            description: "Insert, remove and clear notifications in one session",
            live_update: true,
            inbound: vec![
                PeerMessage::Ready {
                    entries: entries(&[("a", "1")]),
                },
                change(Some("b"), None, Some("2")),
                change(Some("a"), Some("1"), None),
                change(None, None, None),
            ],
            expected_mirror: Some(Entries::new()),
            expected_capability: Capability::Supported,
            expected_events: vec!["ready", "update:update", "update:remove", "update:clear"],
            expected_drops: 0,
        },
        Transcript {
            name: "clear_ignores_values",
            description: "A missing key means clear even when values are present",
            live_update: true,
            inbound: vec![
                PeerMessage::Ready {
                    entries: entries(&[("a", "1")]),
                },
                change(None, Some("x"), Some("y")),
            ],
            expected_mirror: Some(Entries::new()),
            expected_capability: Capability::Supported,
            expected_events: vec!["ready", "update:clear"],
            expected_drops: 0,
        },
        Transcript {
            name: "empty_value_is_update",
            description: "The empty string is a value, not an absence",
            live_update: true,
            inbound: vec![
                PeerMessage::Ready {
                    entries: Entries::new(),
                },
                change(Some("k"), None, Some("")),
            ],
            expected_mirror: Some(entries(&[("k", "")])),
            expected_capability: Capability::Supported,
            expected_events: vec!["ready", "update:update"],
            expected_drops: 0,
        },
        Transcript {
            name: "change_before_handshake",
            description: "Notifications ahead of the snapshot are absorbed",
            live_update: true,
            inbound: vec![
                change(Some("a"), None, Some("1")),
                PeerMessage::Ready {
                    entries: Entries::new(),
                },
            ],
            expected_mirror: Some(Entries::new()),
            expected_capability: Capability::Supported,
            expected_events: vec!["ready"],
            expected_drops: 1,
        },
        Transcript {
            name: "refresh_replaces_mirror",
            description: "A refresh snapshot replaces the mirror wholesale",
            live_update: true,
            inbound: vec![
                PeerMessage::Ready {
                    entries: entries(&[("a", "1")]),
                },
                PeerMessage::Refresh {
                    entries: entries(&[("b", "2")]),
                },
            ],
            expected_mirror: Some(entries(&[("b", "2")])),
            expected_capability: Capability::Supported,
            expected_events: vec!["ready", "refresh"],
            expected_drops: 0,
        },
        Transcript {
            name: "refresh_after_unsupported",
            description: "Capability never moves back from unsupported",
            live_update: true,
            inbound: vec![
                PeerMessage::ReadyUnsupported,
                PeerMessage::Refresh {
                    entries: entries(&[("a", "1")]),
                },
            ],
            expected_mirror: None,
            expected_capability: Capability::Unsupported,
            expected_events: vec!["ready"],
            expected_drops: 1,
        },
        Transcript {
            name: "stale_outcome",
            description: "An outcome nobody waits for touches nothing",
            live_update: true,
            inbound: vec![
                PeerMessage::Ready {
                    entries: Entries::new(),
                },
                PeerMessage::Outcome {
                    correlation: 7.into(),
                    success: true,
                    key: Some("a".into()),
                    old_value: None,
                    new_value: Some("1".into()),
                },
            ],
            expected_mirror: Some(Entries::new()),
            expected_capability: Capability::Supported,
            expected_events: vec!["ready"],
            expected_drops: 1,
        },
        Transcript {
            name: "live_update_disabled",
            description: "Notifications are absorbed while live update is off",
            live_update: false,
            inbound: vec![
                PeerMessage::Ready {
                    entries: entries(&[("a", "1")]),
                },
                change(Some("a"), Some("1"), Some("2")),
            ],
            expected_mirror: Some(entries(&[("a", "1")])),
            expected_capability: Capability::Supported,
            expected_events: vec!["ready"],
            expected_drops: 1,
        },
    ]
}

/// Accepts and forgets every request.
struct Discard;

impl Outbound for Discard {
    fn send(&self, _request: PeerRequest) -> peerstore_sync::Result<()> {
        Ok(())
    }
}

/// Feed a transcript to a fresh store.
pub fn run_transcript(transcript: &Transcript) -> peerstore::Result<TranscriptRun> {
    let store = PeerStore::new(
        Discard,
        PeerStoreConfig {
            live_update: transcript.live_update,
            simulate_unsupported: false,
        },
    )?;

    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    store.on_ready(move |_| sink.lock().unwrap().push("ready".to_string()));
    let sink = Arc::clone(&events);
    store.on_refresh(move |_| sink.lock().unwrap().push("refresh".to_string()));
    let sink = Arc::clone(&events);
    store.on_item_update(move |change| {
        sink.lock()
            .unwrap()
            .push(format!("update:{}", change.kind()))
    });

    let drops = transcript
        .inbound
        .iter()
        .cloned()
        .map(|message| store.dispatch(message))
        .filter(|disposition| matches!(disposition, Disposition::Dropped(_)))
        .count();

    let events = events.lock().unwrap().clone();
    Ok(TranscriptRun {
        mirror: store.cached_items(),
        capability: store.capability(),
        events,
        drops,
    })
}

/// Run every golden transcript.
///
/// Returns `(name, matches)` for each.
pub fn verify_all_transcripts() -> Vec<(String, bool)> {
    all_transcripts()
        .iter()
        .map(|t| {
            let matches = run_transcript(t).map(|run| t.matches(&run)).unwrap_or(false);
            (t.name.to_string(), matches)
        })
        .collect()
}

/// The transcripts as pretty JSON, for other implementations to consume.
pub fn transcripts_json() -> serde_json::Result<String> {
    serde_json::to_string_pretty(&all_transcripts())
}
