//! # PeerStore Testkit
//!
//! Testing utilities for PeerStore.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Simulated peer**: Answers host requests the way a browser-side store does
//! - **Golden transcripts**: Known inbound sequences with expected outcomes
//! - **Generators**: Proptest strategies for property-based testing
//!
//! ## Golden Transcripts
//!
//! Transcripts pin down how the host reacts to a sequence of peer messages:
//!
//! ```rust
//! use peerstore_testkit::vectors::{all_transcripts, run_transcript};
//!
//! for transcript in all_transcripts() {
//!     let run = run_transcript(&transcript).unwrap();
//!     assert!(transcript.matches(&run), "{}", transcript.name);
//! }
//! ```
//!
//! ## Property Testing
//!
//! Use the generators with proptest:
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use peerstore_testkit::generators::change_event;
//!
//! proptest! {
//!     #[test]
//!     fn kind_matches_triple(event in change_event()) {
//!         prop_assert_eq!(event.kind(), ChangeKind::classify(event.key(), event.new_value()));
//!     }
//! }
//! ```
//!
//! ## Sessions
//!
//! Wire a store to a simulated peer and step it by hand:
//!
//! ```rust
//! use peerstore::PeerStoreConfig;
//! use peerstore_testkit::fixtures::{Session, SimulatedPeer};
//!
//! let mut session = Session::new(SimulatedPeer::with_entries([("a", "1")]), PeerStoreConfig::default());
//! session.pump();
//! assert_eq!(session.store.cached("a").value(), Some("1"));
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{init_tracing, OutcomeLog, Session, SimulatedPeer};
pub use generators::{session_ops, SessionOp};
pub use vectors::{all_transcripts, run_transcript, verify_all_transcripts, Transcript};
