//! Tension-gated dialogue agent engine.
//!
//! Inputs are abstracted into comparable vectors and accumulated in a
//! content-addressable knowledge base. A dialogue gate crosses an
//! operator/network-controlled silence level with accumulated conversational
//! tension to decide whether the agent responds or stays quiet. Connectivity
//! transitions drive synchronization of registered external sources into the
//! knowledge base, one source at a time, with per-source failure isolation.
//!
//! All I/O lives behind trait seams ([`Archive`], [`SourceFetch`]); the
//! engine itself never touches the network or disk.

pub mod abstraction;
pub mod config;
pub mod constants;
pub mod dialogue;
pub mod error;
pub mod knowledge;
pub mod snapshot;
pub mod sync;
pub mod tension;
pub mod time;
pub mod vector;

pub use abstraction::{Signal, abstract_signal, tokenize};
pub use config::{AgentConfig, SourceEndpoint};
pub use constants::{EPSILON, INSTABILITY_THRESHOLD, SILENCE_GATE};
pub use dialogue::{DialogueGate, DialogueOutcome, DialogueState};
pub use error::{ArchiveError, CoreError, SourceError};
pub use knowledge::{Archive, KnowledgeBase, KnowledgeEntry, NoopArchive};
pub use snapshot::{AgentSnapshot, CURRENT_VERSION, SnapshotError, export_json, import_json};
pub use sync::{
    NetworkState, SourceFetch, SourceRegistration, SourceRegistry, SyncReport, Synchronizer,
};
pub use tension::{ControlMatrix, TensionEvent, TensionState};
pub use time::Timestamp;
pub use vector::Vector;
