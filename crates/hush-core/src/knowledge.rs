use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::abstraction::{Signal, abstract_signal};
use crate::error::ArchiveError;
use crate::time::Timestamp;
use crate::vector::Vector;

/// Storage collaborator seam. The knowledge base notifies it of additions
/// fire-and-forget; the engine is correct even if every call no-ops.
pub trait Archive: Send + Sync {
    /// Persist one entry under its identity hash.
    fn record(&self, key: &str, value: &serde_json::Value) -> Result<(), ArchiveError>;

    /// Fetch a previously recorded value, if any.
    fn fetch(&self, key: &str) -> Result<Option<serde_json::Value>, ArchiveError>;

    /// Append an event to the archive log.
    fn log_event(&self, kind: &str, payload: &serde_json::Value) -> Result<(), ArchiveError>;
}

/// Default collaborator: persists nothing, never fails.
pub struct NoopArchive;

impl Archive for NoopArchive {
    fn record(&self, _key: &str, _value: &serde_json::Value) -> Result<(), ArchiveError> {
        Ok(())
    }

    fn fetch(&self, _key: &str) -> Result<Option<serde_json::Value>, ArchiveError> {
        Ok(None)
    }

    fn log_event(&self, _kind: &str, _payload: &serde_json::Value) -> Result<(), ArchiveError> {
        Ok(())
    }
}

/// One registered piece of knowledge, keyed by its vector's identity hash.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub hash: String,
    pub vector: Vector,
    pub meta: serde_json::Value,
    pub registered_at: Timestamp,
}

/// Content-addressable store of abstracted inputs.
///
/// Entries keep insertion order (re-registration replaces in place), which
/// `fuse` depends on. Constructed per-instance and passed explicitly; there
/// is no shared global store.
pub struct KnowledgeBase {
    entries: Vec<KnowledgeEntry>,
    index: HashMap<String, usize>,
    archive: Arc<dyn Archive>,
}

impl Default for KnowledgeBase {
    fn default() -> Self {
        Self::new()
    }
}

impl KnowledgeBase {
    pub fn new() -> Self {
        Self::with_archive(Arc::new(NoopArchive))
    }

    pub fn with_archive(archive: Arc<dyn Archive>) -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
            archive,
        }
    }

    pub fn archive(&self) -> &Arc<dyn Archive> {
        &self.archive
    }

    /// Abstract and store an input. Empty input is a no-op returning the
    /// zero vector, not an error. The storage collaborator is notified
    /// fire-and-forget; its failure is logged and never aborts
    /// registration.
    pub fn register(&mut self, signal: &Signal, meta: serde_json::Value) -> Vector {
        if signal.is_empty() {
            return Vector::zero();
        }

        let vector = abstract_signal(signal, Timestamp::now());
        if vector.is_zero() {
            return Vector::zero();
        }

        let hash = vector.identity_hash();
        let entry = KnowledgeEntry {
            hash: hash.clone(),
            vector,
            meta,
            registered_at: Timestamp::now(),
        };

        if let Err(e) = self
            .archive
            .record(&hash, &serde_json::json!({
                "magnitude": entry.vector.magnitude,
                "entropy_rate": entry.vector.entropy_rate,
                "observed_at": entry.vector.observed_at,
                "meta": entry.meta,
            }))
        {
            tracing::debug!("archive write skipped: {e}");
        }

        match self.index.get(&hash) {
            Some(&slot) => self.entries[slot] = entry,
            None => {
                self.index.insert(hash, self.entries.len());
                self.entries.push(entry);
            }
        }

        vector
    }

    /// Nearest-neighbor retrieval: full linear scan scoring each stored
    /// vector by negative absolute magnitude difference against the query.
    /// Highest score wins; ties go to the first-inserted entry. O(n) per
    /// call by design; the store is not indexed.
    pub fn retrieve(&self, query: &Vector) -> Vector {
        let mut best: Option<(f64, &KnowledgeEntry)> = None;

        for entry in &self.entries {
            let score = -(entry.vector.magnitude - query.magnitude).abs();
            match best {
                Some((best_score, _)) if score <= best_score => {}
                _ => best = Some((score, entry)),
            }
        }

        match best {
            Some((_, entry)) => entry.vector,
            None => Vector::zero(),
        }
    }

    /// Fold every stored vector into one summary vector, in insertion
    /// order, starting from zero. `biased_merge` is asymmetric, so the
    /// result is order-sensitive by intent, not by accident.
    pub fn fuse(&self) -> Vector {
        if self.entries.is_empty() {
            return Vector::zero();
        }
        self.entries
            .iter()
            .fold(Vector::zero(), |acc, entry| acc.biased_merge(entry.vector))
    }

    /// Bulk clear.
    pub fn reset(&mut self) {
        self.entries.clear();
        self.index.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[KnowledgeEntry] {
        &self.entries
    }

    /// Replace all entries (persistence load path). Later duplicates of a
    /// hash replace earlier ones, keeping the earlier slot, matching
    /// `register` semantics.
    pub fn restore(&mut self, entries: Vec<KnowledgeEntry>) {
        self.reset();
        for entry in entries {
            match self.index.get(&entry.hash) {
                Some(&slot) => self.entries[slot] = entry,
                None => {
                    self.index.insert(entry.hash.clone(), self.entries.len());
                    self.entries.push(entry);
                }
            }
        }
    }
}
