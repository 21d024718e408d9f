//! Connectivity-driven synchronization.
//!
//! The synchronizer owns the network state machine: losing connectivity
//! forces the dialogue gate fully silent and disables external I/O;
//! regaining it relaxes the gate and replays integration of every
//! registered source into the knowledge base. Sources are processed
//! strictly sequentially, in registration order, and one failing source
//! never blocks the rest.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::abstraction::Signal;
use crate::constants::{OFFLINE_SILENCE, ONLINE_SILENCE};
use crate::dialogue::DialogueGate;
use crate::error::SourceError;
use crate::knowledge::KnowledgeBase;
use crate::time::Timestamp;

/// Raw-content fetch collaborator. The engine never talks to the network
/// itself; the CLI implements this with an HTTP client, tests with queues.
#[async_trait]
pub trait SourceFetch: Send + Sync {
    async fn fetch_raw(&self, name: &str, url: &str) -> Result<String, SourceError>;
}

/// Optional per-source payload rewrite applied between fetch and
/// registration.
pub type Transform = Box<dyn Fn(&str) -> String + Send + Sync>;

/// One registered external source. Registrations are append-only and
/// consumed in registration order.
pub struct SourceRegistration {
    pub name: String,
    pub url: String,
    pub transform: Option<Transform>,
}

impl fmt::Debug for SourceRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceRegistration")
            .field("name", &self.name)
            .field("url", &self.url)
            .field("transform", &self.transform.is_some())
            .finish()
    }
}

/// Ordered list of external sources plus the external-I/O enable flag.
///
/// The flag has a single writer (the synchronizer, or explicit operator
/// toggles) and is consulted by every outbound call path: while disabled,
/// `fetch` returns `Ok(None)` without touching the collaborator.
pub struct SourceRegistry {
    sources: Vec<SourceRegistration>,
    io_enabled: bool,
    fetcher: Arc<dyn SourceFetch>,
}

impl SourceRegistry {
    pub fn new(fetcher: Arc<dyn SourceFetch>) -> Self {
        Self {
            sources: Vec::new(),
            io_enabled: true,
            fetcher,
        }
    }

    /// Append a source. Returns false (and keeps the existing entry) when
    /// the name is already registered.
    pub fn register_endpoint(&mut self, name: impl Into<String>, url: impl Into<String>) -> bool {
        self.register(SourceRegistration {
            name: name.into(),
            url: url.into(),
            transform: None,
        })
    }

    pub fn register_with_transform(
        &mut self,
        name: impl Into<String>,
        url: impl Into<String>,
        transform: Transform,
    ) -> bool {
        self.register(SourceRegistration {
            name: name.into(),
            url: url.into(),
            transform: Some(transform),
        })
    }

    fn register(&mut self, registration: SourceRegistration) -> bool {
        if self.sources.iter().any(|s| s.name == registration.name) {
            return false;
        }
        self.sources.push(registration);
        true
    }

    pub fn set_io_enabled(&mut self, enabled: bool) {
        self.io_enabled = enabled;
    }

    pub fn io_enabled(&self) -> bool {
        self.io_enabled
    }

    pub fn sources(&self) -> &[SourceRegistration] {
        &self.sources
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Fetch raw content for a named source. `Ok(None)` means "no data":
    /// the name is unregistered, or external I/O is disabled. Collaborator
    /// failures surface as `Err` for the caller to isolate.
    pub async fn fetch(&self, name: &str) -> Result<Option<String>, SourceError> {
        if !self.io_enabled {
            return Ok(None);
        }
        let Some(source) = self.sources.iter().find(|s| s.name == name) else {
            return Ok(None);
        };
        let raw = self.fetcher.fetch_raw(&source.name, &source.url).await?;
        Ok(Some(raw))
    }
}

/// Connectivity as last observed. `initialized` guards listener re-entry;
/// `last_sync_at` is stamped on every reconnect.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct NetworkState {
    pub connected: bool,
    pub initialized: bool,
    pub last_sync_at: Option<Timestamp>,
}

impl NetworkState {
    pub fn new(connected: bool) -> Self {
        Self {
            connected,
            initialized: false,
            last_sync_at: None,
        }
    }
}

/// A failed source within one pass.
#[derive(Clone, Debug)]
pub struct SourceFailure {
    pub name: String,
    pub message: String,
}

/// Outcome of one synchronization pass.
#[derive(Debug)]
pub struct SyncReport {
    pub pass_id: Uuid,
    pub started_at: Timestamp,
    pub integrated: usize,
    pub skipped: usize,
    pub failures: Vec<SourceFailure>,
}

impl SyncReport {
    fn new() -> Self {
        Self {
            pass_id: Uuid::new_v4(),
            started_at: Timestamp::now(),
            integrated: 0,
            skipped: 0,
            failures: Vec::new(),
        }
    }

    pub fn attempted(&self) -> usize {
        self.integrated + self.skipped + self.failures.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Connectivity state machine driving source integration.
pub struct Synchronizer {
    network: NetworkState,
}

impl Synchronizer {
    pub fn new(connected: bool) -> Self {
        Self {
            network: NetworkState::new(connected),
        }
    }

    pub fn from_state(network: NetworkState) -> Self {
        Self { network }
    }

    pub fn network(&self) -> &NetworkState {
        &self.network
    }

    /// Idempotent: a second call is a no-op. If currently disconnected,
    /// immediately enters the disconnected branch.
    pub fn init(&mut self, gate: &mut DialogueGate, registry: &mut SourceRegistry) {
        if self.network.initialized {
            return;
        }
        self.network.initialized = true;
        if !self.network.connected {
            self.enter_offline(gate, registry);
        }
    }

    /// Connectivity lost: full silence, external I/O off.
    pub fn handle_offline(&mut self, gate: &mut DialogueGate, registry: &mut SourceRegistry) {
        self.network.connected = false;
        self.enter_offline(gate, registry);
    }

    fn enter_offline(&mut self, gate: &mut DialogueGate, registry: &mut SourceRegistry) {
        gate.set_silence_level(OFFLINE_SILENCE);
        registry.set_io_enabled(false);
        tracing::info!("connectivity lost: silence forced, external I/O disabled");
    }

    /// Connectivity regained: stamp the sync time, re-enable I/O, relax the
    /// gate, then run one full synchronization pass. A scheduler-originated
    /// "synchronize now" signal takes this same path.
    pub async fn handle_online(
        &mut self,
        gate: &mut DialogueGate,
        registry: &mut SourceRegistry,
        knowledge: &mut KnowledgeBase,
    ) -> SyncReport {
        self.network.connected = true;
        self.network.last_sync_at = Some(Timestamp::now());
        registry.set_io_enabled(true);
        gate.set_silence_level(ONLINE_SILENCE);
        tracing::info!("connectivity regained: starting synchronization pass");
        self.synchronize(registry, knowledge).await
    }

    /// Integrate every registered source, strictly sequentially in
    /// registration order, so source N observes source N−1's registrations.
    /// A failure on one source is caught, logged, recorded in the report,
    /// and never halts the loop. The pass outcome is archived best-effort.
    pub async fn synchronize(
        &self,
        registry: &SourceRegistry,
        knowledge: &mut KnowledgeBase,
    ) -> SyncReport {
        let mut report = SyncReport::new();

        for source in registry.sources() {
            match registry.fetch(&source.name).await {
                Ok(Some(raw)) => {
                    let content = match &source.transform {
                        Some(transform) => transform(&raw),
                        None => raw,
                    };
                    let meta = serde_json::json!({
                        "source": source.name,
                        "url": source.url,
                        "pass": report.pass_id.to_string(),
                        "synced_at": report.started_at.iso8601(),
                    });
                    let vector = knowledge.register(&Signal::text(content), meta);
                    if vector.is_zero() {
                        report.skipped += 1;
                    } else {
                        report.integrated += 1;
                    }
                }
                Ok(None) => {
                    tracing::debug!(source = %source.name, "no data");
                    report.skipped += 1;
                }
                Err(e) => {
                    tracing::warn!(source = %source.name, "integration failed: {e}");
                    report.failures.push(SourceFailure {
                        name: source.name.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }

        let summary = serde_json::json!({
            "pass": report.pass_id.to_string(),
            "integrated": report.integrated,
            "skipped": report.skipped,
            "failed": report.failures.len(),
        });
        if let Err(e) = knowledge.archive().log_event("sync_pass", &summary) {
            tracing::debug!("archive event skipped: {e}");
        }

        report
    }
}
