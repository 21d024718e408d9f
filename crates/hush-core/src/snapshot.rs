//! Versioned JSON export/import of the full agent state.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::dialogue::DialogueState;
use crate::knowledge::KnowledgeEntry;
use crate::sync::NetworkState;
use crate::tension::TensionState;

pub const CURRENT_VERSION: u32 = 1;

/// Everything needed to reconstruct an agent instance.
#[derive(Debug, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub version: u32,
    pub agent_name: String,
    pub entries: Vec<KnowledgeEntry>,
    pub dialogue: DialogueState,
    pub tension: TensionState,
    pub network: NetworkState,
}

#[derive(Debug)]
pub enum SnapshotError {
    Json(serde_json::Error),
    UnsupportedVersion(u32),
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotError::Json(e) => write!(f, "snapshot JSON error: {e}"),
            SnapshotError::UnsupportedVersion(v) => {
                write!(f, "unsupported snapshot version {v} (current {CURRENT_VERSION})")
            }
        }
    }
}

impl std::error::Error for SnapshotError {}

impl From<serde_json::Error> for SnapshotError {
    fn from(e: serde_json::Error) -> Self {
        SnapshotError::Json(e)
    }
}

pub fn export_json(snapshot: &AgentSnapshot) -> Result<String, SnapshotError> {
    Ok(serde_json::to_string_pretty(snapshot)?)
}

pub fn import_json(json: &str) -> Result<AgentSnapshot, SnapshotError> {
    let snapshot: AgentSnapshot = serde_json::from_str(json)?;
    if snapshot.version != CURRENT_VERSION {
        return Err(SnapshotError::UnsupportedVersion(snapshot.version));
    }
    Ok(snapshot)
}
