use serde::{Deserialize, Serialize};

/// A source declared in configuration, registered at startup.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SourceEndpoint {
    pub name: String,
    pub url: String,
}

/// Agent tunables. Every field has a default, so a config file only needs
/// to name what it changes.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub agent_name: String,
    /// Starting value of the event-driven tension machine.
    pub initial_tension: f64,
    /// Probability that an autonomous self-correction attempt passes its
    /// gate. The original constant had no stated rationale, so it is a
    /// tunable here.
    pub correction_probability: f64,
    /// Hard timeout applied to every external source fetch.
    pub fetch_timeout_secs: u64,
    /// Sources registered on startup, in declaration order.
    pub sources: Vec<SourceEndpoint>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            agent_name: "hush".to_string(),
            initial_tension: 0.0,
            correction_probability: 0.3,
            fetch_timeout_secs: 10,
            sources: Vec::new(),
        }
    }
}
