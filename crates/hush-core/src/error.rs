use std::fmt;

/// Failures surfaced by the engine itself.
#[derive(Debug)]
pub enum CoreError {
    /// An autonomous self-correction was attempted below the instability
    /// threshold, or its probabilistic gate did not pass. Surfaced as an
    /// explicit failure so callers can tell "calmed down" from "refused".
    PreconditionNotMet { reason: String },
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreError::PreconditionNotMet { reason } => {
                write!(f, "precondition not met: {reason}")
            }
        }
    }
}

impl std::error::Error for CoreError {}

/// Failure reported by a source fetch collaborator. Caught per-source during
/// synchronization; never halts the loop.
#[derive(Debug)]
pub struct SourceError(pub String);

impl SourceError {
    pub fn new(msg: impl Into<String>) -> Self {
        SourceError(msg.into())
    }
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "source fetch failed: {}", self.0)
    }
}

impl std::error::Error for SourceError {}

/// Failure reported by the storage collaborator. Always best-effort: logged
/// by the caller, never propagated into core results.
#[derive(Debug)]
pub struct ArchiveError(pub String);

impl ArchiveError {
    pub fn new(msg: impl Into<String>) -> Self {
        ArchiveError(msg.into())
    }
}

impl fmt::Display for ArchiveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "archive unavailable: {}", self.0)
    }
}

impl std::error::Error for ArchiveError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let e = CoreError::PreconditionNotMet {
            reason: "tension 0.300 below threshold".to_string(),
        };
        assert!(e.to_string().contains("precondition not met"));

        assert!(SourceError::new("timeout").to_string().contains("timeout"));
        assert!(ArchiveError::new("locked").to_string().contains("locked"));
    }
}
