use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::constants::{
    DELTA_OUTWARD, DELTA_REJECTED_CORRECTION, DELTA_REQUESTED_ADJUSTMENT, DELTA_ROUTINE,
    DELTA_SELF_CORRECTION, DELTA_UNKNOWN, ESCALATION_GAIN, INSTABILITY_THRESHOLD,
    RECOVERY_DAMPING,
};
use crate::error::CoreError;

/// Event categories driving tension transitions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TensionEvent {
    /// Ordinary interaction.
    Routine,
    /// Externally-facing action (an emission left the agent).
    Outward,
    /// A self-correction attempt that was refused.
    RejectedCorrection,
    /// An adjustment requested from outside.
    RequestedAdjustment,
    /// A self-initiated correction that went through.
    SelfCorrection,
    /// Anything the table does not recognize.
    Unknown,
}

impl TensionEvent {
    /// Table-driven base delta, before amplification.
    pub fn base_delta(self) -> f64 {
        match self {
            TensionEvent::Routine => DELTA_ROUTINE,
            TensionEvent::Outward => DELTA_OUTWARD,
            TensionEvent::RejectedCorrection => DELTA_REJECTED_CORRECTION,
            TensionEvent::RequestedAdjustment => DELTA_REQUESTED_ADJUSTMENT,
            TensionEvent::SelfCorrection => DELTA_SELF_CORRECTION,
            TensionEvent::Unknown => DELTA_UNKNOWN,
        }
    }
}

/// Derived control parameters, computed on demand and never stored.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ControlMatrix {
    /// (1 − T)²: how forcefully the agent acts. Falls off fast as tension
    /// rises.
    pub intensity: f64,
    /// √T: how carefully it checks itself. Grows quickly from zero.
    pub rigor: f64,
}

/// Bounded scalar in [0, 1], clamped on every write, mutated only through
/// [`TensionState::apply`]. Lives for the process lifetime.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct TensionState {
    value: f64,
}

impl Default for TensionState {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl TensionState {
    pub fn new(initial: f64) -> Self {
        Self {
            value: initial.clamp(0.0, 1.0),
        }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    /// Apply one event. Above the instability threshold the machine is
    /// unstable: positive deltas amplify by the escalation gain, negative
    /// deltas shrink by the recovery damping: escalating gets easier,
    /// calming gets harder, near saturation. Amplification keys off the
    /// pre-transition value. Result is clamped to [0, 1].
    pub fn apply(&mut self, event: TensionEvent) -> f64 {
        let base = event.base_delta();
        let delta = if self.value > INSTABILITY_THRESHOLD {
            if base > 0.0 {
                base * ESCALATION_GAIN
            } else {
                base * RECOVERY_DAMPING
            }
        } else {
            base
        };

        self.value = (self.value + delta).clamp(0.0, 1.0);
        self.value
    }

    pub fn control_matrix(&self) -> ControlMatrix {
        ControlMatrix {
            intensity: (1.0 - self.value).powi(2),
            rigor: self.value.sqrt(),
        }
    }

    /// Attempt an autonomous de-escalation.
    ///
    /// Requires tension at or above the instability threshold AND a
    /// probabilistic gate draw below `probability`. On success the
    /// self-correction delta is applied and the new value returned. A failed
    /// attempt surfaces [`CoreError::PreconditionNotMet`], never a silent
    /// no-op. When the draw fails (but the threshold held), the rejection
    /// itself registers as friction via the rejected-correction delta.
    pub fn try_self_correct(
        &mut self,
        rng: &mut impl Rng,
        probability: f64,
    ) -> Result<f64, CoreError> {
        if self.value < INSTABILITY_THRESHOLD {
            return Err(CoreError::PreconditionNotMet {
                reason: format!(
                    "tension {:.3} below threshold {INSTABILITY_THRESHOLD}",
                    self.value
                ),
            });
        }

        if rng.random::<f64>() >= probability {
            self.apply(TensionEvent::RejectedCorrection);
            return Err(CoreError::PreconditionNotMet {
                reason: "correction gate did not pass".to_string(),
            });
        }

        Ok(self.apply(TensionEvent::SelfCorrection))
    }
}
