/// Base tension delta for a routine interaction.
pub const DELTA_ROUTINE: f64 = 0.05;

/// Base tension delta for an externally-facing action.
pub const DELTA_OUTWARD: f64 = 0.20;

/// Base tension delta for a rejected self-correction attempt.
pub const DELTA_REJECTED_CORRECTION: f64 = 0.05;

/// Base tension delta for an externally requested adjustment.
pub const DELTA_REQUESTED_ADJUSTMENT: f64 = -0.10;

/// Base tension delta for a self-initiated correction.
pub const DELTA_SELF_CORRECTION: f64 = -0.40;

/// Default delta for event kinds the table does not recognize.
pub const DELTA_UNKNOWN: f64 = 0.02;

/// Tension level above which the machine becomes unstable: escalation
/// amplifies, recovery damps.
pub const INSTABILITY_THRESHOLD: f64 = 0.8;

/// Positive deltas are multiplied by this factor above the instability
/// threshold.
pub const ESCALATION_GAIN: f64 = 1.5;

/// Negative deltas are multiplied by this factor above the instability
/// threshold.
pub const RECOVERY_DAMPING: f64 = 0.5;

/// Silence level at or above which emission may be suppressed.
pub const SILENCE_GATE: f64 = 0.8;

/// Dialogue tension at or above which accumulated pressure overrides a high
/// silence level.
pub const SILENCE_OVERRIDE_TENSION: f64 = 0.5;

/// Tension released by a successful emission.
pub const EMISSION_DECAY: f64 = 0.3;

/// Upper bound of the per-turn dialogue tension increment.
pub const TURN_INCREMENT_MAX: f64 = 0.1;

/// Scale factor from input length to vector magnitude.
pub const MAGNITUDE_SCALE: f64 = 0.01;

/// Silence level forced when connectivity is lost.
pub const OFFLINE_SILENCE: f64 = 1.0;

/// Silence level relaxed to after connectivity returns.
pub const ONLINE_SILENCE: f64 = 0.5;

/// Numerical epsilon for near-zero comparisons.
pub const EPSILON: f64 = 1e-10;
