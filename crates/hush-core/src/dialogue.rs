use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::abstraction::Signal;
use crate::constants::{
    EMISSION_DECAY, SILENCE_GATE, SILENCE_OVERRIDE_TENSION, TURN_INCREMENT_MAX,
};
use crate::knowledge::KnowledgeBase;
use crate::vector::Vector;

/// Outcome of one processed input.
#[derive(Clone, Debug, PartialEq)]
pub enum DialogueOutcome {
    /// Nothing leaves the agent.
    Silence,
    /// The merged inner response is emitted.
    Respond(Vector),
}

impl DialogueOutcome {
    pub fn is_silence(&self) -> bool {
        matches!(self, DialogueOutcome::Silence)
    }
}

/// Serializable snapshot of the gate.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct DialogueState {
    pub silence_level: f64,
    pub tension: f64,
}

/// Decides, per input, whether the agent speaks.
///
/// Owns its own accumulated tension, distinct from the event-driven tension
/// machine: conversational friction builds a little every turn and releases
/// on each emission. The silence level is set from outside, by the
/// connectivity synchronizer or explicit operator control.
pub struct DialogueGate {
    silence_level: f64,
    tension: f64,
}

impl Default for DialogueGate {
    fn default() -> Self {
        Self::new()
    }
}

impl DialogueGate {
    pub fn new() -> Self {
        Self {
            silence_level: 0.0,
            tension: 0.0,
        }
    }

    pub fn from_state(state: DialogueState) -> Self {
        Self {
            silence_level: state.silence_level.clamp(0.0, 1.0),
            tension: state.tension.clamp(0.0, 1.0),
        }
    }

    pub fn state(&self) -> DialogueState {
        DialogueState {
            silence_level: self.silence_level,
            tension: self.tension,
        }
    }

    pub fn silence_level(&self) -> f64 {
        self.silence_level
    }

    pub fn tension(&self) -> f64 {
        self.tension
    }

    /// Fully replace the silence level, clamped to [0, 1].
    pub fn set_silence_level(&mut self, level: f64) {
        self.silence_level = level.clamp(0.0, 1.0);
    }

    /// Process one input.
    ///
    /// Empty input yields `Silence` with no side effects at all. Otherwise
    /// the input is registered, the nearest stored vector retrieved, and the
    /// two merged into the inner response. Every processed turn adds a small
    /// rng-bounded amount of tension (clamped to 1.0). Emission is then
    /// suppressed when the silence level is high and tension has not yet
    /// built up; a successful emission releases a fixed amount of tension.
    pub fn process_input(
        &mut self,
        knowledge: &mut KnowledgeBase,
        signal: &Signal,
        rng: &mut impl Rng,
    ) -> DialogueOutcome {
        if signal.is_empty() {
            return DialogueOutcome::Silence;
        }

        let registered = knowledge.register(signal, serde_json::json!({"origin": "dialogue"}));
        if registered.is_zero() {
            return DialogueOutcome::Silence;
        }

        let nearest = knowledge.retrieve(&registered);
        let inner_response = registered.biased_merge(nearest);

        self.tension = (self.tension + rng.random_range(0.0..TURN_INCREMENT_MAX)).min(1.0);

        if self.silence_level >= SILENCE_GATE && self.tension < SILENCE_OVERRIDE_TENSION {
            return DialogueOutcome::Silence;
        }

        self.tension = (self.tension - EMISSION_DECAY).max(0.0);
        DialogueOutcome::Respond(inner_response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::EPSILON;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn rng() -> SmallRng {
        SmallRng::seed_from_u64(42)
    }

    #[test]
    fn test_empty_input_is_silence_without_effects() {
        let mut kb = KnowledgeBase::new();
        let mut gate = DialogueGate::new();
        let mut rng = rng();

        let outcome = gate.process_input(&mut kb, &Signal::Empty, &mut rng);
        assert!(outcome.is_silence());
        assert_eq!(gate.tension(), 0.0, "empty input must not add tension");
        assert!(kb.is_empty(), "empty input must not register");
    }

    #[test]
    fn test_suppressed_when_silent_and_calm() {
        let mut kb = KnowledgeBase::new();
        let mut gate = DialogueGate::new();
        let mut rng = rng();
        gate.set_silence_level(1.0);

        let outcome = gate.process_input(&mut kb, &Signal::text("hello"), &mut rng);
        assert!(outcome.is_silence());
        // Only the per-turn increment applies, no emission decay.
        assert!(gate.tension() > 0.0);
        assert!(gate.tension() < TURN_INCREMENT_MAX + EPSILON);
        // The input was still registered.
        assert_eq!(kb.len(), 1);
    }

    #[test]
    fn test_emits_below_silence_gate() {
        let mut kb = KnowledgeBase::new();
        let mut gate = DialogueGate::new();
        let mut rng = rng();
        gate.set_silence_level(0.3);

        let outcome = gate.process_input(&mut kb, &Signal::text("hello there"), &mut rng);
        match outcome {
            DialogueOutcome::Respond(v) => assert!(!v.is_zero()),
            DialogueOutcome::Silence => panic!("silence level 0.3 must emit"),
        }
        // Increment < 0.1, decay 0.3, floored at 0.
        assert_eq!(gate.tension(), 0.0);
    }

    #[test]
    fn test_emission_decay_arithmetic() {
        let mut kb = KnowledgeBase::new();
        let mut gate = DialogueGate::from_state(DialogueState {
            silence_level: 0.3,
            tension: 0.9,
        });
        let mut rng = rng();

        let before = gate.tension();
        let outcome = gate.process_input(&mut kb, &Signal::text("hello"), &mut rng);
        assert!(!outcome.is_silence());

        // tension = min(1, before + inc) - 0.3, with inc in [0, 0.1)
        let after = gate.tension();
        assert!(after >= before - EMISSION_DECAY - EPSILON, "after={after}");
        assert!(after < before + TURN_INCREMENT_MAX - EMISSION_DECAY, "after={after}");
    }

    #[test]
    fn test_built_up_tension_overrides_silence() {
        let mut kb = KnowledgeBase::new();
        let mut gate = DialogueGate::from_state(DialogueState {
            silence_level: 1.0,
            tension: 0.6,
        });
        let mut rng = rng();

        let outcome = gate.process_input(&mut kb, &Signal::text("hello"), &mut rng);
        assert!(
            !outcome.is_silence(),
            "tension 0.6 must override silence 1.0"
        );
    }

    #[test]
    fn test_repeated_suppression_eventually_speaks() {
        let mut kb = KnowledgeBase::new();
        let mut gate = DialogueGate::new();
        let mut rng = rng();
        gate.set_silence_level(1.0);

        // Tension accumulates per turn until it crosses the override level.
        let mut spoke = false;
        for _ in 0..200 {
            if !gate
                .process_input(&mut kb, &Signal::text("still there?"), &mut rng)
                .is_silence()
            {
                spoke = true;
                break;
            }
        }
        assert!(spoke, "accumulated tension should eventually break silence");
    }

    #[test]
    fn test_inner_response_merges_registered_and_nearest() {
        let mut kb = KnowledgeBase::new();
        let mut gate = DialogueGate::new();
        let mut rng = rng();

        kb.register(&Signal::text("hello world"), serde_json::json!({}));

        let outcome = gate.process_input(&mut kb, &Signal::text("hello world"), &mut rng);
        match outcome {
            DialogueOutcome::Respond(v) => {
                // Registered magnitude m merged with its own nearest match:
                // m + m/2.
                let m = crate::abstraction::abstract_signal(
                    &Signal::text("hello world"),
                    crate::time::Timestamp(0),
                )
                .magnitude;
                assert!((v.magnitude - m * 1.5).abs() < EPSILON, "got {}", v.magnitude);
            }
            DialogueOutcome::Silence => panic!("expected emission"),
        }
    }

    #[test]
    fn test_set_silence_level_clamps() {
        let mut gate = DialogueGate::new();
        gate.set_silence_level(2.0);
        assert_eq!(gate.silence_level(), 1.0);
        gate.set_silence_level(-1.0);
        assert_eq!(gate.silence_level(), 0.0);
    }

    #[test]
    fn test_state_roundtrip() {
        let gate = DialogueGate::from_state(DialogueState {
            silence_level: 0.7,
            tension: 0.4,
        });
        let state = gate.state();
        assert!((state.silence_level - 0.7).abs() < EPSILON);
        assert!((state.tension - 0.4).abs() < EPSILON);
    }
}
