//! Repetition engine: two-phase hysteresis state machine
//!
//! State transitions:
//! - DOWN → UP: angle < 55° (repetition counted at peak contraction)
//! - UP → DOWN: angle > 105°
//! - otherwise unchanged
//!
//! Form accuracy is recomputed on every frame against the phase the engine
//! is in after the transition.

use tracing::{debug, info};

use crate::config::{FormPolicy, RepThresholds};
use crate::types::{ExerciseState, FrameOutput, HingeAngle, Phase, ReasonCode};

/// Phase transition for one angle. Returns the new phase and whether a
/// repetition completed.
pub fn transition(phase: Phase, angle: HingeAngle, thresholds: &RepThresholds) -> (Phase, bool) {
    let deg = angle.degrees();
    match phase {
        Phase::Down if deg < thresholds.up_deg => (Phase::Up, true),
        Phase::Up if deg > thresholds.down_deg => (Phase::Down, false),
        _ => (phase, false),
    }
}

/// Triangular penalty around the phase's ideal angle, 0..=100
pub fn form_accuracy(phase: Phase, angle: HingeAngle, form: &FormPolicy) -> u8 {
    let ideal = match phase {
        Phase::Up => form.up_ideal_deg,
        Phase::Down => form.down_ideal_deg,
    };
    let deviation = (angle.degrees() - ideal).abs();
    if deviation <= form.tolerance_deg {
        return 100;
    }
    let score = (100.0 - form.penalty_per_deg * deviation).round();
    score.clamp(0.0, 100.0) as u8
}

/// Pure step: state + angle → next state, repetition completed
pub fn step(
    state: &ExerciseState,
    angle: HingeAngle,
    thresholds: &RepThresholds,
    form: &FormPolicy,
) -> (ExerciseState, bool) {
    let (phase, completed) = transition(state.phase, angle, thresholds);
    let next = ExerciseState {
        repetition_count: if completed {
            state.repetition_count.saturating_add(1)
        } else {
            state.repetition_count
        },
        phase,
        last_angle: angle,
        last_form_accuracy: form_accuracy(phase, angle, form),
    };
    (next, completed)
}

/// Repetition engine owning one session's `ExerciseState`
#[derive(Debug, Clone)]
pub struct RepetitionEngine {
    state: ExerciseState,
    thresholds: RepThresholds,
    form: FormPolicy,
    update_count: u64,
}

impl Default for RepetitionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RepetitionEngine {
    /// Create new engine with the default policy
    pub fn new() -> Self {
        Self::with_policy(RepThresholds::default(), FormPolicy::default())
    }

    pub fn with_policy(thresholds: RepThresholds, form: FormPolicy) -> Self {
        Self {
            state: ExerciseState::default(),
            thresholds,
            form,
            update_count: 0,
        }
    }

    /// Feed one angle, return the frame output. A NaN angle changes nothing.
    pub fn update(&mut self, angle: HingeAngle) -> FrameOutput {
        if angle.is_nan() {
            return self.current_output();
        }
        let previous = self.state.phase;
        let (next, completed) = step(&self.state, angle, &self.thresholds, &self.form);
        self.state = next;
        self.update_count += 1;

        let reason = match (previous, next.phase) {
            (Phase::Down, Phase::Up) => ReasonCode::R005_TRANSITION_TO_UP,
            (Phase::Up, Phase::Down) => ReasonCode::R005_TRANSITION_TO_DOWN,
            (_, Phase::Down) => ReasonCode::R002_STATE_DOWN,
            (_, Phase::Up) => ReasonCode::R002_STATE_UP,
        };

        if completed {
            info!(
                reps = next.repetition_count,
                angle = angle.degrees(),
                accuracy = next.last_form_accuracy,
                "repetition completed"
            );
        } else {
            debug!(phase = %next.phase, angle = angle.degrees(), "frame");
        }

        FrameOutput::new(next, completed, reason)
    }

    pub fn state(&self) -> ExerciseState {
        self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn repetition_count(&self) -> u32 {
        self.state.repetition_count
    }

    pub fn update_count(&self) -> u64 {
        self.update_count
    }

    /// Get current output without updating
    pub fn current_output(&self) -> FrameOutput {
        let reason = match self.state.phase {
            Phase::Down => ReasonCode::R002_STATE_DOWN,
            Phase::Up => ReasonCode::R002_STATE_UP,
        };
        FrameOutput::new(self.state, false, reason)
    }

    /// Back to zero reps in the starting position, policy kept
    pub fn reset(&mut self) {
        *self = Self::with_policy(self.thresholds, self.form);
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn deg(d: f64) -> HingeAngle {
        HingeAngle::new(d)
    }

    #[test]
    fn test_initial_state_is_down() {
        let engine = RepetitionEngine::new();
        assert_eq!(engine.phase(), Phase::Down);
        assert_eq!(engine.repetition_count(), 0);
    }

    #[test]
    fn test_down_to_up_counts_rep() {
        let mut engine = RepetitionEngine::new();
        let output = engine.update(deg(50.0));
        assert_eq!(output.state.phase, Phase::Up);
        assert!(output.repetition_completed);
        assert_eq!(output.state.repetition_count, 1);
        assert_eq!(output.reason, ReasonCode::R005_TRANSITION_TO_UP);
    }

    #[test]
    fn test_nan_angle_leaves_state() {
        let mut engine = RepetitionEngine::new();
        let output = engine.update(HingeAngle::new(f64::NAN));
        assert!(!output.repetition_completed);
        assert_eq!(output.state, ExerciseState::default());
        assert_eq!(engine.update_count(), 0);
    }

    #[test]
    fn test_up_to_down_does_not_count() {
        let mut engine = RepetitionEngine::new();
        engine.update(deg(50.0));
        let output = engine.update(deg(110.0));
        assert_eq!(output.state.phase, Phase::Down);
        assert!(!output.repetition_completed);
        assert_eq!(output.state.repetition_count, 1);
        assert_eq!(output.reason, ReasonCode::R005_TRANSITION_TO_DOWN);
    }

    #[test]
    fn test_thresholds_are_strict() {
        let t = RepThresholds::default();
        assert_eq!(transition(Phase::Down, deg(55.0), &t), (Phase::Down, false));
        assert_eq!(transition(Phase::Up, deg(105.0), &t), (Phase::Up, false));
        assert_eq!(transition(Phase::Down, deg(54.9), &t), (Phase::Up, true));
        assert_eq!(transition(Phase::Up, deg(105.1), &t), (Phase::Down, false));
    }

    #[test]
    fn test_hysteresis_ignores_noise_between_thresholds() {
        let mut engine = RepetitionEngine::new();
        engine.update(deg(50.0));
        for d in [60.0, 90.0, 104.0, 56.0, 100.0] {
            let out = engine.update(deg(d));
            assert_eq!(out.state.phase, Phase::Up);
            assert_eq!(out.reason, ReasonCode::R002_STATE_UP);
        }
        assert_eq!(engine.repetition_count(), 1);
    }

    #[test]
    fn test_reference_sequence_counts_two() {
        let mut engine = RepetitionEngine::new();
        for d in [170.0, 100.0, 50.0, 110.0, 52.0] {
            engine.update(deg(d));
        }
        assert_eq!(engine.repetition_count(), 2);
        assert_eq!(engine.phase(), Phase::Up);
    }

    #[test]
    fn test_form_in_band_is_full() {
        let f = FormPolicy::default();
        assert_eq!(form_accuracy(Phase::Up, deg(45.0), &f), 100);
        assert_eq!(form_accuracy(Phase::Up, deg(65.0), &f), 100);
        assert_eq!(form_accuracy(Phase::Down, deg(95.0), &f), 100);
        assert_eq!(form_accuracy(Phase::Down, deg(115.0), &f), 100);
    }

    #[test]
    fn test_form_penalty_outside_band() {
        let f = FormPolicy::default();
        // |40 - 55| = 15 → 100 - 30
        assert_eq!(form_accuracy(Phase::Up, deg(40.0), &f), 70);
        // |130 - 105| = 25 → 100 - 50
        assert_eq!(form_accuracy(Phase::Down, deg(130.0), &f), 50);
        // far away floors at zero
        assert_eq!(form_accuracy(Phase::Down, deg(170.0), &f), 0);
    }

    #[test]
    fn test_form_without_tolerance_band() {
        let f = FormPolicy {
            tolerance_deg: 0.0,
            ..FormPolicy::default()
        };
        assert_eq!(form_accuracy(Phase::Up, deg(50.0), &f), 90);
        assert_eq!(form_accuracy(Phase::Up, deg(52.0), &f), 94);
    }

    #[test]
    fn test_form_uses_post_transition_phase() {
        let mut engine = RepetitionEngine::new();
        // Graded against the Up ideal, not the Down ideal
        let out = engine.update(deg(50.0));
        assert_eq!(out.state.last_form_accuracy, 100);
    }

    #[test]
    fn test_form_recomputed_without_transition() {
        let mut engine = RepetitionEngine::new();
        let out = engine.update(deg(170.0));
        assert_eq!(out.state.last_form_accuracy, 0);
        let out = engine.update(deg(105.0));
        assert_eq!(out.state.last_form_accuracy, 100);
    }

    #[test]
    fn test_reset_clears_state() {
        let mut engine = RepetitionEngine::new();
        engine.update(deg(50.0));
        engine.reset();
        assert_eq!(engine.state(), ExerciseState::default());
        assert_eq!(engine.update_count(), 0);
    }
}
