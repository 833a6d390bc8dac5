//! Repetition engine state and the per-frame output handed to renderers

use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::{Deserialize, Serialize};

use crate::types::{HingeAngle, Phase, ReasonCode};

/// State of the repetition engine for one session
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExerciseState {
    pub repetition_count: u32,
    pub phase: Phase,
    pub last_angle: HingeAngle,
    /// 0..=100
    pub last_form_accuracy: u8,
}

impl Default for ExerciseState {
    fn default() -> Self {
        Self {
            repetition_count: 0,
            phase: Phase::Down,
            last_angle: HingeAngle::default(),
            last_form_accuracy: 100,
        }
    }
}

/// Read-only snapshot after one processed frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameOutput {
    pub timestamp: DateTime<Utc>,
    pub state: ExerciseState,
    /// True only on the Down → Up transition
    pub repetition_completed: bool,
    pub reason: ReasonCode,
}

impl FrameOutput {
    pub fn new(state: ExerciseState, repetition_completed: bool, reason: ReasonCode) -> Self {
        Self {
            timestamp: Utc::now(),
            state,
            repetition_completed,
            reason,
        }
    }

    /// Format for terminal display (with colors)
    pub fn to_terminal_string(&self) -> String {
        let line = format!(
            "{} reps={} | phase={} | angle={} | form={}% | {}",
            self.state.phase.emoji(),
            self.state.repetition_count,
            self.state.phase,
            self.state.last_angle,
            self.state.last_form_accuracy,
            self.reason.code(),
        );
        if self.repetition_completed {
            line.color(self.state.phase.color()).bold().to_string()
        } else {
            line.color(self.state.phase.color()).to_string()
        }
    }

    /// Format for parseable output (no colors)
    pub fn to_parseable_string(&self) -> String {
        format!(
            "reps={} | phase={} | angle={:.1} | form={} | reason={}",
            self.state.repetition_count,
            self.state.phase,
            self.state.last_angle.degrees(),
            self.state.last_form_accuracy,
            self.reason.code(),
        )
    }
}
