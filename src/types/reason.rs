//! Reason codes attached to every frame output

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[allow(non_camel_case_types)]
pub enum ReasonCode {
    // =========================================================================
    // R002: Steady state
    // =========================================================================
    /// Holding the starting position
    R002_STATE_DOWN,
    /// Holding the contracted position
    R002_STATE_UP,

    // =========================================================================
    // R003: Streak
    // =========================================================================
    /// Repetition counted and met the accuracy threshold
    R003_STREAK_EXTENDED,
    /// Repetition counted below the accuracy threshold
    R003_STREAK_BROKEN,

    // =========================================================================
    // R005: Transitions
    // =========================================================================
    /// Down → Up, repetition completed
    R005_TRANSITION_TO_UP,
    /// Up → Down, back in the starting position
    R005_TRANSITION_TO_DOWN,

    // =========================================================================
    // R006: Session
    // =========================================================================
    /// Session already finalized, frame not aggregated
    R006_SESSION_FROZEN,
}

impl ReasonCode {
    /// Get the code string (for logging)
    pub fn code(&self) -> &'static str {
        match self {
            Self::R002_STATE_DOWN => "R002_STATE_DOWN",
            Self::R002_STATE_UP => "R002_STATE_UP",
            Self::R003_STREAK_EXTENDED => "R003_STREAK_EXTENDED",
            Self::R003_STREAK_BROKEN => "R003_STREAK_BROKEN",
            Self::R005_TRANSITION_TO_UP => "R005_TRANSITION_TO_UP",
            Self::R005_TRANSITION_TO_DOWN => "R005_TRANSITION_TO_DOWN",
            Self::R006_SESSION_FROZEN => "R006_SESSION_FROZEN",
        }
    }

    /// Get human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::R002_STATE_DOWN => "Starting position",
            Self::R002_STATE_UP => "Contracted",
            Self::R003_STREAK_EXTENDED => "Clean rep - streak extended",
            Self::R003_STREAK_BROKEN => "Rep counted - form below streak threshold",
            Self::R005_TRANSITION_TO_UP => "Rep completed",
            Self::R005_TRANSITION_TO_DOWN => "Returning to start",
            Self::R006_SESSION_FROZEN => "Session finalized",
        }
    }
}

impl std::fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code(), self.description())
    }
}
