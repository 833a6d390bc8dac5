//! Repetition phase definitions

use colored::Color;
use serde::{Deserialize, Serialize};

/// The two half-cycles of a crunch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    /// Starting position, torso open
    #[default]
    Down,
    /// Contracted position, torso folded toward the knees
    Up,
}

impl Phase {
    /// Terminal color for state lines
    pub fn color(&self) -> Color {
        match self {
            Phase::Down => Color::Cyan,
            Phase::Up => Color::Green,
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Phase::Down => "⬇",
            Phase::Up => "⬆",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Phase::Down => "DOWN",
            Phase::Up => "UP",
        };
        write!(f, "{}", name)
    }
}
