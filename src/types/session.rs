//! Session statistics accumulated from repetition events

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::ScoreInputs;

/// What the aggregator needs from one processed frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepEvent {
    pub repetition_completed: bool,
    /// Form accuracy reported with the frame, 0..=100
    pub accuracy: u8,
}

/// Running statistics of one session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    pub total_reps: u32,
    /// One entry per counted repetition, in order
    pub accuracy_history: Vec<u8>,
    pub current_streak: u32,
    pub best_streak: u32,
    pub start_timestamp: DateTime<Utc>,
    pub elapsed_seconds: u64,
}

impl SessionStats {
    pub fn new(start_timestamp: DateTime<Utc>) -> Self {
        Self {
            total_reps: 0,
            accuracy_history: Vec::new(),
            current_streak: 0,
            best_streak: 0,
            start_timestamp,
            elapsed_seconds: 0,
        }
    }
}

/// Frozen result of a finished session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub stats: SessionStats,
    /// Rounded mean of the accuracy history, 100 when no reps
    pub average_form_accuracy: u8,
    pub stopped_at: DateTime<Utc>,
}

impl SessionSummary {
    pub fn reps(&self) -> u32 {
        self.stats.total_reps
    }

    pub fn best_streak(&self) -> u32 {
        self.stats.best_streak
    }

    pub fn duration_secs(&self) -> u64 {
        self.stats.elapsed_seconds
    }
}

impl ScoreInputs for SessionSummary {
    fn reps(&self) -> u32 {
        self.stats.total_reps
    }

    fn average_form_accuracy(&self) -> u8 {
        self.average_form_accuracy
    }

    fn best_streak(&self) -> u32 {
        self.stats.best_streak
    }

    fn duration_secs(&self) -> u64 {
        self.stats.elapsed_seconds
    }
}
