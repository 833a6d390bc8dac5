//! Data that crosses the boundary to the ledger

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{ScoreBreakdown, ScoreInputs, ScoreReceipt, SessionSummary};

/// Tuple sent to the ledger after the gate accepted it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub reps: u32,
    pub average_form_accuracy: u8,
    pub best_streak: u32,
    pub duration_seconds: u64,
    pub region: String,
}

impl SubmissionRecord {
    pub fn from_summary(summary: &SessionSummary, region: impl Into<String>) -> Self {
        Self {
            reps: summary.reps(),
            average_form_accuracy: summary.average_form_accuracy,
            best_streak: summary.best_streak(),
            duration_seconds: summary.duration_secs(),
            region: region.into(),
        }
    }
}

impl ScoreInputs for SubmissionRecord {
    fn reps(&self) -> u32 {
        self.reps
    }

    fn average_form_accuracy(&self) -> u8 {
        self.average_form_accuracy
    }

    fn best_streak(&self) -> u32 {
        self.best_streak
    }

    fn duration_secs(&self) -> u64 {
        self.duration_seconds
    }
}

/// Gate refusals. `CooldownActive` is expected traffic, not a failure.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum GateError {
    #[error("reps {reps} outside 1..={max}")]
    RepsOutOfRange { reps: u32, max: u32 },
    #[error("average form accuracy {accuracy} above 100")]
    AccuracyOutOfRange { accuracy: u8 },
    #[error("best streak {best_streak} exceeds reps {reps}")]
    StreakOutOfRange { best_streak: u32, reps: u32 },
    #[error("cooldown active, {remaining_secs}s remaining")]
    CooldownActive { remaining_secs: u64 },
}

impl GateError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::RepsOutOfRange { .. } => "S001_REPS_OUT_OF_RANGE",
            Self::AccuracyOutOfRange { .. } => "S002_ACCURACY_OUT_OF_RANGE",
            Self::StreakOutOfRange { .. } => "S003_STREAK_OUT_OF_RANGE",
            Self::CooldownActive { .. } => "S004_COOLDOWN_ACTIVE",
        }
    }

    /// Caller-input errors are surfaced, never retried
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::CooldownActive { .. })
    }
}

/// Lifetime row the ledger keeps per user
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LifetimeStats {
    pub user: String,
    pub total_reps: u64,
    /// Rep-weighted running average
    pub average_form_accuracy: u8,
    pub best_streak: u32,
    pub sessions_completed: u32,
    pub best_score: u64,
}

/// One accepted submission as stored by the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub user: String,
    pub record: SubmissionRecord,
    pub breakdown: ScoreBreakdown,
    pub receipt: ScoreReceipt,
    pub accepted_at: DateTime<Utc>,
}
