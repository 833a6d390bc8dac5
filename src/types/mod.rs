//! Core types for abscore

mod bonus;
mod exercise;
mod landmark;
mod phase;
mod reason;
mod score;
mod session;
mod submission;

pub use bonus::{BonusContext, ChallengeKind, ChallengeSpec};
pub use exercise::{ExerciseState, FrameOutput};
pub use landmark::{GeometryError, HingeAngle, JointFrame, Landmark, LANDMARK_COUNT};
pub use phase::Phase;
pub use reason::ReasonCode;
pub use score::{ScoreBreakdown, ScoreInputs, ScorePayload, ScoreReceipt};
pub use session::{RepEvent, SessionStats, SessionSummary};
pub use submission::{GateError, LedgerEntry, LifetimeStats, SubmissionRecord};
