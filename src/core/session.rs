//! Exercise session: single serialization point for one user's workout
//!
//! Owns the (ExerciseState, SessionStats) pair. Frames must be fed in arrival
//! order through `&mut self`; hosts with several frame callbacks wrap the
//! session in one lock.

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::config::Config;
use crate::core::aggregator::{AggregateOutcome, SessionAggregator};
use crate::core::geometry::GeometryExtractor;
use crate::core::rep_engine::RepetitionEngine;
use crate::types::{
    ExerciseState, FrameOutput, GeometryError, HingeAngle, JointFrame, ReasonCode, RepEvent,
    SessionStats, SessionSummary, SubmissionRecord,
};

#[derive(Debug, Clone)]
pub struct ExerciseSession {
    user: String,
    region: String,
    extractor: GeometryExtractor,
    engine: RepetitionEngine,
    aggregator: SessionAggregator,
    streak_threshold: u8,
    rejected_frames: u64,
}

impl ExerciseSession {
    pub fn new(user: impl Into<String>, region: impl Into<String>, start: DateTime<Utc>) -> Self {
        Self::with_config(user, region, &Config::default(), start)
    }

    pub fn with_config(
        user: impl Into<String>,
        region: impl Into<String>,
        config: &Config,
        start: DateTime<Utc>,
    ) -> Self {
        let streak_threshold = config.scoring.streak_accuracy_threshold;
        Self {
            user: user.into(),
            region: region.into(),
            extractor: GeometryExtractor::with_threshold(config.thresholds.visibility),
            engine: RepetitionEngine::with_policy(config.thresholds, config.form),
            aggregator: SessionAggregator::with_threshold(start, streak_threshold),
            streak_threshold,
            rejected_frames: 0,
        }
    }

    /// Geometry → engine → aggregator. A rejected frame leaves all state untouched.
    pub fn process_frame(&mut self, frame: &JointFrame) -> Result<FrameOutput, GeometryError> {
        match self.extractor.extract(frame) {
            Ok(angle) => self.process_angle(angle),
            Err(e) => Err(self.reject(e)),
        }
    }

    /// Feed an angle computed elsewhere. NaN is rejected like a bad frame.
    pub fn process_angle(&mut self, angle: HingeAngle) -> Result<FrameOutput, GeometryError> {
        if angle.is_nan() {
            return Err(self.reject(GeometryError::NonFiniteAngle));
        }
        if self.aggregator.is_finalized() {
            let mut output = self.engine.current_output();
            output.reason = ReasonCode::R006_SESSION_FROZEN;
            return Ok(output);
        }

        let mut output = self.engine.update(angle);
        let outcome = self.aggregator.on_frame_processed(RepEvent {
            repetition_completed: output.repetition_completed,
            accuracy: output.state.last_form_accuracy,
        });
        match outcome {
            AggregateOutcome::StreakExtended => output.reason = ReasonCode::R003_STREAK_EXTENDED,
            AggregateOutcome::StreakBroken => output.reason = ReasonCode::R003_STREAK_BROKEN,
            AggregateOutcome::Frozen => output.reason = ReasonCode::R006_SESSION_FROZEN,
            AggregateOutcome::Idle => {}
        }
        Ok(output)
    }

    fn reject(&mut self, e: GeometryError) -> GeometryError {
        self.rejected_frames += 1;
        warn!(user = %self.user, code = e.code(), "frame rejected: {}", e);
        e
    }

    /// Stop the session; idempotent
    pub fn finalize(&mut self, now: DateTime<Utc>) -> SessionSummary {
        self.aggregator.finalize(now)
    }

    /// Start over at `now`: zero reps, empty history
    pub fn reset(&mut self, now: DateTime<Utc>) {
        self.engine.reset();
        self.aggregator = SessionAggregator::with_threshold(now, self.streak_threshold);
        self.rejected_frames = 0;
    }

    /// Record for the gate, built from a finalized summary
    pub fn submission_record(&self, summary: &SessionSummary) -> SubmissionRecord {
        SubmissionRecord::from_summary(summary, self.region.clone())
    }

    pub fn state(&self) -> ExerciseState {
        self.engine.state()
    }

    pub fn current_output(&self) -> FrameOutput {
        self.engine.current_output()
    }

    pub fn stats(&self) -> &SessionStats {
        self.aggregator.stats()
    }

    pub fn average_form_accuracy(&self) -> u8 {
        self.aggregator.average_form_accuracy()
    }

    pub fn is_finalized(&self) -> bool {
        self.aggregator.is_finalized()
    }

    pub fn rejected_frames(&self) -> u64 {
        self.rejected_frames
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn region(&self) -> &str {
        &self.region
    }
}
