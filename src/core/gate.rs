//! Submission gate: bounds checks and per-user cooldown
//!
//! Client-side and optimistic; the ledger enforces the same rules again.
//! The cooldown check and the timestamp update happen under one lock, so
//! concurrent submissions of one user cannot both pass.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

use crate::config::GatePolicy;
use crate::types::{GateError, SubmissionRecord};

#[derive(Debug, Default)]
pub struct SubmissionGate {
    policy: GatePolicy,
    last_submission: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl SubmissionGate {
    pub fn new(policy: GatePolicy) -> Self {
        Self {
            policy,
            last_submission: Mutex::new(HashMap::new()),
        }
    }

    pub fn policy(&self) -> &GatePolicy {
        &self.policy
    }

    /// Stateless bounds checks
    pub fn validate(&self, record: &SubmissionRecord) -> Result<(), GateError> {
        if record.reps == 0 || record.reps > self.policy.max_reps {
            return Err(GateError::RepsOutOfRange {
                reps: record.reps,
                max: self.policy.max_reps,
            });
        }
        if record.average_form_accuracy > 100 {
            return Err(GateError::AccuracyOutOfRange {
                accuracy: record.average_form_accuracy,
            });
        }
        if record.best_streak > record.reps {
            return Err(GateError::StreakOutOfRange {
                best_streak: record.best_streak,
                reps: record.reps,
            });
        }
        Ok(())
    }

    /// Validate, check the cooldown and record `now` on success
    pub fn try_submit(
        &self,
        user: &str,
        record: SubmissionRecord,
        now: DateTime<Utc>,
    ) -> Result<SubmissionRecord, GateError> {
        if let Err(e) = self.validate(&record) {
            warn!(user, code = e.code(), "submission rejected: {}", e);
            return Err(e);
        }

        let mut last = self
            .last_submission
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(remaining_secs) = last
            .get(user)
            .and_then(|&at| remaining(at, self.policy.cooldown_secs, now))
        {
            warn!(user, remaining_secs, "submission during cooldown");
            return Err(GateError::CooldownActive { remaining_secs });
        }

        last.insert(user.to_string(), now);
        info!(user, reps = record.reps, "submission accepted by gate");
        Ok(record)
    }

    /// Seconds until `user` may submit again, None when free
    pub fn cooldown_remaining(&self, user: &str, now: DateTime<Utc>) -> Option<u64> {
        let last = self
            .last_submission
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        last.get(user)
            .and_then(|&at| remaining(at, self.policy.cooldown_secs, now))
    }
}

/// Whole seconds (rounded up) until `last + cooldown`, None once passed
fn remaining(last: DateTime<Utc>, cooldown_secs: i64, now: DateTime<Utc>) -> Option<u64> {
    let Some(deadline) =
        Duration::try_seconds(cooldown_secs).and_then(|d| last.checked_add_signed(d))
    else {
        // Deadline past the representable range: still cooling down
        return (cooldown_secs > 0).then(|| cooldown_secs.unsigned_abs());
    };
    if now >= deadline {
        return None;
    }
    let left = deadline - now;
    let mut secs = left.num_seconds();
    if left > Duration::seconds(secs) {
        secs += 1;
    }
    Some(secs.max(1) as u64)
}
