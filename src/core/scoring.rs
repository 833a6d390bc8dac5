//! Composite score calculator
//!
//! Integer basis-point arithmetic only, every division truncates. The same
//! function backs the client estimate and the ledger recomputation; the
//! client value is advisory.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::config::ScoringPolicy;
use crate::types::{
    BonusContext, ChallengeKind, ScoreBreakdown, ScoreInputs, ScorePayload, ScoreReceipt,
};
use crate::BPS_DENOMINATOR;

/// Receipt payload version
pub const RECEIPT_VERSION: u16 = 1;

/// Pure composite scorer
#[derive(Debug, Clone, Copy, Default)]
pub struct CompositeScorer {
    policy: ScoringPolicy,
}

impl CompositeScorer {
    pub fn new(policy: ScoringPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &ScoringPolicy {
        &self.policy
    }

    /// Volume + form + streak + duration points
    pub fn base_score<S: ScoreInputs + ?Sized>(&self, summary: &S) -> u64 {
        let reps = summary.reps() as u64;
        let accuracy = summary.average_form_accuracy() as u64;
        let divisor = self.policy.duration_divisor.max(1);

        self.policy
            .rep_points
            .saturating_mul(reps)
            .saturating_add(accuracy.saturating_mul(reps) / 100)
            .saturating_add(
                self.policy
                    .streak_points
                    .saturating_mul(summary.best_streak() as u64),
            )
            .saturating_add(summary.duration_secs() / divisor)
    }

    /// Full breakdown. `now` decides challenge expiry.
    pub fn score<S: ScoreInputs + ?Sized>(
        &self,
        summary: &S,
        ctx: &BonusContext,
        now: DateTime<Utc>,
    ) -> ScoreBreakdown {
        let base = self.base_score(summary);
        let weather_multiplier_bps = ctx.weather_multiplier_bps();
        let after_bonus = apply_bps(base, weather_multiplier_bps);

        let mut breakdown = ScoreBreakdown {
            base,
            weather_multiplier_bps,
            after_bonus,
            challenge_met: false,
            challenge_applied: false,
            final_score: after_bonus,
        };

        if let Some(challenge) = ctx.challenge.as_ref().filter(|c| c.is_active(now)) {
            breakdown.challenge_met = challenge_metric(challenge.kind, summary) >= challenge.target;
            if breakdown.challenge_met && !ctx.challenge_claimed {
                breakdown.challenge_applied = true;
                breakdown.final_score = apply_bps(after_bonus, challenge.multiplier_bps as u64);
            }
        }

        breakdown
    }

    /// Score plus SHA-256 receipt over inputs and result
    pub fn score_with_receipt<S: ScoreInputs + ?Sized>(
        &self,
        summary: &S,
        ctx: &BonusContext,
        now: DateTime<Utc>,
    ) -> (ScoreBreakdown, ScoreReceipt) {
        let breakdown = self.score(summary, ctx, now);
        let receipt = receipt(summary, ctx, &breakdown);
        (breakdown, receipt)
    }
}

/// Composite score with the default policy
pub fn score<S: ScoreInputs + ?Sized>(summary: &S, ctx: &BonusContext, now: DateTime<Utc>) -> u64 {
    CompositeScorer::default().score(summary, ctx, now).final_score
}

/// value × bps / 10000, truncating
pub fn apply_bps(value: u64, bps: u64) -> u64 {
    (value as u128 * bps as u128 / BPS_DENOMINATOR as u128).min(u64::MAX as u128) as u64
}

/// Session metric a challenge kind measures
pub fn challenge_metric<S: ScoreInputs + ?Sized>(kind: ChallengeKind, summary: &S) -> u64 {
    let reps = summary.reps() as u64;
    match kind {
        ChallengeKind::Reps => reps,
        ChallengeKind::Duration => summary.duration_secs(),
        ChallengeKind::Streak => summary.best_streak() as u64,
        ChallengeKind::Accuracy => summary.average_form_accuracy() as u64,
        ChallengeKind::Combo => summary.average_form_accuracy() as u64 * reps / 100,
    }
}

/// Build the receipt for an already computed breakdown
pub fn receipt<S: ScoreInputs + ?Sized>(
    summary: &S,
    ctx: &BonusContext,
    breakdown: &ScoreBreakdown,
) -> ScoreReceipt {
    let challenge = ctx.challenge.as_ref();
    let payload = ScorePayload {
        version: RECEIPT_VERSION,
        reps: summary.reps(),
        average_form_accuracy: summary.average_form_accuracy(),
        best_streak: summary.best_streak(),
        duration_secs: summary.duration_secs(),
        seasonal_bonus_bps: ctx.seasonal_bonus_bps,
        regional_bonus_bps: ctx.regional_bonus_bps,
        challenge_present: challenge.is_some(),
        challenge_id: challenge.map(|c| c.id).unwrap_or(0),
        challenge_kind: challenge.map(|c| c.kind.tag()).unwrap_or(0),
        challenge_target: challenge.map(|c| c.target).unwrap_or(0),
        challenge_multiplier_bps: challenge.map(|c| c.multiplier_bps).unwrap_or(0),
        challenge_expiry_unix: challenge.map(|c| c.expires_at.timestamp()).unwrap_or(0),
        challenge_applied: breakdown.challenge_applied,
        final_score: breakdown.final_score,
    };

    ScoreReceipt {
        score: breakdown.final_score,
        digest: sha256(&payload.to_bytes()),
    }
}

/// Recompute and compare against a receipt produced elsewhere
pub fn verify_receipt<S: ScoreInputs + ?Sized>(
    scorer: &CompositeScorer,
    summary: &S,
    ctx: &BonusContext,
    now: DateTime<Utc>,
    claimed: &ScoreReceipt,
) -> bool {
    let (_, recomputed) = scorer.score_with_receipt(summary, ctx, now);
    recomputed == *claimed
}

/// One-shot challenge claims per (user, challenge id)
#[derive(Debug, Default, Clone)]
pub struct ChallengeClaims {
    claimed: HashSet<(String, u64)>,
}

impl ChallengeClaims {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a claim. False if it was already recorded.
    pub fn claim(&mut self, user: &str, challenge_id: u64) -> bool {
        self.claimed.insert((user.to_string(), challenge_id))
    }

    pub fn is_claimed(&self, user: &str, challenge_id: u64) -> bool {
        self.claimed.contains(&(user.to_string(), challenge_id))
    }
}

/// SHA-256 helper
fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

// =============================================================================
// TESTS
// =============================================================================
