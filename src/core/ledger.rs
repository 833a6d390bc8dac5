//! Reference ledger
//!
//! Stands in for the authoritative store: re-validates every record, enforces
//! its own cooldown, recomputes the composite score against its own bonus
//! context and records one-shot challenge claims. Keeps one lifetime row per
//! user plus an append-only list of accepted sessions. Nothing is persisted.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::info;

use crate::config::Config;
use crate::core::gate::SubmissionGate;
use crate::core::scoring::{ChallengeClaims, CompositeScorer};
use crate::types::{BonusContext, GateError, LedgerEntry, LifetimeStats, SubmissionRecord};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("user id must not be empty")]
    InvalidUser,
    #[error(transparent)]
    Rejected(#[from] GateError),
}

impl LedgerError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidUser => "L001_INVALID_USER",
            Self::Rejected(e) => e.code(),
        }
    }
}

/// Authoritative side of a submission
pub trait Ledger {
    /// Accept a record, recompute its score and update the user's row
    fn submit(
        &mut self,
        user: &str,
        record: SubmissionRecord,
        now: DateTime<Utc>,
    ) -> Result<LedgerEntry, LedgerError>;

    fn lifetime(&self, user: &str) -> Option<LifetimeStats>;

    /// Accepted sessions of `user`, oldest first
    fn sessions(&self, user: &str) -> Vec<LedgerEntry>;

    /// Rows ordered by best score, at most `limit`
    fn leaderboard(&self, limit: usize) -> Vec<LifetimeStats>;
}

#[derive(Debug, Default)]
struct UserRow {
    stats: LifetimeStats,
    /// Σ accuracy × reps, for the rep-weighted average
    weighted_accuracy: u64,
}

impl UserRow {
    fn apply(&mut self, record: &SubmissionRecord, score: u64) {
        let reps = record.reps as u64;
        self.weighted_accuracy += record.average_form_accuracy as u64 * reps;

        let stats = &mut self.stats;
        stats.total_reps += reps;
        stats.average_form_accuracy = if stats.total_reps == 0 {
            100
        } else {
            let n = stats.total_reps;
            ((2 * self.weighted_accuracy + n) / (2 * n)).min(100) as u8
        };
        stats.best_streak = stats.best_streak.max(record.best_streak);
        stats.sessions_completed = stats.sessions_completed.saturating_add(1);
        stats.best_score = stats.best_score.max(score);
    }
}

#[derive(Debug)]
pub struct InMemoryLedger {
    gate: SubmissionGate,
    scorer: CompositeScorer,
    bonus: BonusContext,
    claims: ChallengeClaims,
    rows: HashMap<String, UserRow>,
    entries: Vec<LedgerEntry>,
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new(BonusContext::default())
    }
}

impl InMemoryLedger {
    pub fn new(bonus: BonusContext) -> Self {
        Self::with_config(&Config::default(), bonus)
    }

    pub fn with_config(config: &Config, bonus: BonusContext) -> Self {
        Self {
            gate: SubmissionGate::new(config.gate),
            scorer: CompositeScorer::new(config.scoring),
            bonus,
            claims: ChallengeClaims::new(),
            rows: HashMap::new(),
            entries: Vec::new(),
        }
    }

    pub fn bonus_context(&self) -> &BonusContext {
        &self.bonus
    }

    /// Replace the bonus context; claims already recorded stay recorded
    pub fn set_bonus_context(&mut self, bonus: BonusContext) {
        self.bonus = bonus;
    }

    /// Bonus context as seen by `user`, with their claim status filled in
    pub fn context_for(&self, user: &str) -> BonusContext {
        let mut ctx = self.bonus.clone();
        ctx.challenge_claimed = ctx
            .challenge
            .as_ref()
            .map(|c| self.claims.is_claimed(user, c.id))
            .unwrap_or(false);
        ctx
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }
}

impl Ledger for InMemoryLedger {
    fn submit(
        &mut self,
        user: &str,
        record: SubmissionRecord,
        now: DateTime<Utc>,
    ) -> Result<LedgerEntry, LedgerError> {
        if user.trim().is_empty() {
            return Err(LedgerError::InvalidUser);
        }
        let record = self.gate.try_submit(user, record, now)?;

        let ctx = self.context_for(user);
        let (breakdown, receipt) = self.scorer.score_with_receipt(&record, &ctx, now);
        if breakdown.challenge_applied {
            if let Some(challenge) = &ctx.challenge {
                self.claims.claim(user, challenge.id);
            }
        }

        self.rows
            .entry(user.to_string())
            .or_insert_with(|| UserRow {
                stats: LifetimeStats {
                    user: user.to_string(),
                    ..LifetimeStats::default()
                },
                weighted_accuracy: 0,
            })
            .apply(&record, breakdown.final_score);

        let entry = LedgerEntry {
            user: user.to_string(),
            record,
            breakdown,
            receipt,
            accepted_at: now,
        };
        info!(
            user,
            score = breakdown.final_score,
            challenge = breakdown.challenge_applied,
            receipt = %receipt.to_hex(),
            "ledger accepted session"
        );
        self.entries.push(entry.clone());
        Ok(entry)
    }

    fn lifetime(&self, user: &str) -> Option<LifetimeStats> {
        self.rows.get(user).map(|row| row.stats.clone())
    }

    fn sessions(&self, user: &str) -> Vec<LedgerEntry> {
        self.entries
            .iter()
            .filter(|e| e.user == user)
            .cloned()
            .collect()
    }

    fn leaderboard(&self, limit: usize) -> Vec<LifetimeStats> {
        let mut rows: Vec<LifetimeStats> = self.rows.values().map(|r| r.stats.clone()).collect();
        rows.sort_by(|a, b| {
            b.best_score
                .cmp(&a.best_score)
                .then(b.total_reps.cmp(&a.total_reps))
                .then(a.user.cmp(&b.user))
        });
        rows.truncate(limit);
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChallengeKind, ChallengeSpec};
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;

    fn t0() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    fn record(reps: u32, accuracy: u8, best_streak: u32, duration: u64) -> SubmissionRecord {
        SubmissionRecord {
            reps,
            average_form_accuracy: accuracy,
            best_streak,
            duration_seconds: duration,
            region: "eu".to_string(),
        }
    }

    fn reps_challenge(target: u64) -> ChallengeSpec {
        ChallengeSpec {
            id: 7,
            kind: ChallengeKind::Reps,
            target,
            multiplier_bps: 15000,
            expires_at: t0() + Duration::hours(24),
        }
    }

    #[test]
    fn test_submit_recomputes_score() {
        let mut ledger = InMemoryLedger::new(BonusContext::new(1000, 500));
        let entry = ledger.submit("alice", record(50, 90, 10, 120), t0()).unwrap();
        assert_eq!(entry.breakdown.base, 207);
        assert_eq!(entry.breakdown.final_score, 238);
        assert_eq!(entry.receipt.score, 238);
        assert_eq!(entry.accepted_at, t0());
    }

    #[test]
    fn test_bounds_rechecked() {
        let mut ledger = InMemoryLedger::default();
        let err = ledger.submit("alice", record(0, 90, 0, 10), t0()).unwrap_err();
        assert_eq!(err.code(), "S001_REPS_OUT_OF_RANGE");
        assert_eq!(ledger.entry_count(), 0);
        assert_eq!(ledger.lifetime("alice"), None);
    }

    #[test]
    fn test_empty_user_rejected() {
        let mut ledger = InMemoryLedger::default();
        let err = ledger.submit("  ", record(5, 90, 5, 10), t0()).unwrap_err();
        assert_eq!(err, LedgerError::InvalidUser);
    }

    #[test]
    fn test_cooldown_enforced() {
        let mut ledger = InMemoryLedger::default();
        ledger.submit("alice", record(5, 90, 5, 10), t0()).unwrap();
        let err = ledger
            .submit("alice", record(5, 90, 5, 10), t0() + Duration::seconds(10))
            .unwrap_err();
        assert_eq!(
            err,
            LedgerError::Rejected(GateError::CooldownActive { remaining_secs: 50 })
        );
    }

    #[test]
    fn test_challenge_claimed_once_per_user() {
        let bonus = BonusContext::new(1000, 500).with_challenge(reps_challenge(50), false);
        let mut ledger = InMemoryLedger::new(bonus);

        let first = ledger.submit("alice", record(50, 90, 10, 120), t0()).unwrap();
        assert!(first.breakdown.challenge_applied);
        assert_eq!(first.breakdown.final_score, 357);
        assert!(ledger.context_for("alice").challenge_claimed);
        assert!(!ledger.context_for("bob").challenge_claimed);

        let later = t0() + Duration::seconds(120);
        let second = ledger.submit("alice", record(50, 90, 10, 120), later).unwrap();
        assert!(second.breakdown.challenge_met);
        assert!(!second.breakdown.challenge_applied);
        assert_eq!(second.breakdown.final_score, 238);

        let bob = ledger.submit("bob", record(50, 90, 10, 120), later).unwrap();
        assert!(bob.breakdown.challenge_applied);
    }

    #[test]
    fn test_lifetime_average_is_rep_weighted() {
        let mut ledger = InMemoryLedger::default();
        ledger.submit("alice", record(30, 100, 30, 60), t0()).unwrap();
        ledger
            .submit("alice", record(10, 60, 4, 60), t0() + Duration::seconds(60))
            .unwrap();

        let row = ledger.lifetime("alice").unwrap();
        assert_eq!(row.total_reps, 40);
        // (30 × 100 + 10 × 60) / 40 = 90
        assert_eq!(row.average_form_accuracy, 90);
        assert_eq!(row.best_streak, 30);
        assert_eq!(row.sessions_completed, 2);
        assert_eq!(ledger.sessions("alice").len(), 2);
    }

    #[test]
    fn test_best_score_keeps_maximum() {
        let mut ledger = InMemoryLedger::default();
        let big = ledger.submit("alice", record(50, 90, 10, 120), t0()).unwrap();
        ledger
            .submit("alice", record(5, 90, 5, 10), t0() + Duration::seconds(60))
            .unwrap();
        assert_eq!(
            ledger.lifetime("alice").unwrap().best_score,
            big.breakdown.final_score
        );
    }

    #[test]
    fn test_leaderboard_orders_by_best_score() {
        let mut ledger = InMemoryLedger::default();
        ledger.submit("carol", record(5, 90, 5, 10), t0()).unwrap();
        ledger.submit("alice", record(50, 90, 10, 120), t0()).unwrap();
        ledger.submit("bob", record(20, 80, 8, 60), t0()).unwrap();

        let board: Vec<String> = ledger.leaderboard(10).into_iter().map(|r| r.user).collect();
        assert_eq!(board, vec!["alice", "bob", "carol"]);
        assert_eq!(ledger.leaderboard(1).len(), 1);
    }
}
