//! Session aggregator: the only component holding state across frames

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::types::{RepEvent, SessionStats, SessionSummary};
use crate::STREAK_ACCURACY_THRESHOLD;

/// Outcome of feeding one event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateOutcome {
    /// No repetition in this frame
    Idle,
    StreakExtended,
    StreakBroken,
    /// Session already finalized, event dropped
    Frozen,
}

/// Rounded mean in integer arithmetic (half rounds up), 100 when empty
pub fn average_accuracy(history: &[u8]) -> u8 {
    if history.is_empty() {
        return 100;
    }
    let n = history.len() as u64;
    let sum: u64 = history.iter().map(|&a| a as u64).sum();
    ((2 * sum + n) / (2 * n)).min(100) as u8
}

#[derive(Debug, Clone)]
pub struct SessionAggregator {
    stats: SessionStats,
    streak_threshold: u8,
    frozen: Option<SessionSummary>,
}

impl SessionAggregator {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self::with_threshold(start, STREAK_ACCURACY_THRESHOLD)
    }

    pub fn with_threshold(start: DateTime<Utc>, streak_threshold: u8) -> Self {
        Self {
            stats: SessionStats::new(start),
            streak_threshold,
            frozen: None,
        }
    }

    /// Apply one frame's event
    pub fn on_frame_processed(&mut self, event: RepEvent) -> AggregateOutcome {
        if self.frozen.is_some() {
            if event.repetition_completed {
                warn!("repetition after finalize ignored");
            }
            return AggregateOutcome::Frozen;
        }
        if !event.repetition_completed {
            return AggregateOutcome::Idle;
        }

        let stats = &mut self.stats;
        stats.total_reps = stats.total_reps.saturating_add(1);
        stats.accuracy_history.push(event.accuracy.min(100));

        if event.accuracy >= self.streak_threshold {
            stats.current_streak = stats.current_streak.saturating_add(1);
            stats.best_streak = stats.best_streak.max(stats.current_streak);
            AggregateOutcome::StreakExtended
        } else {
            stats.current_streak = 0;
            AggregateOutcome::StreakBroken
        }
    }

    /// Freeze the session. Later calls return the first snapshot unchanged.
    pub fn finalize(&mut self, now: DateTime<Utc>) -> SessionSummary {
        if let Some(summary) = &self.frozen {
            return summary.clone();
        }

        let elapsed = (now - self.stats.start_timestamp).num_seconds().max(0) as u64;
        self.stats.elapsed_seconds = elapsed;

        let summary = SessionSummary {
            stats: self.stats.clone(),
            average_form_accuracy: average_accuracy(&self.stats.accuracy_history),
            stopped_at: now,
        };
        info!(
            reps = summary.reps(),
            accuracy = summary.average_form_accuracy,
            best_streak = summary.best_streak(),
            duration_secs = elapsed,
            "session finalized"
        );
        self.frozen = Some(summary.clone());
        summary
    }

    /// Running statistics; `elapsed_seconds` is only set by `finalize`
    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Running average without freezing
    pub fn average_form_accuracy(&self) -> u8 {
        average_accuracy(&self.stats.accuracy_history)
    }

    pub fn is_finalized(&self) -> bool {
        self.frozen.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;

    fn t0() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    fn rep(accuracy: u8) -> RepEvent {
        RepEvent {
            repetition_completed: true,
            accuracy,
        }
    }

    #[test]
    fn test_idle_frames_do_not_count() {
        let mut agg = SessionAggregator::new(t0());
        let outcome = agg.on_frame_processed(RepEvent {
            repetition_completed: false,
            accuracy: 100,
        });
        assert_eq!(outcome, AggregateOutcome::Idle);
        assert_eq!(agg.stats().total_reps, 0);
        assert!(agg.stats().accuracy_history.is_empty());
    }

    #[test]
    fn test_streak_builds_and_breaks() {
        let mut agg = SessionAggregator::new(t0());
        assert_eq!(agg.on_frame_processed(rep(90)), AggregateOutcome::StreakExtended);
        assert_eq!(agg.on_frame_processed(rep(80)), AggregateOutcome::StreakExtended);
        assert_eq!(agg.on_frame_processed(rep(79)), AggregateOutcome::StreakBroken);
        agg.on_frame_processed(rep(100));

        let stats = agg.stats();
        assert_eq!(stats.total_reps, 4);
        assert_eq!(stats.accuracy_history, vec![90, 80, 79, 100]);
        assert_eq!(stats.current_streak, 1);
        assert_eq!(stats.best_streak, 2);
    }

    #[test]
    fn test_average_rounds_half_up() {
        assert_eq!(average_accuracy(&[]), 100);
        assert_eq!(average_accuracy(&[90, 91]), 91);
        assert_eq!(average_accuracy(&[90, 90, 91]), 90);
        assert_eq!(average_accuracy(&[0, 100]), 50);
    }

    #[test]
    fn test_finalize_computes_elapsed_and_average() {
        let mut agg = SessionAggregator::new(t0());
        agg.on_frame_processed(rep(100));
        agg.on_frame_processed(rep(90));
        let summary = agg.finalize(t0() + Duration::seconds(120));
        assert_eq!(summary.duration_secs(), 120);
        assert_eq!(summary.average_form_accuracy, 95);
        assert_eq!(summary.reps(), 2);
    }

    #[test]
    fn test_finalize_is_idempotent() {
        let mut agg = SessionAggregator::new(t0());
        agg.on_frame_processed(rep(100));
        let first = agg.finalize(t0() + Duration::seconds(30));
        let second = agg.finalize(t0() + Duration::seconds(30));
        let later = agg.finalize(t0() + Duration::seconds(99));
        assert_eq!(first, second);
        assert_eq!(first, later);
    }

    #[test]
    fn test_events_after_finalize_ignored() {
        let mut agg = SessionAggregator::new(t0());
        agg.on_frame_processed(rep(100));
        let summary = agg.finalize(t0() + Duration::seconds(10));
        assert_eq!(agg.on_frame_processed(rep(100)), AggregateOutcome::Frozen);
        assert_eq!(agg.stats().total_reps, 1);
        assert_eq!(agg.finalize(t0() + Duration::seconds(10)), summary);
    }

    #[test]
    fn test_clock_skew_clamps_to_zero() {
        let mut agg = SessionAggregator::new(t0());
        let summary = agg.finalize(t0() - Duration::seconds(5));
        assert_eq!(summary.duration_secs(), 0);
    }
}
