//! Property tests for the engine, aggregator and scorer invariants

use abscore::config::RepThresholds;
use abscore::core::{
    average_accuracy, score, transition, CompositeScorer, RepetitionEngine, SessionAggregator,
};
use abscore::types::{
    BonusContext, ChallengeKind, ChallengeSpec, HingeAngle, Phase, RepEvent, SessionSummary,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;

fn t0() -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000, 0).unwrap()
}

fn summary_from(events: &[(bool, u8)], duration: i64) -> SessionSummary {
    let mut agg = SessionAggregator::new(t0());
    for &(repetition_completed, accuracy) in events {
        agg.on_frame_processed(RepEvent {
            repetition_completed,
            accuracy,
        });
    }
    agg.finalize(t0() + Duration::seconds(duration))
}

fn challenge_kind() -> impl Strategy<Value = ChallengeKind> {
    prop_oneof![
        Just(ChallengeKind::Reps),
        Just(ChallengeKind::Duration),
        Just(ChallengeKind::Streak),
        Just(ChallengeKind::Accuracy),
        Just(ChallengeKind::Combo),
    ]
}

#[test]
fn test_repetition_count_is_monotonic() {
    proptest!(|(angles in prop::collection::vec(0.0f64..180.0, 0..200))| {
        let mut engine = RepetitionEngine::new();
        let mut previous = engine.repetition_count();
        let mut phase = engine.phase();
        for deg in angles {
            let out = engine.update(HingeAngle::new(deg));
            let count = out.state.repetition_count;
            prop_assert!(count >= previous);
            // Counts exactly on Down → Up
            let expected = phase == Phase::Down && out.state.phase == Phase::Up;
            prop_assert_eq!(out.repetition_completed, expected);
            prop_assert_eq!(count - previous, expected as u32);
            prop_assert!(out.state.last_form_accuracy <= 100);
            previous = count;
            phase = out.state.phase;
        }
    });
}

#[test]
fn test_no_transition_inside_hysteresis_band() {
    proptest!(|(deg in 55.0f64..=105.0, up in any::<bool>())| {
        let phase = if up { Phase::Up } else { Phase::Down };
        let (next, completed) = transition(phase, HingeAngle::new(deg), &RepThresholds::default());
        prop_assert_eq!(next, phase);
        prop_assert!(!completed);
    });
}

#[test]
fn test_aggregator_invariants_hold() {
    proptest!(|(events in prop::collection::vec((any::<bool>(), 0u8..=100), 0..300))| {
        let mut agg = SessionAggregator::new(t0());
        for (repetition_completed, accuracy) in events {
            agg.on_frame_processed(RepEvent { repetition_completed, accuracy });
            let stats = agg.stats();
            prop_assert!(stats.best_streak >= stats.current_streak);
            prop_assert_eq!(stats.accuracy_history.len(), stats.total_reps as usize);
            prop_assert!(stats.best_streak <= stats.total_reps);
        }
    });
}

#[test]
fn test_average_stays_in_range() {
    proptest!(|(history in prop::collection::vec(0u8..=100, 0..500))| {
        let avg = average_accuracy(&history);
        prop_assert!(avg <= 100);
        if let (Some(&lo), Some(&hi)) = (history.iter().min(), history.iter().max()) {
            prop_assert!(avg >= lo && avg <= hi);
        }
    });
}

#[test]
fn test_finalize_is_idempotent() {
    proptest!(|(
        events in prop::collection::vec((any::<bool>(), 0u8..=100), 0..100),
        first in -100i64..10_000,
        second in -100i64..10_000
    )| {
        let mut agg = SessionAggregator::new(t0());
        for (repetition_completed, accuracy) in events {
            agg.on_frame_processed(RepEvent { repetition_completed, accuracy });
        }
        let a = agg.finalize(t0() + Duration::seconds(first));
        let b = agg.finalize(t0() + Duration::seconds(second));
        prop_assert_eq!(a, b);
    });
}

#[test]
fn test_score_is_deterministic_and_bonus_monotonic() {
    proptest!(|(
        events in prop::collection::vec((any::<bool>(), 0u8..=100), 0..200),
        duration in 0i64..7_200,
        seasonal in 0u32..20_000,
        regional in 0u32..20_000
    )| {
        let summary = summary_from(&events, duration);
        let plain = score(&summary, &BonusContext::default(), t0());
        let ctx = BonusContext::new(seasonal, regional);
        let boosted = score(&summary, &ctx, t0());

        prop_assert_eq!(boosted, score(&summary, &ctx, t0()));
        prop_assert_eq!(plain, CompositeScorer::default().base_score(&summary));
        prop_assert!(boosted >= plain);
    });
}

#[test]
fn test_claimed_challenge_never_multiplies() {
    proptest!(|(
        events in prop::collection::vec((any::<bool>(), 0u8..=100), 0..200),
        kind in challenge_kind(),
        target in 0u64..100,
        multiplier in 10_000u32..40_000
    )| {
        let summary = summary_from(&events, 300);
        let spec = ChallengeSpec {
            id: 1,
            kind,
            target,
            multiplier_bps: multiplier,
            expires_at: t0() + Duration::hours(24),
        };
        let scorer = CompositeScorer::default();
        let claimed = scorer.score(&summary, &BonusContext::default().with_challenge(spec.clone(), true), t0());
        let open = scorer.score(&summary, &BonusContext::default().with_challenge(spec, false), t0());

        prop_assert!(!claimed.challenge_applied);
        prop_assert_eq!(claimed.final_score, claimed.after_bonus);
        prop_assert_eq!(open.challenge_applied, open.challenge_met);
        prop_assert!(open.final_score >= claimed.final_score);
    });
}
