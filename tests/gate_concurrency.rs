//! Concurrent submissions against one gate

use std::sync::{Arc, Barrier};
use std::thread;

use abscore::core::SubmissionGate;
use abscore::types::{GateError, SubmissionRecord};
use chrono::{DateTime, TimeZone, Utc};

fn t0() -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000, 0).unwrap()
}

fn record() -> SubmissionRecord {
    SubmissionRecord {
        reps: 25,
        average_form_accuracy: 88,
        best_streak: 9,
        duration_seconds: 140,
        region: "eu".to_string(),
    }
}

#[test]
fn test_one_success_per_window_for_same_user() {
    let gate = Arc::new(SubmissionGate::default());
    let barrier = Arc::new(Barrier::new(16));

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let gate = Arc::clone(&gate);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                gate.try_submit("alice", record(), t0())
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let accepted = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(accepted, 1);
    for err in results.into_iter().filter_map(Result::err) {
        assert_eq!(err, GateError::CooldownActive { remaining_secs: 60 });
    }
}

#[test]
fn test_distinct_users_do_not_contend() {
    let gate = Arc::new(SubmissionGate::default());

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let gate = Arc::clone(&gate);
            thread::spawn(move || gate.try_submit(&format!("user{}", i), record(), t0()))
        })
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap().is_ok());
    }
}
