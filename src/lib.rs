//! abscore: repetition tracking and composite scoring for ab workouts
//!
//! Pipeline: JointFrame → GeometryExtractor → RepetitionEngine →
//! SessionAggregator → CompositeScorer → SubmissionGate → ledger

pub mod config;
pub mod core;
pub mod types;

// =============================================================================
// GEOMETRY
// =============================================================================

/// Minimum landmark visibility accepted by the geometry extractor
pub const VISIBILITY_THRESHOLD: f64 = 0.5;

/// Landmark indices in the 33-point body layout
pub const LEFT_SHOULDER: usize = 11;
pub const RIGHT_SHOULDER: usize = 12;
pub const LEFT_HIP: usize = 23;
pub const RIGHT_HIP: usize = 24;
pub const LEFT_KNEE: usize = 25;
pub const RIGHT_KNEE: usize = 26;

// =============================================================================
// REPETITION THRESHOLDS - hysteresis pair
// =============================================================================

/// Down → Up when the hinge angle drops below this (degrees)
pub const UP_THRESHOLD_DEG: f64 = 55.0;

/// Up → Down when the hinge angle rises above this (degrees)
pub const DOWN_THRESHOLD_DEG: f64 = 105.0;

// =============================================================================
// FORM ACCURACY
// =============================================================================

/// Ideal hinge angle at the top of the crunch
pub const UP_IDEAL_DEG: f64 = 55.0;

/// Ideal hinge angle in the starting position
pub const DOWN_IDEAL_DEG: f64 = 105.0;

/// Half-width of the band around each ideal that scores a full 100
pub const FORM_TOLERANCE_DEG: f64 = 10.0;

/// Accuracy points lost per degree of deviation outside the band
pub const FORM_PENALTY_PER_DEG: f64 = 2.0;

/// Minimum accuracy for a repetition to extend the streak
pub const STREAK_ACCURACY_THRESHOLD: u8 = 80;

// =============================================================================
// COMPOSITE SCORE
// =============================================================================

/// 10000 bps = 100%
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Points per repetition
pub const REP_POINTS: u64 = 2;

/// Points per repetition in the best streak
pub const STREAK_POINTS: u64 = 5;

/// One point per this many seconds of session time
pub const DURATION_DIVISOR: u64 = 10;

/// Bonus refresh cadence of the seasonal/regional service (6 hours)
pub const BONUS_REFRESH_INTERVAL_SECS: i64 = 6 * 60 * 60;

/// Typical lifetime of a daily challenge (24 hours)
pub const CHALLENGE_LIFETIME_SECS: i64 = 24 * 60 * 60;

// =============================================================================
// SUBMISSION GATE
// =============================================================================

/// Highest repetition count a single session may submit
pub const MAX_REPS: u32 = 500;

/// Minimum spacing between two accepted submissions of one user
pub const COOLDOWN_SECONDS: i64 = 60;

/// Longest cooldown a config may set (one year)
pub const MAX_COOLDOWN_SECONDS: i64 = 365 * 24 * 60 * 60;

// =============================================================================
// VERSION
// =============================================================================

pub const VERSION: &str = "1.0.0";
