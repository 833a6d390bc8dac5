//! Core modules for abscore

pub mod aggregator;
pub mod api;
pub mod gate;
pub mod geometry;
pub mod ledger;
pub mod rep_engine;
pub mod scoring;
pub mod session;

pub use aggregator::{average_accuracy, AggregateOutcome, SessionAggregator};
pub use api::{create_router, run_server, AppState};
pub use gate::SubmissionGate;
pub use geometry::{hinge_angle, GeometryExtractor};
pub use ledger::{InMemoryLedger, Ledger, LedgerError};
pub use rep_engine::{form_accuracy, transition, RepetitionEngine};
pub use scoring::{apply_bps, challenge_metric, score, verify_receipt, ChallengeClaims, CompositeScorer};
pub use session::ExerciseSession;
