//! Policy configuration
//!
//! Every section defaults to the constants in the crate root, so an empty
//! JSON object is a valid config file.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    COOLDOWN_SECONDS, DOWN_IDEAL_DEG, DOWN_THRESHOLD_DEG, DURATION_DIVISOR, FORM_PENALTY_PER_DEG,
    FORM_TOLERANCE_DEG, MAX_COOLDOWN_SECONDS, MAX_REPS, REP_POINTS, STREAK_ACCURACY_THRESHOLD,
    STREAK_POINTS, UP_IDEAL_DEG, UP_THRESHOLD_DEG, VISIBILITY_THRESHOLD,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid policy: {0}")]
    Invalid(&'static str),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub thresholds: RepThresholds,
    #[serde(default)]
    pub form: FormPolicy,
    #[serde(default)]
    pub scoring: ScoringPolicy,
    #[serde(default)]
    pub gate: GatePolicy,
}

impl Config {
    /// Load and validate a JSON config file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().display().to_string();
        let content = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path_str.clone(),
            source,
        })?;
        let config: Config = serde_json::from_str(&content).map_err(|source| {
            ConfigError::Parse {
                path: path_str,
                source,
            }
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.thresholds.up_deg >= self.thresholds.down_deg {
            return Err(ConfigError::Invalid("up threshold must be below down threshold"));
        }
        if !(0.0..=1.0).contains(&self.thresholds.visibility) {
            return Err(ConfigError::Invalid("visibility threshold must be in [0, 1]"));
        }
        if self.form.tolerance_deg < 0.0 || self.form.penalty_per_deg < 0.0 {
            return Err(ConfigError::Invalid("form tolerance and penalty must be non-negative"));
        }
        if self.scoring.streak_accuracy_threshold > 100 {
            return Err(ConfigError::Invalid("streak threshold must be at most 100"));
        }
        if self.scoring.duration_divisor == 0 {
            return Err(ConfigError::Invalid("duration divisor must be positive"));
        }
        if !(0..=MAX_COOLDOWN_SECONDS).contains(&self.gate.cooldown_secs) {
            return Err(ConfigError::Invalid("cooldown must be between 0 and one year"));
        }
        Ok(())
    }
}

/// Hysteresis pair and landmark confidence for the repetition engine
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepThresholds {
    pub up_deg: f64,
    pub down_deg: f64,
    pub visibility: f64,
}

impl Default for RepThresholds {
    fn default() -> Self {
        Self {
            up_deg: UP_THRESHOLD_DEG,
            down_deg: DOWN_THRESHOLD_DEG,
            visibility: VISIBILITY_THRESHOLD,
        }
    }
}

/// Triangular form penalty around each phase's ideal angle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormPolicy {
    pub up_ideal_deg: f64,
    pub down_ideal_deg: f64,
    pub tolerance_deg: f64,
    pub penalty_per_deg: f64,
}

impl Default for FormPolicy {
    fn default() -> Self {
        Self {
            up_ideal_deg: UP_IDEAL_DEG,
            down_ideal_deg: DOWN_IDEAL_DEG,
            tolerance_deg: FORM_TOLERANCE_DEG,
            penalty_per_deg: FORM_PENALTY_PER_DEG,
        }
    }
}

/// Integer weights of the composite score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringPolicy {
    pub rep_points: u64,
    pub streak_points: u64,
    pub duration_divisor: u64,
    pub streak_accuracy_threshold: u8,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            rep_points: REP_POINTS,
            streak_points: STREAK_POINTS,
            duration_divisor: DURATION_DIVISOR,
            streak_accuracy_threshold: STREAK_ACCURACY_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatePolicy {
    pub max_reps: u32,
    pub cooldown_secs: i64,
}

impl Default for GatePolicy {
    fn default() -> Self {
        Self {
            max_reps: MAX_REPS,
            cooldown_secs: COOLDOWN_SECONDS,
        }
    }
}
