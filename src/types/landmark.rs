//! Joint estimates delivered by the pose collaborator

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of samples in a full body-landmark frame
pub const LANDMARK_COUNT: usize = 33;

/// One joint estimate
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Landmark {
    /// Normalized image X (0.0-1.0)
    pub x: f64,
    /// Normalized image Y (0.0-1.0), grows downward
    pub y: f64,
    /// Depth relative to the hips
    #[serde(default)]
    pub z: f64,
    /// Detection confidence (0.0-1.0)
    pub visibility: f64,
}

impl Landmark {
    pub fn new(x: f64, y: f64, z: f64, visibility: f64) -> Self {
        Self { x, y, z, visibility }
    }

    /// NaN visibility never passes
    pub fn is_visible(&self, threshold: f64) -> bool {
        self.visibility >= threshold
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Midpoint of two samples
    pub fn midpoint(&self, other: &Landmark) -> Landmark {
        Landmark {
            x: (self.x + other.x) / 2.0,
            y: (self.y + other.y) / 2.0,
            z: (self.z + other.z) / 2.0,
            visibility: self.visibility.min(other.visibility),
        }
    }
}

/// All landmarks of one captured frame
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct JointFrame {
    pub landmarks: Vec<Landmark>,
}

impl JointFrame {
    pub fn new(landmarks: Vec<Landmark>) -> Self {
        Self { landmarks }
    }

    pub fn get(&self, index: usize) -> Option<&Landmark> {
        self.landmarks.get(index)
    }

    pub fn len(&self) -> usize {
        self.landmarks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.landmarks.is_empty()
    }
}

/// Torso hinge angle at the hip, degrees in [0, 180]
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HingeAngle(f64);

impl HingeAngle {
    /// Clamp into [0, 180]. NaN stays NaN and is rejected by the session.
    pub fn new(degrees: f64) -> Self {
        Self(degrees.clamp(0.0, 180.0))
    }

    /// None for NaN
    pub fn try_new(degrees: f64) -> Option<Self> {
        if degrees.is_nan() {
            None
        } else {
            Some(Self::new(degrees))
        }
    }

    pub fn is_nan(&self) -> bool {
        self.0.is_nan()
    }

    pub fn degrees(&self) -> f64 {
        self.0
    }
}

impl std::fmt::Display for HingeAngle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.1}°", self.0)
    }
}

/// Why a frame produced no angle. The frame is skipped, state stays as it was.
#[derive(Debug, Clone, Copy, PartialEq, Error, Serialize, Deserialize)]
pub enum GeometryError {
    #[error("landmark {index} visibility {visibility:.2} below threshold")]
    InsufficientConfidence { index: usize, visibility: f64 },
    #[error("frame has no landmark {index}")]
    MissingLandmark { index: usize },
    #[error("landmark {index} has a non-finite coordinate")]
    NonFiniteCoordinate { index: usize },
    #[error("hinge angle is not a number")]
    NonFiniteAngle,
}

impl GeometryError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::InsufficientConfidence { .. } => "G001_INSUFFICIENT_CONFIDENCE",
            Self::MissingLandmark { .. } => "G002_MISSING_LANDMARK",
            Self::NonFiniteCoordinate { .. } => "G003_NON_FINITE_COORDINATE",
            Self::NonFiniteAngle => "G004_NON_FINITE_ANGLE",
        }
    }
}
