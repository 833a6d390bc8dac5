//! Geometry extractor: joint frame → torso hinge angle
//!
//! Shoulders, hips and knees are averaged left/right; the angle is taken at
//! the hip midpoint in the image plane.

use tracing::debug;

use crate::types::{GeometryError, HingeAngle, JointFrame, Landmark};
use crate::{
    LEFT_HIP, LEFT_KNEE, LEFT_SHOULDER, RIGHT_HIP, RIGHT_KNEE, RIGHT_SHOULDER,
    VISIBILITY_THRESHOLD,
};

/// Landmarks the extractor requires, in validation order
pub const REQUIRED_LANDMARKS: [usize; 6] = [
    LEFT_SHOULDER,
    RIGHT_SHOULDER,
    LEFT_HIP,
    RIGHT_HIP,
    LEFT_KNEE,
    RIGHT_KNEE,
];

#[derive(Debug, Clone, Copy)]
pub struct GeometryExtractor {
    visibility_threshold: f64,
}

impl Default for GeometryExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl GeometryExtractor {
    pub fn new() -> Self {
        Self {
            visibility_threshold: VISIBILITY_THRESHOLD,
        }
    }

    pub fn with_threshold(visibility_threshold: f64) -> Self {
        Self {
            visibility_threshold,
        }
    }

    /// Extract the hinge angle, rejecting frames with missing or low-confidence joints
    pub fn extract(&self, frame: &JointFrame) -> Result<HingeAngle, GeometryError> {
        for &index in REQUIRED_LANDMARKS.iter() {
            let lm = frame
                .get(index)
                .ok_or(GeometryError::MissingLandmark { index })?;
            if !lm.is_visible(self.visibility_threshold) {
                return Err(GeometryError::InsufficientConfidence {
                    index,
                    visibility: lm.visibility,
                });
            }
            if !lm.is_finite() {
                return Err(GeometryError::NonFiniteCoordinate { index });
            }
        }

        // Indices validated above
        let pick = |i: usize| frame.landmarks[i];
        let shoulder = pick(LEFT_SHOULDER).midpoint(&pick(RIGHT_SHOULDER));
        let hip = pick(LEFT_HIP).midpoint(&pick(RIGHT_HIP));
        let knee = pick(LEFT_KNEE).midpoint(&pick(RIGHT_KNEE));

        let angle = hinge_angle(&shoulder, &hip, &knee);
        debug!(angle = angle.degrees(), "hinge angle extracted");
        Ok(angle)
    }
}

/// Angle at `vertex` between `a` and `c`, folded into [0, 180]
pub fn hinge_angle(a: &Landmark, vertex: &Landmark, c: &Landmark) -> HingeAngle {
    let radians =
        (c.y - vertex.y).atan2(c.x - vertex.x) - (a.y - vertex.y).atan2(a.x - vertex.x);
    let mut degrees = radians.to_degrees().abs();
    if degrees > 180.0 {
        degrees = 360.0 - degrees;
    }
    HingeAngle::new(degrees)
}
