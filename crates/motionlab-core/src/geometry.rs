//! Landmark geometry: point type, vector ops, scale normalization and
//! three-point joint angles.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::ops::Sub;

use crate::types::{Frame, Landmark};

/// Below this, a body scale is treated as degenerate and normalization is skipped
pub const MIN_SCALE: f64 = 0.01;

/// Vector lengths below this are treated as zero
const EPSILON: f64 = 1e-10;

/// Immutable 3D landmark with detection visibility in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawLandmarkPoint")]
pub struct LandmarkPoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub visibility: f64,
}

#[derive(Deserialize)]
struct RawLandmarkPoint {
    x: f64,
    y: f64,
    #[serde(default)]
    z: f64,
    #[serde(default = "full_visibility")]
    visibility: f64,
}

fn full_visibility() -> f64 {
    1.0
}

impl From<RawLandmarkPoint> for LandmarkPoint {
    fn from(raw: RawLandmarkPoint) -> Self {
        Self::new(raw.x, raw.y, raw.z, raw.visibility)
    }
}

impl LandmarkPoint {
    pub fn new(x: f64, y: f64, z: f64, visibility: f64) -> Self {
        let visibility = if visibility.is_nan() {
            0.0
        } else {
            visibility.clamp(0.0, 1.0)
        };
        Self { x, y, z, visibility }
    }

    /// Fully visible point
    pub fn at(x: f64, y: f64, z: f64) -> Self {
        Self::new(x, y, z, 1.0)
    }

    pub fn to_vector(&self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.z)
    }

    /// Midpoint; visibility is the weaker of the two
    pub fn midpoint(&self, other: &Self) -> Self {
        Self::new(
            (self.x + other.x) / 2.0,
            (self.y + other.y) / 2.0,
            (self.z + other.z) / 2.0,
            self.visibility.min(other.visibility),
        )
    }

    pub fn distance_to(&self, other: &Self) -> f64 {
        (*self - *other).norm()
    }

    /// Distance in the image plane, ignoring monocular depth
    pub fn planar_distance_to(&self, other: &Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Coordinates divided by `scale`; visibility unchanged
    pub fn scaled(&self, scale: f64) -> Self {
        Self {
            x: self.x / scale,
            y: self.y / scale,
            z: self.z / scale,
            visibility: self.visibility,
        }
    }
}

impl Sub for LandmarkPoint {
    type Output = Vector3<f64>;

    fn sub(self, rhs: Self) -> Vector3<f64> {
        Vector3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

/// Midpoint of two named landmarks, if both are present
pub fn landmark_midpoint(frame: &Frame, a: Landmark, b: Landmark) -> Option<LandmarkPoint> {
    Some(frame.point(a)?.midpoint(&frame.point(b)?))
}

/// Body scale of a frame: `max(spine length, shoulder width)`.
///
/// Spine length runs from the shoulder midpoint to the hip midpoint. Returns
/// 1.0 when either shoulder or hip is missing so callers never divide by an
/// unknown scale.
pub fn scale_factor(frame: &Frame) -> f64 {
    let points = (
        frame.point(Landmark::LeftShoulder),
        frame.point(Landmark::RightShoulder),
        frame.point(Landmark::LeftHip),
        frame.point(Landmark::RightHip),
    );

    match points {
        (Some(ls), Some(rs), Some(lh), Some(rh)) => {
            let shoulder_mid = ls.midpoint(&rs);
            let hip_mid = lh.midpoint(&rh);
            let spine_length = shoulder_mid.distance_to(&hip_mid);
            let shoulder_width = ls.distance_to(&rs);
            spine_length.max(shoulder_width)
        }
        _ => 1.0,
    }
}

/// Divide every coordinate by the frame's body scale.
///
/// Identity when the scale is degenerate (< [`MIN_SCALE`]).
pub fn normalize_landmarks(frame: &Frame) -> Frame {
    let scale = scale_factor(frame);
    if !scale.is_finite() || scale < MIN_SCALE {
        return frame.clone();
    }
    frame.map_points(|p| p.scaled(scale))
}

/// Angle between two vectors in radians; 0 for zero-length input
pub fn angle_between(v1: &Vector3<f64>, v2: &Vector3<f64>) -> f64 {
    let norms = v1.norm() * v2.norm();
    if norms < EPSILON || !norms.is_finite() {
        0.0
    } else {
        (v1.dot(v2) / norms).clamp(-1.0, 1.0).acos()
    }
}

/// Interior angle at vertex `b` formed by `a-b-c`, in radians [0, π]
pub fn calculate_angle(a: &LandmarkPoint, b: &LandmarkPoint, c: &LandmarkPoint) -> f64 {
    angle_between(&(*a - *b), &(*c - *b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    fn upright_torso(scale: f64) -> Frame {
        Frame::new()
            .with(Landmark::LeftShoulder, LandmarkPoint::at(-0.2 * scale, 0.0, 0.0))
            .with(Landmark::RightShoulder, LandmarkPoint::at(0.2 * scale, 0.0, 0.0))
            .with(Landmark::LeftHip, LandmarkPoint::at(-0.1 * scale, 0.5 * scale, 0.0))
            .with(Landmark::RightHip, LandmarkPoint::at(0.1 * scale, 0.5 * scale, 0.0))
    }

    #[test]
    fn test_visibility_is_clamped() {
        assert_eq!(LandmarkPoint::new(0.0, 0.0, 0.0, 1.7).visibility, 1.0);
        assert_eq!(LandmarkPoint::new(0.0, 0.0, 0.0, -0.3).visibility, 0.0);
        assert_eq!(LandmarkPoint::new(0.0, 0.0, 0.0, f64::NAN).visibility, 0.0);
    }

    #[test]
    fn test_midpoint_and_distance() {
        let a = LandmarkPoint::at(0.0, 0.0, 0.0);
        let b = LandmarkPoint::new(3.0, 4.0, 0.0, 0.4);
        let mid = a.midpoint(&b);

        assert!((mid.x - 1.5).abs() < 1e-12);
        assert!((mid.y - 2.0).abs() < 1e-12);
        assert!((mid.visibility - 0.4).abs() < 1e-12);
        assert!((a.distance_to(&b) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_scale_factor_prefers_longer_segment() {
        // Spine 0.5, shoulders 0.4
        assert!((scale_factor(&upright_torso(1.0)) - 0.5).abs() < 1e-12);

        let wide = upright_torso(1.0)
            .with(Landmark::LeftShoulder, LandmarkPoint::at(-0.5, 0.0, 0.0))
            .with(Landmark::RightShoulder, LandmarkPoint::at(0.5, 0.0, 0.0));
        assert!((scale_factor(&wide) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_scale_factor_fails_open() {
        let frame = Frame::new().with(Landmark::LeftShoulder, LandmarkPoint::at(0.1, 0.2, 0.0));
        assert_eq!(scale_factor(&frame), 1.0);
    }

    #[test]
    fn test_normalization_is_scale_invariant() {
        let small = normalize_landmarks(&upright_torso(0.5));
        let large = normalize_landmarks(&upright_torso(4.0));

        let a = small.point(Landmark::RightHip).unwrap();
        let b = large.point(Landmark::RightHip).unwrap();
        assert!((a.x - b.x).abs() < 1e-12);
        assert!((a.y - b.y).abs() < 1e-12);
        assert!((a.y - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_normalization_skips_degenerate_scale() {
        let tiny = upright_torso(0.001);
        assert_eq!(normalize_landmarks(&tiny), tiny);
    }

    #[test]
    fn test_calculate_angle() {
        let a = LandmarkPoint::at(1.0, 0.0, 0.0);
        let b = LandmarkPoint::at(0.0, 0.0, 0.0);
        let c = LandmarkPoint::at(0.0, 1.0, 0.0);
        assert!((calculate_angle(&a, &b, &c) - FRAC_PI_2).abs() < 1e-12);

        let straight = LandmarkPoint::at(-1.0, 0.0, 0.0);
        assert!((calculate_angle(&a, &b, &straight) - PI).abs() < 1e-9);
    }

    #[test]
    fn test_calculate_angle_degenerate_is_zero() {
        let p = LandmarkPoint::at(0.3, 0.3, 0.3);
        let angle = calculate_angle(&p, &p, &LandmarkPoint::at(1.0, 0.0, 0.0));
        assert_eq!(angle, 0.0);
        assert!(!angle.is_nan());
    }
}
