//! Per-frame posture stability metrics.
//!
//! ## Elevation (shoulder shrug)
//!
//! `1 - neck / (0.5 * clavicle)`, clamped to [0, 1]. Neck length is the mean
//! ear-to-shoulder distance; clavicle length is the shoulder width. A relaxed
//! neck is at least half the clavicle length, so shrugging drives the ratio
//! toward 1.
//!
//! ## Retraction
//!
//! Mean shoulder depth minus spine-center depth. Positive means retracted
//! scapulae, negative means rounded shoulders. Monocular depth is the least
//! reliable axis, so this value is advisory only.
//!
//! ## Valgus (knee collapse)
//!
//! Flagged only when the knees sit clearly inside the ankles (< 0.8x ankle
//! width) or the hips (< 0.7x hip width).
//!
//! ## Pelvic tilt
//!
//! Hip height asymmetry, only measured from a frontal view. In a side view
//! the hips overlap and the y difference is meaningless.

use motionlab_core::{landmark_midpoint, Frame, Landmark, LandmarkPoint, StabilityMetrics};

const EPSILON: f64 = 1e-9;

/// Knee width below this fraction of ankle width is a valgus candidate
pub const VALGUS_ANKLE_RATIO: f64 = 0.8;
/// Knee width below this fraction of hip width is a valgus candidate
pub const VALGUS_HIP_RATIO: f64 = 0.7;
/// Shoulder width must reach this fraction of spine length for a frontal view
pub const FRONTAL_VIEW_RATIO: f64 = 0.3;

/// Stateless stability metric calculator
#[derive(Debug, Clone, Copy, Default)]
pub struct StabilityCalculator;

impl StabilityCalculator {
    /// Compute every sub-metric; a missing landmark zeroes only its own metric
    pub fn calculate(frame: &Frame) -> StabilityMetrics {
        StabilityMetrics {
            elevation_factor: Self::elevation_factor(frame).unwrap_or(0.0),
            valgus_factor: Self::valgus_factor(frame).unwrap_or(0.0),
            retraction_factor: Self::retraction_factor(frame).unwrap_or(0.0),
            pelvic_tilt_factor: Self::pelvic_tilt_factor(frame).unwrap_or(0.0),
        }
    }

    /// True when shoulders and hips are present and the torso is seen edge-on
    pub fn is_side_view(frame: &Frame) -> bool {
        matches!(Self::frontal_view(frame), Some(false))
    }

    fn elevation_factor(frame: &Frame) -> Option<f64> {
        let ls = frame.point(Landmark::LeftShoulder)?;
        let rs = frame.point(Landmark::RightShoulder)?;
        let le = frame.point(Landmark::LeftEar)?;
        let re = frame.point(Landmark::RightEar)?;

        let clavicle_length = ls.distance_to(&rs);
        if clavicle_length < EPSILON {
            return None;
        }

        let neck_length = (le.distance_to(&ls) + re.distance_to(&rs)) / 2.0;
        Some((1.0 - neck_length / (0.5 * clavicle_length)).clamp(0.0, 1.0))
    }

    fn retraction_factor(frame: &Frame) -> Option<f64> {
        let ls = frame.point(Landmark::LeftShoulder)?;
        let rs = frame.point(Landmark::RightShoulder)?;
        let hip_mid = landmark_midpoint(frame, Landmark::LeftHip, Landmark::RightHip)?;

        let shoulder_mid = ls.midpoint(&rs);
        let shoulder_depth = (ls.z + rs.z) / 2.0;
        let spine_depth = (shoulder_mid.z + hip_mid.z) / 2.0;
        Some(shoulder_depth - spine_depth)
    }

    fn valgus_factor(frame: &Frame) -> Option<f64> {
        let lk = frame.point(Landmark::LeftKnee)?;
        let rk = frame.point(Landmark::RightKnee)?;
        let la = frame.point(Landmark::LeftAnkle)?;
        let ra = frame.point(Landmark::RightAnkle)?;

        let knee_width = (lk.x - rk.x).abs();
        let ankle_width = (la.x - ra.x).abs();
        let hip_width = match (frame.point(Landmark::LeftHip), frame.point(Landmark::RightHip)) {
            (Some(lh), Some(rh)) => Some((lh.x - rh.x).abs()),
            _ => None,
        };

        let inside_ankles = knee_width < VALGUS_ANKLE_RATIO * ankle_width;
        let inside_hips = hip_width.is_some_and(|w| knee_width < VALGUS_HIP_RATIO * w);

        if !(inside_ankles || inside_hips) || ankle_width < EPSILON {
            return Some(0.0);
        }

        Some(((ankle_width - knee_width) / ankle_width).clamp(0.0, 1.0))
    }

    fn pelvic_tilt_factor(frame: &Frame) -> Option<f64> {
        if !Self::frontal_view(frame)? {
            return Some(0.0);
        }
        let lh = frame.point(Landmark::LeftHip)?;
        let rh = frame.point(Landmark::RightHip)?;
        Some((lh.y - rh.y).abs())
    }

    /// Frontal-view heuristic: `shoulder width >= 0.3 * spine length`, both
    /// measured in the image plane
    fn frontal_view(frame: &Frame) -> Option<bool> {
        let ls = frame.point(Landmark::LeftShoulder)?;
        let rs = frame.point(Landmark::RightShoulder)?;
        let lh = frame.point(Landmark::LeftHip)?;
        let rh = frame.point(Landmark::RightHip)?;

        let shoulder_mid: LandmarkPoint = ls.midpoint(&rs);
        let hip_mid = lh.midpoint(&rh);
        let spine_length = shoulder_mid.planar_distance_to(&hip_mid);
        let shoulder_width = ls.planar_distance_to(&rs);

        Some(shoulder_width >= FRONTAL_VIEW_RATIO * spine_length)
    }
}

/// Weighted stability penalty used by the energy-leak model
pub fn stability_penalty(metrics: &StabilityMetrics) -> f64 {
    metrics.elevation_factor * 0.2
        + metrics.valgus_factor * 0.3
        + (metrics.pelvic_tilt_factor * 0.1).clamp(0.0, 0.2)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Frontal, neutral stance with relaxed shoulders
    fn neutral_frame() -> Frame {
        Frame::new()
            .with(Landmark::LeftEar, LandmarkPoint::at(-0.08, -0.35, 0.0))
            .with(Landmark::RightEar, LandmarkPoint::at(0.08, -0.35, 0.0))
            .with(Landmark::LeftShoulder, LandmarkPoint::at(-0.2, 0.0, 0.0))
            .with(Landmark::RightShoulder, LandmarkPoint::at(0.2, 0.0, 0.0))
            .with(Landmark::LeftHip, LandmarkPoint::at(-0.15, 0.5, 0.0))
            .with(Landmark::RightHip, LandmarkPoint::at(0.15, 0.5, 0.0))
            .with(Landmark::LeftKnee, LandmarkPoint::at(-0.15, 0.9, 0.0))
            .with(Landmark::RightKnee, LandmarkPoint::at(0.15, 0.9, 0.0))
            .with(Landmark::LeftAnkle, LandmarkPoint::at(-0.15, 1.3, 0.0))
            .with(Landmark::RightAnkle, LandmarkPoint::at(0.15, 1.3, 0.0))
    }

    #[test]
    fn test_neutral_stance_is_stable() {
        let metrics = StabilityCalculator::calculate(&neutral_frame());
        assert_eq!(metrics.elevation_factor, 0.0);
        assert_eq!(metrics.valgus_factor, 0.0);
        assert_eq!(metrics.pelvic_tilt_factor, 0.0);
        assert!(metrics.retraction_factor.abs() < 1e-12);
        assert_eq!(stability_penalty(&metrics), 0.0);
    }

    #[test]
    fn test_shrug_raises_elevation() {
        // Ears 0.1 above shoulders against a 0.4 clavicle: neck/(0.5*clav) = 0.5
        let frame = neutral_frame()
            .with(Landmark::LeftEar, LandmarkPoint::at(-0.2, -0.1, 0.0))
            .with(Landmark::RightEar, LandmarkPoint::at(0.2, -0.1, 0.0));
        let metrics = StabilityCalculator::calculate(&frame);
        assert!((metrics.elevation_factor - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_knee_collapse_flags_valgus() {
        let frame = neutral_frame()
            .with(Landmark::LeftKnee, LandmarkPoint::at(-0.05, 0.9, 0.0))
            .with(Landmark::RightKnee, LandmarkPoint::at(0.05, 0.9, 0.0));
        let metrics = StabilityCalculator::calculate(&frame);
        // (0.3 - 0.1) / 0.3
        assert!((metrics.valgus_factor - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_valgus_requires_flagging_condition() {
        // Knees at 0.85x ankle width and wider than 0.7x hips: not flagged
        let frame = neutral_frame()
            .with(Landmark::LeftKnee, LandmarkPoint::at(-0.1275, 0.9, 0.0))
            .with(Landmark::RightKnee, LandmarkPoint::at(0.1275, 0.9, 0.0));
        assert_eq!(StabilityCalculator::calculate(&frame).valgus_factor, 0.0);
    }

    #[test]
    fn test_rounded_shoulders_are_negative_retraction() {
        let frame = neutral_frame()
            .with(Landmark::LeftShoulder, LandmarkPoint::at(-0.2, 0.0, -0.2))
            .with(Landmark::RightShoulder, LandmarkPoint::at(0.2, 0.0, -0.2));
        let metrics = StabilityCalculator::calculate(&frame);
        // shoulders -0.2, spine center -0.1
        assert!((metrics.retraction_factor + 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_pelvic_tilt_frontal_only() {
        let tilted = neutral_frame().with(Landmark::RightHip, LandmarkPoint::at(0.15, 0.56, 0.0));
        let metrics = StabilityCalculator::calculate(&tilted);
        assert!((metrics.pelvic_tilt_factor - 0.06).abs() < 1e-9);
        assert!(!StabilityCalculator::is_side_view(&tilted));

        // Side view: shoulders overlap in x
        let side = tilted
            .with(Landmark::LeftShoulder, LandmarkPoint::at(0.0, 0.0, -0.2))
            .with(Landmark::RightShoulder, LandmarkPoint::at(0.02, 0.0, 0.2));
        assert!(StabilityCalculator::is_side_view(&side));
        assert_eq!(StabilityCalculator::calculate(&side).pelvic_tilt_factor, 0.0);
    }

    #[test]
    fn test_missing_landmarks_default_to_zero() {
        let metrics = StabilityCalculator::calculate(&Frame::new());
        assert_eq!(metrics, StabilityMetrics::default());
        assert!(!StabilityCalculator::is_side_view(&Frame::new()));
    }

    #[test]
    fn test_factors_stay_in_unit_range() {
        // Knees crossed past each other and ears below shoulders
        let frame = neutral_frame()
            .with(Landmark::LeftEar, LandmarkPoint::at(-0.2, 0.01, 0.0))
            .with(Landmark::RightEar, LandmarkPoint::at(0.2, 0.01, 0.0))
            .with(Landmark::LeftKnee, LandmarkPoint::at(0.4, 0.9, 0.0))
            .with(Landmark::RightKnee, LandmarkPoint::at(0.39, 0.9, 0.0));
        let metrics = StabilityCalculator::calculate(&frame);
        assert!((0.0..=1.0).contains(&metrics.elevation_factor));
        assert!((0.0..=1.0).contains(&metrics.valgus_factor));
    }
}
