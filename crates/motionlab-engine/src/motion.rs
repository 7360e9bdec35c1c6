//! Movement pattern and contraction phase classification.
//!
//! The analyzer compares each frame with the one before it, so it carries a
//! one-frame buffer and a frame counter across calls within a session:
//!
//! 1. **Re-entry guard**: an empty frame, or any shoulder/hip below the
//!    visibility threshold, resets the counter and drops the buffer. A subject
//!    reappearing after an occlusion would otherwise produce a finite
//!    difference spanning seconds.
//! 2. **Warm-up**: the first `warmup_frames` visible frames only fill the
//!    buffer.
//! 3. **Steady state**: phase from the vertical motion of the spine center,
//!    pattern from a lower-body test followed by an upper-body test.
//!
//! Frames are expected in scale-normalized units (see
//! [`motionlab_core::normalize_landmarks`]).

use motionlab_core::{
    calculate_angle, landmark_midpoint, Frame, Landmark, LandmarkPoint, MotionPattern,
    MovementState,
};
use serde::{Deserialize, Serialize};

/// Motion analyzer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionAnalyzerConfig {
    /// Frames buffered before classification starts (≈0.3s at 30fps)
    pub warmup_frames: u32,
    /// Minimum visibility for shoulders and hips
    pub visibility_threshold: f64,
    /// Spine-center vertical displacement below which the phase is isometric
    pub isometric_threshold: f64,
    /// Mean hip drop (image y, downward positive) separating knee- from hip-dominant
    pub hip_displacement_threshold: f64,
}

impl Default for MotionAnalyzerConfig {
    fn default() -> Self {
        Self {
            warmup_frames: 10,
            visibility_threshold: 0.5,
            isometric_threshold: 0.005,
            hip_displacement_threshold: 0.1,
        }
    }
}

/// Result of classifying one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MotionClassification {
    pub pattern: MotionPattern,
    pub state: MovementState,
}

impl MotionClassification {
    pub const STABILIZING: Self = Self {
        pattern: MotionPattern::Stabilizing,
        state: MovementState::Isometric,
    };

    pub fn is_stabilizing(&self) -> bool {
        self.pattern == MotionPattern::Stabilizing
    }
}

/// Stateful per-session movement classifier
#[derive(Debug, Clone)]
pub struct MotionAnalyzer {
    config: MotionAnalyzerConfig,
    frame_count: u32,
    previous: Option<Frame>,
}

impl MotionAnalyzer {
    pub fn new(config: MotionAnalyzerConfig) -> Self {
        Self {
            config,
            frame_count: 0,
            previous: None,
        }
    }

    pub fn config(&self) -> &MotionAnalyzerConfig {
        &self.config
    }

    /// Visible frames seen since the last reset
    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    pub fn is_warmed_up(&self) -> bool {
        self.frame_count >= self.config.warmup_frames && self.previous.is_some()
    }

    pub fn reset(&mut self) {
        self.frame_count = 0;
        self.previous = None;
    }

    /// Classify `frame` against the buffered previous frame.
    ///
    /// Takes the frame by value: it becomes the new previous frame.
    pub fn analyze(&mut self, frame: Frame) -> MotionClassification {
        if !frame.has_core(self.config.visibility_threshold) {
            if self.frame_count > 0 {
                tracing::debug!(
                    frames = self.frame_count,
                    "Core landmarks lost, motion analyzer re-entering warm-up"
                );
            }
            self.reset();
            return MotionClassification::STABILIZING;
        }

        let previous = match self.previous.take() {
            Some(previous) if self.frame_count >= self.config.warmup_frames => previous,
            _ => {
                self.previous = Some(frame);
                self.frame_count = self.frame_count.saturating_add(1);
                return MotionClassification::STABILIZING;
            }
        };

        let state = self.movement_state(&previous, &frame);
        let pattern = self
            .lower_body_pattern(&previous, &frame)
            .or_else(|| self.upper_body_pattern(&previous, &frame))
            .unwrap_or(MotionPattern::Vertical);

        self.previous = Some(frame);
        self.frame_count = self.frame_count.saturating_add(1);

        MotionClassification { pattern, state }
    }

    fn point(&self, frame: &Frame, landmark: Landmark) -> Option<LandmarkPoint> {
        frame.visible(landmark, self.config.visibility_threshold)
    }

    fn movement_state(&self, previous: &Frame, current: &Frame) -> MovementState {
        let (Some(prev), Some(curr)) = (spine_center(previous), spine_center(current)) else {
            return MovementState::Isometric;
        };

        let dy = curr.y - prev.y;
        if dy.abs() < self.config.isometric_threshold {
            MovementState::Isometric
        } else if dy < 0.0 {
            // Image y grows downward: rising spine works against gravity
            MovementState::Concentric
        } else {
            MovementState::Eccentric
        }
    }

    fn lower_body_pattern(&self, previous: &Frame, current: &Frame) -> Option<MotionPattern> {
        let prev = self.leg_angles(previous)?;
        let curr = self.leg_angles(current)?;

        let knee_delta = ((curr.left_knee - prev.left_knee).abs()
            + (curr.right_knee - prev.right_knee).abs())
            / 2.0;
        let hip_delta = ((curr.left_hip - prev.left_hip).abs()
            + (curr.right_hip - prev.right_hip).abs())
            / 2.0;
        // Signed: image y grows downward, so a descending hip is positive
        let hip_delta_y = curr.hip_height - prev.hip_height;

        let threshold = self.config.hip_displacement_threshold;
        if hip_delta_y > threshold && knee_delta > hip_delta {
            Some(MotionPattern::KneeDominant)
        } else if hip_delta_y < threshold && hip_delta > knee_delta {
            Some(MotionPattern::HipDominant)
        } else {
            None
        }
    }

    fn leg_angles(&self, frame: &Frame) -> Option<LegAngles> {
        let ls = self.point(frame, Landmark::LeftShoulder)?;
        let rs = self.point(frame, Landmark::RightShoulder)?;
        let lh = self.point(frame, Landmark::LeftHip)?;
        let rh = self.point(frame, Landmark::RightHip)?;
        let lk = self.point(frame, Landmark::LeftKnee)?;
        let rk = self.point(frame, Landmark::RightKnee)?;
        let la = self.point(frame, Landmark::LeftAnkle)?;
        let ra = self.point(frame, Landmark::RightAnkle)?;

        let spine_mid = ls.midpoint(&rs).midpoint(&lh.midpoint(&rh));

        Some(LegAngles {
            left_knee: calculate_angle(&lh, &lk, &la),
            right_knee: calculate_angle(&rh, &rk, &ra),
            left_hip: calculate_angle(&spine_mid, &lh, &lk),
            right_hip: calculate_angle(&spine_mid, &rh, &rk),
            hip_height: (lh.y + rh.y) / 2.0,
        })
    }

    fn upper_body_pattern(&self, previous: &Frame, current: &Frame) -> Option<MotionPattern> {
        let prev = self.wrist_offset(previous)?;
        let curr = self.wrist_offset(current)?;

        let delta = curr - prev;
        let vertical = delta.y.abs() > delta.x.abs() + delta.z.abs();
        let push = curr.norm() > prev.norm();

        Some(match (vertical, push) {
            (true, true) => MotionPattern::VerticalPush,
            (true, false) => MotionPattern::VerticalPull,
            (false, true) => MotionPattern::HorizontalPush,
            (false, false) => MotionPattern::HorizontalPull,
        })
    }

    /// Wrist midpoint relative to shoulder midpoint
    fn wrist_offset(&self, frame: &Frame) -> Option<nalgebra::Vector3<f64>> {
        let ls = self.point(frame, Landmark::LeftShoulder)?;
        let rs = self.point(frame, Landmark::RightShoulder)?;
        let lw = self.point(frame, Landmark::LeftWrist)?;
        let rw = self.point(frame, Landmark::RightWrist)?;
        Some(lw.midpoint(&rw) - ls.midpoint(&rs))
    }
}

impl Default for MotionAnalyzer {
    fn default() -> Self {
        Self::new(MotionAnalyzerConfig::default())
    }
}

struct LegAngles {
    left_knee: f64,
    right_knee: f64,
    left_hip: f64,
    right_hip: f64,
    hip_height: f64,
}

/// Midpoint of the shoulder and hip midpoints
pub fn spine_center(frame: &Frame) -> Option<LandmarkPoint> {
    let shoulders = landmark_midpoint(frame, Landmark::LeftShoulder, Landmark::RightShoulder)?;
    let hips = landmark_midpoint(frame, Landmark::LeftHip, Landmark::RightHip)?;
    Some(shoulders.midpoint(&hips))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn torso(shoulder_y: f64, hip_y: f64) -> Frame {
        Frame::new()
            .with(Landmark::LeftShoulder, LandmarkPoint::at(-0.2, shoulder_y, 0.0))
            .with(Landmark::RightShoulder, LandmarkPoint::at(0.2, shoulder_y, 0.0))
            .with(Landmark::LeftHip, LandmarkPoint::at(-0.15, hip_y, 0.0))
            .with(Landmark::RightHip, LandmarkPoint::at(0.15, hip_y, 0.0))
    }

    fn standing() -> Frame {
        torso(0.0, 0.5)
            .with(Landmark::LeftKnee, LandmarkPoint::at(-0.15, 1.0, 0.0))
            .with(Landmark::RightKnee, LandmarkPoint::at(0.15, 1.0, 0.0))
            .with(Landmark::LeftAnkle, LandmarkPoint::at(-0.15, 1.5, 0.0))
            .with(Landmark::RightAnkle, LandmarkPoint::at(0.15, 1.5, 0.0))
    }

    fn warmed_up(frame: &Frame) -> MotionAnalyzer {
        let mut analyzer = MotionAnalyzer::default();
        for _ in 0..10 {
            assert!(analyzer.analyze(frame.clone()).is_stabilizing());
        }
        analyzer
    }

    #[test]
    fn test_never_classifies_during_warmup() {
        let mut analyzer = MotionAnalyzer::default();
        for i in 0..10 {
            let result = analyzer.analyze(torso(0.0 + i as f64 * 0.05, 0.5 + i as f64 * 0.05));
            assert_eq!(result, MotionClassification::STABILIZING);
        }
        assert_eq!(analyzer.frame_count(), 10);
        assert!(analyzer.is_warmed_up());

        let result = analyzer.analyze(torso(0.6, 1.1));
        assert!(!result.is_stabilizing());
        assert_eq!(result.state, MovementState::Eccentric);
    }

    #[test]
    fn test_occlusion_resets_counter() {
        let mut analyzer = warmed_up(&standing());
        analyzer.analyze(standing());
        assert_eq!(analyzer.frame_count(), 11);

        let mut occluded = standing();
        occluded.insert("left_hip", LandmarkPoint::new(-0.15, 0.5, 0.0, 0.3));
        assert!(analyzer.analyze(occluded).is_stabilizing());
        assert_eq!(analyzer.frame_count(), 0);
        assert!(!analyzer.is_warmed_up());

        // Next visible frame re-enters warm-up
        assert!(analyzer.analyze(standing()).is_stabilizing());
        assert_eq!(analyzer.frame_count(), 1);
    }

    #[test]
    fn test_occlusion_during_warmup_resets_counter() {
        let mut analyzer = MotionAnalyzer::default();
        for _ in 0..5 {
            analyzer.analyze(standing());
        }
        assert_eq!(analyzer.frame_count(), 5);

        let mut occluded = standing();
        occluded.insert("right_shoulder", LandmarkPoint::new(0.2, 0.0, 0.0, 0.1));
        assert!(analyzer.analyze(occluded).is_stabilizing());
        assert_eq!(analyzer.frame_count(), 0);
        assert!(!analyzer.is_warmed_up());
    }

    #[test]
    fn test_empty_frame_resets_counter() {
        let mut analyzer = warmed_up(&standing());
        assert!(analyzer.analyze(Frame::new()).is_stabilizing());
        assert_eq!(analyzer.frame_count(), 0);
    }

    #[test]
    fn test_movement_state_from_spine_center() {
        let mut analyzer = warmed_up(&torso(0.0, 0.5));
        assert_eq!(analyzer.analyze(torso(0.001, 0.501)).state, MovementState::Isometric);
        assert_eq!(analyzer.analyze(torso(-0.05, 0.45)).state, MovementState::Concentric);
        assert_eq!(analyzer.analyze(torso(0.0, 0.5)).state, MovementState::Eccentric);
    }

    #[test]
    fn test_squat_descent_is_knee_dominant() {
        let mut analyzer = warmed_up(&standing());

        // Hips drop 0.15 while the knees travel forward
        let descent = torso(0.15, 0.65)
            .with(Landmark::LeftKnee, LandmarkPoint::at(-0.15, 1.0, -0.35))
            .with(Landmark::RightKnee, LandmarkPoint::at(0.15, 1.0, -0.35))
            .with(Landmark::LeftAnkle, LandmarkPoint::at(-0.15, 1.5, 0.0))
            .with(Landmark::RightAnkle, LandmarkPoint::at(0.15, 1.5, 0.0));

        let result = analyzer.analyze(descent);
        assert_eq!(result.pattern, MotionPattern::KneeDominant);
        assert_eq!(result.state, MovementState::Eccentric);
    }

    #[test]
    fn test_hinge_is_hip_dominant() {
        let mut analyzer = warmed_up(&standing());

        // Torso pitches forward over fixed hips
        let hinge = standing()
            .with(Landmark::LeftShoulder, LandmarkPoint::at(-0.2, 0.2, -0.4))
            .with(Landmark::RightShoulder, LandmarkPoint::at(0.2, 0.2, -0.4))
            .with(Landmark::LeftKnee, LandmarkPoint::at(-0.15, 1.0, -0.05))
            .with(Landmark::RightKnee, LandmarkPoint::at(0.15, 1.0, -0.05));

        assert_eq!(analyzer.analyze(hinge).pattern, MotionPattern::HipDominant);
    }

    #[test]
    fn test_overhead_press_is_vertical_push() {
        let start = torso(0.0, 0.5)
            .with(Landmark::LeftWrist, LandmarkPoint::at(-0.25, -0.1, 0.0))
            .with(Landmark::RightWrist, LandmarkPoint::at(0.25, -0.1, 0.0));
        let mut analyzer = warmed_up(&start);

        let lockout = torso(0.0, 0.5)
            .with(Landmark::LeftWrist, LandmarkPoint::at(-0.25, -0.5, 0.0))
            .with(Landmark::RightWrist, LandmarkPoint::at(0.25, -0.5, 0.0));

        assert_eq!(analyzer.analyze(lockout).pattern, MotionPattern::VerticalPush);
    }

    #[test]
    fn test_row_is_horizontal_pull() {
        let reach = torso(0.0, 0.5)
            .with(Landmark::LeftWrist, LandmarkPoint::at(-0.25, 0.1, -0.5))
            .with(Landmark::RightWrist, LandmarkPoint::at(0.25, 0.1, -0.5));
        let mut analyzer = warmed_up(&reach);

        let pulled = torso(0.0, 0.5)
            .with(Landmark::LeftWrist, LandmarkPoint::at(-0.25, 0.1, -0.1))
            .with(Landmark::RightWrist, LandmarkPoint::at(0.25, 0.1, -0.1));

        assert_eq!(analyzer.analyze(pulled).pattern, MotionPattern::HorizontalPull);
    }

    #[test]
    fn test_static_legs_fall_through_to_upper_body() {
        let start = standing()
            .with(Landmark::LeftWrist, LandmarkPoint::at(-0.25, -0.1, 0.0))
            .with(Landmark::RightWrist, LandmarkPoint::at(0.25, -0.1, 0.0));
        let mut analyzer = warmed_up(&start);

        let lockout = standing()
            .with(Landmark::LeftWrist, LandmarkPoint::at(-0.25, -0.5, 0.0))
            .with(Landmark::RightWrist, LandmarkPoint::at(0.25, -0.5, 0.0));

        assert_eq!(analyzer.analyze(lockout).pattern, MotionPattern::VerticalPush);
    }

    #[test]
    fn test_squat_ascent_is_not_knee_dominant() {
        // Hips rise 0.15 while the knees pull back: the mirror of the descent
        let bottom = torso(0.15, 0.65)
            .with(Landmark::LeftKnee, LandmarkPoint::at(-0.15, 1.0, -0.35))
            .with(Landmark::RightKnee, LandmarkPoint::at(0.15, 1.0, -0.35))
            .with(Landmark::LeftAnkle, LandmarkPoint::at(-0.15, 1.5, 0.0))
            .with(Landmark::RightAnkle, LandmarkPoint::at(0.15, 1.5, 0.0));
        let mut analyzer = warmed_up(&bottom);

        let result = analyzer.analyze(standing());
        assert_ne!(result.pattern, MotionPattern::KneeDominant);
        assert_eq!(result.state, MovementState::Concentric);
    }

    #[test]
    fn test_torso_only_defaults_to_vertical() {
        let mut analyzer = warmed_up(&torso(0.0, 0.5));
        assert_eq!(analyzer.analyze(torso(0.0, 0.5)).pattern, MotionPattern::Vertical);
    }
}
