//! Fundamental types for biomechanical session analysis.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::error::{Error, Result};
use crate::geometry::LandmarkPoint;

/// Body landmarks consumed by the analysis core (MediaPipe naming)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Landmark {
    Nose,
    LeftEar,
    RightEar,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
}

impl Landmark {
    pub const COUNT: usize = 15;

    /// Landmarks that must be visible before any frame is classified
    pub const CORE: [Landmark; 4] = [
        Landmark::LeftShoulder,
        Landmark::RightShoulder,
        Landmark::LeftHip,
        Landmark::RightHip,
    ];

    pub fn all() -> &'static [Landmark; Landmark::COUNT] {
        &[
            Landmark::Nose,
            Landmark::LeftEar,
            Landmark::RightEar,
            Landmark::LeftShoulder,
            Landmark::RightShoulder,
            Landmark::LeftElbow,
            Landmark::RightElbow,
            Landmark::LeftWrist,
            Landmark::RightWrist,
            Landmark::LeftHip,
            Landmark::RightHip,
            Landmark::LeftKnee,
            Landmark::RightKnee,
            Landmark::LeftAnkle,
            Landmark::RightAnkle,
        ]
    }

    /// Joint-name key used by the pose-extraction collaborator
    pub fn as_str(&self) -> &'static str {
        match self {
            Landmark::Nose => "nose",
            Landmark::LeftEar => "left_ear",
            Landmark::RightEar => "right_ear",
            Landmark::LeftShoulder => "left_shoulder",
            Landmark::RightShoulder => "right_shoulder",
            Landmark::LeftElbow => "left_elbow",
            Landmark::RightElbow => "right_elbow",
            Landmark::LeftWrist => "left_wrist",
            Landmark::RightWrist => "right_wrist",
            Landmark::LeftHip => "left_hip",
            Landmark::RightHip => "right_hip",
            Landmark::LeftKnee => "left_knee",
            Landmark::RightKnee => "right_knee",
            Landmark::LeftAnkle => "left_ankle",
            Landmark::RightAnkle => "right_ankle",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::all().iter().copied().find(|lm| lm.as_str() == name)
    }
}

impl fmt::Display for Landmark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One sampled pose: joint name to landmark point.
///
/// Keys are free-form strings so that landmarks this core does not consume
/// (hands, feet, face mesh) pass through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Frame {
    landmarks: HashMap<String, LandmarkPoint>,
}

impl Frame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert keyed by a known landmark
    pub fn with(mut self, landmark: Landmark, point: LandmarkPoint) -> Self {
        self.insert(landmark.as_str(), point);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, point: LandmarkPoint) {
        self.landmarks.insert(name.into(), point);
    }

    pub fn get(&self, name: &str) -> Option<&LandmarkPoint> {
        self.landmarks.get(name)
    }

    pub fn point(&self, landmark: Landmark) -> Option<LandmarkPoint> {
        self.landmarks.get(landmark.as_str()).copied()
    }

    /// Landmark point if present with at least `min_visibility`
    pub fn visible(&self, landmark: Landmark, min_visibility: f64) -> Option<LandmarkPoint> {
        self.point(landmark).filter(|p| p.visibility >= min_visibility)
    }

    /// True when every core landmark (both shoulders, both hips) is visible
    pub fn has_core(&self, min_visibility: f64) -> bool {
        !self.is_empty()
            && Landmark::CORE
                .iter()
                .all(|lm| self.visible(*lm, min_visibility).is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.landmarks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.landmarks.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &LandmarkPoint)> {
        self.landmarks.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// New frame with `f` applied to every point
    pub fn map_points<F>(&self, mut f: F) -> Frame
    where
        F: FnMut(&LandmarkPoint) -> LandmarkPoint,
    {
        Frame {
            landmarks: self
                .landmarks
                .iter()
                .map(|(k, v)| (k.clone(), f(v)))
                .collect(),
        }
    }
}

/// Frame tagged with its capture time, as emitted by the pose extractor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedFrame {
    #[serde(rename = "timestampMs")]
    pub timestamp_ms: i64,
    pub landmarks: Frame,
}

impl TimedFrame {
    pub fn new(timestamp_ms: i64, landmarks: Frame) -> Self {
        Self {
            timestamp_ms,
            landmarks,
        }
    }
}

/// Ordered sequence of frames for one analysis call.
///
/// Order is preserved exactly as supplied; velocity and ROM both depend on it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Session {
    frames: Vec<TimedFrame>,
}

impl Session {
    pub fn new(frames: Vec<TimedFrame>) -> Self {
        Self { frames }
    }

    /// Build from parallel frame and millisecond-timestamp sequences
    pub fn from_parallel(frames: Vec<Frame>, timestamps_ms: Vec<i64>) -> Result<Self> {
        if frames.len() != timestamps_ms.len() {
            return Err(Error::InvalidInput(format!(
                "{} frames but {} timestamps",
                frames.len(),
                timestamps_ms.len()
            )));
        }

        Ok(Self {
            frames: timestamps_ms
                .into_iter()
                .zip(frames)
                .map(|(t, f)| TimedFrame::new(t, f))
                .collect(),
        })
    }

    /// Parse the collaborator's JSON frame list
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn frames(&self) -> &[TimedFrame] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn push(&mut self, frame: TimedFrame) {
        self.frames.push(frame);
    }
}

/// Body region a pattern, joint or request belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BodyRegion {
    Upper,
    Lower,
}

/// Classified movement pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MotionPattern {
    /// Warm-up or re-entry; no classification performed
    Stabilizing,
    Vertical,
    Horizontal,
    VerticalPush,
    HorizontalPush,
    VerticalPull,
    HorizontalPull,
    KneeDominant,
    HipDominant,
}

impl MotionPattern {
    pub const ALL: [MotionPattern; 9] = [
        MotionPattern::Stabilizing,
        MotionPattern::Vertical,
        MotionPattern::Horizontal,
        MotionPattern::VerticalPush,
        MotionPattern::HorizontalPush,
        MotionPattern::VerticalPull,
        MotionPattern::HorizontalPull,
        MotionPattern::KneeDominant,
        MotionPattern::HipDominant,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MotionPattern::Stabilizing => "STABILIZING",
            MotionPattern::Vertical => "VERTICAL",
            MotionPattern::Horizontal => "HORIZONTAL",
            MotionPattern::VerticalPush => "VERTICAL_PUSH",
            MotionPattern::HorizontalPush => "HORIZONTAL_PUSH",
            MotionPattern::VerticalPull => "VERTICAL_PULL",
            MotionPattern::HorizontalPull => "HORIZONTAL_PULL",
            MotionPattern::KneeDominant => "KNEE_DOMINANT",
            MotionPattern::HipDominant => "HIP_DOMINANT",
        }
    }

    /// Region of the prime movers, if the pattern identifies one
    pub fn region(&self) -> Option<BodyRegion> {
        match self {
            MotionPattern::VerticalPush
            | MotionPattern::HorizontalPush
            | MotionPattern::VerticalPull
            | MotionPattern::HorizontalPull => Some(BodyRegion::Upper),
            MotionPattern::KneeDominant | MotionPattern::HipDominant => Some(BodyRegion::Lower),
            MotionPattern::Stabilizing | MotionPattern::Vertical | MotionPattern::Horizontal => {
                None
            }
        }
    }
}

impl fmt::Display for MotionPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Muscle contraction phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementState {
    /// Lengthening under load (moving with gravity)
    Eccentric,
    /// Shortening (moving against gravity)
    Concentric,
    /// No significant displacement
    Isometric,
}

impl MovementState {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementState::Eccentric => "ECCENTRIC",
            MovementState::Concentric => "CONCENTRIC",
            MovementState::Isometric => "ISOMETRIC",
        }
    }
}

impl fmt::Display for MovementState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller-selected training focus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TargetArea {
    Upper,
    Lower,
    #[default]
    Full,
}

impl TargetArea {
    pub fn includes_upper(&self) -> bool {
        matches!(self, TargetArea::Upper | TargetArea::Full)
    }

    pub fn includes_lower(&self) -> bool {
        matches!(self, TargetArea::Lower | TargetArea::Full)
    }

    pub fn includes(&self, region: BodyRegion) -> bool {
        match region {
            BodyRegion::Upper => self.includes_upper(),
            BodyRegion::Lower => self.includes_lower(),
        }
    }
}

/// Caller-supplied contraction type of the exercise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MotionTypeHint {
    #[default]
    Isotonic,
    Isometric,
    Isokinetic,
}

/// Per-frame posture stability metrics
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StabilityMetrics {
    /// Shoulder shrug [0, 1]
    pub elevation_factor: f64,
    /// Knee collapse [0, 1]
    pub valgus_factor: f64,
    /// Scapular retraction (+) vs rounded shoulders (-); depth-derived, advisory
    pub retraction_factor: f64,
    /// Hip height asymmetry [0, inf); 0 when the view is not frontal
    pub pelvic_tilt_factor: f64,
}

/// Joints whose angle series are tracked across a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JointId {
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
}

impl JointId {
    pub const ALL: [JointId; 8] = [
        JointId::LeftShoulder,
        JointId::RightShoulder,
        JointId::LeftElbow,
        JointId::RightElbow,
        JointId::LeftHip,
        JointId::RightHip,
        JointId::LeftKnee,
        JointId::RightKnee,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JointId::LeftShoulder => "left_shoulder",
            JointId::RightShoulder => "right_shoulder",
            JointId::LeftElbow => "left_elbow",
            JointId::RightElbow => "right_elbow",
            JointId::LeftHip => "left_hip",
            JointId::RightHip => "right_hip",
            JointId::LeftKnee => "left_knee",
            JointId::RightKnee => "right_knee",
        }
    }

    /// (proximal, vertex, distal) landmarks defining the joint angle
    pub fn landmarks(&self) -> (Landmark, Landmark, Landmark) {
        use Landmark::*;
        match self {
            JointId::LeftShoulder => (LeftHip, LeftShoulder, LeftElbow),
            JointId::RightShoulder => (RightHip, RightShoulder, RightElbow),
            JointId::LeftElbow => (LeftShoulder, LeftElbow, LeftWrist),
            JointId::RightElbow => (RightShoulder, RightElbow, RightWrist),
            JointId::LeftHip => (LeftShoulder, LeftHip, LeftKnee),
            JointId::RightHip => (RightShoulder, RightHip, RightKnee),
            JointId::LeftKnee => (LeftHip, LeftKnee, LeftAnkle),
            JointId::RightKnee => (RightHip, RightKnee, RightAnkle),
        }
    }

    pub fn region(&self) -> BodyRegion {
        match self {
            JointId::LeftShoulder
            | JointId::RightShoulder
            | JointId::LeftElbow
            | JointId::RightElbow => BodyRegion::Upper,
            JointId::LeftHip | JointId::RightHip | JointId::LeftKnee | JointId::RightKnee => {
                BodyRegion::Lower
            }
        }
    }

    /// Proximal joint whose large muscle groups stabilize this one
    pub fn proximal(&self) -> Option<JointId> {
        match self {
            JointId::LeftElbow => Some(JointId::LeftShoulder),
            JointId::RightElbow => Some(JointId::RightShoulder),
            JointId::LeftKnee => Some(JointId::LeftHip),
            JointId::RightKnee => Some(JointId::RightHip),
            _ => None,
        }
    }
}

impl fmt::Display for JointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Muscle groups scored by the energy-leak model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Muscle {
    Deltoids,
    Triceps,
    Pectorals,
    Trapezius,
    Latissimus,
    Biceps,
    Rhomboids,
    Quadriceps,
    Glutes,
    Hamstrings,
    Adductors,
}

impl Muscle {
    pub fn as_str(&self) -> &'static str {
        match self {
            Muscle::Deltoids => "deltoids",
            Muscle::Triceps => "triceps",
            Muscle::Pectorals => "pectorals",
            Muscle::Trapezius => "trapezius",
            Muscle::Latissimus => "latissimus",
            Muscle::Biceps => "biceps",
            Muscle::Rhomboids => "rhomboids",
            Muscle::Quadriceps => "quadriceps",
            Muscle::Glutes => "glutes",
            Muscle::Hamstrings => "hamstrings",
            Muscle::Adductors => "adductors",
        }
    }
}

impl fmt::Display for Muscle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
